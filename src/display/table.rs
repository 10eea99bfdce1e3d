//! Compact tables for terminal output

use prettytable::{format, Cell, Row, Table};

use super::ColourManager;

/// Format a compact table with headers and rows using the prettytable clean format
pub fn format_compact_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.set_titles(Row::new(headers.iter().map(|h| Cell::new(h)).collect()));
    for row in rows {
        table.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
    }

    // 2-space indent under the section title
    table
        .to_string()
        .lines()
        .map(|line| format!("  {}\n", line.trim_end()))
        .collect()
}

/// A titled table section
pub struct TableBuilder {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn headers(mut self, headers: &[&str]) -> Self {
        self.headers = headers.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn build_with_colors(&self, colour_manager: &ColourManager) -> String {
        let headers: Vec<&str> = self.headers.iter().map(String::as_str).collect();
        let body = format_compact_table(&headers, &self.rows);
        if body.is_empty() {
            return String::new();
        }
        format!("{}\n{}", colour_manager.highlight(&self.title), body)
    }
}
