//! Date parsing for search and activity cutoffs
//!
//! Supports both absolute and relative date formats:
//! - Absolute: ISO 8601 formats like "2016-04-22", "2017-03-22T10:30:00"
//! - Relative: Human-readable formats like "1 month ago", "yesterday", "last month"
//!
//! All results are UTC instants, since the hosting provider compares
//! timestamps in UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Error types for date parsing
#[derive(Debug, thiserror::Error)]
pub enum DateParseError {
    #[error("Invalid date format: {input}. Expected ISO 8601 (YYYY-MM-DD) or relative format (e.g., '1 month ago')")]
    InvalidFormat { input: String },

    #[error("Invalid relative date: {input}. Expected format like '1 month ago', 'yesterday', 'last month'")]
    InvalidRelativeFormat { input: String },

    #[error("Unsupported time unit: {unit}. Supported units: seconds, minutes, hours, days, weeks, months, years")]
    UnsupportedUnit { unit: String },

    #[error("Invalid number in relative date: {input}")]
    InvalidNumber { input: String },
}

/// Parse a date string into a UTC timestamp
///
/// # Examples
///
/// ```
/// use repo_scout::cli::date_parser::parse_date;
///
/// let cutoff = parse_date("2017-03-22").unwrap();
/// assert_eq!(cutoff.to_rfc3339(), "2017-03-22T00:00:00+00:00");
///
/// let recent = parse_date("1 month ago").unwrap();
/// assert!(recent > cutoff);
/// ```
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, DateParseError> {
    parse_date_at(input, Utc::now())
}

/// Parse a date string, resolving relative formats against `now`
pub fn parse_date_at(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = input.trim();

    if let Some(parsed) = parse_absolute_date(trimmed) {
        return Ok(parsed);
    }

    parse_relative_date(trimmed, now)
}

/// Format a timestamp as the plain date used in search qualifiers
pub fn format_search_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_absolute_date(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive_dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn parse_relative_date(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, DateParseError> {
    let input_lower = input.to_lowercase();
    let midnight = |at: DateTime<Utc>| at.date_naive().and_time(NaiveTime::MIN).and_utc();

    match input_lower.as_str() {
        "now" => return Ok(now),
        "today" => return Ok(midnight(now)),
        "yesterday" => return Ok(midnight(now - Duration::days(1))),
        "last week" => return Ok(now - Duration::weeks(1)),
        "last month" => return Ok(now - Duration::days(30)),
        "last year" => return Ok(now - Duration::days(365)),
        _ => {}
    }

    // "N unit ago"
    let parts: Vec<&str> = input_lower.split_whitespace().collect();
    if parts.len() == 3 && parts[2] == "ago" {
        let number = parts[0].parse::<i64>()
            .map_err(|_| DateParseError::InvalidNumber { input: input.to_string() })?;

        let duration = match parts[1] {
            "second" | "seconds" => Duration::seconds(number),
            "minute" | "minutes" => Duration::minutes(number),
            "hour" | "hours" => Duration::hours(number),
            "day" | "days" => Duration::days(number),
            "week" | "weeks" => Duration::weeks(number),
            "month" | "months" => Duration::days(number * 30), // Approximate
            "year" | "years" => Duration::days(number * 365), // Approximate
            unit => return Err(DateParseError::UnsupportedUnit { unit: unit.to_string() }),
        };

        return Ok(now - duration);
    }

    if parts.iter().any(|p| p.chars().all(|c| c.is_ascii_digit() || c == '-' || c == ':')) {
        return Err(DateParseError::InvalidFormat { input: input.to_string() });
    }

    Err(DateParseError::InvalidRelativeFormat { input: input.to_string() })
}
