//! Colour management for CLI output
//!
//! Colours are used only when stdout is a terminal, `NO_COLOR` is unset and
//! `--no-color` was not given.

use std::env;
use std::io::IsTerminal;

use colored::{ColoredString, Colorize};

#[derive(Debug, Clone)]
pub struct ColourManager {
    enabled: bool,
}

impl ColourManager {
    /// Detect colour support from the environment
    pub fn new() -> Self {
        let no_color = env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::with_colours(!no_color && std::io::stdout().is_terminal())
    }

    pub fn with_colours(enabled: bool) -> Self {
        Self { enabled }
    }

    /// `--no-color` overrides detection; `config_enabled` comes from `[base] color`
    pub fn from_args(no_color_flag: bool, config_enabled: Option<bool>) -> Self {
        if no_color_flag || config_enabled == Some(false) {
            return Self::with_colours(false);
        }
        Self::new()
    }

    pub fn colours_enabled(&self) -> bool {
        self.enabled
    }

    pub fn error(&self, text: &str) -> ColoredString {
        self.paint(text, |t| t.bright_red())
    }

    pub fn warning(&self, text: &str) -> ColoredString {
        self.paint(text, |t| t.bright_yellow())
    }

    pub fn success(&self, text: &str) -> ColoredString {
        self.paint(text, |t| t.bright_green())
    }

    pub fn highlight(&self, text: &str) -> ColoredString {
        self.paint(text, |t| t.bright_cyan().bold())
    }

    fn paint(&self, text: &str, style: impl FnOnce(&str) -> ColoredString) -> ColoredString {
        if self.enabled {
            style(text)
        } else {
            text.normal()
        }
    }
}

impl Default for ColourManager {
    fn default() -> Self {
        Self::new()
    }
}
