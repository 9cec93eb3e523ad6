//! Console color helpers - semantic styling over `colored`

use colored::{ColoredString, Colorize};

/// Semantic text styles used across the console output
pub struct Theme;

impl Theme {
    /// Section headers
    pub fn header(text: &str) -> ColoredString {
        text.bold().cyan()
    }

    /// Primary/action text (e.g. "Checking", "Downloading")
    pub fn primary(text: &str) -> ColoredString {
        text.cyan()
    }

    /// Success markers
    pub fn success(text: &str) -> ColoredString {
        text.green()
    }

    /// Warnings and notes
    pub fn warning(text: &str) -> ColoredString {
        text.yellow()
    }

    /// Errors
    pub fn error(text: &str) -> ColoredString {
        text.red()
    }

    /// De-emphasized text
    pub fn dim(text: &str) -> ColoredString {
        text.dimmed()
    }

    /// Thin horizontal divider
    pub fn divider(width: usize) -> String {
        "-".repeat(width)
    }

    /// Bold horizontal divider
    pub fn divider_bold(width: usize) -> String {
        "=".repeat(width)
    }
}
