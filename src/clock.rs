//! # Clock
//! Source of "today" for every date-windowed scan.
//!
//! Production code uses the system UTC date; tests pin a fixed date so that
//! day-window boundaries are deterministic.

use chrono::{NaiveDate, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Current UTC calendar date.
    #[default]
    System,
    /// Always returns the given date.
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Utc::now().date_naive(),
            Clock::Fixed(d) => *d,
        }
    }
}

/// Format a date the way vault filenames embed it (`YYYY-MM-DD`).
pub fn iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}
