//! Human readable rendering of record timestamps for the activity feed.

use chrono::{DateTime, Utc};

/// `strftime` pattern for feed timestamps, e.g. `01 April 2021 - 09:30 PM UTC`
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%d %B %Y - %I:%M %p UTC";

/// Format a timestamp as `DD Month YYYY - hh:mm AM/PM UTC`
pub fn format_display_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(DISPLAY_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
