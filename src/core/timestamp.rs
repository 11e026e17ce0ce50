//! Timestamp formatting utilities
//!
//! Provides the timestamp patterns a formatter can render a record with.

use super::error::{LoggerError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

/// `dd-MMM-yyyy HH:mm:ss.SSS`, e.g. `08-Jan-2025 10:30:45.123`
pub const ONE_LINE_PATTERN: &str = "%d-%b-%Y %H:%M:%S%.3f";

/// Timestamp format options
///
/// # Examples
///
/// ```
/// use rust_scoped_logger::core::TimestampFormat;
/// use chrono::Local;
///
/// let format = TimestampFormat::Iso8601;
/// let timestamp = format.format(&Local::now()).unwrap();
/// assert!(timestamp.contains('T'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `08-Jan-2025 10:30:45.123` (local time)
    #[default]
    OneLine,

    /// ISO 8601 with milliseconds and offset: `2025-01-08T10:30:45.123+01:00`
    Iso8601,

    /// RFC 3339 format: `2025-01-08T10:30:45.123456+01:00`
    Rfc3339,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Custom strftime format, validated by [`TimestampFormat::custom`]
    Custom(String),
}

impl TimestampFormat {
    /// Build a custom format, rejecting patterns chrono cannot render
    pub fn custom(pattern: &str) -> Result<Self> {
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            return Err(LoggerError::format_failure(
                "TimestampFormat",
                format!("invalid strftime pattern '{}'", pattern),
            ));
        }
        Ok(TimestampFormat::Custom(pattern.to_string()))
    }

    /// Format a local `DateTime` according to this format
    pub fn format(&self, datetime: &DateTime<Local>) -> Result<String> {
        let pattern = match self {
            TimestampFormat::OneLine => ONE_LINE_PATTERN,
            TimestampFormat::Iso8601 => "%Y-%m-%dT%H:%M:%S%.3f%:z",
            TimestampFormat::Rfc3339 => return Ok(datetime.to_rfc3339()),
            TimestampFormat::UnixMillis => return Ok(datetime.timestamp_millis().to_string()),
            TimestampFormat::Custom(pattern) => pattern.as_str(),
        };

        let mut out = String::with_capacity(32);
        write!(out, "{}", datetime.format(pattern)).map_err(|_| {
            LoggerError::format_failure(
                "TimestampFormat",
                format!("cannot render timestamp with pattern '{}'", pattern),
            )
        })?;
        Ok(out)
    }
}

impl FromStr for TimestampFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "oneline" | "OneLine" => Ok(TimestampFormat::OneLine),
            "iso8601" | "Iso8601" => Ok(TimestampFormat::Iso8601),
            "rfc3339" | "Rfc3339" => Ok(TimestampFormat::Rfc3339),
            "unix_millis" | "UnixMillis" => Ok(TimestampFormat::UnixMillis),
            pattern => TimestampFormat::custom(pattern),
        }
    }
}
