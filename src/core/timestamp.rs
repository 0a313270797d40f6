//! Timestamp formatting for the `%(asctime)s` attribute
//!
//! The default rendering is the classic `2025-01-08 10:30:45,123` local-time
//! layout. ISO 8601, RFC 3339, Unix and custom strftime layouts are available
//! for handlers built in code or configured with `datefmt`.

use super::error::{LoggerError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};

/// Layout used to render `%(asctime)s`
///
/// # Examples
///
/// ```
/// use rust_logutils::core::TimestampFormat;
/// use chrono::Utc;
///
/// let format = TimestampFormat::Iso8601;
/// let timestamp = format.format(&Utc::now());
/// assert!(timestamp.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Local time with millisecond suffix: `2025-01-08 10:30:45,123`
    #[default]
    Default,

    /// ISO 8601 in UTC with milliseconds: `2025-01-08T10:30:45.123Z`
    Iso8601,

    /// RFC 3339 format: `2025-01-08T10:30:45.123456+00:00`
    Rfc3339,

    /// Unix timestamp in seconds: `1736332245`
    Unix,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Custom strftime layout, rendered in local time
    ///
    /// Construct through [`TimestampFormat::custom`] so the layout is
    /// validated up front.
    Custom(String),
}

impl TimestampFormat {
    /// Validate a strftime layout and wrap it
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the layout contains an unknown
    /// specifier.
    pub fn custom(layout: impl Into<String>) -> Result<Self> {
        let layout = layout.into();
        if StrftimeItems::new(&layout).any(|item| matches!(item, Item::Error)) {
            return Err(LoggerError::config(
                "datefmt",
                format!("invalid strftime layout '{}'", layout),
            ));
        }
        Ok(TimestampFormat::Custom(layout))
    }

    /// Format a `DateTime<Utc>` according to this format
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Default => datetime
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S,%3f")
                .to_string(),
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(layout) => datetime
                .with_timezone(&Local)
                .format_with_items(StrftimeItems::new(layout))
                .to_string(),
        }
    }
}
