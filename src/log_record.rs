//! Log record representation consumed by the delivery manager.
//!
//! A [`LogRecord`] is the per-call input to
//! [`CloudLoggingManager::write`](crate::manager::CloudLoggingManager::write).
//! Besides the message and level it carries the caller's timestamp and the
//! end-of-batch signal that tells the manager to flush everything buffered so
//! far, including this record.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::level::LogLevel;

/// A single log event supplied by the emitting application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Formatted message text.
    pub message: String,
    /// Severity of the event.
    pub level: LogLevel,
    /// Milliseconds since the Unix epoch at which the event occurred.
    pub timestamp_millis: i64,
    /// Flush the accumulated batch once this record has been appended.
    pub end_of_batch: bool,
}

impl LogRecord {
    /// Construct a record stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp_millis: now_millis(),
            end_of_batch: false,
        }
    }

    /// Override the event timestamp.
    pub fn with_timestamp_millis(mut self, timestamp_millis: i64) -> Self {
        self.timestamp_millis = timestamp_millis;
        self
    }

    /// Set the end-of-batch flag.
    pub fn with_end_of_batch(mut self, end_of_batch: bool) -> Self {
        self.end_of_batch = end_of_batch;
        self
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}

/// Current wall-clock time in epoch milliseconds.
///
/// Clocks set before 1970 report zero.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
