//! Log levels accepted by the manager and their Cloud Logging severities.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Severity of a [`LogRecord`](crate::log_record::LogRecord).
///
/// Variants are ordered from least to most severe so comparisons such as
/// `level >= LogLevel::Warn` behave as expected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

/// Returned when a string does not name a known level.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl LogLevel {
    /// All levels in ascending order.
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    /// Canonical upper-case name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Severity string understood by the Cloud Logging backend.
    ///
    /// `WARN` and `FATAL` are renamed; every other level keeps its canonical
    /// name.
    pub const fn cloud_severity(self) -> &'static str {
        match self {
            LogLevel::Warn => "WARNING",
            LogLevel::Fatal => "CRITICAL",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "FATAL" | "CRITICAL" => Ok(Self::Fatal),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LogLevel::Trace, "TRACE")]
    #[case(LogLevel::Debug, "DEBUG")]
    #[case(LogLevel::Info, "INFO")]
    #[case(LogLevel::Warn, "WARNING")]
    #[case(LogLevel::Error, "ERROR")]
    #[case(LogLevel::Fatal, "CRITICAL")]
    fn maps_to_cloud_severity(#[case] level: LogLevel, #[case] expected: &str) {
        assert_eq!(level.cloud_severity(), expected);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::ALL.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[rstest]
    #[case("warning", LogLevel::Warn)]
    #[case(" info ", LogLevel::Info)]
    #[case("CRITICAL", LogLevel::Fatal)]
    fn parses_aliases(#[case] input: &str, #[case] expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_level() {
        let err = "loud".parse::<LogLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown log level: loud");
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for level in LogLevel::ALL {
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
        }
    }
}
