//! Wire representation of delivered log entries.
//!
//! Field names follow the Cloud Logging `entries:write` payload:
//!
//! ```json
//! {
//!   "entries": [{
//!     "textPayload": "...", "log": "...", "insertId": "...",
//!     "metadata": { "projectId": "...", "serviceName": "...", "severity": "...",
//!                   "timestamp": "...", "userId": "...", "zone": "..." }
//!   }],
//!   "commonLabels": { "...": "..." }
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::environment::{Environment, Labels};
use crate::log_record::LogRecord;

/// One log entry ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub text_payload: String,
    pub log: String,
    pub insert_id: String,
    pub metadata: LogEntryMetadata,
}

/// Per-entry metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryMetadata {
    pub project_id: String,
    pub service_name: &'static str,
    pub severity: &'static str,
    /// RFC3339 timestamp in UTC with whole seconds.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub zone: String,
}

impl LogEntry {
    /// Build the entry for `record` under `environment`.
    ///
    /// Every call draws a fresh insert id.
    pub fn from_record(record: &LogRecord, environment: &Environment, user_id: Option<&str>) -> Self {
        Self {
            text_payload: record.message.clone(),
            log: environment.log_name().to_owned(),
            insert_id: next_insert_id(),
            metadata: LogEntryMetadata {
                project_id: environment.project_id().to_owned(),
                service_name: environment.service().service_name(),
                severity: record.level.cloud_severity(),
                timestamp: format_timestamp(record.timestamp_millis),
                user_id: user_id.map(str::to_owned),
                zone: environment.zone().to_owned(),
            },
        }
    }
}

/// A detached batch plus the labels shared by all of its entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub entries: Vec<LogEntry>,
    pub common_labels: Labels,
}

impl DeliveryRequest {
    pub fn new(entries: Vec<LogEntry>, common_labels: Labels) -> Self {
        Self {
            entries,
            common_labels,
        }
    }
}

/// Format epoch milliseconds as RFC3339 UTC without fractional seconds.
///
/// Values outside the representable range format as the Unix epoch.
pub fn format_timestamp(timestamp_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Generate a time-ordered unique insert id.
pub fn next_insert_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::credentials::Credentials;
    use crate::environment::EnvironmentOverrides;
    use crate::level::LogLevel;
    use crate::test_utils::doubles::StaticMetadata;
    use rstest::{fixture, rstest};

    #[fixture]
    fn environment() -> Environment {
        Environment::resolve(
            &EnvironmentOverrides::default(),
            &Credentials::Ambient,
            "log_name",
            &StaticMetadata::compute(),
        )
        .expect("resolve environment")
    }

    #[rstest]
    #[case(1_428_345_504_000, "2015-04-06T18:38:24Z")]
    #[case(1_428_345_504_002, "2015-04-06T18:38:24Z")]
    #[case(0, "1970-01-01T00:00:00Z")]
    #[case(i64::MAX, "1970-01-01T00:00:00Z")]
    fn formats_whole_second_utc(#[case] millis: i64, #[case] expected: &str) {
        assert_eq!(format_timestamp(millis), expected);
    }

    #[rstest]
    fn builds_entry_from_record(environment: Environment) {
        let record = LogRecord::new(LogLevel::Warn, "LogMsg").with_timestamp_millis(1_428_345_504_002);
        let entry = LogEntry::from_record(&record, &environment, None);

        assert_eq!(entry.text_payload, "LogMsg");
        assert_eq!(entry.log, "log_name");
        assert!(!entry.insert_id.is_empty());
        assert_eq!(entry.metadata.project_id, "project_id");
        assert_eq!(entry.metadata.service_name, "compute.googleapis.com");
        assert_eq!(entry.metadata.severity, "WARNING");
        assert_eq!(entry.metadata.timestamp, "2015-04-06T18:38:24Z");
        assert_eq!(entry.metadata.user_id, None);
        assert_eq!(entry.metadata.zone, "europe-west1-d");
    }

    #[rstest]
    fn serialises_with_wire_field_names(environment: Environment) {
        let record = LogRecord::new(LogLevel::Info, "hello").with_timestamp_millis(0);
        let entry = LogEntry::from_record(&record, &environment, Some("svc@example.com"));
        let request = DeliveryRequest::new(vec![entry], environment.common_labels().clone());

        let json = serde_json::to_value(&request).expect("serialise request");
        let entry = &json["entries"][0];
        assert_eq!(entry["textPayload"], "hello");
        assert_eq!(entry["log"], "log_name");
        assert!(entry["insertId"].is_string());
        assert_eq!(entry["metadata"]["projectId"], "project_id");
        assert_eq!(entry["metadata"]["serviceName"], "compute.googleapis.com");
        assert_eq!(entry["metadata"]["severity"], "INFO");
        assert_eq!(entry["metadata"]["timestamp"], "1970-01-01T00:00:00Z");
        assert_eq!(entry["metadata"]["userId"], "svc@example.com");
        assert_eq!(entry["metadata"]["zone"], "europe-west1-d");
        assert_eq!(
            json["commonLabels"]["compute.googleapis.com/resource_type"],
            "instance"
        );
    }

    #[rstest]
    fn omits_absent_user_id(environment: Environment) {
        let record = LogRecord::new(LogLevel::Info, "hello");
        let entry = LogEntry::from_record(&record, &environment, None);
        let json = serde_json::to_value(&entry).expect("serialise entry");
        assert!(json["metadata"].get("userId").is_none());
    }

    #[test]
    fn insert_ids_are_unique() {
        let ids: HashSet<String> = (0..1_000).map(|_| next_insert_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }
}
