//! In-memory metadata and transport doubles.

use std::collections::HashMap;
use std::io;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::entry::DeliveryRequest;
use crate::metadata::{
    ATTRIBUTES_PATH, INSTANCE_ID_PATH, MetadataSource, PROJECT_ID_PATH, ZONE_PATH, attribute_path,
};
use crate::transport::{Transport, TransportError};

/// Metadata source answering from a fixed table and recording every lookup.
#[derive(Debug, Default)]
pub struct StaticMetadata {
    values: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// A plain VM in `europe-west1-d` with no instance attributes.
    pub fn compute() -> Self {
        Self::new()
            .with(PROJECT_ID_PATH, "project_id")
            .with(ZONE_PATH, "projects/55605977627/zones/europe-west1-d")
            .with(INSTANCE_ID_PATH, "vm_id")
            .with(ATTRIBUTES_PATH, "")
    }

    /// Store `value` at `path`.
    pub fn with(mut self, path: &str, value: &str) -> Self {
        self.values.insert(path.to_owned(), value.to_owned());
        self
    }

    /// Replace the attribute listing with `attributes` and store their values.
    pub fn with_attributes(mut self, attributes: &[(&str, &str)]) -> Self {
        let listing = attributes
            .iter()
            .map(|(key, _)| *key)
            .collect::<Vec<_>>()
            .join("\n");
        self.values.insert(ATTRIBUTES_PATH.to_owned(), listing);
        for (key, value) in attributes {
            self.values.insert(attribute_path(key), (*value).to_owned());
        }
        self
    }

    /// Remove `path` so lookups fail.
    pub fn without(mut self, path: &str) -> Self {
        self.values.remove(path);
        self
    }

    /// Paths requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl MetadataSource for StaticMetadata {
    fn fetch(&self, path: &str) -> io::Result<String> {
        self.calls.lock().push(path.to_owned());
        self.values.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no metadata at {path}"))
        })
    }
}

/// A request observed by [`RecordingTransport`].
#[derive(Clone, Debug)]
pub struct SentRequest {
    pub project_id: String,
    pub log_name: String,
    pub request: DeliveryRequest,
}

/// Transport that records requests instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentRequest>>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record requests but report every send as failed.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleep for `delay` inside every send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, in order.
    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Transport for RecordingTransport {
    fn send(
        &self,
        project_id: &str,
        log_name: &str,
        request: DeliveryRequest,
    ) -> Result<(), TransportError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.sent.lock().push(SentRequest {
            project_id: project_id.to_owned(),
            log_name: log_name.to_owned(),
            request,
        });
        if self.fail {
            return Err(TransportError::RetriesExhausted {
                attempts: 1,
                last_error: "TEST".into(),
            });
        }
        Ok(())
    }
}
