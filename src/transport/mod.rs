//! Delivery of detached batches to the logging backend.
//!
//! [`Transport`] is the seam between the manager and the network. The
//! production implementation, [`HttpTransport`], posts JSON to the Cloud
//! Logging `entries:write` endpoint and retries transient failures with
//! jittered exponential backoff until the configured retry budget is spent.
//!
//! # Retry Semantics
//!
//! - **2xx**: Success.
//! - **429 (Too Many Requests)**: Retryable.
//! - **5xx**: Retryable.
//! - **Other statuses**: Permanent failure, reported without retry.
//! - **Network errors**: Retryable.

pub(crate) mod backoff;
mod http;
mod token;

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::entry::DeliveryRequest;

pub use backoff::{
    BackoffPolicy, BackoffState, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP, DEFAULT_MAX_RETRY_TIME,
};
pub use http::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT, HttpTransport,
    HttpTransportConfig,
};
pub use token::{MetadataTokenSource, StaticTokenSource, TokenSource, token_source_for};

/// Failure to deliver a request after the transport's own retries.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend rejected the request with a non-retryable status.
    #[error("logging API rejected the request with status {status}: {body}")]
    Status { status: u16, body: String },
    /// Transient failures persisted past the retry budget.
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    /// No access token could be obtained.
    #[error("failed to obtain access token: {0}")]
    Auth(#[source] io::Error),
    /// The request could not be encoded.
    #[error("failed to serialise request: {0}")]
    Serialise(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Sends a [`DeliveryRequest`] addressed by project and log name.
///
/// Implementations retry internally and only return once the request has
/// been accepted or the retry budget is exhausted.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        project_id: &str,
        log_name: &str,
        request: DeliveryRequest,
    ) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(
        &self,
        project_id: &str,
        log_name: &str,
        request: DeliveryRequest,
    ) -> Result<(), TransportError> {
        (**self).send(project_id, log_name, request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(
        &self,
        project_id: &str,
        log_name: &str,
        request: DeliveryRequest,
    ) -> Result<(), TransportError> {
        (**self).send(project_id, log_name, request)
    }
}
