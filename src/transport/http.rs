//! Blocking HTTP transport for the Cloud Logging API.
//!
//! A ureq `Agent` provides connection pooling; retries run on the calling
//! thread so a send returns only after success, a permanent failure, or the
//! end of the retry budget.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use native_tls::TlsConnector;
use ureq::{Agent, AgentBuilder};

use crate::entry::DeliveryRequest;

use super::backoff::{BackoffPolicy, BackoffState};
use super::token::TokenSource;
use super::{Transport, TransportError};

/// Root URL of the logging API.
pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com";
/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for a whole request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`HttpTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpTransportConfig {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Classification of HTTP response for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseClass {
    Success,
    Retryable,
    Permanent,
}

/// Classifies an HTTP status code for retry logic.
pub(crate) fn classify_status(status: u16) -> ResponseClass {
    match status {
        200..=299 => ResponseClass::Success,
        429 => ResponseClass::Retryable,
        500..=599 => ResponseClass::Retryable,
        _ => ResponseClass::Permanent,
    }
}

enum Attempt {
    Delivered,
    Retry(String),
    Rejected { status: u16, body: String },
}

/// [`Transport`] posting JSON batches to `entries:write`.
pub struct HttpTransport {
    config: HttpTransportConfig,
    agent: Agent,
    tokens: Box<dyn TokenSource>,
}

impl HttpTransport {
    /// Build a transport using the platform TLS implementation.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS connector cannot be initialised.
    pub fn new(config: HttpTransportConfig, tokens: Box<dyn TokenSource>) -> io::Result<Self> {
        let tls = TlsConnector::new().map_err(io::Error::other)?;
        let agent = AgentBuilder::new()
            .tls_connector(Arc::new(tls))
            .timeout_connect(config.connect_timeout)
            .timeout(config.request_timeout)
            .build();
        Ok(Self {
            config,
            agent,
            tokens,
        })
    }

    fn url_for(&self, project_id: &str, log_name: &str) -> String {
        format!(
            "{}/v1beta3/projects/{project_id}/logs/{log_name}/entries:write",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    fn attempt(&self, url: &str, token: &str, payload: &str) -> Attempt {
        let result = self
            .agent
            .post(url)
            .set("Authorization", &format!("Bearer {token}"))
            .set("Content-Type", "application/json")
            .send_string(payload);

        match result {
            Ok(response) => Self::classify(response.status(), response),
            Err(ureq::Error::Status(status, response)) => Self::classify(status, response),
            Err(ureq::Error::Transport(err)) => Attempt::Retry(err.to_string()),
        }
    }

    fn classify(status: u16, response: ureq::Response) -> Attempt {
        match classify_status(status) {
            ResponseClass::Success => Attempt::Delivered,
            ResponseClass::Retryable => Attempt::Retry(format!("server returned status {status}")),
            ResponseClass::Permanent => Attempt::Rejected {
                status,
                body: response.into_string().unwrap_or_default(),
            },
        }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        project_id: &str,
        log_name: &str,
        request: DeliveryRequest,
    ) -> Result<(), TransportError> {
        let payload = serde_json::to_string(&request)?;
        let token = self.tokens.access_token().map_err(TransportError::Auth)?;
        let url = self.url_for(project_id, log_name);
        let mut backoff = BackoffState::new(self.config.backoff.clone());
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let now = Instant::now();
            let last_error = match self.attempt(&url, &token, &payload) {
                Attempt::Delivered => {
                    debug!(
                        "HttpTransport delivered {} entries after {attempts} attempt(s)",
                        request.entries.len()
                    );
                    return Ok(());
                }
                Attempt::Rejected { status, body } => {
                    warn!("HttpTransport received permanent error {status}, dropping batch");
                    return Err(TransportError::Status { status, body });
                }
                Attempt::Retry(reason) => reason,
            };

            warn!("HttpTransport request failed: {last_error}");
            let Some(delay) = backoff.next_sleep(now) else {
                return Err(TransportError::RetriesExhausted {
                    attempts,
                    last_error,
                });
            };
            thread::sleep(delay);
        }
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish()
    }
}
