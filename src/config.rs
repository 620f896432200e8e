//! Builder types for configuring a cloud logging destination.
//!
//! [`ManagerConfigBuilder`] collects the options a host configuration layer
//! supplies for one named destination and validates them before producing a
//! [`ManagerConfig`]. Defaults apply for every option except the name.

use std::time::Duration;

use thiserror::Error;

use crate::credentials::Credentials;
use crate::environment::EnvironmentOverrides;
use crate::metadata::DEFAULT_METADATA_URL;
use crate::transport::{
    BackoffPolicy, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT, DEFAULT_MAX_RETRY_TIME,
    DEFAULT_REQUEST_TIMEOUT, HttpTransportConfig,
};

/// Log stream used when none is configured.
pub const DEFAULT_LOG_NAME: &str = "cloud.logging.rust";

/// Errors that may occur while building a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value failed validation.
    #[error("invalid manager configuration: {0}")]
    InvalidConfig(String),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value.is_zero() {
            Err(ConfigError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Validated settings for one [`CloudLoggingManager`](crate::CloudLoggingManager).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Registry key; one manager exists per name.
    pub name: String,
    pub overrides: EnvironmentOverrides,
    pub log_name: String,
    /// Retry budget forwarded to the transport.
    pub max_retry_time: Duration,
    pub credentials: Credentials,
    pub metadata_url: String,
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Whether the handler swallows delivery failures.
    pub ignore_errors: bool,
}

impl ManagerConfig {
    /// Start building a configuration for the destination `name`.
    pub fn builder(name: impl Into<String>) -> ManagerConfigBuilder {
        ManagerConfigBuilder::new().with_name(name)
    }

    /// Transport settings derived from this configuration.
    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            endpoint: self.endpoint.clone(),
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            backoff: BackoffPolicy::with_deadline(self.max_retry_time),
        }
    }
}

/// Builder for constructing [`ManagerConfig`] instances.
#[derive(Clone, Debug, Default)]
pub struct ManagerConfigBuilder {
    name: Option<String>,
    project_id: Option<String>,
    zone: Option<String>,
    vm_id: Option<String>,
    log_name: Option<String>,
    max_retry_time: Option<Duration>,
    credentials: Credentials,
    metadata_url: Option<String>,
    endpoint: Option<String>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    ignore_errors: Option<bool>,
}

impl ManagerConfigBuilder {
    /// Create a new builder with no name configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destination name (required).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use `project_id` instead of asking the metadata server.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Use `zone` instead of asking the metadata server.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Use `vm_id` instead of asking the metadata server.
    pub fn with_vm_id(mut self, vm_id: impl Into<String>) -> Self {
        self.vm_id = Some(vm_id.into());
        self
    }

    /// Set the log stream name. Defaults to [`DEFAULT_LOG_NAME`].
    pub fn with_log_name(mut self, log_name: impl Into<String>) -> Self {
        self.log_name = Some(log_name.into());
        self
    }

    /// Authenticate as a service account instead of the ambient identity.
    pub fn with_service_account(
        mut self,
        account_id: impl Into<String>,
        key_material: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials::explicit(account_id, key_material);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Point the metadata client at `url`.
    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = Some(url.into());
        self
    }

    /// Point the transport at `endpoint`.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    option_setter!(
        #[doc = "Set the maximum time spent retrying one batch."]
        with_max_retry_time,
        max_retry_time,
        Duration
    );
    option_setter!(
        #[doc = "Set the connect timeout."]
        with_connect_timeout,
        connect_timeout,
        Duration
    );
    option_setter!(
        #[doc = "Set the request timeout."]
        with_request_timeout,
        request_timeout,
        Duration
    );
    option_setter!(
        #[doc = "Choose whether delivery failures are swallowed by the handler."]
        with_ignore_errors,
        ignore_errors,
        bool
    );

    /// Check the collected options without building.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_name()?;
        self.validate_log_name()?;
        self.validate_durations()?;
        Ok(())
    }

    fn validate_name(&self) -> Result<(), ConfigError> {
        match &self.name {
            None => Err(ConfigError::InvalidConfig(
                "cloud logging destination requires a name".into(),
            )),
            Some(name) if name.trim().is_empty() => Err(ConfigError::InvalidConfig(
                "name must not be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    fn validate_log_name(&self) -> Result<(), ConfigError> {
        match &self.log_name {
            Some(log_name) if log_name.trim().is_empty() => Err(ConfigError::InvalidConfig(
                "log_name must not be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    fn validate_durations(&self) -> Result<(), ConfigError> {
        if let Some(value) = self.max_retry_time {
            ensure_positive!(value, "max_retry_time")?;
        }
        if let Some(value) = self.connect_timeout {
            ensure_positive!(value, "connect_timeout")?;
        }
        if let Some(value) = self.request_timeout {
            ensure_positive!(value, "request_timeout")?;
        }
        Ok(())
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] if validation fails.
    pub fn build(&self) -> Result<ManagerConfig, ConfigError> {
        self.validate()?;
        Ok(ManagerConfig {
            name: self.name.clone().unwrap_or_default(),
            overrides: EnvironmentOverrides {
                project_id: self.project_id.clone(),
                zone: self.zone.clone(),
                vm_id: self.vm_id.clone(),
            },
            log_name: self
                .log_name
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_NAME.to_owned()),
            max_retry_time: self.max_retry_time.unwrap_or(DEFAULT_MAX_RETRY_TIME),
            credentials: self.credentials.clone(),
            metadata_url: self
                .metadata_url
                .clone()
                .unwrap_or_else(|| DEFAULT_METADATA_URL.to_owned()),
            endpoint: self
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            ignore_errors: self.ignore_errors.unwrap_or(true),
        })
    }
}
