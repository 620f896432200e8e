//! Environment-aware batching and delivery of log records to Google Cloud
//! Logging.
//!
//! A [`CloudLoggingManager`] resolves, once, whether the process runs on a
//! plain Compute Engine VM, an App Engine backend or a Dataflow worker, and
//! labels every batch it delivers accordingly. Callers hand it
//! [`LogRecord`]s; a record flagged as end of batch flushes everything
//! buffered so far through a retrying [`Transport`].
//!
//! ```no_run
//! use cloudlogging::{CloudLoggingHandler, LogHandler, LogLevel, LogRecord, ManagerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ManagerConfig::builder("cloud").with_log_name("my-app").build()?;
//! let handler = CloudLoggingHandler::from_config(&config)?;
//! handler.handle(LogRecord::new(LogLevel::Warn, "disk almost full").with_end_of_batch(true))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod entry;
pub mod environment;
pub mod handler;
pub mod level;
#[cfg(feature = "log-compat")]
pub mod log_compat;
pub mod log_record;
pub mod manager;
pub mod metadata;
pub mod rate_limited_warner;
#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;
pub mod transport;

pub use config::{ConfigError, DEFAULT_LOG_NAME, ManagerConfig, ManagerConfigBuilder};
pub use credentials::Credentials;
pub use entry::{DeliveryRequest, LogEntry, LogEntryMetadata};
pub use environment::{Environment, EnvironmentOverrides, Labels, ServiceIdentifier};
pub use handler::{CloudLoggingHandler, HandlerError, LogHandler};
pub use level::{LogLevel, ParseLevelError};
#[cfg(feature = "log-compat")]
pub use log_compat::CloudLogAdapter;
pub use log_record::LogRecord;
pub use manager::{
    CloudLoggingManager, DeliveryError, ManagerError, get_manager, get_or_create_manager,
    lookup_manager, remove_manager, reset_registry,
};
pub use metadata::{MetadataClient, MetadataError, MetadataSource};
pub use transport::{HttpTransport, HttpTransportConfig, Transport, TransportError};
