//! Environment-aware batching and delivery.
//!
//! A [`CloudLoggingManager`] owns the [`Environment`] resolved at
//! construction, the batch of pending entries, and the [`Transport`] used to
//! deliver them. Records accumulate until one arrives with its end-of-batch
//! flag set; the whole batch is then detached and sent synchronously on the
//! caller's thread.
//!
//! # Locking
//!
//! - `buffer` guards appends, the detach of a full batch, and the ticket
//!   handed to that batch;
//! - `sending` holds the ticket whose batch may be sent next.
//!
//! A flushing writer detaches its batch and takes a ticket under `buffer`,
//! releases `buffer`, then waits for its turn on `sending`. At most one batch
//! is in flight and batches reach the transport in detach order, while other
//! threads keep appending, and detaching, behind it.

mod batch;
mod registry;

use std::io;
use std::sync::Arc;

use log::debug;
use parking_lot::{Condvar, Mutex, MutexGuard};
use thiserror::Error;

use crate::config::{ConfigError, ManagerConfig};
use crate::credentials::Credentials;
use crate::entry::{DeliveryRequest, LogEntry};
use crate::environment::{Environment, EnvironmentOverrides};
use crate::log_record::LogRecord;
use crate::metadata::{DEFAULT_METADATA_TIMEOUT, MetadataClient, MetadataError, MetadataSource};
use crate::transport::{HttpTransport, Transport, TransportError, token_source_for};

use batch::BatchBuffer;

pub use registry::{
    get_manager, get_or_create_manager, lookup_manager, remove_manager, reset_registry,
};

/// A flush failed after the transport exhausted its retries.
///
/// The batch that was being sent is dropped.
#[derive(Debug, Error)]
#[error("Sending message to projectId \"{project_id}\" and logName \"{log_name}\" failed")]
pub struct DeliveryError {
    pub project_id: String,
    pub log_name: String,
    #[source]
    pub source: TransportError,
}

/// Failure to create a manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("failed to initialise transport: {0}")]
    Transport(#[source] io::Error),
}

/// Batches log records and delivers them to one log stream.
pub struct CloudLoggingManager {
    name: String,
    environment: Environment,
    user_id: Option<String>,
    buffer: Mutex<BatchBuffer>,
    sending: Mutex<u64>,
    turn_changed: Condvar,
    transport: Box<dyn Transport>,
}

impl CloudLoggingManager {
    /// Create a manager from an already resolved environment.
    pub fn new(
        name: impl Into<String>,
        environment: Environment,
        credentials: &Credentials,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            environment,
            user_id: credentials.user_id().map(str::to_owned),
            buffer: Mutex::new(BatchBuffer::default()),
            sending: Mutex::new(0),
            turn_changed: Condvar::new(),
            transport,
        }
    }

    /// Resolve the environment from `metadata` and create the manager.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if a value without an override cannot be
    /// fetched.
    pub fn resolve(
        name: impl Into<String>,
        overrides: &EnvironmentOverrides,
        credentials: &Credentials,
        log_name: &str,
        metadata: &dyn MetadataSource,
        transport: Box<dyn Transport>,
    ) -> Result<Self, MetadataError> {
        let environment = Environment::resolve(overrides, credentials, log_name, metadata)?;
        let manager = Self::new(name, environment, credentials, transport);
        debug!(
            "CloudLoggingManager {} resolved service {} for project {}",
            manager.name,
            manager.environment.service(),
            manager.environment.project_id()
        );
        Ok(manager)
    }

    /// Create a manager talking to the metadata server and the logging API.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Metadata`] if environment resolution fails or
    /// [`ManagerError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &ManagerConfig) -> Result<Self, ManagerError> {
        let metadata: Arc<dyn MetadataSource> = Arc::new(MetadataClient::new(
            config.metadata_url.clone(),
            DEFAULT_METADATA_TIMEOUT,
        ));
        let tokens = token_source_for(&config.credentials, Arc::clone(&metadata));
        let transport =
            HttpTransport::new(config.transport_config(), tokens).map_err(ManagerError::Transport)?;
        Ok(Self::resolve(
            config.name.clone(),
            &config.overrides,
            &config.credentials,
            &config.log_name,
            metadata.as_ref(),
            Box::new(transport),
        )?)
    }

    /// Append `record` and, on end of batch, deliver everything buffered.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the flush triggered by this record fails.
    /// The failed batch is not retried.
    pub fn write(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let mut buffer = self.buffer.lock();
        // Built under the lock so insert ids follow batch order.
        buffer.push(LogEntry::from_record(
            record,
            &self.environment,
            self.user_id.as_deref(),
        ));
        if !record.end_of_batch {
            return Ok(());
        }
        let (batch, ticket) = buffer.detach();
        drop(buffer);
        self.deliver(batch, ticket)
    }

    /// Deliver any buffered entries without appending a record.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the transport fails.
    pub fn flush(&self) -> Result<(), DeliveryError> {
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return Ok(());
        }
        let (batch, ticket) = buffer.detach();
        drop(buffer);
        self.deliver(batch, ticket)
    }

    fn deliver(&self, batch: Vec<LogEntry>, ticket: u64) -> Result<(), DeliveryError> {
        let _turn = self.wait_for_turn(ticket);
        let project_id = self.environment.project_id();
        let log_name = self.environment.log_name();
        debug!(
            "CloudLoggingManager {} sending {} entries to {project_id}/{log_name}",
            self.name,
            batch.len()
        );
        let request = DeliveryRequest::new(batch, self.environment.common_labels().clone());
        self.transport
            .send(project_id, log_name, request)
            .map_err(|source| DeliveryError {
                project_id: project_id.to_owned(),
                log_name: log_name.to_owned(),
                source,
            })
    }

    fn wait_for_turn(&self, ticket: u64) -> SendTurn<'_> {
        let mut current = self.sending.lock();
        while *current != ticket {
            self.turn_changed.wait(&mut current);
        }
        SendTurn {
            current,
            turn_changed: &self.turn_changed,
        }
    }

    /// Number of entries waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

/// Exclusive right to send; passes the turn on when dropped, even if the
/// send panicked.
struct SendTurn<'a> {
    current: MutexGuard<'a, u64>,
    turn_changed: &'a Condvar,
}

impl Drop for SendTurn<'_> {
    fn drop(&mut self) {
        *self.current += 1;
        self.turn_changed.notify_all();
    }
}

impl std::fmt::Debug for CloudLoggingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudLoggingManager")
            .field("name", &self.name)
            .field("environment", &self.environment)
            .field("pending", &self.buffer.try_lock().map(|buffer| buffer.len()))
            .finish()
    }
}
