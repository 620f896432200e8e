//! Host-facing appender over a shared manager.
//!
//! [`CloudLoggingHandler`] is the piece a host logging framework talks to. It
//! forwards each record to the named [`CloudLoggingManager`] and applies the
//! destination's error policy: with `ignore_errors` set, delivery failures are
//! counted and reported through a rate-limited warning instead of reaching the
//! caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use thiserror::Error;

use crate::config::ManagerConfig;
use crate::log_record::LogRecord;
use crate::manager::{CloudLoggingManager, DeliveryError, ManagerError, get_manager};
use crate::rate_limited_warner::RateLimitedWarner;

/// Failure surfaced by a [`LogHandler`].
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Trait implemented by log handlers.
///
/// `LogHandler` is `Send + Sync` so one instance can be shared by every thread
/// that logs.
pub trait LogHandler: Send + Sync {
    /// Dispatch a log record for handling.
    fn handle(&self, record: LogRecord) -> Result<(), HandlerError>;

    /// Deliver anything buffered. Returns `true` when nothing was lost.
    fn flush(&self) -> bool;
}

/// Appender writing records to a [`CloudLoggingManager`].
pub struct CloudLoggingHandler {
    manager: Arc<CloudLoggingManager>,
    ignore_errors: bool,
    failures: AtomicU64,
    warner: RateLimitedWarner,
}

impl CloudLoggingHandler {
    pub fn new(manager: Arc<CloudLoggingManager>, ignore_errors: bool) -> Self {
        Self::with_warner(manager, ignore_errors, RateLimitedWarner::new())
    }

    /// Create a handler using a custom warning rate limit.
    pub fn with_warner(
        manager: Arc<CloudLoggingManager>,
        ignore_errors: bool,
        warner: RateLimitedWarner,
    ) -> Self {
        Self {
            manager,
            ignore_errors,
            failures: AtomicU64::new(0),
            warner,
        }
    }

    /// Create a handler for the shared manager named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError`] if the manager has to be created and creation
    /// fails.
    pub fn from_config(config: &ManagerConfig) -> Result<Self, ManagerError> {
        Ok(Self::new(get_manager(config)?, config.ignore_errors))
    }

    pub fn manager(&self) -> &Arc<CloudLoggingManager> {
        &self.manager
    }

    /// Delivery failures observed over the handler's lifetime.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn on_failure(&self, err: DeliveryError) -> Result<(), HandlerError> {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if !self.ignore_errors {
            return Err(err.into());
        }
        self.warner.record_failure();
        self.warner.warn_if_due(|count| {
            warn!(
                "CloudLoggingHandler {}: {count} batch(es) dropped; last error: {err}",
                self.manager.name()
            );
        });
        Ok(())
    }
}

impl LogHandler for CloudLoggingHandler {
    fn handle(&self, record: LogRecord) -> Result<(), HandlerError> {
        match self.manager.write(&record) {
            Ok(()) => Ok(()),
            Err(err) => self.on_failure(err),
        }
    }

    fn flush(&self) -> bool {
        let delivered = match self.manager.flush() {
            Ok(()) => true,
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.warner.record_failure();
                warn!(
                    "CloudLoggingHandler {} flush failed: {err}",
                    self.manager.name()
                );
                false
            }
        };
        self.warner.flush(|count| {
            warn!(
                "CloudLoggingHandler {}: {count} batch(es) dropped",
                self.manager.name()
            );
        });
        delivered
    }
}

impl std::fmt::Debug for CloudLoggingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudLoggingHandler")
            .field("manager", &self.manager.name())
            .field("ignore_errors", &self.ignore_errors)
            .field("failures", &self.failures())
            .finish()
    }
}
