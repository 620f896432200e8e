//! Compatibility bridge for the Rust `log` crate.
//!
//! [`CloudLogAdapter`] implements `log::Log` and forwards records from the
//! `log` facade into a [`LogHandler`]. Every `batch_size`-th record carries the
//! end-of-batch flag, so the default of one delivers each record as it is
//! logged. Records emitted by this crate are skipped to avoid feeding
//! delivery diagnostics back into delivery, and so is anything logged on a
//! thread that is already inside the handler (for example the HTTP client's
//! own debug output during a send).

use std::cell::Cell;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::handler::LogHandler;
use crate::level::LogLevel;
use crate::log_record::LogRecord;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

fn map_log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Trace => LogLevel::Trace,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Info => LogLevel::Info,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Error => LogLevel::Error,
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        map_log_level(level)
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

thread_local! {
    static IN_HANDLER: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as busy inside the handler until dropped.
struct HandlerScope;

impl HandlerScope {
    /// Returns `None` when the thread is already inside the handler.
    fn enter() -> Option<Self> {
        IN_HANDLER.with(|busy| (!busy.replace(true)).then_some(HandlerScope))
    }
}

impl Drop for HandlerScope {
    fn drop(&mut self) {
        IN_HANDLER.with(|busy| busy.set(false));
    }
}

/// Adapter implementing the Rust `log::Log` trait.
pub struct CloudLogAdapter {
    handler: Box<dyn LogHandler>,
    batch_size: NonZeroUsize,
    max_level: LevelFilter,
    seen: AtomicUsize,
}

impl CloudLogAdapter {
    /// Forward records to `handler`, one record per batch.
    pub fn new(handler: Box<dyn LogHandler>) -> Self {
        Self {
            handler,
            batch_size: NonZeroUsize::MIN,
            max_level: LevelFilter::Trace,
            seen: AtomicUsize::new(0),
        }
    }

    /// Mark every `batch_size`-th record as the end of a batch.
    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Drop records more verbose than `max_level`.
    pub fn with_max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    fn next_is_end_of_batch(&self) -> bool {
        let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        seen % self.batch_size.get() == 0
    }
}

impl log::Log for CloudLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level && !is_own_target(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(_scope) = HandlerScope::enter() else {
            return;
        };
        let record = LogRecord::new(record.level().into(), record.args().to_string())
            .with_end_of_batch(self.next_is_end_of_batch());
        if let Err(err) = self.handler.handle(record) {
            eprintln!("cloudlogging: failed to deliver log record: {err}");
        }
    }

    fn flush(&self) {
        if let Some(_scope) = HandlerScope::enter() {
            self.handler.flush();
        }
    }
}

/// Install `adapter` as the global Rust logger.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a global logger is already installed.
pub fn install(adapter: CloudLogAdapter, max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(adapter.with_max_level(max_level)))?;
    log::set_max_level(max_level);
    Ok(())
}
