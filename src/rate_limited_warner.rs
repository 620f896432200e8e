use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How often to emit warnings about failed deliveries.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Helper that rate limits delivery-failure warnings.
///
/// The caller increments the failure counter via [`record_failure`]. The next
/// call to [`warn_if_due`] emits a warning using the provided callback if the
/// configured interval has elapsed since the last one. [`flush`] emits a
/// warning immediately if any failures have accumulated.
///
/// [`record_failure`]: Self::record_failure
/// [`warn_if_due`]: Self::warn_if_due
/// [`flush`]: Self::flush
pub struct RateLimitedWarner {
    interval: Duration,
    origin: Instant,
    /// Milliseconds after `origin` when the next warning may fire.
    next_due_ms: AtomicU64,
    pending: AtomicU64,
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitedWarner {
    /// Create a warner using [`DEFAULT_WARN_INTERVAL`]. The first warning can
    /// be emitted immediately.
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_WARN_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            origin: Instant::now(),
            next_due_ms: AtomicU64::new(0),
            pending: AtomicU64::new(0),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn interval_ms(&self) -> u64 {
        u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
    }

    /// Increment the failure counter.
    pub fn record_failure(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Failures recorded since the last warning.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Emit a warning if the rate limit interval has elapsed.
    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        let now = self.elapsed_ms();
        let due = self.next_due_ms.load(Ordering::Relaxed);
        if now < due {
            return;
        }
        let next = now.saturating_add(self.interval_ms());
        if self
            .next_due_ms
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            // Another thread claimed this window.
            return;
        }
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
        }
    }

    /// Immediately warn about any accumulated failures.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            let next = self.elapsed_ms().saturating_add(self.interval_ms());
            self.next_due_ms.store(next, Ordering::Relaxed);
        }
    }
}
