//! Exponential backoff state machine used by the HTTP transport.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Default base delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(50);
/// Default maximum delay between two retries.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(5);
/// Default total time spent retrying one request.
pub const DEFAULT_MAX_RETRY_TIME: Duration = Duration::from_millis(500);

const MIN_SLEEP_MS: u64 = 10;

/// Exponential backoff policy for delivery retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    /// Retry budget measured from the first failure.
    pub deadline: Duration,
}

impl BackoffPolicy {
    /// Default delays with a custom retry budget.
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline,
            ..Self::default()
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
            deadline: DEFAULT_MAX_RETRY_TIME,
        }
    }
}

/// Tracks retries of a single request and produces jittered delays.
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    failure_since: Option<Instant>,
    rng: StdRng,
}

impl BackoffState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.base,
            failure_since: None,
            rng: StdRng::from_entropy(),
            policy,
        }
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    ///
    /// The delay never extends past the deadline.
    pub fn next_sleep(&mut self, now: Instant) -> Option<Duration> {
        let start = *self.failure_since.get_or_insert(now);
        let elapsed = now.duration_since(start);
        if elapsed >= self.policy.deadline {
            return None;
        }

        if now != start {
            self.current = self.current.saturating_mul(2).min(self.policy.cap);
        }

        let max_ms = self.current.as_millis().min(u128::from(u64::MAX)) as u64;
        let sleep_ms = match max_ms {
            0 => MIN_SLEEP_MS,
            1..=MIN_SLEEP_MS => max_ms,
            _ => self.rng.gen_range(MIN_SLEEP_MS..=max_ms),
        };
        let remaining = self.policy.deadline - elapsed;
        Some(Duration::from_millis(sleep_ms).min(remaining))
    }
}
