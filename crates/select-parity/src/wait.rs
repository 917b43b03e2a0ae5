//! Polling and navigation-bound waits.
//!
//! Every wait in the harness is a poll loop with a fixed deadline that
//! suspends on `tokio::time::sleep` between probes. A session's
//! [`NavigationEpoch`] is bumped on each navigation; a wait started under an
//! older epoch is abandoned instead of being evaluated against a new document.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::result::{ParityError, ParityResult};

/// Default assertion timeout (5 seconds)
pub const DEFAULT_EXPECT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default navigation timeout (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total timeout duration
    pub timeout: Duration,
    /// Interval between probes
    pub poll_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_EXPECT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl RetryConfig {
    /// Create a retry config with a timeout and the default poll interval
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Short timeout with fast polling, for tests
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Timeout in whole milliseconds
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// What a single probe saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Condition holds; carry the observed value
    Ready(T),
    /// Not yet; describe what was observed instead
    Pending(String),
}

/// Result of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// Condition held before the deadline
    Matched(T),
    /// Deadline passed
    TimedOut {
        /// Observation from the final probe
        last_observed: String,
    },
}

impl<T> PollOutcome<T> {
    /// Whether the condition held
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Monotonic navigation counter owned by a session
#[derive(Debug)]
pub struct NavigationEpoch {
    tx: watch::Sender<u64>,
}

impl Default for NavigationEpoch {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationEpoch {
    /// Start at epoch 0
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Current epoch
    #[must_use]
    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Bump the epoch, abandoning every outstanding guard
    pub fn advance(&self) -> u64 {
        self.tx.send_modify(|epoch| *epoch += 1);
        self.current()
    }

    /// Guard bound to the current epoch
    #[must_use]
    pub fn guard(&self) -> EpochGuard {
        let rx = self.tx.subscribe();
        let epoch = *rx.borrow();
        EpochGuard { rx, epoch }
    }
}

/// Observes whether the page navigated since the guard was taken
#[derive(Debug, Clone)]
pub struct EpochGuard {
    rx: watch::Receiver<u64>,
    epoch: u64,
}

impl EpochGuard {
    /// Epoch this guard was taken under
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether a navigation happened since
    #[must_use]
    pub fn is_stale(&self) -> bool {
        *self.rx.borrow() != self.epoch
    }

    /// Sleep for `duration`, waking early if the epoch changes
    async fn sleep_or_navigate(&mut self, duration: Duration) {
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            changed = self.rx.changed() => {
                // Sender dropped: the session is gone, fall back to a plain sleep
                if changed.is_err() {
                    tokio::time::sleep(duration).await;
                }
            }
        }
    }
}

/// Probe until ready, the deadline passes, or the page navigates away.
///
/// The probe always runs at least once, so a zero timeout still evaluates
/// the current state.
///
/// # Errors
///
/// `WaitAbandoned` if the guard goes stale; any error the probe returns.
pub async fn poll_until<T, F, Fut>(
    config: &RetryConfig,
    mut guard: EpochGuard,
    what: &str,
    mut probe: F,
) -> ParityResult<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ParityResult<Probe<T>>>,
{
    let start = Instant::now();

    loop {
        if guard.is_stale() {
            return Err(ParityError::WaitAbandoned {
                what: what.to_string(),
            });
        }

        let last_observed = match probe().await? {
            Probe::Ready(value) => {
                if guard.is_stale() {
                    return Err(ParityError::WaitAbandoned {
                        what: what.to_string(),
                    });
                }
                return Ok(PollOutcome::Matched(value));
            }
            Probe::Pending(observed) => observed,
        };

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            tracing::debug!(what, %last_observed, "poll timed out");
            return Ok(PollOutcome::TimedOut { last_observed });
        }

        let remaining = config.timeout.saturating_sub(elapsed);
        guard
            .sleep_or_navigate(config.poll_interval.min(remaining))
            .await;
    }
}
