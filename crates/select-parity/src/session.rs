//! One isolated page plus the harness state bound to it.
//!
//! A [`Session`] resolves [`Locator`]s with auto-waiting, gates every action
//! on actionability (present, visible, enabled) and owns the navigation epoch
//! that abandons waits started on a previous document.

use std::time::Duration;

use uuid::Uuid;

use crate::driver::{ElementSnapshot, Key, PageDriver};
use crate::fixture::join_url;
use crate::locator::Locator;
use crate::result::{ParityError, ParityResult};
use crate::wait::{poll_until, EpochGuard, NavigationEpoch, PollOutcome, Probe, RetryConfig};

/// Per-session timing and addressing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Origin the fixture routes are resolved against
    pub base_url: String,
    /// Expectation and actionability polling
    pub retry: RetryConfig,
    /// Upper bound for one navigation
    pub navigation_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5173".to_string(),
            retry: RetryConfig::default(),
            navigation_timeout: Duration::from_millis(crate::wait::DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }
}

impl SessionOptions {
    /// Options for a base URL with default timing
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the retry config
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// A page under test
pub struct Session {
    id: Uuid,
    page: Box<dyn PageDriver>,
    epoch: NavigationEpoch,
    options: SessionOptions,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("epoch", &self.epoch.current())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap an open page
    #[must_use]
    pub fn new(page: Box<dyn PageDriver>, options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            page,
            epoch: NavigationEpoch::new(),
            options,
        }
    }

    /// Session id, used in logs
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Timing and addressing options
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Guard bound to the current document
    #[must_use]
    pub fn guard(&self) -> EpochGuard {
        self.epoch.guard()
    }

    /// Navigation count so far
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.current()
    }

    /// Retry config for a locator, honoring its timeout override
    #[must_use]
    pub fn retry_for(&self, locator: &Locator) -> RetryConfig {
        match locator.options().timeout {
            Some(timeout) => self.options.retry.with_timeout(timeout),
            None => self.options.retry,
        }
    }

    /// Navigate to a route under the base URL.
    ///
    /// Bumps the navigation epoch first, so any wait still pending on the
    /// previous document is abandoned.
    ///
    /// # Errors
    ///
    /// `NavigationError` if the driver fails or the navigation timeout passes.
    pub async fn goto(&self, route: &str) -> ParityResult<()> {
        let url = join_url(&self.options.base_url, route);
        let epoch = self.epoch.advance();
        tracing::debug!(session = %self.id, %url, epoch, "navigating");

        match tokio::time::timeout(self.options.navigation_timeout, self.page.navigate(&url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(ParityError::NavigationError { url, message })) => {
                Err(ParityError::NavigationError { url, message })
            }
            Ok(Err(other)) => Err(ParityError::NavigationError {
                url,
                message: other.to_string(),
            }),
            Err(_) => Err(ParityError::NavigationError {
                url,
                message: format!(
                    "not loaded within {}ms",
                    self.options.navigation_timeout.as_millis()
                ),
            }),
        }
    }

    /// Current page URL
    ///
    /// # Errors
    ///
    /// Propagates driver errors.
    pub async fn current_url(&self) -> ParityResult<String> {
        self.page.current_url().await
    }

    /// Snapshot every element the locator's selector matches, ignoring `nth`
    ///
    /// # Errors
    ///
    /// Propagates driver errors.
    pub async fn query_all(&self, locator: &Locator) -> ParityResult<Vec<ElementSnapshot>> {
        self.page.query_all(locator.selector()).await
    }

    /// Snapshot the element the locator designates right now, if any
    ///
    /// # Errors
    ///
    /// Strict-mode violations and driver errors.
    pub async fn query(&self, locator: &Locator) -> ParityResult<Option<ElementSnapshot>> {
        let matches = self.query_all(locator).await?;
        Ok(pick(locator, matches)?.map(|(_, snap)| snap))
    }

    /// Wait until the locator resolves to a visible element.
    ///
    /// # Errors
    ///
    /// `ActionabilityTimeout` when the element never shows up, `WaitAbandoned`
    /// on navigation.
    pub async fn wait_for(&self, locator: &Locator) -> ParityResult<ElementSnapshot> {
        self.wait_actionable(locator, false)
            .await
            .map(|(_, snap)| snap)
    }

    /// Wait until the locator resolves to an element that is present,
    /// visible and (if `require_enabled`) enabled. Returns its match index.
    async fn wait_actionable(
        &self,
        locator: &Locator,
        require_enabled: bool,
    ) -> ParityResult<(usize, ElementSnapshot)> {
        let retry = self.retry_for(locator);
        let target = locator.to_string();
        let this = self;
        let outcome = poll_until(&retry, self.guard(), &target, move || async move {
            let matches = this.query_all(locator).await?;
            let count = matches.len();
            Ok(match pick(locator, matches)? {
                None if count == 0 => Probe::Pending("no element matches".to_string()),
                None => Probe::Pending(format!("{count} matches, index out of range")),
                Some((index, snap)) => {
                    let blocker = if require_enabled {
                        snap.blocker()
                    } else if snap.visible {
                        None
                    } else {
                        Some("not visible")
                    };
                    match blocker {
                        None => Probe::Ready((index, snap)),
                        Some(reason) => Probe::Pending(reason.to_string()),
                    }
                }
            })
        })
        .await?;

        match outcome {
            PollOutcome::Matched(found) => Ok(found),
            PollOutcome::TimedOut { last_observed } => Err(ParityError::ActionabilityTimeout {
                target,
                ms: retry.timeout_ms(),
                reason: last_observed,
            }),
        }
    }

    /// Click once the target is actionable
    ///
    /// # Errors
    ///
    /// `ActionabilityTimeout`, `WaitAbandoned`, driver errors.
    pub async fn click(&self, locator: &Locator) -> ParityResult<()> {
        let (index, _) = self.wait_actionable(locator, true).await?;
        tracing::trace!(session = %self.id, %locator, "click");
        self.page.click(locator.selector(), index).await
    }

    /// Press a key on whatever has focus
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn press(&self, key: Key) -> ParityResult<()> {
        tracing::trace!(session = %self.id, %key, "press");
        self.page.press_key(key).await
    }

    /// Set a `<select>` value once it is actionable
    ///
    /// # Errors
    ///
    /// `OptionNotFound`, `ActionabilityTimeout`, driver errors.
    pub async fn select_option(&self, locator: &Locator, value: &str) -> ParityResult<()> {
        let (index, _) = self.wait_actionable(locator, true).await?;
        tracing::trace!(session = %self.id, %locator, value, "select option");
        self.page
            .set_select_value(locator.selector(), index, value)
            .await
    }

    /// Close the page. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn close(&self) -> ParityResult<()> {
        tracing::debug!(session = %self.id, "closing");
        self.page.close().await
    }
}

/// Apply `nth` and strictness to a match list
fn pick(
    locator: &Locator,
    matches: Vec<ElementSnapshot>,
) -> ParityResult<Option<(usize, ElementSnapshot)>> {
    if locator.options().strict && matches.len() > 1 {
        return Err(ParityError::driver(format!(
            "strict mode violation: {locator} resolved to {} elements",
            matches.len()
        )));
    }
    let index = locator.index().unwrap_or(0);
    Ok(matches.into_iter().nth(index).map(|snap| (index, snap)))
}
