//! Matrix runner: every scenario against every fixture.
//!
//! Each (fixture, scenario) pair gets its own page, so no state leaks between
//! pairs. A pair moves through
//!
//! ```text
//! Navigating ──► Ready ──► Executing ──► Passed
//!      │           │           │
//!      └───────────┴───────────┴───────► Failed
//! (inapplicable or halted) ────────────► Skipped
//! ```
//!
//! Pairs run concurrently up to `jobs`. Results come back in catalog order
//! regardless of completion order.

use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::{FutureExt, StreamExt};
use tracing::{debug, info, warn};

use crate::adapter::adapter_for;
use crate::driver::SessionFactory;
use crate::fixture::{default_fixtures, FixtureDescriptor, Variant};
use crate::reporter::{FailureMode, ParityReport, RunnerState, ScenarioResult};
use crate::result::{ParityError, ParityResult};
use crate::scenario::{catalog, Applicability, Scenario, ScenarioContext};
use crate::session::{Session, SessionOptions};

/// Called once per finished pair, in completion order
pub type ProgressFn = Arc<dyn Fn(&ScenarioResult) + Send + Sync>;

/// Scheduling options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Per-session timing and addressing
    pub session: SessionOptions,
    /// Concurrent pairs; 0 means available parallelism
    pub jobs: usize,
    /// Continue or stop after a failure
    pub failure_mode: FailureMode,
    /// Restrict the run to one variant
    pub variant: Option<Variant>,
}

impl RunnerOptions {
    /// Defaults for a base URL
    #[must_use]
    pub fn new(session: SessionOptions) -> Self {
        Self {
            session,
            jobs: 0,
            failure_mode: FailureMode::CollectAll,
            variant: None,
        }
    }
}

/// Runs the scenario catalog against a set of fixtures
pub struct ParityRunner {
    factory: Arc<dyn SessionFactory>,
    fixtures: Vec<FixtureDescriptor>,
    scenarios: Vec<Scenario>,
    options: RunnerOptions,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for ParityRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParityRunner")
            .field("driver", &self.factory.name())
            .field("fixtures", &self.fixtures)
            .field("scenarios", &self.scenarios.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ParityRunner {
    /// Full catalog against both default fixtures
    #[must_use]
    pub fn new(factory: Arc<dyn SessionFactory>, session: SessionOptions) -> Self {
        Self {
            factory,
            fixtures: default_fixtures(),
            scenarios: catalog(),
            options: RunnerOptions::new(session),
            progress: None,
        }
    }

    /// Replace the fixture list
    #[must_use]
    pub fn with_fixtures(mut self, fixtures: Vec<FixtureDescriptor>) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Replace the scenario list
    #[must_use]
    pub fn with_scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    /// Keep only scenarios whose name or title contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: &str) -> Self {
        self.scenarios.retain(|s| s.matches(filter));
        self
    }

    /// Run a single variant
    #[must_use]
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.options.variant = Some(variant);
        self
    }

    /// Concurrency limit; 0 means available parallelism
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.options.jobs = jobs;
        self
    }

    /// Set the failure mode
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.options.failure_mode = mode;
        self
    }

    /// Stop scheduling after the first failure
    #[must_use]
    pub fn fail_fast(self) -> Self {
        self.with_failure_mode(FailureMode::AndonCord)
    }

    /// Register a per-pair progress callback
    #[must_use]
    pub fn on_result(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Scheduling options
    #[must_use]
    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Every scheduled pair, fixture-major in catalog order
    #[must_use]
    pub fn pairs(&self) -> Vec<(FixtureDescriptor, Scenario)> {
        self.fixtures
            .iter()
            .filter(|f| self.options.variant.map_or(true, |v| v == f.variant))
            .flat_map(|f| self.scenarios.iter().map(move |s| (f.clone(), *s)))
            .collect()
    }

    /// Concurrency actually used
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        match self.options.jobs {
            0 => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            n => n,
        }
    }

    /// Run every pair and collect the report. Never fails: each pair's error
    /// is recorded in its result.
    pub async fn run(&self) -> ParityReport {
        let started = Instant::now();
        let mut report =
            ParityReport::new(self.factory.name(), self.options.session.base_url.clone());
        let pairs = self.pairs();
        let jobs = self.effective_jobs();
        info!(
            run = %report.run_id,
            driver = self.factory.name(),
            pairs = pairs.len(),
            jobs,
            "starting parity run"
        );

        let halted = AtomicBool::new(false);
        let this = self;
        let halted_ref = &halted;
        let mut results: Vec<(usize, ScenarioResult)> =
            futures::stream::iter(pairs.into_iter().enumerate())
                .map(move |(index, (fixture, scenario))| async move {
                    let result = this.run_pair(&fixture, &scenario, halted_ref).await;
                    (index, result)
                })
                .buffer_unordered(jobs.max(1))
                .inspect(|(_, result)| {
                    if let Some(progress) = &self.progress {
                        progress(result);
                    }
                })
                .collect()
                .await;

        results.sort_by_key(|(index, _)| *index);
        report.results = results.into_iter().map(|(_, result)| result).collect();
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(run = %report.run_id, summary = %report.summary(), "parity run finished");
        report
    }

    async fn run_pair(
        &self,
        fixture: &FixtureDescriptor,
        scenario: &Scenario,
        halted: &AtomicBool,
    ) -> ScenarioResult {
        if let Applicability::Only(only) = scenario.applicability {
            if only != fixture.variant {
                debug!(route = %fixture.route, scenario = scenario.name, "not applicable");
                return ScenarioResult::skipped(
                    fixture,
                    scenario.name,
                    scenario.title,
                    format!("applies to the {only} variant only"),
                );
            }
        }
        if halted.load(Ordering::SeqCst) {
            return ScenarioResult::skipped(
                fixture,
                scenario.name,
                scenario.title,
                "not run: an earlier pair failed",
            );
        }

        let started = Instant::now();
        let mut states = vec![RunnerState::Navigating];
        let outcome = self.execute(fixture, scenario, &mut states).await;
        let result = match outcome {
            Ok(()) => {
                states.push(RunnerState::Passed);
                debug!(route = %fixture.route, scenario = scenario.name, "passed");
                ScenarioResult::passed(fixture, scenario.name, scenario.title)
            }
            Err(err) => {
                states.push(RunnerState::Failed);
                warn!(
                    route = %fixture.route,
                    scenario = scenario.name,
                    kind = err.kind(),
                    error = %err,
                    "failed"
                );
                if self.options.failure_mode == FailureMode::AndonCord {
                    halted.store(true, Ordering::SeqCst);
                }
                ScenarioResult::failed(fixture, scenario.name, scenario.title, &err)
            }
        };
        result.with_duration(started.elapsed()).with_states(states)
    }

    /// Open a page, drive the pair, and always dispose of the page
    async fn execute(
        &self,
        fixture: &FixtureDescriptor,
        scenario: &Scenario,
        states: &mut Vec<RunnerState>,
    ) -> ParityResult<()> {
        let page = self.factory.open().await?;
        let session = Arc::new(Session::new(page, self.options.session.clone()));
        debug!(session = %session.id(), route = %fixture.route, scenario = scenario.name, "page opened");

        let outcome = drive(fixture, scenario, &session, states).await;
        if let Err(err) = session.close().await {
            warn!(session = %session.id(), error = %err, "failed to close page");
        }
        outcome
    }
}

async fn drive(
    fixture: &FixtureDescriptor,
    scenario: &Scenario,
    session: &Arc<Session>,
    states: &mut Vec<RunnerState>,
) -> ParityResult<()> {
    session.goto(&fixture.route).await?;
    let ctx = ScenarioContext {
        fixture: fixture.clone(),
        session: Arc::clone(session),
        adapter: adapter_for(fixture.variant),
    };
    ctx.expect_ready().await.map_err(|err| match err {
        ParityError::ScenarioFailure { actual, .. } => ParityError::NavigationError {
            url: fixture.url(&session.options().base_url),
            message: format!(
                "label/control not visible within {}ms: {actual}",
                session.options().retry.timeout_ms()
            ),
        },
        other => other,
    })?;
    states.push(RunnerState::Ready);

    states.push(RunnerState::Executing);
    match AssertUnwindSafe((scenario.body)(ctx)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(ParityError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::mock::{Fault, FaultSpec, MockBrowser};
    use crate::reporter::TestStatus;
    use crate::wait::RetryConfig;

    fn runner(browser: &MockBrowser) -> ParityRunner {
        ParityRunner::new(
            Arc::new(browser.clone()),
            SessionOptions::new("http://127.0.0.1:5173").with_retry(RetryConfig::fast()),
        )
        .with_jobs(4)
    }

    mod scheduling_tests {
        use super::*;

        #[test]
        fn test_pairs_are_fixture_major() {
            let runner = runner(&MockBrowser::new());
            let pairs = runner.pairs();
            assert_eq!(pairs.len(), 32);
            assert_eq!(pairs[0].0.route, "/plain");
            assert_eq!(pairs[16].0.route, "/shadcn");
            assert_eq!(pairs[0].1.name, pairs[16].1.name);
        }

        #[test]
        fn test_variant_and_filter_narrow_pairs() {
            let runner = runner(&MockBrowser::new())
                .with_variant(Variant::Composite)
                .with_filter("select");
            assert!(runner
                .pairs()
                .iter()
                .all(|(f, s)| f.variant == Variant::Composite && s.matches("select")));
            assert!(!runner.pairs().is_empty());
        }

        #[test]
        fn test_zero_jobs_uses_parallelism() {
            let runner = runner(&MockBrowser::new()).with_jobs(0);
            assert!(runner.effective_jobs() >= 1);
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_clean_matrix_passes() {
            let browser = MockBrowser::new();
            let report = runner(&browser).run().await;

            assert_eq!(report.total_count(), 32);
            assert_eq!(report.skipped_count(), 2, "{}", report.render_text());
            assert_eq!(report.failed_count(), 0, "{}", report.render_text());
            assert!(report.parity_violations().is_empty());
            assert_eq!(browser.pages_opened(), 30);
            assert_eq!(browser.pages_closed(), 30);
        }

        #[tokio::test]
        async fn test_results_keep_catalog_order() {
            let report = runner(&MockBrowser::new()).with_jobs(8).run().await;
            let names: Vec<_> = report.results.iter().map(|r| r.scenario.as_str()).collect();
            let expected: Vec<_> = catalog().iter().map(|s| s.name).collect();
            assert_eq!(&names[..16], expected.as_slice());
            assert_eq!(&names[16..], expected.as_slice());
        }

        #[tokio::test]
        async fn test_state_trace() {
            let report = runner(&MockBrowser::new())
                .with_filter("structure")
                .run()
                .await;
            let result = report.find("/plain", "structure").unwrap();
            assert_eq!(
                result.states,
                vec![
                    RunnerState::Navigating,
                    RunnerState::Ready,
                    RunnerState::Executing,
                    RunnerState::Passed
                ]
            );
            let skipped = runner(&MockBrowser::new())
                .with_filter("role-is-button")
                .run()
                .await;
            let native = skipped.find("/plain", "role-is-button").unwrap();
            assert_eq!(native.status, TestStatus::Skipped);
            assert_eq!(native.states, vec![RunnerState::Skipped]);
        }

        #[tokio::test]
        async fn test_fault_isolated_to_one_variant() {
            let browser = MockBrowser::new()
                .with_fault(FaultSpec::new(Variant::Composite, Fault::ValueDesync));
            let report = runner(&browser).run().await;

            assert!(report.failed_count() > 0);
            assert!(report
                .failures()
                .iter()
                .all(|r| r.fixture.variant == Variant::Composite));
            assert!(!report.parity_violations().is_empty());
        }

        #[tokio::test]
        async fn test_navigation_failure_never_reaches_ready() {
            let browser =
                MockBrowser::new().with_fault(FaultSpec::new(Variant::Native, Fault::Unreachable));
            let report = runner(&browser).with_filter("structure").run().await;
            let result = report.find("/plain", "structure").unwrap();
            assert_eq!(result.failure.as_ref().unwrap().kind, "NavigationError");
            assert_eq!(
                result.states,
                vec![RunnerState::Navigating, RunnerState::Failed]
            );
            assert!(report.find("/shadcn", "structure").unwrap().status.is_passed());
            assert_eq!(browser.pages_closed(), browser.pages_opened());
        }

        #[tokio::test]
        async fn test_fixture_never_ready_is_navigation_error() {
            let browser = MockBrowser::new().with_render_delay(Duration::from_secs(60));
            let report = runner(&browser).with_filter("structure").run().await;
            for route in ["/plain", "/shadcn"] {
                let result = report.find(route, "structure").unwrap();
                let failure = result.failure.as_ref().unwrap();
                assert_eq!(failure.kind, "NavigationError");
                assert!(failure.message.contains("not visible within"));
                assert_eq!(
                    result.states,
                    vec![RunnerState::Navigating, RunnerState::Failed]
                );
            }
            assert_eq!(browser.pages_closed(), browser.pages_opened());
        }

        #[tokio::test]
        async fn test_panicking_scenario_is_disposed() {
            let browser = MockBrowser::new()
                .with_fault(FaultSpec::new(Variant::Composite, Fault::PanicOnClick));
            let report = runner(&browser).run().await;

            let panicked: Vec<_> = report
                .failures()
                .into_iter()
                .filter(|r| r.failure.as_ref().unwrap().kind == "Panicked")
                .collect();
            assert!(!panicked.is_empty());
            assert!(panicked.iter().all(|r| r.fixture.route == "/shadcn"));
            assert_eq!(browser.pages_closed(), browser.pages_opened());
        }

        #[tokio::test]
        async fn test_fail_fast_skips_remaining_pairs() {
            let browser =
                MockBrowser::new().with_fault(FaultSpec::new(Variant::Native, Fault::Unreachable));
            let report = runner(&browser).with_jobs(1).fail_fast().run().await;

            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.passed_count(), 0);
            assert_eq!(report.skipped_count(), 31);
            assert_eq!(browser.pages_opened(), 1);
        }

        #[tokio::test]
        async fn test_progress_called_per_pair() {
            let seen = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&seen);
            let report = runner(&MockBrowser::new())
                .with_variant(Variant::Native)
                .on_result(Arc::new(move |_: &ScenarioResult| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .run()
                .await;
            assert_eq!(seen.load(Ordering::SeqCst), report.total_count());
            assert_eq!(report.total_count(), 16);
        }
    }
}
