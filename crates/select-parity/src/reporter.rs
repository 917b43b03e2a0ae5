//! Per-pair results and report rendering.
//!
//! A run produces one [`ScenarioResult`] per (fixture, scenario) pair. The
//! [`ParityReport`] renders them as a text summary, a scenario × variant
//! parity matrix, JUnit XML for CI, and JSON.
//!
//! ```text
//! scenario                    native     composite
//! ──────────────────────────  ─────────  ─────────
//! structure                   PASS       PASS
//! role-is-button              SKIP       PASS
//! keyboard-interaction        PASS       FAIL  ◄ parity violation
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fixture::{FixtureDescriptor, Variant};
use crate::result::{ParityError, ParityResult};

/// What to do after the first failing pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailureMode {
    /// Stop scheduling pairs after the first failure; the rest report `Skipped`
    AndonCord,
    /// Run every pair and gather all failures
    #[default]
    CollectAll,
}

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    /// Scenario passed
    Passed,
    /// Scenario failed
    Failed,
    /// Scenario did not run against this fixture
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Four-letter label for tables
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Skipped => "SKIP",
        }
    }
}

/// Lifecycle of one scenario instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunnerState {
    /// Loading the fixture route
    Navigating,
    /// Label and control present and visible
    Ready,
    /// Running the scenario body
    Executing,
    /// Terminal: passed
    Passed,
    /// Terminal: failed
    Failed,
    /// Terminal: not applicable or not run
    Skipped,
}

impl RunnerState {
    /// Whether no further transition can happen
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }
}

/// Why a pair failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Error kind, e.g. `ScenarioFailure`
    pub kind: String,
    /// Full error message
    pub message: String,
    /// Expected side of an assertion mismatch
    pub expected: Option<String>,
    /// Last observed side of an assertion mismatch
    pub actual: Option<String>,
}

impl From<&ParityError> for FailureDetail {
    fn from(err: &ParityError) -> Self {
        let (expected, actual) = match err.expected_actual() {
            Some((e, a)) => (Some(e.to_string()), Some(a.to_string())),
            None => (None, None),
        };
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            expected,
            actual,
        }
    }
}

/// Result of one (fixture, scenario) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Fixture the scenario ran against
    pub fixture: FixtureDescriptor,
    /// Scenario name
    pub scenario: String,
    /// Scenario title
    pub title: String,
    /// Outcome
    pub status: TestStatus,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Failure detail, when failed
    pub failure: Option<FailureDetail>,
    /// Reason, when skipped
    pub skip_reason: Option<String>,
    /// States visited, in order
    pub states: Vec<RunnerState>,
}

impl ScenarioResult {
    fn base(fixture: &FixtureDescriptor, scenario: &str, title: &str, status: TestStatus) -> Self {
        Self {
            fixture: fixture.clone(),
            scenario: scenario.to_string(),
            title: title.to_string(),
            status,
            duration_ms: 0,
            failure: None,
            skip_reason: None,
            states: Vec::new(),
        }
    }

    /// A passing result
    #[must_use]
    pub fn passed(fixture: &FixtureDescriptor, scenario: &str, title: &str) -> Self {
        Self::base(fixture, scenario, title, TestStatus::Passed)
    }

    /// A failing result
    #[must_use]
    pub fn failed(
        fixture: &FixtureDescriptor,
        scenario: &str,
        title: &str,
        error: &ParityError,
    ) -> Self {
        Self {
            failure: Some(FailureDetail::from(error)),
            ..Self::base(fixture, scenario, title, TestStatus::Failed)
        }
    }

    /// A skipped result
    #[must_use]
    pub fn skipped(
        fixture: &FixtureDescriptor,
        scenario: &str,
        title: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            skip_reason: Some(reason.into()),
            states: vec![RunnerState::Skipped],
            ..Self::base(fixture, scenario, title, TestStatus::Skipped)
        }
    }

    /// Set the duration
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the state trace
    #[must_use]
    pub fn with_states(mut self, states: Vec<RunnerState>) -> Self {
        self.states = states;
        self
    }

    /// `route :: scenario`
    #[must_use]
    pub fn pair_name(&self) -> String {
        format!("{} :: {}", self.fixture.route, self.scenario)
    }
}

/// One scenario row of the parity matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRow {
    /// Scenario name
    pub scenario: String,
    /// Status per variant
    pub cells: BTreeMap<String, TestStatus>,
}

impl MatrixRow {
    /// Status for a variant, if the scenario was scheduled for it
    #[must_use]
    pub fn status(&self, variant: Variant) -> Option<TestStatus> {
        self.cells.get(variant.as_str()).copied()
    }

    /// Passed on one variant and failed on another
    #[must_use]
    pub fn is_parity_violation(&self) -> bool {
        let statuses: Vec<_> = self.cells.values().collect();
        statuses.iter().any(|s| s.is_passed()) && statuses.iter().any(|s| s.is_failed())
    }
}

/// Results of one matrix run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParityReport {
    /// Run id
    pub run_id: Uuid,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// Driver name (`chromium`, `mock`)
    pub driver: String,
    /// Origin the fixtures were loaded from
    pub base_url: String,
    /// Total wall time in milliseconds
    pub duration_ms: u64,
    /// One entry per pair, fixture-major in catalog order
    pub results: Vec<ScenarioResult>,
}

impl ParityReport {
    /// Create an empty report
    #[must_use]
    pub fn new(driver: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            driver: driver.into(),
            base_url: base_url.into(),
            duration_ms: 0,
            results: Vec::new(),
        }
    }

    /// Number of passed pairs
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    /// Number of failed pairs
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// Number of skipped pairs
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(TestStatus::Skipped)
    }

    fn count(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Total number of pairs
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// No pair failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Failed pairs
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results
            .iter()
            .filter(|r| r.status.is_failed())
            .collect()
    }

    /// Result for one pair
    #[must_use]
    pub fn find(&self, route: &str, scenario: &str) -> Option<&ScenarioResult> {
        self.results
            .iter()
            .find(|r| r.fixture.route == route && r.scenario == scenario)
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} skipped ({} pairs, {:.2}s)",
            self.passed_count(),
            self.failed_count(),
            self.skipped_count(),
            self.total_count(),
            Duration::from_millis(self.duration_ms).as_secs_f64()
        )
    }

    /// Scenario × variant matrix, rows in first-seen order
    #[must_use]
    pub fn matrix(&self) -> Vec<MatrixRow> {
        let mut rows: Vec<MatrixRow> = Vec::new();
        for result in &self.results {
            let index = match rows.iter().position(|r| r.scenario == result.scenario) {
                Some(index) => index,
                None => {
                    rows.push(MatrixRow {
                        scenario: result.scenario.clone(),
                        cells: BTreeMap::new(),
                    });
                    rows.len() - 1
                }
            };
            rows[index]
                .cells
                .insert(result.fixture.variant.as_str().to_string(), result.status);
        }
        rows
    }

    /// Rows where the variants disagree
    #[must_use]
    pub fn parity_violations(&self) -> Vec<MatrixRow> {
        self.matrix()
            .into_iter()
            .filter(MatrixRow::is_parity_violation)
            .collect()
    }

    /// Human-readable per-pair report with failure details
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "select-parity run {} ({})", self.run_id, self.driver);
        let _ = writeln!(out, "base url: {}", self.base_url);
        let _ = writeln!(out);

        for result in &self.results {
            let _ = writeln!(
                out,
                "  {}  {:<48} {:>6}ms",
                result.status.label(),
                result.pair_name(),
                result.duration_ms
            );
            if let Some(failure) = &result.failure {
                let _ = writeln!(out, "        {}: {}", failure.kind, failure.message);
                if let (Some(expected), Some(actual)) = (&failure.expected, &failure.actual) {
                    let _ = writeln!(out, "        expected: {expected:?}");
                    let _ = writeln!(out, "        actual:   {actual:?}");
                }
            }
            if let Some(reason) = &result.skip_reason {
                let _ = writeln!(out, "        skipped: {reason}");
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.summary());
        out
    }

    /// Scenario × variant table, flagging parity violations
    #[must_use]
    pub fn render_matrix(&self) -> String {
        let rows = self.matrix();
        let width = rows
            .iter()
            .map(|r| r.scenario.len())
            .max()
            .unwrap_or(8)
            .max("scenario".len());

        let mut out = String::new();
        let _ = write!(out, "{:<width$}", "scenario");
        for variant in Variant::ALL {
            let _ = write!(out, "  {:<9}", variant.as_str());
        }
        let _ = writeln!(out);
        let _ = write!(out, "{}", "─".repeat(width));
        for _ in Variant::ALL {
            let _ = write!(out, "  {}", "─".repeat(9));
        }
        let _ = writeln!(out);

        for row in &rows {
            let _ = write!(out, "{:<width$}", row.scenario);
            for variant in Variant::ALL {
                let cell = row.status(variant).map_or("-", |s| s.label());
                let _ = write!(out, "  {cell:<9}");
            }
            if row.is_parity_violation() {
                let _ = write!(out, "◄ parity violation");
            }
            let _ = writeln!(out);
        }
        out
    }

    /// Write JUnit XML for CI integration
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn write_junit(&self, path: &Path) -> ParityResult<()> {
        std::fs::write(path, self.render_junit())?;
        Ok(())
    }

    /// Render JUnit XML, one `<testsuite>` per fixture
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuites name="select-parity" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            self.total_count(),
            self.failed_count(),
            self.skipped_count(),
            Duration::from_millis(self.duration_ms).as_secs_f64()
        );

        let mut fixtures: Vec<&FixtureDescriptor> = Vec::new();
        for result in &self.results {
            if !fixtures.contains(&&result.fixture) {
                fixtures.push(&result.fixture);
            }
        }

        for fixture in fixtures {
            let results: Vec<_> = self
                .results
                .iter()
                .filter(|r| r.fixture == *fixture)
                .collect();
            let failures = results.iter().filter(|r| r.status.is_failed()).count();
            let skipped = results
                .iter()
                .filter(|r| r.status == TestStatus::Skipped)
                .count();
            let time: u64 = results.iter().map(|r| r.duration_ms).sum();
            let _ = writeln!(
                xml,
                r#"  <testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
                escape_xml(&fixture.description),
                results.len(),
                failures,
                skipped,
                Duration::from_millis(time).as_secs_f64()
            );

            for result in results {
                let _ = writeln!(
                    xml,
                    r#"    <testcase name="{}" classname="{}" time="{:.3}">"#,
                    escape_xml(&result.title),
                    escape_xml(&result.fixture.route),
                    Duration::from_millis(result.duration_ms).as_secs_f64()
                );
                if let Some(failure) = &result.failure {
                    let body = match (&failure.expected, &failure.actual) {
                        (Some(e), Some(a)) => format!("expected: {e:?}\nactual: {a:?}"),
                        _ => failure.message.clone(),
                    };
                    let _ = writeln!(
                        xml,
                        r#"      <failure type="{}" message="{}">{}</failure>"#,
                        escape_xml(&failure.kind),
                        escape_xml(&failure.message),
                        escape_xml(&body)
                    );
                }
                if let Some(reason) = &result.skip_reason {
                    let _ = writeln!(xml, r#"      <skipped message="{}"/>"#, escape_xml(reason));
                }
                xml.push_str("    </testcase>\n");
            }
            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        xml
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Serialization errors.
    pub fn to_json(&self) -> ParityResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write pretty JSON
    ///
    /// # Errors
    ///
    /// Serialization or file writing errors.
    pub fn write_json(&self, path: &Path) -> ParityResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParityReport {
        let plain = FixtureDescriptor::plain();
        let shadcn = FixtureDescriptor::shadcn();
        let mut report = ParityReport::new("mock", "http://127.0.0.1:5173");
        report.results = vec![
            ScenarioResult::passed(&plain, "structure", "structure test")
                .with_duration(Duration::from_millis(12)),
            ScenarioResult::skipped(&plain, "role-is-button", "role is button", "composite only"),
            ScenarioResult::failed(
                &plain,
                "keyboard-interaction",
                "keyboard <test>",
                &ParityError::mismatch("current value of native selector", "apple", ""),
            ),
            ScenarioResult::passed(&shadcn, "structure", "structure test"),
            ScenarioResult::passed(&shadcn, "role-is-button", "role is button"),
            ScenarioResult::passed(&shadcn, "keyboard-interaction", "keyboard <test>"),
        ];
        report
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_status_predicates() {
            assert!(TestStatus::Passed.is_passed());
            assert!(TestStatus::Failed.is_failed());
            assert!(!TestStatus::Skipped.is_failed());
            assert_eq!(TestStatus::Skipped.label(), "SKIP");
        }

        #[test]
        fn test_failure_mode_defaults_to_collect_all() {
            assert_eq!(FailureMode::default(), FailureMode::CollectAll);
        }

        #[test]
        fn test_terminal_states() {
            assert!(RunnerState::Passed.is_terminal());
            assert!(!RunnerState::Executing.is_terminal());
        }

        #[test]
        fn test_failure_detail_from_error() {
            let detail = FailureDetail::from(&ParityError::OptionNotFound {
                value: "mango".into(),
            });
            assert_eq!(detail.kind, "OptionNotFound");
            assert!(detail.expected.is_none());
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_counts_and_summary() {
            let report = sample();
            assert_eq!(report.passed_count(), 4);
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.skipped_count(), 1);
            assert!(!report.is_success());
            assert!(report.summary().starts_with("4 passed, 1 failed, 1 skipped"));
            assert_eq!(report.failures()[0].pair_name(), "/plain :: keyboard-interaction");
        }

        #[test]
        fn test_matrix_and_violations() {
            let report = sample();
            let matrix = report.matrix();
            assert_eq!(matrix.len(), 3);
            assert_eq!(matrix[1].status(Variant::Native), Some(TestStatus::Skipped));

            let violations = report.parity_violations();
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].scenario, "keyboard-interaction");
            // Skipped vs passed is not a violation
            assert!(!matrix[1].is_parity_violation());
        }

        #[test]
        fn test_render_text_lists_expected_and_actual() {
            let text = sample().render_text();
            assert!(text.contains("FAIL  /plain :: keyboard-interaction"));
            assert!(text.contains("expected: \"apple\""));
            assert!(text.contains("actual:   \"\""));
            assert!(text.contains("skipped: composite only"));
        }

        #[test]
        fn test_render_matrix_flags_violation() {
            let matrix = sample().render_matrix();
            let line = matrix
                .lines()
                .find(|l| l.starts_with("keyboard-interaction"))
                .unwrap();
            assert!(line.contains("FAIL"));
            assert!(line.contains("parity violation"));
            assert!(!matrix
                .lines()
                .find(|l| l.starts_with("structure"))
                .unwrap()
                .contains("violation"));
        }

        #[test]
        fn test_render_junit() {
            let xml = sample().render_junit();
            assert!(xml.starts_with("<?xml"));
            assert!(xml.contains(r#"tests="6" failures="1" skipped="1""#));
            assert!(xml.contains(r#"<testsuite name="Plain HTML Select Component""#));
            assert!(xml.contains("keyboard &lt;test&gt;"));
            assert!(xml.contains(r#"<failure type="ScenarioFailure""#));
            assert!(xml.contains("<skipped message=\"composite only\"/>"));
            assert_eq!(xml.matches("<testsuite ").count(), 2);
        }

        #[test]
        fn test_json_round_trip() {
            let report = sample();
            let json = report.to_json().unwrap();
            let back: ParityReport = serde_json::from_str(&json).unwrap();
            assert_eq!(back, report);
        }

        #[test]
        fn test_write_files() {
            let dir = tempfile::tempdir().unwrap();
            let report = sample();
            let junit = dir.path().join("junit.xml");
            let json = dir.path().join("report.json");
            report.write_junit(&junit).unwrap();
            report.write_json(&json).unwrap();
            assert!(std::fs::read_to_string(junit).unwrap().contains("testsuites"));
            assert!(std::fs::read_to_string(json).unwrap().contains("\"driver\": \"mock\""));
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&'\""), "a&lt;b&gt;&amp;&apos;&quot;");
    }
}
