//! End-to-end matrix runs against the in-memory browser.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use select_parity::prelude::*;
use select_parity::{Fault, FaultSpec, FailureMode, RetryConfig, TestStatus};

fn options() -> SessionOptions {
    SessionOptions::new("http://127.0.0.1:5173").with_retry(RetryConfig::fast())
}

async fn run_with(browser: &MockBrowser) -> ParityReport {
    ParityRunner::new(Arc::new(browser.clone()), options())
        .with_jobs(4)
        .run()
        .await
}

#[tokio::test]
async fn clean_fixtures_are_at_parity() {
    let browser = MockBrowser::new();
    let report = run_with(&browser).await;

    assert!(report.is_success(), "{}", report.render_text());
    assert_eq!(report.passed_count(), 30);
    assert!(report.parity_violations().is_empty());
    assert_eq!(browser.pages_opened(), browser.pages_closed());

    // Each shared scenario passes on both variants
    for row in report.matrix() {
        let native = row.status(Variant::Native).unwrap();
        let composite = row.status(Variant::Composite).unwrap();
        if native != TestStatus::Skipped && composite != TestStatus::Skipped {
            assert_eq!(native, composite, "{}", row.scenario);
        }
    }
}

#[tokio::test]
async fn desynced_hidden_select_breaks_only_composite() {
    let browser =
        MockBrowser::new().with_fault(FaultSpec::new(Variant::Composite, Fault::ValueDesync));
    let report = run_with(&browser).await;

    assert!(!report.is_success());
    for failure in report.failures() {
        assert_eq!(failure.fixture.route, "/shadcn");
    }
    let violations = report.parity_violations();
    assert!(violations.iter().any(|r| r.scenario == "select-each-fruit"));
    assert!(report.render_matrix().contains("parity violation"));
}

#[tokio::test]
async fn missing_placeholder_reports_expected_and_actual() {
    let browser =
        MockBrowser::new().with_fault(FaultSpec::new(Variant::Native, Fault::MissingPlaceholder));
    let report = run_with(&browser).await;

    let result = report.find("/plain", "all-expected-options").unwrap();
    assert_eq!(result.status, TestStatus::Failed);
    let failure = result.failure.as_ref().unwrap();
    assert_eq!(failure.kind, "ScenarioFailure");
    assert!(failure.expected.is_some());
    assert!(failure.actual.is_some());
    assert!(report
        .find("/shadcn", "all-expected-options")
        .unwrap()
        .status
        .is_passed());
}

#[tokio::test]
async fn sticky_selection_fails_reset_after_navigation() {
    let browser =
        MockBrowser::new().with_fault(FaultSpec::new(Variant::Native, Fault::StickySelection));
    let report = run_with(&browser).await;

    let result = report.find("/plain", "reset-after-navigation").unwrap();
    assert_eq!(result.status, TestStatus::Failed, "{}", report.render_text());
}

#[tokio::test]
async fn ignored_keyboard_fails_keyboard_scenario() {
    let browser =
        MockBrowser::new().with_fault(FaultSpec::new(Variant::Composite, Fault::IgnoreKeyboard));
    let report = run_with(&browser).await;

    let keyboard = report.find("/shadcn", "keyboard-interaction").unwrap();
    assert_eq!(keyboard.status, TestStatus::Failed);
    assert!(report
        .find("/plain", "keyboard-interaction")
        .unwrap()
        .status
        .is_passed());
}

#[tokio::test]
async fn disabled_control_times_out_on_actionability() {
    let browser =
        MockBrowser::new().with_fault(FaultSpec::new(Variant::Composite, Fault::DisabledControl));
    let report = run_with(&browser).await;

    let kinds: Vec<_> = report
        .failures()
        .iter()
        .filter_map(|r| r.failure.as_ref().map(|f| f.kind.clone()))
        .collect();
    assert!(kinds.iter().any(|k| k == "ActionabilityTimeout"), "{kinds:?}");
}

#[tokio::test]
async fn fail_fast_stops_after_first_failure() {
    let browser =
        MockBrowser::new().with_fault(FaultSpec::new(Variant::Native, Fault::Unreachable));
    let report = ParityRunner::new(Arc::new(browser.clone()), options())
        .with_jobs(1)
        .with_failure_mode(FailureMode::AndonCord)
        .run()
        .await;

    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.passed_count(), 0);
    assert_eq!(browser.pages_opened(), 1);
}

#[tokio::test]
async fn reports_write_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let report = ParityRunner::new(Arc::new(MockBrowser::new()), options())
        .with_filter("structure")
        .run()
        .await;

    let junit = dir.path().join("junit.xml");
    let json = dir.path().join("report.json");
    report.write_junit(&junit).unwrap();
    report.write_json(&json).unwrap();

    let xml = std::fs::read_to_string(&junit).unwrap();
    assert!(xml.contains(r#"tests="2" failures="0""#));
    let back: ParityReport =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(back.results.len(), 2);
}
