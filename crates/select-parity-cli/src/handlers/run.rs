//! Run command: every scenario against every fixture

use std::path::Path;
use std::sync::Arc;

use select_parity::{HarnessConfig, ParityReport, ParityRunner, ScenarioResult, SessionFactory};

use crate::commands::{DriverArg, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::setup::{open_factory, prepare_fixtures, resolve_harness, FixtureOrigin};
use crate::output::ProgressReporter;

/// Harness config with the run-only flags applied
pub fn harness_for_run(args: &RunArgs, cwd: &Path) -> CliResult<HarnessConfig> {
    let mut harness = resolve_harness(&args.harness, cwd)?;
    if let Some(jobs) = args.jobs {
        harness.jobs = jobs;
    }
    if let Some(ms) = args.timeout {
        harness.expect_timeout_ms = ms;
    }
    if let Some(command) = &args.build_command {
        harness.build_command = Some(command.clone());
    }
    harness.validate()?;
    Ok(harness)
}

/// Configure the runner from flags
pub fn build_runner(
    factory: Arc<dyn SessionFactory>,
    harness: &HarnessConfig,
    args: &RunArgs,
) -> CliResult<ParityRunner> {
    let mut runner =
        ParityRunner::new(factory, harness.session_options()).with_jobs(harness.jobs);
    if let Some(filter) = &args.filter {
        runner = runner.with_filter(filter);
    }
    if let Some(variant) = args.variant {
        runner = runner.with_variant(variant.into());
    }
    if args.fail_fast {
        runner = runner.fail_fast();
    }
    if runner.pairs().is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no scenarios match filter {:?}",
            args.filter.as_deref().unwrap_or("")
        )));
    }
    Ok(runner)
}

/// Write the requested report files
pub fn write_reports(report: &ParityReport, args: &RunArgs) -> CliResult<()> {
    if let Some(path) = &args.junit {
        report.write_junit(path)?;
        tracing::info!(path = %path.display(), "wrote JUnit report");
    }
    if let Some(path) = &args.json {
        report.write_json(path)?;
        tracing::info!(path = %path.display(), "wrote JSON report");
    }
    Ok(())
}

/// Execute the run command
pub async fn execute_run(config: &CliConfig, args: &RunArgs, cwd: &Path) -> CliResult<()> {
    let harness = harness_for_run(args, cwd)?;
    let use_color = config.color.should_color();
    let quiet = config.verbosity.is_quiet();
    if args.driver != DriverArg::Mock && !args.inject_fault.is_empty() {
        return Err(CliError::invalid_argument(
            "--inject-fault requires --driver mock",
        ));
    }

    let origin = match args.driver {
        DriverArg::Mock => FixtureOrigin::Unused,
        DriverArg::Chromium => prepare_fixtures(&harness, !args.no_reuse).await?,
    };

    let factory = match open_factory(args.driver, &harness, &args.inject_fault).await {
        Ok(factory) => factory,
        Err(e) => {
            origin.shutdown();
            return Err(e);
        }
    };

    let report = match build_runner(Arc::clone(&factory), &harness, args) {
        Ok(runner) => {
            let mut reporter = ProgressReporter::new(use_color, quiet)
                .with_per_pair(config.verbosity.is_verbose());
            reporter.header(&format!(
                "{} pairs on {} via {}",
                runner.pairs().len(),
                harness.base_url(),
                factory.name()
            ));
            reporter.start_progress(runner.pairs().len() as u64, "running");
            let reporter = Arc::new(reporter);
            let progress = Arc::clone(&reporter);
            let runner = runner.on_result(Arc::new(move |result: &ScenarioResult| {
                progress.pair_finished(result);
            }));

            let report = runner.run().await;
            reporter.finish();
            reporter.report(&report);
            Ok(report)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = factory.shutdown().await {
        tracing::warn!(error = %e, "browser shutdown failed");
    }
    origin.shutdown();

    let report = report?;
    write_reports(&report, args)?;

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::test_execution(format!(
            "{} pair(s) failed",
            report.failed_count()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;
    use select_parity::MockBrowser;
    use tempfile::TempDir;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["parity", "run", "--driver", "mock"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            _ => panic!("expected run"),
        }
    }

    fn quiet() -> CliConfig {
        CliConfig::new()
            .with_verbosity(crate::config::Verbosity::Quiet)
            .with_color(crate::config::ColorChoice::Never)
    }

    #[test]
    fn test_run_flags_reach_harness() {
        let dir = TempDir::new().unwrap();
        let args = run_args(&["-j", "3", "--timeout", "900", "--build-command", "true"]);
        let harness = harness_for_run(&args, dir.path()).unwrap();
        assert_eq!(harness.jobs, 3);
        assert_eq!(harness.expect_timeout_ms, 900);
        assert_eq!(harness.build_command.as_deref(), Some("true"));
    }

    #[test]
    fn test_runner_filter_and_variant() {
        let args = run_args(&["--filter", "keyboard", "--variant", "native"]);
        let runner = build_runner(
            Arc::new(MockBrowser::new()),
            &HarnessConfig::default(),
            &args,
        )
        .unwrap();
        let pairs = runner.pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.route, "/plain");
    }

    #[test]
    fn test_unmatched_filter_is_an_error() {
        let args = run_args(&["--filter", "no-such-scenario"]);
        let err = build_runner(
            Arc::new(MockBrowser::new()),
            &HarnessConfig::default(),
            &args,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("no-such-scenario"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clean_mock_run_succeeds_and_writes_reports() {
        let dir = TempDir::new().unwrap();
        let junit = dir.path().join("parity.xml");
        let json = dir.path().join("parity.json");
        let args = run_args(&[
            "--timeout",
            "2000",
            "--junit",
            junit.to_str().unwrap(),
            "--json",
            json.to_str().unwrap(),
        ]);
        execute_run(&quiet(), &args, dir.path()).await.unwrap();
        assert!(std::fs::read_to_string(junit).unwrap().contains("<testsuites"));
        assert!(std::fs::read_to_string(json).unwrap().contains("\"results\""));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_injected_fault_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let args = run_args(&[
            "--timeout",
            "500",
            "--filter",
            "select-each-fruit",
            "--inject-fault",
            "composite:value-desync",
        ]);
        let err = execute_run(&quiet(), &args, dir.path()).await.unwrap_err();
        assert!(matches!(err, CliError::TestExecution { .. }));
        assert!(err.to_string().contains("1 pair(s) failed"));
    }
}
