//! Terminal output and progress reporting

use std::time::Duration;

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use select_parity::{ParityReport, ScenarioResult, TestStatus};

/// Progress reporter for a parity run. Writes to stderr.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print one line per finished pair
    pub per_pair: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            per_pair: false,
        }
    }

    /// Print a line per pair as results arrive
    #[must_use]
    pub const fn with_per_pair(mut self, per_pair: bool) -> Self {
        self.per_pair = per_pair;
        self
    }

    /// Start a progress bar over `total` pairs
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Record one finished pair
    pub fn pair_finished(&self, result: &ScenarioResult) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
            pb.set_message(result.pair_name());
        }
        if !self.per_pair {
            return;
        }
        let line = format!("{} ({}ms)", result.pair_name(), result.duration_ms);
        let print = |text: &str| match &self.progress_bar {
            Some(pb) => pb.println(text),
            None => {
                let _ = self.term.write_line(text);
            }
        };
        match result.status {
            TestStatus::Passed if !self.quiet => print(&format!("{} {line}", self.prefix_pass())),
            TestStatus::Failed => print(&format!("{} {line}", self.prefix_fail())),
            TestStatus::Skipped if !self.quiet => print(&format!("{} {line}", self.prefix_skip())),
            _ => {}
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn prefix_pass(&self) -> String {
        if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        }
    }

    fn prefix_fail(&self) -> String {
        if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        }
    }

    fn prefix_skip(&self) -> String {
        if self.use_color {
            style("-").yellow().to_string()
        } else {
            "SKIP".to_string()
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self
            .term
            .write_line(&format!("{} {message}", self.prefix_pass()));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let _ = self
            .term
            .write_line(&format!("{} {message}", self.prefix_fail()));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print every failure with expected and actual values
    pub fn failures(&self, report: &ParityReport) {
        let failures = report.failures();
        if failures.is_empty() {
            return;
        }
        let _ = self.term.write_line("");
        for result in failures {
            self.failure(&result.pair_name());
            if let Some(failure) = &result.failure {
                let _ = self
                    .term
                    .write_line(&format!("    {}: {}", failure.kind, failure.message));
                if let (Some(expected), Some(actual)) = (&failure.expected, &failure.actual) {
                    let _ = self.term.write_line(&format!("    expected: {expected:?}"));
                    let _ = self.term.write_line(&format!("    actual:   {actual:?}"));
                }
            }
        }
    }

    /// Print the parity matrix
    pub fn matrix(&self, report: &ParityReport) {
        if self.quiet && report.parity_violations().is_empty() {
            return;
        }
        let _ = self.term.write_line("");
        for line in report.render_matrix().lines() {
            let line = if self.use_color && line.contains("parity violation") {
                style(line).red().to_string()
            } else {
                line.to_string()
            };
            let _ = self.term.write_line(&line);
        }
    }

    /// Print run summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let _ = self.term.write_line("");

        let total = passed + failed + skipped;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} pairs in {:.2}s ({} passed, {} failed, {} skipped)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} pairs in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
            ));
        }
    }

    /// Matrix, failures, then summary
    pub fn report(&self, report: &ParityReport) {
        self.matrix(report);
        self.failures(report);
        self.summary(
            report.passed_count(),
            report.failed_count(),
            report.skipped_count(),
            Duration::from_millis(report.duration_ms),
        );
    }
}
