//! Final report: summary banner, failure details and the saved xUnit file

use std::path::Path;

use super::tester::{FailureRecord, Tester};
use crate::common::Error;
use crate::driver::Style;

/// What a finished run amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    /// Exit status requested from the driver
    pub status: i32,
}

/// Render the results accumulated by `tester`
///
/// `save` overrides the save path from the tester options. A report that
/// cannot be written only produces a warning.
pub fn render_results(tester: &Tester, exit: bool, status: i32, save: Option<&Path>) -> RunSummary {
    let results = tester.results();
    let options = tester.options();
    let total = results.total();

    if total == 0 {
        tester.bar(
            &format!("{} Looks like you didn't run any test.", options.fail_text),
            Style::RedBar,
        );
    } else {
        let (label, style) = if results.failed > 0 {
            (&options.fail_text, Style::RedBar)
        } else {
            (&options.pass_text, Style::GreenBar)
        };
        tester.bar(
            &format!(
                "{} {} tests executed, {} passed, {} failed.",
                label, total, results.passed, results.failed
            ),
            style,
        );
    }

    if results.failed > 0 {
        render_failure_details(tester, &results.failures);
    }

    if let Some(path) = save.or(options.save.as_deref()) {
        save_report(tester, path);
    }

    tracing::info!(
        passed = results.passed,
        failed = results.failed,
        "Run complete"
    );

    if exit {
        tester.driver().exit(status);
    }

    RunSummary {
        passed: results.passed,
        failed: results.failed,
        status,
    }
}

fn render_failure_details(tester: &Tester, failures: &[FailureRecord]) {
    let driver = tester.driver();
    driver.echo(
        &format!(
            "\nDetails for the {} failed test{}:\n",
            failures.len(),
            if failures.len() > 1 { "s" } else { "" }
        ),
        Some(Style::Parameter),
    );
    for failure in failures {
        let file = failure
            .file
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        driver.echo(&format!("In {}:", file), Some(Style::Info));
        driver.echo(&format!("    {}", failure.message.detail()), Some(Style::Comment));
    }
}

fn save_report(tester: &Tester, path: &Path) {
    let written = tester
        .exporter()
        .serialize()
        .and_then(|xml| tester.fs().write(path, &xml));

    match written {
        Ok(()) => tester
            .driver()
            .echo(&format!("Result log stored in {}", path.display()), Some(Style::Info)),
        Err(e) => {
            let e = if matches!(e, Error::ReportWrite { .. }) {
                e
            } else {
                Error::ReportWrite {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                }
            };
            tracing::warn!(error = %e, "Report not saved");
            tester.error(&e.to_string());
        }
    }
}

impl Tester {
    /// Render the results of the run, see [`render_results`]
    pub fn render_results(&self, exit: bool, status: i32, save: Option<&Path>) -> RunSummary {
        render_results(self, exit, status, save)
    }
}
