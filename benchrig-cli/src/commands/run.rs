// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `benchrig run` command - Run the suite and emit the report.

use std::path::Path;
use std::process::ExitCode;

use benchrig_runner::{format_duration, JsonReporter, Report};

use super::Invocation;

pub fn execute(
    invocation: &Invocation<'_>,
    output: Option<&Path>,
    allow_failures: bool,
) -> anyhow::Result<ExitCode> {
    let loaded = invocation.load()?;

    let reporter = match output {
        Some(path) => JsonReporter::for_path(path)?,
        None => JsonReporter::stdout(),
    };

    let report = loaded.orchestrator().run_suite(
        &loaded.suite,
        &loaded.defaults.config,
        &loaded.search_paths,
    )?;

    if let Some(path) = reporter.save(&report)? {
        eprintln!("Benchmark report saved to: {}", path.display());
    }
    print_summary(&report);

    if report.has_failures() && !allow_failures {
        tracing::warn!(
            unresolved = report.resolution_failures.len(),
            failed_repetitions = report.failed_repetitions(),
            "Suite finished with failures"
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Human-readable summary on stderr, keeping stdout for the report.
fn print_summary(report: &Report) {
    eprintln!();
    eprintln!(
        "{:<40} {:<24} {:>8} {:>8} {:>12}",
        "Benchmark", "Parameters", "OK", "Failed", "Mean time"
    );
    eprintln!("{}", "-".repeat(96));

    for result in &report.results {
        let mean = result
            .aggregate
            .elapsed
            .as_ref()
            .map(|s| format_duration(s.mean))
            .unwrap_or_else(|| "-".to_string());
        eprintln!(
            "{:<40} {:<24} {:>8} {:>8} {:>12}",
            result.name,
            result.parameters.to_string(),
            result.aggregate.successes,
            result.aggregate.failures,
            mean
        );
    }

    for failure in &report.resolution_failures {
        eprintln!("{:<40} unresolved: {}", failure.name, failure.error);
    }
}
