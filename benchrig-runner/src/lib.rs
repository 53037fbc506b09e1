// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchrig Runner
//!
//! Execution side of the benchrig benchmark runner: drives resolved
//! benchmarks through their repetitions, reduces the records into summary
//! statistics and assembles the suite report.
//!
//! # Flow
//!
//! - **Orchestrator**: plans the suite, resolves each entry, runs every binding
//! - **RunExecutor**: exactly `runs` repetitions per binding, failures recorded
//! - **ResultAggregator**: counts plus statistics over numeric payloads
//! - **JsonReporter**: prints or persists the report
//!
//! # Data Output
//!
//! Reports serialize to JSON with one result per (benchmark, binding) pair.

pub mod aggregate;
pub mod harness;
pub mod metrics;
pub mod orchestrator;
pub mod reporter;

pub use aggregate::ResultAggregator;
pub use harness::{RunExecutor, Timer};
pub use metrics::{
    format_duration, AggregateResult, BenchmarkResult, Report, ResolutionFailure, RunOutcome,
    RunRecord, SummaryStatistics, SystemInfo,
};
pub use orchestrator::{Orchestrator, PlannedBenchmark, DEFAULT_SUITE_NAME};
pub use reporter::{JsonReporter, ReportTarget, ReporterError};
