// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Result types for benchmark runs.
//!
//! This module defines the data structures used to capture and serialize
//! repetition records, their aggregates and the complete suite report.

use std::collections::BTreeMap;

use benchrig_core::{Config, Mapping, Measurement, MetricDescriptor, ParameterBinding, SearchPath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use uuid::Uuid;

/// Outcome of one repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success { measurement: Measurement },
    Failure { error: String },
}

/// One repetition of one benchmark for one parameter binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Zero-based repetition index
    pub repetition: u32,
    /// Wall-clock time the repetition started
    pub timestamp: DateTime<Utc>,
    /// Time spent in execute, in nanoseconds
    pub elapsed_ns: u64,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

impl RunRecord {
    pub fn success(
        repetition: u32,
        timestamp: DateTime<Utc>,
        elapsed_ns: u64,
        measurement: Measurement,
    ) -> Self {
        Self {
            repetition,
            timestamp,
            elapsed_ns,
            outcome: RunOutcome::Success { measurement },
        }
    }

    pub fn failure(
        repetition: u32,
        timestamp: DateTime<Utc>,
        elapsed_ns: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            repetition,
            timestamp,
            elapsed_ns,
            outcome: RunOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Success { .. })
    }

    /// The measurement of a successful repetition.
    pub fn measurement(&self) -> Option<&Measurement> {
        match &self.outcome {
            RunOutcome::Success { measurement } => Some(measurement),
            RunOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Success { .. } => None,
            RunOutcome::Failure { error } => Some(error),
        }
    }
}

/// Summary statistics over a set of numeric samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of samples the statistics cover
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl SummaryStatistics {
    /// Calculate statistics from samples. `None` when there are none.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);
        let len = sorted.len();

        let mean = sorted.iter().sum::<f64>() / len as f64;
        let median = if len % 2 == 0 {
            (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
        } else {
            sorted[len / 2]
        };

        let variance = sorted
            .iter()
            .map(|&x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<f64>()
            / len as f64;

        Some(Self {
            count: len,
            mean,
            min: sorted[0],
            max: sorted[len - 1],
            median,
            std_dev: variance.sqrt(),
        })
    }
}

/// Format a nanosecond duration in human-readable form (auto-selects ns/μs/ms/s).
pub fn format_duration(ns: f64) -> String {
    if ns < 1_000.0 {
        format!("{:.0}ns", ns)
    } else if ns < 1_000_000.0 {
        format!("{:.2}μs", ns / 1_000.0)
    } else if ns < 1_000_000_000.0 {
        format!("{:.2}ms", ns / 1_000_000.0)
    } else {
        format!("{:.2}s", ns / 1_000_000_000.0)
    }
}

/// Reduction of the repetitions for one (benchmark, binding) pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateResult {
    pub successes: usize,
    pub failures: usize,
    /// Statistics over scalar numeric measurements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<SummaryStatistics>,
    /// Statistics per numeric field of mapping measurements
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metric_statistics: BTreeMap<String, SummaryStatistics>,
    /// Statistics over the execute time of successful repetitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<SummaryStatistics>,
    pub records: Vec<RunRecord>,
}

impl AggregateResult {
    /// Total number of repetitions.
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// System information captured at benchmark time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name
    pub os: String,
    /// OS version
    pub os_version: String,
    /// Kernel version (Linux)
    pub kernel_version: Option<String>,
    /// CPU model name
    pub cpu_model: String,
    /// Number of CPU cores
    pub cpu_cores: usize,
    /// Total system memory in bytes
    pub memory_bytes: u64,
    /// Hostname
    pub hostname: String,
}

impl SystemInfo {
    /// Collect current system information.
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// Aggregated outcome of one benchmark for one parameter binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Qualified name of the resolved benchmark
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub parameters: ParameterBinding,
    /// Fully merged configuration the repetitions ran with
    pub config: Config,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, MetricDescriptor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Mapping,
    #[serde(flatten)]
    pub aggregate: AggregateResult,
}

/// A suite entry that could not be resolved and was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionFailure {
    /// Name as written in the suite
    pub name: String,
    pub error: String,
}

/// Complete benchmark suite report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Unique identifier of this invocation
    pub run_id: Uuid,
    /// Suite identifier
    pub benchmark_suite: String,
    /// Runner version
    pub version: String,
    /// Timestamp when the suite started
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_info: Option<SystemInfo>,
    /// Default configuration layer
    pub config: Config,
    /// Effective search order
    pub search_paths: Vec<SearchPath>,
    /// Results in suite declaration order, then binding order
    pub results: Vec<BenchmarkResult>,
    #[serde(default)]
    pub resolution_failures: Vec<ResolutionFailure>,
}

impl Report {
    /// Create an empty report.
    pub fn new(
        benchmark_suite: impl Into<String>,
        config: Config,
        search_paths: Vec<SearchPath>,
        system_info: Option<SystemInfo>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            benchmark_suite: benchmark_suite.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            system_info,
            config,
            search_paths,
            results: Vec::new(),
            resolution_failures: Vec::new(),
        }
    }

    /// Add a result to the report.
    pub fn add_result(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn add_resolution_failure(&mut self, name: impl Into<String>, error: impl Into<String>) {
        self.resolution_failures.push(ResolutionFailure {
            name: name.into(),
            error: error.into(),
        });
    }

    /// Number of failed repetitions across all results.
    pub fn failed_repetitions(&self) -> usize {
        self.results.iter().map(|r| r.aggregate.failures).sum()
    }

    /// Whether any entry failed to resolve or any repetition failed.
    pub fn has_failures(&self) -> bool {
        !self.resolution_failures.is_empty() || self.failed_repetitions() > 0
    }
}
