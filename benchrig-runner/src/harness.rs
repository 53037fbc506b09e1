// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Run executor for timing benchmark repetitions.
//!
//! Executes one (benchmark, binding, config) triple for the configured
//! number of repetitions and records every outcome. Nothing raised by a
//! benchmark escapes this module: failures, including panics, become
//! failed [`RunRecord`]s.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use benchrig_core::{
    Benchmark, BenchmarkError, BenchmarkInstance, ParameterBinding, ResolvedConfig,
};
use chrono::Utc;

use crate::metrics::RunRecord;

/// Sequential executor for benchmark repetitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunExecutor;

impl RunExecutor {
    /// Create a new run executor.
    pub fn new() -> Self {
        Self
    }

    /// Run `config.runs()` repetitions of `instance` for `binding`.
    ///
    /// Always returns exactly that many records, in repetition order.
    pub fn run(
        &self,
        instance: &mut BenchmarkInstance,
        binding: &ParameterBinding,
        config: &ResolvedConfig,
    ) -> Vec<RunRecord> {
        let runs = config.runs().value();
        let name = instance.name().clone();
        let benchmark = instance.implementation();

        tracing::debug!(benchmark = %name, parameters = %binding, runs, "Running benchmark");

        if let Err(e) = guarded(|| benchmark.setup(binding, config)) {
            tracing::error!(benchmark = %name, error = %e, "Setup failed, skipping repetitions");
            let message = format!("setup failed: {}", e);
            let timestamp = Utc::now();
            return (0..runs)
                .map(|repetition| RunRecord::failure(repetition, timestamp, 0, message.clone()))
                .collect();
        }

        let records: Vec<RunRecord> = (0..runs)
            .map(|repetition| {
                let record = Self::run_once(&mut *benchmark, binding, config, repetition);
                if let Some(error) = record.error() {
                    tracing::warn!(benchmark = %name, repetition, error, "Repetition failed");
                } else {
                    tracing::trace!(
                        benchmark = %name,
                        repetition,
                        elapsed_ns = record.elapsed_ns,
                        "Repetition done"
                    );
                }
                record
            })
            .collect();

        if let Err(e) = guarded(|| benchmark.teardown()) {
            tracing::warn!(benchmark = %name, error = %e, "Teardown failed");
        }

        records
    }

    fn run_once(
        benchmark: &mut dyn Benchmark,
        binding: &ParameterBinding,
        config: &ResolvedConfig,
        repetition: u32,
    ) -> RunRecord {
        let timestamp = Utc::now();

        if let Err(e) = guarded(|| benchmark.pre_run(repetition)) {
            return RunRecord::failure(repetition, timestamp, 0, format!("pre_run failed: {}", e));
        }

        let timer = Timer::start();
        let outcome = guarded(|| benchmark.execute(binding, config));
        let elapsed_ns = timer.stop();

        if let Err(e) = guarded(|| benchmark.post_run(repetition)) {
            tracing::warn!(repetition, error = %e, "post_run failed");
        }

        match outcome {
            Ok(measurement) => RunRecord::success(repetition, timestamp, elapsed_ns, measurement),
            Err(e) => RunRecord::failure(repetition, timestamp, elapsed_ns, e.to_string()),
        }
    }
}

/// Call into a benchmark, turning a panic into an error.
fn guarded<T>(f: impl FnOnce() -> Result<T, BenchmarkError>) -> Result<T, BenchmarkError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Err(BenchmarkError::failed(format!("panicked: {}", message)))
    })
}

/// Timer for measuring individual operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return elapsed nanoseconds.
    pub fn stop(self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
}
