// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Suite orchestration.
//!
//! Plans every benchmark entry up front (configuration merge and parameter
//! expansion), then resolves, executes and aggregates each entry in
//! declaration order. Configuration errors abort before anything runs;
//! resolution errors skip one entry and are reported.

use std::sync::Arc;

use benchrig_core::{
    BenchResult, BenchmarkName, BenchmarkRegistry, BenchmarkSpec, Config, ConfigResolver,
    ParameterBinding, ParameterMatrixExpander, ResolvedConfig, SearchPath, Suite,
};

use crate::aggregate::ResultAggregator;
use crate::harness::RunExecutor;
use crate::metrics::{format_duration, BenchmarkResult, Report, SystemInfo};

/// Suite identifier used when none is given.
pub const DEFAULT_SUITE_NAME: &str = "benchrig";

/// One suite entry after configuration merge and parameter expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedBenchmark {
    pub name: BenchmarkName,
    pub config: ResolvedConfig,
    pub bindings: Vec<ParameterBinding>,
}

/// Drives a whole suite through resolution, execution and aggregation.
pub struct Orchestrator {
    registry: Arc<BenchmarkRegistry>,
    executor: RunExecutor,
    suite_name: String,
    collect_system_info: bool,
}

impl Orchestrator {
    pub fn new(registry: Arc<BenchmarkRegistry>) -> Self {
        Self {
            registry,
            executor: RunExecutor::new(),
            suite_name: DEFAULT_SUITE_NAME.to_string(),
            collect_system_info: true,
        }
    }

    /// Set the suite identifier recorded in the report.
    pub fn suite_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Set whether host information is embedded in the report.
    pub fn system_info(mut self, collect: bool) -> Self {
        self.collect_system_info = collect;
        self
    }

    pub fn registry(&self) -> &BenchmarkRegistry {
        &self.registry
    }

    /// The entries a suite runs: its declared list, or everything discovered.
    pub fn entries(&self, suite: &Suite, search_paths: &[SearchPath]) -> Vec<BenchmarkSpec> {
        match &suite.benchmarks {
            Some(specs) => specs.clone(),
            None => {
                tracing::info!("Suite lists no benchmarks, running everything discovered");
                self.registry
                    .discover(search_paths)
                    .into_iter()
                    .map(|found| BenchmarkSpec::named(found.name))
                    .collect()
            }
        }
    }

    /// Merge and expand every entry without executing anything.
    pub fn plan(
        &self,
        suite: &Suite,
        defaults: &Config,
        search_paths: &[SearchPath],
    ) -> BenchResult<Vec<PlannedBenchmark>> {
        let defaults = defaults.to_layer();

        self.entries(suite, search_paths)
            .iter()
            .map(|spec| -> BenchResult<PlannedBenchmark> {
                let merged = ConfigResolver::merge(&[
                    defaults.clone(),
                    suite.config.clone(),
                    spec.config.clone(),
                ])?;
                Ok(PlannedBenchmark {
                    name: spec.name.clone(),
                    config: ResolvedConfig::new(merged)?,
                    bindings: ParameterMatrixExpander::expand(spec)?,
                })
            })
            .collect()
    }

    /// Run every entry of `suite` and assemble the report.
    ///
    /// Fails only on configuration errors, before any benchmark executes.
    pub fn run_suite(
        &self,
        suite: &Suite,
        defaults: &Config,
        search_paths: &[SearchPath],
    ) -> BenchResult<Report> {
        let plan = self.plan(suite, defaults, search_paths)?;
        tracing::info!(benchmarks = plan.len(), "Suite planned");

        let system_info = self.collect_system_info.then(SystemInfo::collect);
        let mut report = Report::new(
            self.suite_name.clone(),
            defaults.clone(),
            search_paths.to_vec(),
            system_info,
        );

        for planned in &plan {
            self.run_planned(planned, search_paths, &mut report);
        }

        tracing::info!(
            results = report.results.len(),
            failed_repetitions = report.failed_repetitions(),
            unresolved = report.resolution_failures.len(),
            "Suite finished"
        );
        Ok(report)
    }

    fn run_planned(
        &self,
        planned: &PlannedBenchmark,
        search_paths: &[SearchPath],
        report: &mut Report,
    ) {
        let mut instance = match self.registry.resolve(&planned.name, search_paths) {
            Ok(instance) => instance,
            Err(e) => {
                tracing::error!(benchmark = %planned.name, error = %e, "Skipping benchmark");
                report.add_resolution_failure(planned.name.as_str(), e.to_string());
                return;
            }
        };

        for binding in &planned.bindings {
            let records = self.executor.run(&mut instance, binding, &planned.config);
            let aggregate = ResultAggregator::reduce(&records);

            let undescribed = ResultAggregator::undescribed_metrics(&aggregate, instance.info());
            if !undescribed.is_empty() {
                tracing::warn!(
                    benchmark = %instance.name(),
                    metrics = ?undescribed,
                    "Measurement reports metrics without a descriptor"
                );
            }

            let mean_elapsed = aggregate
                .elapsed
                .as_ref()
                .map(|s| format_duration(s.mean))
                .unwrap_or_else(|| "-".to_string());
            tracing::info!(
                benchmark = %instance.name(),
                parameters = %binding,
                successes = aggregate.successes,
                failures = aggregate.failures,
                mean_elapsed = %mean_elapsed,
                "Benchmark finished"
            );

            let info = instance.info();
            report.add_result(BenchmarkResult {
                name: instance.name().to_string(),
                version: info.version,
                parameters: binding.clone(),
                config: planned.config.tree().clone(),
                metrics: info.metrics.clone(),
                metadata: info.metadata.clone(),
                aggregate,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchrig_core::{Benchmark, BenchmarkError, BenchError, ConfigError, ConfigLoader, Value};
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Counter {
        calls: i64,
    }

    impl Benchmark for Counter {
        fn execute(
            &mut self,
            binding: &ParameterBinding,
            _config: &ResolvedConfig,
        ) -> Result<Value, BenchmarkError> {
            self.calls += 1;
            let base = binding.get("base").and_then(Value::as_i64).unwrap_or(0);
            Ok(Value::from(base + self.calls))
        }
    }

    fn fixture() -> (TempDir, Orchestrator) {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("unit.yaml"),
            "benchmarks:\n  - {name: Count, builtin: counter, version: 3}\n  - {name: Other, builtin: counter}\n",
        )
        .unwrap();
        let registry = BenchmarkRegistry::new_shared();
        registry.register_default::<Counter>("counter").unwrap();
        (dir, Orchestrator::new(registry).system_info(false))
    }

    fn paths(dir: &Path) -> Vec<SearchPath> {
        vec![SearchPath::new(dir)]
    }

    #[test]
    fn test_unresolvable_entry_skipped() {
        let (dir, orchestrator) = fixture();
        let suite = ConfigLoader::load_suite_str(
            "benchmarks:\n  - name: Missing\n  - name: Count\n    config: {runs: 3}\n",
        )
        .unwrap();

        let report = orchestrator
            .run_suite(&suite, &Config::builtin_defaults(), &paths(dir.path()))
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].name, "unit.Count");
        assert_eq!(report.results[0].version, Some(3));
        assert_eq!(report.results[0].aggregate.successes, 3);
        assert_eq!(report.resolution_failures.len(), 1);
        assert_eq!(report.resolution_failures[0].name, "Missing");
        assert!(report.has_failures());
        assert!(report.system_info.is_none());
    }

    #[test]
    fn test_instance_reused_across_bindings() {
        let (dir, orchestrator) = fixture();
        let suite = ConfigLoader::load_suite_str(
            "config: {runs: 2}\nbenchmarks:\n  - name: unit.Count\n    params: [{base: 100}, {base: 200}]\n",
        )
        .unwrap();

        let report = orchestrator
            .run_suite(&suite, &Config::builtin_defaults(), &paths(dir.path()))
            .unwrap();

        assert_eq!(report.results.len(), 2);
        let measurements: Vec<i64> = report
            .results
            .iter()
            .flat_map(|r| r.aggregate.records.iter())
            .filter_map(|r| r.measurement().and_then(Value::as_i64))
            .collect();
        // One instance per entry: the call counter keeps running.
        assert_eq!(measurements, vec![101, 102, 203, 204]);
        assert_eq!(
            report.results[1].parameters.get("base"),
            Some(&Value::from(200))
        );
        assert!(!report.has_failures());
    }

    #[test]
    fn test_config_error_aborts_before_execution() {
        let (dir, orchestrator) = fixture();
        let suite = ConfigLoader::load_suite_str(
            "benchmarks:\n  - name: Count\n  - name: Other\n    params: [[1, 2]]\n",
        )
        .unwrap();

        let result =
            orchestrator.run_suite(&suite, &Config::builtin_defaults(), &paths(dir.path()));
        assert!(matches!(
            result,
            Err(BenchError::Config(ConfigError::InvalidParameterSetShape { .. }))
        ));
    }

    #[test]
    fn test_missing_benchmarks_runs_everything() {
        let (dir, orchestrator) = fixture();
        let report = orchestrator
            .run_suite(&Suite::default(), &Config::builtin_defaults(), &paths(dir.path()))
            .unwrap();

        let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["unit.Count", "unit.Other"]);
        assert!(report.results.iter().all(|r| r.aggregate.count() == 1));
    }

    #[test]
    fn test_plan_layers_configuration() {
        let (dir, orchestrator) = fixture();
        let suite = ConfigLoader::load_suite_str(
            "config: {runs: 4, tracer: {mode: ust}}\nbenchmarks:\n  - name: Count\n    config: {tracer: {buffers: 2}}\n",
        )
        .unwrap();
        let defaults = Config::builtin_defaults().with("timeout_ms", 500);

        let plan = orchestrator
            .plan(&suite, &defaults, &paths(dir.path()))
            .unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].config.runs().value(), 4);
        assert!(plan[0].config.timeout().is_some());
        let tracer = plan[0].config.get("tracer").and_then(Value::as_mapping).unwrap();
        assert_eq!(tracer.len(), 2);
        assert_eq!(plan[0].bindings, vec![ParameterBinding::empty()]);
    }
}
