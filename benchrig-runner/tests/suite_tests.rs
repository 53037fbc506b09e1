// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end suite runs against external-command benchmarks.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use benchrig_core::{search_order, BenchmarkRegistry, ConfigLoader, Value};
use benchrig_runner::{JsonReporter, Orchestrator};
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn executable(path: &Path, body: &str) {
    write(path, &format!("#!/bin/sh\n{}\n", body));
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

/// A unit with a steady benchmark, a flaky one and a slow one.
fn workspace() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let bench = temp.path().join("bench");

    executable(&bench.join("steady.sh"), "cat > /dev/null\necho '{\"load_time\": 0.5}'");
    // Fails on the second and fifth repetition, counting from one.
    executable(
        &bench.join("flaky.sh"),
        r#"input=$(cat)
case "$input" in
  *'"repetition":1,'*|*'"repetition":4,'*) echo "flaked" >&2; exit 3 ;;
esac
echo 7"#,
    );
    executable(&bench.join("slow.sh"), "exec sleep 30");

    write(
        &bench.join("lifecycle.yaml"),
        r#"
benchmarks:
  - name: Steady
    version: 1
    command: ["./steady.sh"]
    metrics:
      load_time: {unit: seconds, interpretation: lower is better}
    metadata: {owner: tracing-team}
  - name: Flaky
    command: ["./flaky.sh"]
  - name: Slow
    command: ["./slow.sh"]
"#,
    );
    write(
        &temp.path().join("defaults.yaml"),
        "config:\n  runs: 1\nsearch_paths: [bench]\n",
    );
    temp
}

#[test]
fn test_suite_with_failures_and_unresolved_entry() {
    let temp = workspace();
    let root = temp.path();
    write(
        &root.join("suite.yaml"),
        r#"
benchmarks:
  - name: DoesNotExist
  - name: Steady
    config: {runs: 3}
  - name: lifecycle.Flaky
    config: {runs: 6}
"#,
    );

    let defaults = ConfigLoader::load_defaults_file(root.join("defaults.yaml")).unwrap();
    let suite = ConfigLoader::load_suite_file(root.join("suite.yaml")).unwrap();
    let paths = search_order(&[], &suite.search_paths, &defaults.search_paths, root);

    let orchestrator = Orchestrator::new(BenchmarkRegistry::new_shared())
        .suite_name("lifecycle")
        .system_info(false);
    let report = orchestrator
        .run_suite(&suite, &defaults.config, &paths)
        .unwrap();

    assert_eq!(report.resolution_failures.len(), 1);
    assert_eq!(report.resolution_failures[0].name, "DoesNotExist");
    assert_eq!(report.results.len(), 2);

    let steady = &report.results[0];
    assert_eq!(steady.name, "lifecycle.Steady");
    assert_eq!(steady.aggregate.successes, 3);
    assert_eq!(steady.aggregate.metric_statistics["load_time"].mean, 0.5);
    assert_eq!(
        steady.metadata.get("owner"),
        Some(&Value::from("tracing-team"))
    );

    let flaky = &report.results[1];
    assert_eq!(flaky.aggregate.count(), 6);
    let failed: Vec<u32> = flaky
        .aggregate
        .records
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.repetition + 1)
        .collect();
    assert_eq!(failed, vec![2, 5]);
    assert!(flaky.aggregate.records[1].error().unwrap().contains("flaked"));
    assert_eq!(flaky.aggregate.statistics.as_ref().unwrap().mean, 7.0);

    let reporter = JsonReporter::for_path(root.join("out/")).unwrap();
    let saved = reporter.save(&report).unwrap().unwrap();
    let loaded = JsonReporter::load(saved).unwrap();
    assert_eq!(loaded.results, report.results);
}

#[test]
fn test_timeout_fails_repetition() {
    let temp = workspace();
    let root = temp.path();
    let suite = ConfigLoader::load_suite_str(
        "benchmarks:\n  - name: Slow\n    config: {runs: 1, timeout_ms: 200}\n",
    )
    .unwrap();
    let defaults = ConfigLoader::load_defaults_file(root.join("defaults.yaml")).unwrap();
    let paths = search_order(&[], &[], &defaults.search_paths, root);

    let report = Orchestrator::new(BenchmarkRegistry::new_shared())
        .system_info(false)
        .run_suite(&suite, &defaults.config, &paths)
        .unwrap();

    let slow = &report.results[0];
    assert_eq!(slow.aggregate.failures, 1);
    assert!(slow.aggregate.records[0].error().unwrap().contains("timeout"));
}
