// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Reduction of run records into summary statistics.

use std::collections::BTreeMap;

use benchrig_core::{BenchmarkInfo, Value};

use crate::metrics::{AggregateResult, RunRecord, SummaryStatistics};

/// Reduces the repetitions of one (benchmark, binding) pair.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Reduce `records` into counts and statistics.
    ///
    /// Total over any input. Statistics only cover successful repetitions
    /// with numeric payloads and are omitted when there are none.
    pub fn reduce(records: &[RunRecord]) -> AggregateResult {
        let mut scalars = Vec::new();
        let mut fields: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut elapsed = Vec::new();

        for measurement in records.iter().filter_map(RunRecord::measurement) {
            match measurement {
                Value::Mapping(map) => {
                    for (key, value) in map {
                        if let Some(x) = value.as_f64() {
                            fields.entry(key.clone()).or_default().push(x);
                        }
                    }
                }
                other => {
                    if let Some(x) = other.as_f64() {
                        scalars.push(x);
                    }
                }
            }
        }

        for record in records.iter().filter(|r| r.is_success()) {
            elapsed.push(record.elapsed_ns as f64);
        }

        let successes = elapsed.len();
        AggregateResult {
            successes,
            failures: records.len() - successes,
            statistics: SummaryStatistics::from_samples(&scalars),
            metric_statistics: fields
                .into_iter()
                .filter_map(|(key, samples)| {
                    SummaryStatistics::from_samples(&samples).map(|stats| (key, stats))
                })
                .collect(),
            elapsed: SummaryStatistics::from_samples(&elapsed),
            records: records.to_vec(),
        }
    }

    /// Keys of mapping payloads that `info` has no metric descriptor for.
    pub fn undescribed_metrics(aggregate: &AggregateResult, info: &BenchmarkInfo) -> Vec<String> {
        let mut keys: Vec<String> = aggregate
            .records
            .iter()
            .filter_map(RunRecord::measurement)
            .filter_map(Value::as_mapping)
            .flat_map(|map| map.keys())
            .filter(|key| !info.metrics.contains_key(*key))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchrig_core::MetricDescriptor;
    use chrono::Utc;

    fn ok(repetition: u32, measurement: Value) -> RunRecord {
        RunRecord::success(repetition, Utc::now(), 1_000 * (repetition as u64 + 1), measurement)
    }

    fn failed(repetition: u32) -> RunRecord {
        RunRecord::failure(repetition, Utc::now(), 0, "boom")
    }

    fn mapping(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_reduce_empty() {
        let aggregate = ResultAggregator::reduce(&[]);
        assert_eq!(aggregate.count(), 0);
        assert_eq!(aggregate.successes, 0);
        assert_eq!(aggregate.failures, 0);
        assert!(aggregate.statistics.is_none());
        assert!(aggregate.elapsed.is_none());
        assert!(aggregate.metric_statistics.is_empty());

        let json = serde_json::to_value(&aggregate).unwrap();
        assert!(json.get("statistics").is_none());
    }

    #[test]
    fn test_reduce_numeric_with_failures() {
        let records = vec![
            ok(0, Value::from(2.0)),
            failed(1),
            ok(2, Value::from(4)),
            ok(3, Value::from("not a number")),
        ];
        let aggregate = ResultAggregator::reduce(&records);

        assert_eq!(aggregate.count(), 4);
        assert_eq!(aggregate.successes, 3);
        assert_eq!(aggregate.failures, 1);

        let stats = aggregate.statistics.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(aggregate.elapsed.unwrap().count, 3);
    }

    #[test]
    fn test_reduce_non_numeric_only() {
        let records = vec![ok(0, Value::from("a")), ok(1, Value::Null)];
        let aggregate = ResultAggregator::reduce(&records);

        assert_eq!(aggregate.successes, 2);
        assert!(aggregate.statistics.is_none());
        assert_eq!(aggregate.records, records);
    }

    #[test]
    fn test_reduce_mapping_payloads() {
        let records = vec![
            ok(0, mapping("{load_time: 1.0, sessions: 10, label: x}")),
            ok(1, mapping("{load_time: 3.0, sessions: 10}")),
        ];
        let aggregate = ResultAggregator::reduce(&records);

        assert!(aggregate.statistics.is_none());
        assert_eq!(aggregate.metric_statistics.len(), 2);
        assert_eq!(aggregate.metric_statistics["load_time"].mean, 2.0);
        assert_eq!(aggregate.metric_statistics["sessions"].std_dev, 0.0);
    }

    #[test]
    fn test_undescribed_metrics() {
        let records = vec![
            ok(0, mapping("{load_time: 1.0, extra: 2}")),
            ok(1, mapping("{load_time: 2.0, extra: 3}")),
        ];
        let aggregate = ResultAggregator::reduce(&records);

        let mut info = BenchmarkInfo::default();
        info.metrics
            .insert("load_time".to_string(), MetricDescriptor::default());

        assert_eq!(
            ResultAggregator::undescribed_metrics(&aggregate, &info),
            vec!["extra".to_string()]
        );
    }
}
