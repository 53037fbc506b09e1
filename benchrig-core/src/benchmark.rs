// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! The pluggable benchmark capability.
//!
//! Everything outside the registry sees a benchmark only through the
//! [`Benchmark`] trait: execute one repetition for a parameter binding and
//! a resolved configuration, returning a measurement or failing.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ResolvedConfig;
use crate::error::BenchmarkError;
use crate::matrix::ParameterBinding;
use crate::types::BenchmarkName;
use crate::value::{Mapping, Value};

/// Opaque measurement payload returned by one repetition.
///
/// A number, a mapping of metric name to value, or anything else the
/// implementation chooses to report.
pub type Measurement = Value;

/// One repetition of a benchmark.
///
/// Only [`Benchmark::execute`] is required. The lifecycle hooks default to
/// no-ops: `setup`/`teardown` bracket each parameter binding and
/// `pre_run`/`post_run` bracket each repetition.
pub trait Benchmark: Send {
    /// Run one repetition and return its measurement.
    fn execute(
        &mut self,
        binding: &ParameterBinding,
        config: &ResolvedConfig,
    ) -> Result<Measurement, BenchmarkError>;

    fn setup(
        &mut self,
        _binding: &ParameterBinding,
        _config: &ResolvedConfig,
    ) -> Result<(), BenchmarkError> {
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), BenchmarkError> {
        Ok(())
    }

    fn pre_run(&mut self, _repetition: u32) -> Result<(), BenchmarkError> {
        Ok(())
    }

    fn post_run(&mut self, _repetition: u32) -> Result<(), BenchmarkError> {
        Ok(())
    }
}

/// Constructor for a statically registered benchmark.
pub type BenchmarkFactory =
    Arc<dyn Fn() -> Result<Box<dyn Benchmark>, BenchmarkError> + Send + Sync>;

/// Human-facing description of one reported metric.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// e.g. "lower is better"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Static facts about a benchmark, copied into every result it produces.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BenchmarkInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, MetricDescriptor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Mapping,
}

/// A resolved, constructed benchmark ready to execute.
///
/// Owned by whoever processes the benchmark entry and dropped afterwards.
pub struct BenchmarkInstance {
    name: BenchmarkName,
    origin: PathBuf,
    info: BenchmarkInfo,
    implementation: Box<dyn Benchmark>,
}

impl BenchmarkInstance {
    pub fn new(
        name: BenchmarkName,
        origin: impl Into<PathBuf>,
        info: BenchmarkInfo,
        implementation: Box<dyn Benchmark>,
    ) -> Self {
        Self {
            name,
            origin: origin.into(),
            info,
            implementation,
        }
    }

    /// Fully qualified `module.Symbol` name.
    pub fn name(&self) -> &BenchmarkName {
        &self.name
    }

    /// Unit file the benchmark was declared in.
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn info(&self) -> &BenchmarkInfo {
        &self.info
    }

    pub fn implementation(&mut self) -> &mut dyn Benchmark {
        self.implementation.as_mut()
    }
}

impl fmt::Debug for BenchmarkInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkInstance")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
