// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchrig Core Library
//!
//! Configuration layering, benchmark discovery and parameter expansion for
//! the benchrig black-box benchmark runner. Provides the benchmark
//! contract, unit manifests, the search-path registry and the typed
//! configuration model consumed by the runner.

pub mod benchmark;
pub mod command;
pub mod config;
pub mod error;
pub mod matrix;
pub mod registry;
pub mod suite;
pub mod types;
pub mod unit;
pub mod value;

// Re-export commonly used types
pub use benchmark::{
    Benchmark, BenchmarkFactory, BenchmarkInfo, BenchmarkInstance, Measurement, MetricDescriptor,
};
pub use command::CommandBenchmark;
pub use config::{Config, ConfigResolver, ResolvedConfig, RUNS_KEY, TIMEOUT_KEY};
pub use error::{
    BenchError, BenchResult, BenchmarkError, ConfigError, ResolutionError, UnitError,
};
pub use matrix::{ParameterBinding, ParameterMatrixExpander};
pub use registry::{BenchmarkRegistry, DiscoveredBenchmark};
pub use suite::{search_order, BenchmarkSpec, ConfigLoader, Defaults, Suite, DEFAULT_SEARCH_PATH};
pub use types::{BenchmarkName, RunCount, SearchPath};
pub use unit::Unit;
pub use value::{Mapping, Value};
