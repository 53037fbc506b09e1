// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for benchrig.
//!
//! Explicit enum error types, one per propagation granularity:
//! configuration errors abort the suite, resolution errors skip one
//! benchmark entry, benchmark errors fail one repetition.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the benchrig core.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast before any execution
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error in {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    // =========================================================================
    // Discovery Errors
    // =========================================================================
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),

    #[error("Builtin benchmark already registered: {0}")]
    BuiltinAlreadyRegistered(String),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Structural configuration errors. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid layer shape: layer {index} is a {found}, expected a mapping")]
    InvalidLayerShape { index: usize, found: &'static str },

    #[error("invalid parameter set shape: set {index} of '{benchmark}' - {reason}")]
    InvalidParameterSetShape {
        benchmark: String,
        index: usize,
        reason: String,
    },

    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure to turn a benchmark name into a runnable instance.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("not found: no search path provides benchmark '{name}' (searched {searched} paths)")]
    NotFound { name: String, searched: usize },

    #[error(
        "ambiguous: '{name}' matches {} benchmarks in {}: {}",
        .candidates.len(),
        .search_path.display(),
        .candidates.join(", ")
    )]
    Ambiguous {
        name: String,
        search_path: PathBuf,
        candidates: Vec<String>,
    },

    #[error("construction failed for '{name}': {source}")]
    ConstructionFailed {
        name: String,
        #[source]
        source: BenchmarkError,
    },
}

/// A loadable unit (manifest file) that could not be read or is malformed.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("failed to read unit {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse unit {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid unit {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Failure reported by a benchmark implementation for one repetition
/// (or one lifecycle hook).
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("{message}")]
    Failed { message: String },

    #[error("program not found: {program}")]
    ProgramNotFound { program: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("invalid measurement output: {message}")]
    InvalidOutput { message: String },

    #[error("repetition exceeded timeout of {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("no builtin benchmark registered under '{key}'")]
    UnknownBuiltin { key: String },
}

impl BenchmarkError {
    /// Free-form failure raised by an in-process benchmark.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;
