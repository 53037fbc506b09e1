// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum accepted repetition count for a single binding.
const MAX_RUNS: u32 = 1_000_000;

/// Returns true for characters allowed in module and symbol identifiers.
fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Validated benchmark name, either bare (`SessionStart`) or qualified by
/// the module that exports it (`lifecycle.SessionStart`).
///
/// Module paths may themselves contain dots; the symbol is always the part
/// after the last dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BenchmarkName(String);

impl BenchmarkName {
    /// Create a new BenchmarkName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "name",
                value: name,
                reason: "Benchmark name cannot be empty".to_string(),
            });
        }

        for segment in name.split('.') {
            if segment.is_empty() || !segment.chars().all(is_identifier_char) {
                return Err(ConfigError::InvalidFieldValue {
                    field: "name",
                    value: name.clone(),
                    reason: "Expected `Name` or `module.Name` made of alphanumeric characters, hyphens and underscores".to_string(),
                });
            }
        }

        Ok(Self(name))
    }

    /// Build the qualified name for a symbol exported by a module.
    pub fn qualified(module: &str, symbol: &str) -> Result<Self, ConfigError> {
        Self::new(format!("{}.{}", module, symbol))
    }

    /// The module qualifier, if any.
    pub fn module(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(module, _)| module)
    }

    /// The exported symbol name.
    pub fn symbol(&self) -> &str {
        self.0
            .rsplit_once('.')
            .map(|(_, symbol)| symbol)
            .unwrap_or(&self.0)
    }

    pub fn is_qualified(&self) -> bool {
        self.module().is_some()
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BenchmarkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BenchmarkName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BenchmarkName> for String {
    fn from(name: BenchmarkName) -> Self {
        name.0
    }
}

/// Validated repetition count. Must be in range 1..=MAX_RUNS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RunCount(u32);

impl RunCount {
    /// Create a new RunCount with bounds validation.
    pub fn new(runs: u32) -> Result<Self, ConfigError> {
        if runs == 0 || runs > MAX_RUNS {
            return Err(ConfigError::InvalidFieldValue {
                field: "runs",
                value: runs.to_string(),
                reason: format!("Must be between 1 and {}", MAX_RUNS),
            });
        }
        Ok(Self(runs))
    }

    /// Get the inner value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RunCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for RunCount {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RunCount> for u32 {
    fn from(runs: RunCount) -> Self {
        runs.0
    }
}

/// A directory searched for loadable benchmark units.
///
/// Relative paths are kept as written until [`SearchPath::resolve`] anchors
/// them to the invocation working directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchPath(PathBuf);

impl SearchPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Anchor a relative path to `working_dir`. Absolute paths are returned
    /// unchanged.
    pub fn resolve(&self, working_dir: &Path) -> Self {
        if self.0.is_absolute() {
            self.clone()
        } else {
            Self(working_dir.join(&self.0))
        }
    }

    /// Get the inner path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for SearchPath {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for SearchPath {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_name_valid() {
        assert!(BenchmarkName::new("SessionStart").is_ok());
        assert!(BenchmarkName::new("lifecycle.SessionStart").is_ok());
        assert!(BenchmarkName::new("suite.lifecycle.first-command").is_ok());
    }

    #[test]
    fn test_benchmark_name_invalid() {
        assert!(BenchmarkName::new("").is_err());
        assert!(BenchmarkName::new(".Start").is_err());
        assert!(BenchmarkName::new("lifecycle.").is_err());
        assert!(BenchmarkName::new("a..b").is_err());
        assert!(BenchmarkName::new("session start").is_err());
    }

    #[test]
    fn test_benchmark_name_parts() {
        let bare = BenchmarkName::new("SessionStart").unwrap();
        assert_eq!(bare.module(), None);
        assert_eq!(bare.symbol(), "SessionStart");
        assert!(!bare.is_qualified());

        let qualified = BenchmarkName::new("suite.lifecycle.SessionStart").unwrap();
        assert_eq!(qualified.module(), Some("suite.lifecycle"));
        assert_eq!(qualified.symbol(), "SessionStart");
    }

    #[test]
    fn test_run_count_bounds() {
        assert!(RunCount::new(1).is_ok());
        assert!(RunCount::new(MAX_RUNS).is_ok());
        assert!(RunCount::new(0).is_err());
        assert!(RunCount::new(MAX_RUNS + 1).is_err());
    }

    #[test]
    fn test_search_path_resolve() {
        let cwd = Path::new("/work");
        assert_eq!(
            SearchPath::from("benchmarks").resolve(cwd).as_path(),
            Path::new("/work/benchmarks")
        );
        assert_eq!(
            SearchPath::from("/opt/benchmarks").resolve(cwd).as_path(),
            Path::new("/opt/benchmarks")
        );
    }
}
