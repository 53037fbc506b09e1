// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Defaults and suite file loading with strict validation.
//!
//! Both files are accepted as JSON or YAML. Raw documents are deserialized
//! first and then validated into typed structures; any invalid field is a
//! fatal [`ConfigError`] raised before anything executes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{Config, ConfigResolver};
use crate::error::{BenchError, BenchResult, ConfigError};
use crate::types::{BenchmarkName, SearchPath};
use crate::value::Value;

/// Search path used when neither the command line nor any file names one.
pub const DEFAULT_SEARCH_PATH: &str = "benchmarks";

/// Raw defaults file (before validation).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefaults {
    #[serde(default = "Value::empty_mapping")]
    config: Value,
    #[serde(default)]
    search_paths: Vec<String>,
}

/// Raw suite file (before validation).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSuite {
    #[serde(default = "Value::empty_mapping")]
    config: Value,
    #[serde(default)]
    search_paths: Vec<String>,
    #[serde(default)]
    benchmarks: Option<Vec<RawBenchmarkEntry>>,
}

/// Raw benchmark entry inside a suite file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBenchmarkEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "Value::empty_mapping")]
    config: Value,
    #[serde(default, alias = "parameters")]
    params: Vec<Value>,
}

/// One benchmark entry of a suite.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSpec {
    pub name: BenchmarkName,
    /// Per-benchmark override layer (empty when absent).
    pub config: Value,
    /// Declared parameter sets, validated by the expander.
    pub params: Vec<Value>,
}

impl BenchmarkSpec {
    /// An entry with no override and no parameter sets.
    pub fn named(name: BenchmarkName) -> Self {
        Self {
            name,
            config: Value::empty_mapping(),
            params: Vec::new(),
        }
    }
}

/// Validated defaults file.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    /// Built-in defaults overlaid with the file's `config` mapping.
    pub config: Config,
    pub search_paths: Vec<SearchPath>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            config: Config::builtin_defaults(),
            search_paths: Vec::new(),
        }
    }
}

/// Validated suite file.
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    /// Suite-level override layer (empty when absent).
    pub config: Value,
    pub search_paths: Vec<SearchPath>,
    /// `None` when the suite does not list benchmarks: run everything
    /// discovered on the search paths.
    pub benchmarks: Option<Vec<BenchmarkSpec>>,
}

impl Default for Suite {
    fn default() -> Self {
        Self {
            config: Value::empty_mapping(),
            search_paths: Vec::new(),
            benchmarks: None,
        }
    }
}

/// Loader for defaults and suite documents.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a defaults file.
    pub fn load_defaults_file(path: impl AsRef<Path>) -> BenchResult<Defaults> {
        let path = path.as_ref();
        let content = Self::read(path)?;
        let raw: RawDefaults = Self::parse_document(path, &content)?;
        Ok(Self::validate_defaults(raw)?)
    }

    /// Load and validate defaults from a JSON or YAML string.
    pub fn load_defaults_str(content: &str) -> BenchResult<Defaults> {
        let raw: RawDefaults = Self::parse_document(Path::new("<inline>"), content)?;
        Ok(Self::validate_defaults(raw)?)
    }

    /// Load and validate a suite file.
    pub fn load_suite_file(path: impl AsRef<Path>) -> BenchResult<Suite> {
        let path = path.as_ref();
        let content = Self::read(path)?;
        let raw: RawSuite = Self::parse_document(path, &content)?;
        Ok(Self::validate_suite(raw)?)
    }

    /// Load and validate a suite from a JSON or YAML string.
    pub fn load_suite_str(content: &str) -> BenchResult<Suite> {
        let raw: RawSuite = Self::parse_document(Path::new("<inline>"), content)?;
        Ok(Self::validate_suite(raw)?)
    }

    fn read(path: &Path) -> BenchResult<String> {
        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading configuration file",
            source: e,
        })
    }

    /// Parse as JSON first, then fall back to YAML.
    fn parse_document<T: DeserializeOwned>(path: &Path, content: &str) -> BenchResult<T> {
        match serde_json::from_str(content) {
            Ok(parsed) => Ok(parsed),
            Err(json_err) => {
                tracing::debug!(path = %path.display(), error = %json_err, "Not JSON, trying YAML");
                // An empty YAML document is an empty mapping, not an error.
                let content = if content.trim().is_empty() { "{}" } else { content };
                serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                    path: path.to_path_buf(),
                    message: format!("YAML parse error: {}", e),
                })
            }
        }
    }

    fn validate_defaults(raw: RawDefaults) -> Result<Defaults, ConfigError> {
        let config =
            ConfigResolver::merge(&[Config::builtin_defaults().to_layer(), raw.config])?;

        Ok(Defaults {
            config,
            search_paths: Self::validate_search_paths(raw.search_paths)?,
        })
    }

    fn validate_suite(raw: RawSuite) -> Result<Suite, ConfigError> {
        Self::check_layer(&raw.config, "suite")?;

        let benchmarks = match raw.benchmarks {
            None => None,
            Some(entries) => Some(
                entries
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| Self::validate_entry(entry, index))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Ok(Suite {
            config: raw.config,
            search_paths: Self::validate_search_paths(raw.search_paths)?,
            benchmarks,
        })
    }

    fn validate_entry(raw: RawBenchmarkEntry, index: usize) -> Result<BenchmarkSpec, ConfigError> {
        let context = format!("benchmark entry at index {}", index);

        let name = raw.name.ok_or_else(|| ConfigError::MissingRequiredField {
            field: "name",
            context: context.clone(),
        })?;
        let name = BenchmarkName::new(name)?;

        Self::check_layer(&raw.config, &context)?;

        Ok(BenchmarkSpec {
            name,
            config: raw.config,
            params: raw.params,
        })
    }

    /// Override layers must be mappings; an omitted key is an empty one.
    fn check_layer(layer: &Value, context: &str) -> Result<(), ConfigError> {
        match layer {
            Value::Mapping(_) => Ok(()),
            other => Err(ConfigError::InvalidFieldValue {
                field: "config",
                value: other.to_string(),
                reason: format!("expected a mapping in {}, found a {}", context, other.kind()),
            }),
        }
    }

    fn validate_search_paths(raw: Vec<String>) -> Result<Vec<SearchPath>, ConfigError> {
        raw.into_iter()
            .map(|entry| {
                if entry.trim().is_empty() {
                    Err(ConfigError::InvalidFieldValue {
                        field: "search_paths",
                        value: format!("{:?}", entry),
                        reason: "Search path entries cannot be empty".to_string(),
                    })
                } else {
                    Ok(SearchPath::new(entry))
                }
            })
            .collect()
    }
}

/// Assemble the effective search order.
///
/// Command-line paths come first, then the suite's, then the defaults'.
/// Relative entries are anchored to `working_dir` and duplicates after
/// anchoring are dropped. Falls back to [`DEFAULT_SEARCH_PATH`] when every
/// source is empty.
pub fn search_order(
    cli: &[PathBuf],
    suite: &[SearchPath],
    defaults: &[SearchPath],
    working_dir: &Path,
) -> Vec<SearchPath> {
    let mut seen = HashSet::new();
    let mut ordered: Vec<SearchPath> = cli
        .iter()
        .cloned()
        .map(SearchPath::from)
        .chain(suite.iter().cloned())
        .chain(defaults.iter().cloned())
        .map(|path| path.resolve(working_dir))
        .filter(|path| seen.insert(path.clone()))
        .collect();

    if ordered.is_empty() {
        ordered.push(SearchPath::from(DEFAULT_SEARCH_PATH).resolve(working_dir));
    }
    ordered
}
