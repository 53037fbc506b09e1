// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Layered configuration.
//!
//! A configuration is a string-keyed tree. Layers (built-in defaults, the
//! defaults file, the suite, one benchmark entry) are merged left to right
//! with [`ConfigResolver::merge`]; the result is validated into a
//! [`ResolvedConfig`] before anything executes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::RunCount;
use crate::value::{overlay, Mapping, Value};

/// Key holding the number of repetitions per parameter binding.
pub const RUNS_KEY: &str = "runs";
/// Key holding the optional per-repetition timeout in milliseconds.
pub const TIMEOUT_KEY: &str = "timeout_ms";

/// Repetitions performed when no layer overrides `runs`.
const DEFAULT_RUNS: i64 = 1;

/// An immutable configuration tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Mapping);

impl Config {
    pub fn new() -> Self {
        Self(Mapping::new())
    }

    /// The lowest layer of every resolution: carries the default `runs`.
    pub fn builtin_defaults() -> Self {
        let mut map = Mapping::new();
        map.insert(RUNS_KEY.to_string(), Value::Integer(DEFAULT_RUNS));
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a copy of this configuration with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// This configuration as a layer for [`ConfigResolver::merge`].
    pub fn to_layer(&self) -> Value {
        Value::Mapping(self.0.clone())
    }
}

impl From<Mapping> for Config {
    fn from(map: Mapping) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Config {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Mapping(map) => Ok(Self(map)),
            other => Err(ConfigError::InvalidLayerShape {
                index: 0,
                found: other.kind(),
            }),
        }
    }
}

/// Pure merge of configuration layers.
pub struct ConfigResolver;

impl ConfigResolver {
    /// Merge `layers` left to right; later layers win.
    ///
    /// Every layer must be a mapping at the top level, `null` included.
    /// Absent overrides are represented as empty mappings.
    pub fn merge(layers: &[Value]) -> Result<Config, ConfigError> {
        let mut merged = Mapping::new();
        for (index, layer) in layers.iter().enumerate() {
            match layer {
                Value::Mapping(map) => merged = overlay(&merged, map),
                other => {
                    return Err(ConfigError::InvalidLayerShape {
                        index,
                        found: other.kind(),
                    })
                }
            }
        }
        Ok(Config(merged))
    }

    /// Overlay already-validated configurations.
    pub fn merge_configs<'a>(layers: impl IntoIterator<Item = &'a Config>) -> Config {
        let merged = layers
            .into_iter()
            .fold(Mapping::new(), |acc, layer| overlay(&acc, &layer.0));
        Config(merged)
    }
}

/// A merged configuration whose recognized keys have been validated.
///
/// Holding a `ResolvedConfig` guarantees a concrete repetition count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    #[serde(flatten)]
    tree: Config,
    #[serde(skip)]
    runs: RunCount,
    #[serde(skip)]
    timeout: Option<Duration>,
}

impl ResolvedConfig {
    /// Validate a merged configuration.
    pub fn new(tree: Config) -> Result<Self, ConfigError> {
        let runs = match tree.get(RUNS_KEY) {
            None | Some(Value::Null) => {
                return Err(ConfigError::MissingRequiredField {
                    field: RUNS_KEY,
                    context: "resolved configuration".to_string(),
                })
            }
            Some(value) => Self::positive_integer(RUNS_KEY, value)
                .and_then(|n| {
                    u32::try_from(n).map_err(|_| ConfigError::InvalidFieldValue {
                        field: RUNS_KEY,
                        value: n.to_string(),
                        reason: "Repetition count is too large".to_string(),
                    })
                })
                .and_then(RunCount::new)?,
        };

        let timeout = match tree.get(TIMEOUT_KEY) {
            None | Some(Value::Null) => None,
            Some(value) => Some(Duration::from_millis(Self::positive_integer(
                TIMEOUT_KEY,
                value,
            )?)),
        };

        Ok(Self {
            tree,
            runs,
            timeout,
        })
    }

    fn positive_integer(field: &'static str, value: &Value) -> Result<u64, ConfigError> {
        match value.as_i64() {
            Some(n) if n >= 1 => Ok(n as u64),
            _ => Err(ConfigError::InvalidFieldValue {
                field,
                value: value.to_string(),
                reason: "Must be a positive integer".to_string(),
            }),
        }
    }

    /// Number of repetitions per binding.
    pub fn runs(&self) -> RunCount {
        self.runs
    }

    /// Optional per-repetition timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.tree.get(key)
    }

    /// The full merged tree, including keys this crate does not interpret.
    pub fn tree(&self) -> &Config {
        &self.tree
    }
}
