// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Parameter set expansion.
//!
//! Each declared parameter set becomes exactly one binding, in declaration
//! order. Sets are never combined with each other.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::suite::BenchmarkSpec;
use crate::value::{Mapping, Value};

/// One concrete, flat set of parameter values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterBinding(Mapping);

impl ParameterBinding {
    /// The binding used when a benchmark declares no parameter sets.
    pub fn empty() -> Self {
        Self(Mapping::new())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }
}

impl fmt::Display for ParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(no parameters)");
        }
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

impl TryFrom<Mapping> for ParameterBinding {
    type Error = String;

    fn try_from(map: Mapping) -> Result<Self, Self::Error> {
        if let Some((key, _)) = map.iter().find(|(_, v)| v.is_mapping()) {
            return Err(format!("parameter '{}' holds a nested mapping", key));
        }
        Ok(Self(map))
    }
}

/// Turns a benchmark entry's declared parameter sets into bindings.
pub struct ParameterMatrixExpander;

impl ParameterMatrixExpander {
    /// Expand the parameter sets of `spec`.
    ///
    /// Returns a single empty binding when no sets are declared so that
    /// every benchmark runs at least once.
    pub fn expand(spec: &BenchmarkSpec) -> Result<Vec<ParameterBinding>, ConfigError> {
        if spec.params.is_empty() {
            return Ok(vec![ParameterBinding::empty()]);
        }

        spec.params
            .iter()
            .enumerate()
            .map(|(index, set)| {
                let shape_error = |reason: String| ConfigError::InvalidParameterSetShape {
                    benchmark: spec.name.to_string(),
                    index,
                    reason,
                };
                match set {
                    Value::Mapping(map) => {
                        ParameterBinding::try_from(map.clone()).map_err(shape_error)
                    }
                    other => Err(shape_error(format!(
                        "expected a mapping, found a {}",
                        other.kind()
                    ))),
                }
            })
            .collect()
    }
}
