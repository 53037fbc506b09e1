// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Recursively defined configuration value.
//!
//! Configuration layers, parameter sets and measurement payloads all share
//! this tagged tree. Mappings are ordered by key so that serialized output
//! and merge results are deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// String-keyed mapping node.
pub type Mapping = BTreeMap<String, Value>;

/// A scalar, ordered sequence, or mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

impl Value {
    /// An empty mapping.
    pub fn empty_mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// Name of the variant, for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of integers and floats. Non-finite floats are not
    /// considered numeric measurements.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(x) if x.is_finite() => Some(*x),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }
}

/// Deep, right-biased overlay of `upper` onto `lower`.
///
/// Keys present in `upper` replace those in `lower`; when both sides hold a
/// mapping under the same key the two are merged recursively. Neither input
/// is modified.
pub fn overlay(lower: &Mapping, upper: &Mapping) -> Mapping {
    let mut merged = lower.clone();
    for (key, value) in upper {
        let next = match (merged.get(key), value) {
            (Some(Value::Mapping(below)), Value::Mapping(above)) => {
                Value::Mapping(overlay(below, above))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Self::Mapping(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Value)]) -> Mapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_overlay_replaces_scalars() {
        let lower = map(&[("runs", 1.into()), ("label", "base".into())]);
        let upper = map(&[("runs", 5.into())]);

        let merged = overlay(&lower, &upper);
        assert_eq!(merged["runs"], Value::Integer(5));
        assert_eq!(merged["label"], Value::from("base"));
    }

    #[test]
    fn test_overlay_merges_nested_mappings() {
        let lower = map(&[(
            "tracer",
            map(&[("buffer_kb", 64.into()), ("mode", "discard".into())]).into(),
        )]);
        let upper = map(&[("tracer", map(&[("buffer_kb", 256.into())]).into())]);

        let merged = overlay(&lower, &upper);
        let tracer = merged["tracer"].as_mapping().unwrap();
        assert_eq!(tracer["buffer_kb"], Value::Integer(256));
        assert_eq!(tracer["mode"], Value::from("discard"));
    }

    #[test]
    fn test_overlay_replaces_sequences_wholesale() {
        let lower = map(&[("cpus", vec![Value::from(0), Value::from(1)].into())]);
        let upper = map(&[("cpus", vec![Value::from(3)].into())]);

        let merged = overlay(&lower, &upper);
        assert_eq!(merged["cpus"], Value::Sequence(vec![Value::Integer(3)]));
    }

    #[test]
    fn test_overlay_mapping_over_scalar() {
        let lower = map(&[("tracer", "off".into())]);
        let upper = map(&[("tracer", map(&[("mode", "overwrite".into())]).into())]);

        let merged = overlay(&lower, &upper);
        assert!(merged["tracer"].is_mapping());
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(0.25).as_f64(), Some(0.25));
        assert_eq!(Value::Float(f64::NAN).as_f64(), None);
        assert_eq!(Value::from("3").as_f64(), None);
    }

    #[test]
    fn test_deserialize_yaml_tree() {
        let value: Value = serde_yaml::from_str(
            r#"
runs: 3
ratio: 0.5
enabled: true
name: sessiond
cpus: [0, 1]
nested:
  key: ~
"#,
        )
        .unwrap();

        let root = value.as_mapping().unwrap();
        assert_eq!(root["runs"], Value::Integer(3));
        assert_eq!(root["ratio"], Value::Float(0.5));
        assert_eq!(root["enabled"], Value::Bool(true));
        assert_eq!(root["name"], Value::from("sessiond"));
        assert_eq!(root["cpus"].kind(), "sequence");
        assert_eq!(root["nested"].as_mapping().unwrap()["key"], Value::Null);
    }

    #[test]
    fn test_json_round_trip_preserves_integers() {
        let value: Value = serde_json::from_str(r#"{"a": 1, "b": 1.5}"#).unwrap();
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"a":1,"b":1.5}"#);
    }
}
