// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Loadable benchmark units.
//!
//! A unit is a manifest file directly inside a search path directory. Its
//! file stem is the module name and it declares the benchmarks the module
//! exports, each implemented either by an external command or by a
//! statically registered builtin.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::benchmark::{BenchmarkInfo, MetricDescriptor};
use crate::error::UnitError;
use crate::value::Mapping;

/// Manifest extensions, in lookup precedence order.
pub const UNIT_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Raw manifest as parsed from disk (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    benchmarks: Vec<RawDeclaration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeclaration {
    name: String,
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    command: Option<Vec<String>>,
    #[serde(default)]
    builtin: Option<String>,
    #[serde(default)]
    setup: Option<Vec<String>>,
    #[serde(default)]
    teardown: Option<Vec<String>>,
    #[serde(default)]
    pre_run: Option<Vec<String>>,
    #[serde(default)]
    post_run: Option<Vec<String>>,
    #[serde(default)]
    metrics: BTreeMap<String, MetricDescriptor>,
    #[serde(default)]
    metadata: Mapping,
}

/// A program and its arguments, as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    fn from_raw(raw: Vec<String>, field: &str) -> Result<Self, String> {
        let mut parts = raw.into_iter();
        match parts.next() {
            Some(program) if !program.trim().is_empty() => Ok(Self {
                program,
                args: parts.collect(),
            }),
            _ => Err(format!("'{}' must name a program", field)),
        }
    }
}

/// Commands backing an external-command benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHooks {
    pub execute: CommandLine,
    pub setup: Option<CommandLine>,
    pub teardown: Option<CommandLine>,
    pub pre_run: Option<CommandLine>,
    pub post_run: Option<CommandLine>,
}

/// How a declared benchmark is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Implementation {
    Command(CommandHooks),
    /// Key of a factory registered with the registry.
    Builtin(String),
}

/// One benchmark exported by a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub symbol: String,
    pub info: BenchmarkInfo,
    pub implementation: Implementation,
}

/// A parsed and validated unit manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    module: String,
    path: PathBuf,
    declarations: Vec<Declaration>,
}

impl Unit {
    /// Locate the manifest for `module` directly inside `dir`.
    pub fn find(dir: &Path, module: &str) -> Option<PathBuf> {
        UNIT_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", module, ext)))
            .find(|candidate| candidate.is_file())
    }

    /// List manifest files directly inside `dir`, sorted by file name.
    ///
    /// A missing directory holds no units.
    pub fn scan(dir: &Path) -> Result<Vec<PathBuf>, UnitError> {
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "Search path is not a directory, skipping");
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(dir).map_err(|e| UnitError::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut units = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| UnitError::Read {
                    path: dir.to_path_buf(),
                    source: e,
                })?
                .path();
            let is_manifest = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| UNIT_EXTENSIONS.contains(&e))
                .unwrap_or(false);
            if is_manifest && path.is_file() {
                units.push(path);
            }
        }
        units.sort();
        Ok(units)
    }

    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, UnitError> {
        let module = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| UnitError::Invalid {
                path: path.to_path_buf(),
                reason: "unit file name is not a valid module name".to_string(),
            })?
            .to_string();

        let content = std::fs::read_to_string(path).map_err(|e| UnitError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        let raw: RawManifest = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        }
        .map_err(|message| UnitError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        Self::validate(module, path, raw)
    }

    fn validate(module: String, path: &Path, raw: RawManifest) -> Result<Self, UnitError> {
        let invalid = |reason: String| UnitError::Invalid {
            path: path.to_path_buf(),
            reason,
        };

        let mut seen = HashSet::new();
        let mut declarations = Vec::with_capacity(raw.benchmarks.len());

        for decl in raw.benchmarks {
            let symbol_ok = !decl.name.is_empty()
                && decl
                    .name
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
            if !symbol_ok {
                return Err(invalid(format!("invalid benchmark name '{}'", decl.name)));
            }
            if !seen.insert(decl.name.clone()) {
                return Err(invalid(format!("duplicate benchmark name '{}'", decl.name)));
            }

            let implementation = match (decl.command, decl.builtin) {
                (Some(command), None) => {
                    let hook = |raw: Option<Vec<String>>, field: &str| {
                        raw.map(|r| CommandLine::from_raw(r, field)).transpose()
                    };
                    Implementation::Command(CommandHooks {
                        execute: CommandLine::from_raw(command, "command").map_err(&invalid)?,
                        setup: hook(decl.setup, "setup").map_err(&invalid)?,
                        teardown: hook(decl.teardown, "teardown").map_err(&invalid)?,
                        pre_run: hook(decl.pre_run, "pre_run").map_err(&invalid)?,
                        post_run: hook(decl.post_run, "post_run").map_err(&invalid)?,
                    })
                }
                (None, Some(key)) => {
                    let has_hooks = decl.setup.is_some()
                        || decl.teardown.is_some()
                        || decl.pre_run.is_some()
                        || decl.post_run.is_some();
                    if has_hooks {
                        return Err(invalid(format!(
                            "'{}': lifecycle hook commands require a 'command' benchmark",
                            decl.name
                        )));
                    }
                    Implementation::Builtin(key)
                }
                _ => {
                    return Err(invalid(format!(
                        "'{}' must declare exactly one of 'command' or 'builtin'",
                        decl.name
                    )))
                }
            };

            declarations.push(Declaration {
                symbol: decl.name,
                info: BenchmarkInfo {
                    version: decl.version,
                    metrics: decl.metrics,
                    metadata: decl.metadata,
                },
                implementation,
            });
        }

        Ok(Self {
            module,
            path: path.to_path_buf(),
            declarations,
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest; commands run from here.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declaration(&self, symbol: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.symbol == symbol)
    }
}
