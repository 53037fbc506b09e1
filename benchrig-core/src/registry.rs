// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark registry and resolution.
//!
//! The registry is the only place that loads units from search paths. It
//! maps a bare or qualified benchmark name to a constructed
//! [`BenchmarkInstance`], consulting search paths strictly in order, and
//! holds the table of statically registered builtin factories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::benchmark::{Benchmark, BenchmarkFactory, BenchmarkInfo, BenchmarkInstance};
use crate::command::CommandBenchmark;
use crate::error::{BenchError, BenchResult, BenchmarkError, ResolutionError};
use crate::types::{BenchmarkName, SearchPath};
use crate::unit::{Declaration, Implementation, Unit};

/// A benchmark found while scanning search paths.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredBenchmark {
    pub name: BenchmarkName,
    pub search_path: PathBuf,
    pub unit: PathBuf,
    pub info: BenchmarkInfo,
}

/// Registry resolving benchmark names to runnable instances.
pub struct BenchmarkRegistry {
    /// Builtin key to factory.
    builtins: DashMap<String, BenchmarkFactory>,
}

impl BenchmarkRegistry {
    /// Create a registry with no builtins.
    pub fn new() -> Self {
        Self {
            builtins: DashMap::new(),
        }
    }

    /// Create a registry wrapped in an Arc for sharing across threads.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register an in-process benchmark factory under `key`.
    ///
    /// Unit manifests refer to it with `builtin: <key>`.
    pub fn register_builtin<F>(&self, key: impl Into<String>, factory: F) -> BenchResult<()>
    where
        F: Fn() -> Result<Box<dyn Benchmark>, BenchmarkError> + Send + Sync + 'static,
    {
        let key = key.into();
        match self.builtins.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(BenchError::BuiltinAlreadyRegistered(entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::new(factory));
                Ok(())
            }
        }
    }

    /// Register a benchmark type constructed with [`Default`].
    pub fn register_default<B>(&self, key: impl Into<String>) -> BenchResult<()>
    where
        B: Benchmark + Default + 'static,
    {
        self.register_builtin(key, || Ok(Box::new(B::default()) as Box<dyn Benchmark>))
    }

    /// Check if a builtin key is registered.
    pub fn contains_builtin(&self, key: &str) -> bool {
        self.builtins.contains_key(key)
    }

    /// Number of registered builtins.
    pub fn builtin_count(&self) -> usize {
        self.builtins.len()
    }

    /// Resolve `name` against `search_paths`, in order.
    ///
    /// A qualified name only consults the unit named by its module. A bare
    /// name scans every unit of a search path and must match exactly one
    /// declaration there; the first search path with a match wins.
    pub fn resolve(
        &self,
        name: &BenchmarkName,
        search_paths: &[SearchPath],
    ) -> Result<BenchmarkInstance, ResolutionError> {
        for search_path in search_paths {
            let dir = search_path.as_path();
            let found = match name.module() {
                Some(module) => Self::find_qualified(dir, module, name.symbol()),
                None => Self::find_bare(dir, name)?,
            };

            if let Some((unit, declaration)) = found {
                tracing::debug!(
                    benchmark = %name,
                    unit = %unit.path().display(),
                    "Resolved benchmark"
                );
                return self.instantiate(&unit, &declaration);
            }
        }

        Err(ResolutionError::NotFound {
            name: name.to_string(),
            searched: search_paths.len(),
        })
    }

    /// List every benchmark reachable from `search_paths`.
    ///
    /// Ordered by search path, then unit file name, then declaration order.
    /// A qualified name already seen on an earlier path is skipped.
    pub fn discover(&self, search_paths: &[SearchPath]) -> Vec<DiscoveredBenchmark> {
        let mut seen = HashSet::new();
        let mut discovered = Vec::new();

        for search_path in search_paths {
            for unit in Self::load_units(search_path.as_path()) {
                for declaration in unit.declarations() {
                    let name = match BenchmarkName::qualified(unit.module(), &declaration.symbol) {
                        Ok(name) => name,
                        Err(e) => {
                            tracing::warn!(
                                unit = %unit.path().display(),
                                error = %e,
                                "Skipping benchmark with invalid name"
                            );
                            continue;
                        }
                    };
                    if !seen.insert(name.clone()) {
                        tracing::debug!(benchmark = %name, "Shadowed by an earlier search path");
                        continue;
                    }
                    tracing::info!(
                        benchmark = %name,
                        unit = %unit.path().display(),
                        "Found benchmark"
                    );
                    discovered.push(DiscoveredBenchmark {
                        name,
                        search_path: search_path.as_path().to_path_buf(),
                        unit: unit.path().to_path_buf(),
                        info: declaration.info.clone(),
                    });
                }
            }
        }

        discovered
    }

    fn find_qualified(dir: &Path, module: &str, symbol: &str) -> Option<(Unit, Declaration)> {
        let path = Unit::find(dir, module)?;
        match Unit::load(&path) {
            Ok(unit) => {
                let declaration = unit.declaration(symbol)?.clone();
                Some((unit, declaration))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load unit");
                None
            }
        }
    }

    fn find_bare(
        dir: &Path,
        name: &BenchmarkName,
    ) -> Result<Option<(Unit, Declaration)>, ResolutionError> {
        let mut matches: Vec<(Unit, Declaration)> = Self::load_units(dir)
            .into_iter()
            .filter_map(|unit| {
                let declaration = unit.declaration(name.symbol())?.clone();
                Some((unit, declaration))
            })
            .collect();

        if matches.len() > 1 {
            return Err(ResolutionError::Ambiguous {
                name: name.to_string(),
                search_path: dir.to_path_buf(),
                candidates: matches
                    .iter()
                    .map(|(unit, decl)| format!("{}.{}", unit.module(), decl.symbol))
                    .collect(),
            });
        }

        Ok(matches.pop())
    }

    /// Load every unit in `dir`, logging and skipping the broken ones.
    fn load_units(dir: &Path) -> Vec<Unit> {
        let paths = match Unit::scan(dir) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::error!(error = %e, "Failed to scan search path");
                return Vec::new();
            }
        };

        paths
            .iter()
            .filter_map(|path| match Unit::load(path) {
                Ok(unit) => Some(unit),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load unit");
                    None
                }
            })
            .collect()
    }

    fn instantiate(
        &self,
        unit: &Unit,
        declaration: &Declaration,
    ) -> Result<BenchmarkInstance, ResolutionError> {
        let qualified = format!("{}.{}", unit.module(), declaration.symbol);
        let construction_failed = |source: BenchmarkError| ResolutionError::ConstructionFailed {
            name: qualified.clone(),
            source,
        };

        let name = BenchmarkName::new(qualified.clone()).map_err(|e| {
            construction_failed(BenchmarkError::failed(e.to_string()))
        })?;

        let implementation: Box<dyn Benchmark> = match &declaration.implementation {
            Implementation::Command(hooks) => Box::new(
                CommandBenchmark::new(qualified.clone(), unit.dir(), hooks)
                    .map_err(construction_failed)?,
            ),
            Implementation::Builtin(key) => {
                // Clone the factory out so no map guard is held while it runs.
                let factory = self
                    .builtins
                    .get(key)
                    .map(|entry| Arc::clone(entry.value()))
                    .ok_or_else(|| {
                        construction_failed(BenchmarkError::UnknownBuiltin { key: key.clone() })
                    })?;
                factory().map_err(construction_failed)?
            }
        };

        Ok(BenchmarkInstance::new(
            name,
            unit.path(),
            declaration.info.clone(),
            implementation,
        ))
    }
}

impl Default for BenchmarkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
