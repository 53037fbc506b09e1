// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use benchrig_core::{search_order, BenchmarkRegistry, ConfigLoader, Defaults, SearchPath, Suite};
use benchrig_runner::{Orchestrator, DEFAULT_SUITE_NAME};

pub mod list;
pub mod run;
pub mod validate;

/// Global flags shared by every command.
pub struct Invocation<'a> {
    pub config: Option<&'a Path>,
    pub benchmarks: Option<&'a Path>,
    pub search_paths: &'a [PathBuf],
}

/// Defaults, suite and search order loaded for one invocation.
pub struct Loaded {
    pub defaults: Defaults,
    pub suite: Suite,
    pub search_paths: Vec<SearchPath>,
    pub suite_name: String,
}

impl Invocation<'_> {
    /// Load the defaults and suite files and assemble the search order.
    pub fn load(&self) -> anyhow::Result<Loaded> {
        let defaults = match self.config {
            Some(path) => ConfigLoader::load_defaults_file(path)
                .with_context(|| format!("loading defaults from {}", path.display()))?,
            None => Defaults::default(),
        };

        let suite = match self.benchmarks {
            Some(path) => ConfigLoader::load_suite_file(path)
                .with_context(|| format!("loading suite from {}", path.display()))?,
            None => Suite::default(),
        };

        let working_dir = std::env::current_dir().context("reading working directory")?;
        let search_paths = search_order(
            self.search_paths,
            &suite.search_paths,
            &defaults.search_paths,
            &working_dir,
        );
        tracing::debug!(search_paths = ?search_paths, "Effective search order");

        let suite_name = self
            .benchmarks
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or(DEFAULT_SUITE_NAME)
            .to_string();

        Ok(Loaded {
            defaults,
            suite,
            search_paths,
            suite_name,
        })
    }
}

impl Loaded {
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(Arc::new(BenchmarkRegistry::new())).suite_name(self.suite_name.clone())
    }
}
