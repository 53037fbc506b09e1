// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchrig CLI
//!
//! Command-line interface for the benchrig benchmark runner.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Invocation;

/// Benchrig - Black-box benchmark runner for instrumentation toolkits
#[derive(Parser)]
#[command(name = "benchrig")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Defaults file (JSON or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Suite file listing the benchmarks to run (JSON or YAML)
    #[arg(short, long, global = true)]
    pub benchmarks: Option<PathBuf>,

    /// Extra search path, consulted before the suite's and the defaults'
    #[arg(long = "search-path", global = true)]
    pub search_paths: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write the report to a file, or into a directory (bare invocation)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exit successfully even if benchmarks failed (bare invocation)
    #[arg(long)]
    pub allow_failures: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the suite and emit the JSON report (default)
    Run {
        /// Write the report to a file, or into a directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit successfully even if benchmarks failed
        #[arg(long)]
        allow_failures: bool,
    },

    /// List benchmarks discovered on the search paths
    List {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Load and plan the suite without running anything
    Validate,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over the flags
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let invocation = Invocation {
        config: cli.config.as_deref(),
        benchmarks: cli.benchmarks.as_deref(),
        search_paths: &cli.search_paths,
    };

    // Dispatch to command handlers
    match cli.command {
        None => commands::run::execute(&invocation, cli.output.as_deref(), cli.allow_failures),
        Some(Commands::Run {
            output,
            allow_failures,
        }) => commands::run::execute(
            &invocation,
            output.as_deref().or(cli.output.as_deref()),
            allow_failures || cli.allow_failures,
        ),
        Some(Commands::List { json }) => commands::list::execute(&invocation, json),
        Some(Commands::Validate) => commands::validate::execute(&invocation),
    }
}
