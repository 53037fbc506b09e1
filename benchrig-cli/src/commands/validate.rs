// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `benchrig validate` command - Validate defaults and suite files.
//!
//! Loads both files, merges and expands every entry, and resolves each
//! benchmark. Nothing is executed.

use std::process::ExitCode;

use super::Invocation;

pub fn execute(invocation: &Invocation<'_>) -> anyhow::Result<ExitCode> {
    let loaded = match invocation.load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let orchestrator = loaded.orchestrator();
    let plan = match orchestrator.plan(&loaded.suite, &loaded.defaults.config, &loaded.search_paths)
    {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("✗ Suite validation failed:");
            eprintln!("  {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("✓ Configuration is valid");
    println!();
    println!("Search paths ({}):", loaded.search_paths.len());
    for path in &loaded.search_paths {
        println!("  - {}", path);
    }
    println!();
    println!("Benchmarks ({}):", plan.len());

    let mut unresolved = 0;
    for planned in &plan {
        match orchestrator
            .registry()
            .resolve(&planned.name, &loaded.search_paths)
        {
            Ok(instance) => println!(
                "  ✓ {} -> {} (runs: {}, parameter sets: {})",
                planned.name,
                instance.name(),
                planned.config.runs(),
                planned.bindings.len()
            ),
            Err(e) => {
                unresolved += 1;
                println!("  ✗ {}: {}", planned.name, e);
            }
        }
    }

    if unresolved > 0 {
        eprintln!();
        eprintln!("✗ {} benchmark(s) could not be resolved", unresolved);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
