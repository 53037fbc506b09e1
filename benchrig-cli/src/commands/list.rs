// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `benchrig list` command - List benchmarks on the search paths.

use std::process::ExitCode;

use benchrig_core::BenchmarkRegistry;

use super::Invocation;

pub fn execute(invocation: &Invocation<'_>, json: bool) -> anyhow::Result<ExitCode> {
    let loaded = invocation.load()?;
    let discovered = BenchmarkRegistry::new().discover(&loaded.search_paths);

    if json {
        let entries: Vec<serde_json::Value> = discovered
            .iter()
            .map(|found| {
                serde_json::json!({
                    "name": found.name.as_str(),
                    "version": found.info.version,
                    "unit": found.unit.display().to_string(),
                    "search_path": found.search_path.display().to_string(),
                    "metrics": found.info.metrics,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(ExitCode::SUCCESS);
    }

    if discovered.is_empty() {
        println!("No benchmarks found. Searched:");
        for path in &loaded.search_paths {
            println!("  - {}", path);
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("{:<40} {:<8} Unit", "Benchmark", "Version");
    println!("{}", "-".repeat(80));
    for found in &discovered {
        let version = found
            .info
            .version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<40} {:<8} {}",
            found.name.as_str(),
            version,
            found.unit.display()
        );
    }
    println!();
    println!("Total: {} benchmark(s)", discovered.len());

    Ok(ExitCode::SUCCESS)
}
