// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! JSON report generation for benchmark results.
//!
//! Writes a report to stdout, to a named file, or to a timestamped file
//! inside a directory, and loads saved reports back.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::metrics::Report;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where a report goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    Stdout,
    File(PathBuf),
    /// A fresh timestamped file is created inside the directory.
    Directory(PathBuf),
}

/// JSON reporter for benchmark results.
#[derive(Debug, Clone)]
pub struct JsonReporter {
    target: ReportTarget,
}

impl JsonReporter {
    /// Create a reporter that prints to stdout.
    pub fn stdout() -> Self {
        Self {
            target: ReportTarget::Stdout,
        }
    }

    /// Create a reporter for an output path.
    ///
    /// An existing directory, or a path ending in a separator, selects
    /// directory output. Anything else is a file path whose parent
    /// directories are created as needed.
    pub fn for_path(path: impl AsRef<Path>) -> Result<Self, ReporterError> {
        let path = path.as_ref();
        let is_dir_syntax = path
            .as_os_str()
            .to_str()
            .map(|s| s.ends_with(std::path::MAIN_SEPARATOR))
            .unwrap_or(false);

        let target = if path.is_dir() || is_dir_syntax {
            fs::create_dir_all(path)?;
            ReportTarget::Directory(path.to_path_buf())
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            ReportTarget::File(path.to_path_buf())
        };

        Ok(Self { target })
    }

    pub fn target(&self) -> &ReportTarget {
        &self.target
    }

    /// Write the report to the configured target.
    ///
    /// Returns the path of the created file, or `None` for stdout.
    pub fn save(&self, report: &Report) -> Result<Option<PathBuf>, ReporterError> {
        match &self.target {
            ReportTarget::Stdout => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                Self::write_to(&mut lock, report)?;
                Ok(None)
            }
            ReportTarget::File(path) => {
                Self::write_file(path, report)?;
                Ok(Some(path.clone()))
            }
            ReportTarget::Directory(dir) => {
                let path = dir.join(Self::file_name(report));
                Self::write_file(&path, report)?;
                Ok(Some(path))
            }
        }
    }

    /// Serialize `report` as pretty JSON followed by a newline.
    pub fn write_to<W: Write>(writer: &mut W, report: &Report) -> Result<(), ReporterError> {
        serde_json::to_writer_pretty(&mut *writer, report)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// File name used for directory output.
    pub fn file_name(report: &Report) -> String {
        let timestamp = report.timestamp.format("%Y-%m-%dT%H-%M-%SZ");
        let run_id = report.run_id.simple().to_string();
        format!("{}_{}_{}.json", report.benchmark_suite, timestamp, &run_id[..8])
    }

    fn write_file(path: &Path, report: &Report) -> Result<(), ReporterError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(&mut writer, report)?;
        tracing::info!(path = %path.display(), "Report saved");
        Ok(())
    }

    /// List all existing report files in a directory.
    pub fn list_reports(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ReporterError> {
        let mut reports = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                reports.push(path);
            }
        }
        reports.sort();
        Ok(reports)
    }

    /// Load an existing report from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Report, ReporterError> {
        let file = File::open(path)?;
        let report = serde_json::from_reader(io::BufReader::new(file))?;
        Ok(report)
    }
}
