/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::report
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Render the outcome of an update check as a JSON status
    report for operators and external tooling.

  Security / Safety Notes:
    Report data is written to operator-controlled paths; no
    privileged operations are performed.

  Dependencies:
    serde for JSON serialization, chrono for timestamps.

  Operational Scope:
    Written by `tempyr check` unless running dry.

  Revision History:
    2026-10-19 COD  Adapted report builder.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic ordering for reproducible reports
    - Explicit status attribution for each package
============================================================*/

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Result, TempyrError};
use crate::reconcile::{PackageEntry, UpdateStatus};

/// Wrapper representing the full report document.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub metadata: ReportMetadata,
    pub packages: BTreeMap<String, ReportEntry>,
}

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub generated_by: String,
    pub install_root: String,
    pub total_packages: usize,
    pub updates_available: usize,
    pub up_to_date: usize,
    pub no_source: usize,
    pub errors: usize,
    pub unchecked: usize,
}

/// Per-package report entry, keyed by file name.
#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub installed_version: String,
    pub latest_version: Option<String>,
    pub status: UpdateStatus,
    pub catalog_slug: Option<String>,
    pub catalog_slug_is_guessed: bool,
    pub latest_file: Option<String>,
    pub download_url: Option<String>,
}

/// Snapshot the current state of `entries`.
pub fn build_report(install_root: &Path, entries: &[PackageEntry]) -> StatusReport {
    let mut packages = BTreeMap::new();
    let mut metadata = ReportMetadata {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        generated_by: "tempyr_core".to_string(),
        install_root: install_root.display().to_string(),
        total_packages: entries.len(),
        updates_available: 0,
        up_to_date: 0,
        no_source: 0,
        errors: 0,
        unchecked: 0,
    };

    for entry in entries {
        match entry.status() {
            UpdateStatus::UpdateAvailable => metadata.updates_available += 1,
            UpdateStatus::UpToDate => metadata.up_to_date += 1,
            UpdateStatus::NoSource => metadata.no_source += 1,
            UpdateStatus::Error => metadata.errors += 1,
            UpdateStatus::Unknown | UpdateStatus::Checking | UpdateStatus::Downloading => {
                metadata.unchecked += 1
            }
        }

        let identity = entry.identity();
        let latest = entry.latest_file();
        packages.insert(
            identity.id.clone(),
            ReportEntry {
                name: identity.name.clone(),
                installed_version: identity.version.clone(),
                latest_version: Some(entry.latest_version())
                    .filter(|version| !version.is_empty())
                    .map(str::to_string),
                status: entry.status(),
                catalog_slug: identity.catalog_slug.clone(),
                catalog_slug_is_guessed: identity.catalog_slug_is_guessed,
                latest_file: latest.map(|file| file.file_name.clone()),
                download_url: latest.and_then(|file| file.download_url.clone()),
            },
        );
    }

    StatusReport { metadata, packages }
}

/// Persist the report to the given path.
pub fn write_report(report: &StatusReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            TempyrError::Filesystem(format!(
                "Failed to create report directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    let file = File::create(path).map_err(|err| {
        TempyrError::Filesystem(format!(
            "Failed to create report file {}: {err}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(file, report).map_err(|err| {
        TempyrError::Serialization(format!("Failed to write report {}: {err}", path.display()))
    })?;
    Ok(())
}
