/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::reconcile
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Track the per-package update state machine: compare local
    and remote version signals after a catalog lookup, and
    drive installation of retained update targets.

  Security / Safety Notes:
    Only catalog-provided download links are followed; each
    package's failure is isolated to its own entry.

  Dependencies:
    futures for fan-out/fan-in joins, tokio-util for
    cancellation.

  Operational Scope:
    Used by the library session for single and batch checks
    and updates.

  Revision History:
    2026-10-19 COD  Authored update reconciler.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Filenames, not manifest fields, carry version truth
    - Cancellation returns entries to a retryable state
    - Batch outcomes summarised for a single notification
============================================================*/

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogClient, RemoteLatestFile};
use crate::error::TempyrError;
use crate::filename::version_from_filename;
use crate::identity::{resolve_file, PackageIdentity};
use crate::install::Installer;
use crate::logger::Logger;

/// Update state of one installed package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateStatus {
    /// Not yet checked, or the last check was cancelled.
    Unknown,
    Checking,
    UpToDate,
    UpdateAvailable,
    Downloading,
    /// No catalog slug, or a guessed slug the catalog does not know.
    NoSource,
    Error,
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpdateStatus::Unknown => "Unknown",
            UpdateStatus::Checking => "Checking",
            UpdateStatus::UpToDate => "Up to date",
            UpdateStatus::UpdateAvailable => "Update available",
            UpdateStatus::Downloading => "Downloading",
            UpdateStatus::NoSource => "No source",
            UpdateStatus::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Notification emitted while entries change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryEvent<'a> {
    Status { id: &'a str, status: UpdateStatus },
    Progress { id: &'a str, fraction: f64 },
}

/// Subscriber for entry events supplied by the presentation layer.
pub type EventListener<'a> = dyn Fn(EntryEvent<'_>) + Send + Sync + 'a;

/// Last reported download fraction of an entry, readable while the entry
/// itself is borrowed by a running update.
#[derive(Debug, Clone, Default)]
pub struct ProgressMonitor(Arc<AtomicU64>);

impl ProgressMonitor {
    pub fn fraction(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, fraction: f64) {
        self.0.store(fraction.to_bits(), Ordering::Relaxed);
    }
}

/// Mutable view-state of one installed package.
#[derive(Debug, Clone)]
pub struct PackageEntry {
    identity: PackageIdentity,
    status: UpdateStatus,
    latest_file: Option<RemoteLatestFile>,
    latest_version: String,
    download_progress: ProgressMonitor,
}

impl PackageEntry {
    pub fn new(identity: PackageIdentity) -> Self {
        let status = if identity.has_catalog_slug() {
            UpdateStatus::Unknown
        } else {
            UpdateStatus::NoSource
        };
        Self {
            identity,
            status,
            latest_file: None,
            latest_version: String::new(),
            download_progress: ProgressMonitor::default(),
        }
    }

    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    pub fn status(&self) -> UpdateStatus {
        self.status
    }

    /// Update target retained by the last check that found a newer file.
    pub fn latest_file(&self) -> Option<&RemoteLatestFile> {
        self.latest_file.as_ref()
    }

    pub fn latest_version(&self) -> &str {
        &self.latest_version
    }

    /// Fraction of the running download; `0.0` when idle.
    pub fn download_progress(&self) -> f64 {
        self.download_progress.fraction()
    }

    /// Handle for polling progress from outside the update task.
    pub fn progress_monitor(&self) -> ProgressMonitor {
        self.download_progress.clone()
    }

    /// True when an update was found and can be fetched directly.
    pub fn is_installable(&self) -> bool {
        self.has_update()
            && self
                .latest_file
                .as_ref()
                .is_some_and(|file| file.download_url.is_some())
    }

    pub fn has_update(&self) -> bool {
        self.status == UpdateStatus::UpdateAvailable
    }

    fn set_status(&mut self, status: UpdateStatus, listener: Option<&EventListener<'_>>) {
        self.status = status;
        if let Some(listener) = listener {
            listener(EntryEvent::Status {
                id: &self.identity.id,
                status,
            });
        }
    }
}

/// Result of comparing a local package against the catalog's latest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub status: UpdateStatus,
    /// Version parsed from the remote filename, or its display name.
    pub latest_version: String,
    pub local_version: Option<String>,
}

/// Decide whether `remote` is the file already installed as `local_id`.
pub fn reconcile(local_id: &str, remote: &RemoteLatestFile) -> Reconciliation {
    let remote_version = version_from_filename(&remote.file_name);
    let local_version = version_from_filename(local_id);

    let filename_match = remote.file_name.to_lowercase() == local_id.to_lowercase();
    let version_match = match (&local_version, &remote_version) {
        (Some(local), Some(remote)) => normalize_version(local) == normalize_version(remote),
        _ => false,
    };

    Reconciliation {
        status: if filename_match || version_match {
            UpdateStatus::UpToDate
        } else {
            UpdateStatus::UpdateAvailable
        },
        latest_version: remote_version.unwrap_or_else(|| remote.display_name.clone()),
        local_version,
    }
}

fn normalize_version(version: &str) -> String {
    version.trim_start_matches(['v', 'V']).to_lowercase()
}

/// Status when the catalog cannot confirm a package. A declared slug that
/// yields nothing is a failure; a guessed one is merely unknown upstream.
pub fn unresolved_status(slug_is_guessed: bool) -> UpdateStatus {
    if slug_is_guessed {
        UpdateStatus::NoSource
    } else {
        UpdateStatus::Error
    }
}

/// Check one entry against the catalog.
///
/// Callers must not run two checks or updates on the same entry at once.
pub async fn check_entry(
    entry: &mut PackageEntry,
    catalog: &dyn CatalogClient,
    cancel: &CancellationToken,
    listener: Option<&EventListener<'_>>,
    logger: &Logger,
) -> UpdateStatus {
    let Some(slug) = entry.identity.catalog_slug.clone() else {
        entry.set_status(UpdateStatus::NoSource, listener);
        return entry.status;
    };

    entry.latest_file = None;
    entry.set_status(UpdateStatus::Checking, listener);

    let lookup = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TempyrError::Cancelled),
        found = catalog.lookup_latest(&slug) => found,
    };
    let guessed = entry.identity.catalog_slug_is_guessed;

    let status = match lookup {
        Ok(None) => {
            logger.debug(
                "CHECK",
                format!("{}: no catalog entry for slug `{slug}`", entry.identity.name),
            );
            unresolved_status(guessed)
        }
        Ok(Some(remote)) => {
            let verdict = reconcile(&entry.identity.id, &remote);
            entry.latest_version = verdict.latest_version.clone();
            if verdict.status == UpdateStatus::UpdateAvailable {
                logger.info(
                    "CHECK",
                    format!(
                        "Update available for '{}': local={}, latest={} ({})",
                        entry.identity.name,
                        verdict
                            .local_version
                            .as_deref()
                            .unwrap_or(&entry.identity.id),
                        verdict.latest_version,
                        remote.file_name
                    ),
                );
                entry.latest_file = Some(remote);
            }
            verdict.status
        }
        Err(TempyrError::Cancelled) => UpdateStatus::Unknown,
        Err(err) => {
            logger.error(
                "CHECK",
                format!(
                    "Update check failed for '{}' (slug: {slug}): {err}",
                    entry.identity.name
                ),
            );
            unresolved_status(guessed)
        }
    };

    entry.set_status(status, listener);
    status
}

/// Aggregate outcome of a batch check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub checked: usize,
    pub updates_available: usize,
    pub up_to_date: usize,
    /// Entries left in `Error` or `NoSource` after the lookup.
    pub unreachable: usize,
    pub cancelled: usize,
}

impl CheckSummary {
    /// One-line operator notification for the batch.
    pub fn message(&self) -> String {
        if self.updates_available > 0 {
            format!("{} update(s) available.", self.updates_available)
        } else if self.unreachable > 0 {
            format!(
                "Check complete: {} mod(s) could not be reached.",
                self.unreachable
            )
        } else {
            "All mods are up to date.".to_string()
        }
    }
}

/// Check every entry that has a catalog slug, concurrently.
pub async fn check_all(
    entries: &mut [PackageEntry],
    catalog: &dyn CatalogClient,
    cancel: &CancellationToken,
    listener: Option<&EventListener<'_>>,
    logger: &Logger,
) -> CheckSummary {
    let targets: Vec<&mut PackageEntry> = entries
        .iter_mut()
        .filter(|entry| entry.identity.has_catalog_slug())
        .collect();
    logger.info(
        "CHECK",
        format!("Update check started for {} mod(s)", targets.len()),
    );

    let statuses = join_all(
        targets
            .into_iter()
            .map(|entry| check_entry(entry, catalog, cancel, listener, logger)),
    )
    .await;

    let mut summary = CheckSummary {
        checked: statuses.len(),
        ..CheckSummary::default()
    };
    for status in statuses {
        match status {
            UpdateStatus::UpdateAvailable => summary.updates_available += 1,
            UpdateStatus::UpToDate => summary.up_to_date += 1,
            UpdateStatus::Error | UpdateStatus::NoSource => summary.unreachable += 1,
            UpdateStatus::Unknown => summary.cancelled += 1,
            UpdateStatus::Checking | UpdateStatus::Downloading => {}
        }
    }
    logger.info(
        "CHECK",
        format!(
            "Update check complete: {} available, {} up to date, {} unreachable",
            summary.updates_available, summary.up_to_date, summary.unreachable
        ),
    );
    summary
}

/// Download and install the update retained on `entry`.
///
/// Only entries in `UpdateAvailable` with a direct download link are
/// touched; anything else returns the current status unchanged.
pub async fn apply_update(
    entry: &mut PackageEntry,
    installer: &Installer,
    cancel: &CancellationToken,
    listener: Option<&EventListener<'_>>,
    logger: &Logger,
) -> UpdateStatus {
    if entry.status != UpdateStatus::UpdateAvailable {
        return entry.status;
    }
    let Some(latest) = entry.latest_file.clone() else {
        return entry.status;
    };
    let Some(url) = latest.download_url.clone() else {
        logger.warn(
            "UPDATE",
            format!(
                "'{}' has no direct download for {}",
                entry.identity.name, latest.file_name
            ),
        );
        return entry.status;
    };

    entry.set_status(UpdateStatus::Downloading, listener);
    let id = entry.identity.id.clone();
    let monitor = entry.download_progress.clone();
    monitor.store(0.0);
    let report = |fraction: f64| {
        monitor.store(fraction);
        if let Some(listener) = listener {
            listener(EntryEvent::Progress { id: &id, fraction });
        }
    };

    let outcome = installer
        .update_in_place(
            &entry.identity.file_path,
            &url,
            &latest.file_name,
            &report,
            cancel,
            logger,
        )
        .await;
    monitor.store(0.0);

    let status = match outcome {
        Ok(new_path) => {
            entry.identity = resolve_file(&new_path, logger);
            entry.latest_file = None;
            UpdateStatus::UpToDate
        }
        Err(TempyrError::Cancelled) => UpdateStatus::UpdateAvailable,
        Err(err) => {
            logger.error(
                "UPDATE",
                format!(
                    "Failed to update mod '{}' from {url}: {err}",
                    entry.identity.name
                ),
            );
            UpdateStatus::Error
        }
    };
    entry.set_status(status, listener);
    status
}

/// Aggregate outcome of a batch update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub attempted: usize,
    pub updated: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Updates found without a direct download link; never attempted.
    pub skipped: usize,
}

impl UpdateSummary {
    pub fn message(&self) -> String {
        let mut message = if self.failed > 0 {
            format!(
                "Updated {}/{} mod(s). {} failed.",
                self.updated, self.attempted, self.failed
            )
        } else {
            format!("Successfully updated {} mod(s).", self.updated)
        };
        if self.skipped > 0 {
            message.push_str(&format!(
                " {} mod(s) have no direct download.",
                self.skipped
            ));
        }
        message
    }
}

/// Update every entry with a pending update, concurrently.
pub async fn update_all(
    entries: &mut [PackageEntry],
    installer: &Installer,
    cancel: &CancellationToken,
    listener: Option<&EventListener<'_>>,
    logger: &Logger,
) -> UpdateSummary {
    let (targets, skipped): (Vec<&mut PackageEntry>, Vec<&mut PackageEntry>) = entries
        .iter_mut()
        .filter(|entry| entry.has_update())
        .partition(|entry| entry.is_installable());

    for entry in &skipped {
        logger.warn(
            "UPDATE",
            format!(
                "'{}' has no direct download; update it manually",
                entry.identity.name
            ),
        );
    }
    let mut summary = UpdateSummary {
        attempted: targets.len(),
        skipped: skipped.len(),
        ..UpdateSummary::default()
    };

    let statuses = join_all(
        targets
            .into_iter()
            .map(|entry| apply_update(entry, installer, cancel, listener, logger)),
    )
    .await;

    for status in statuses {
        match status {
            UpdateStatus::UpToDate => summary.updated += 1,
            UpdateStatus::Error => summary.failed += 1,
            _ => summary.cancelled += 1,
        }
    }
    summary
}
