/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::library
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Hold the session state for one install root: the scanned
    package entries plus the catalog and installer used to
    check, update, and add packages.

  Security / Safety Notes:
    Writes only inside the mods directory of the selected
    install root.

  Dependencies:
    tokio-util for cancellation; catalog and install seams
    are injected as trait objects.

  Operational Scope:
    Backs every CLI command that touches installed packages.

  Revision History:
    2026-10-19 COD  Authored library session.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Rescan after every change to the mods directory
    - Requested-but-missing packages reported, not fatal
============================================================*/

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogClient, CfWidgetClient};
use crate::config::CatalogConfig;
use crate::error::{Result, TempyrError};
use crate::http::shared_client;
use crate::identity::{extract_catalog_slug, scan_directory};
use crate::install::{HttpDownloader, Installer};
use crate::install_root;
use crate::logger::Logger;
use crate::reconcile::{
    self, CheckSummary, EntryEvent, EventListener, PackageEntry, UpdateSummary,
};

/// Installed packages of one install root and the services acting on them.
pub struct ModLibrary {
    install_root: PathBuf,
    entries: Vec<PackageEntry>,
    catalog: Arc<dyn CatalogClient>,
    installer: Installer,
    listener: Option<Arc<EventListener<'static>>>,
}

impl ModLibrary {
    pub fn new(install_root: PathBuf, catalog: Arc<dyn CatalogClient>, installer: Installer) -> Self {
        Self {
            install_root,
            entries: Vec::new(),
            catalog,
            installer,
            listener: None,
        }
    }

    /// Library wired to the live catalog over the shared HTTP client.
    pub fn connect(install_root: PathBuf, config: &CatalogConfig) -> Result<Self> {
        let client = shared_client(config)?;
        let catalog = Arc::new(CfWidgetClient::new(config, client.clone()));
        let installer = Installer::new(Arc::new(HttpDownloader::new(client)));
        Ok(Self::new(install_root, catalog, installer))
    }

    /// Subscribe to status and progress events of every entry.
    pub fn with_listener(mut self, listener: Arc<EventListener<'static>>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn mods_dir(&self) -> PathBuf {
        install_root::mods_dir(&self.install_root)
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|entry| entry.identity().id == id)
    }

    /// Rescan the mods directory, discarding previous check results.
    pub fn refresh(&mut self, logger: &Logger) -> usize {
        self.entries = scan_directory(&self.install_root, logger)
            .into_iter()
            .map(PackageEntry::new)
            .collect();
        logger.info(
            "SCAN",
            format!(
                "Found {} mod(s) in {}",
                self.entries.len(),
                self.mods_dir().display()
            ),
        );
        self.entries.len()
    }

    /// Keep only entries matching `requested` by file name, display name, or
    /// catalog slug (case-insensitive). An empty request keeps everything.
    pub fn select(&mut self, requested: &[String], logger: &Logger) {
        if requested.is_empty() {
            return;
        }
        let wanted: HashSet<String> = requested.iter().map(|id| id.to_lowercase()).collect();
        let mut matched: HashSet<String> = HashSet::new();

        self.entries.retain(|entry| {
            let identity = entry.identity();
            let keys = [
                Some(identity.id.to_lowercase()),
                Some(identity.name.to_lowercase()),
                identity.catalog_slug.as_ref().map(|slug| slug.to_lowercase()),
            ];
            let hits: Vec<String> = keys
                .into_iter()
                .flatten()
                .filter(|key| wanted.contains(key))
                .collect();
            let keep = !hits.is_empty();
            matched.extend(hits);
            keep
        });

        let mut missing: Vec<&String> = requested
            .iter()
            .filter(|id| !matched.contains(&id.to_lowercase()))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            logger.warn(
                "PKG404",
                format!(
                    "Requested mods not installed: {}",
                    missing
                        .iter()
                        .map(|id| id.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
        }
    }

    pub async fn check_all(&mut self, cancel: &CancellationToken, logger: &Logger) -> CheckSummary {
        reconcile::check_all(
            &mut self.entries,
            self.catalog.as_ref(),
            cancel,
            self.listener.as_deref(),
            logger,
        )
        .await
    }

    pub async fn update_all(&mut self, cancel: &CancellationToken, logger: &Logger) -> UpdateSummary {
        let summary = reconcile::update_all(
            &mut self.entries,
            &self.installer,
            cancel,
            self.listener.as_deref(),
            logger,
        )
        .await;
        logger.info("UPDATE", summary.message());
        summary
    }

    /// Install the latest file of the mod behind a catalog page URL, then
    /// rescan. Returns the installed path.
    pub async fn install_from_url(
        &mut self,
        url: &str,
        cancel: &CancellationToken,
        logger: &Logger,
    ) -> Result<PathBuf> {
        let slug = extract_catalog_slug(url)
            .ok_or_else(|| TempyrError::InvalidCatalogUrl(url.trim().to_string()))?;

        let latest = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TempyrError::Cancelled),
            found = self.catalog.lookup_latest(&slug) => found?,
        };
        let (file_name, download_url) = match latest {
            Some(file) => match file.download_url {
                Some(download_url) => (file.file_name, download_url),
                None => return Err(no_download(&slug)),
            },
            None => return Err(no_download(&slug)),
        };
        logger.info(
            "INSTALL",
            format!("Installing {file_name} for catalog mod `{slug}`"),
        );

        let listener = self.listener.clone();
        let report = |fraction: f64| {
            if let Some(listener) = &listener {
                listener(EntryEvent::Progress {
                    id: &file_name,
                    fraction,
                });
            }
        };
        let installed = self
            .installer
            .install_fresh(
                &self.mods_dir(),
                &download_url,
                &file_name,
                &report,
                cancel,
                logger,
            )
            .await?;

        self.refresh(logger);
        Ok(installed)
    }
}

fn no_download(slug: &str) -> TempyrError {
    TempyrError::Network(format!("No downloadable file found for `{slug}`"))
}
