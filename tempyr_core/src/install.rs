/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::install
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Download package files, back up the installed version, and
    promote the new file into the mods directory.

  Security / Safety Notes:
    Target filenames come from the remote catalog and are
    rejected unless they name a plain file. Every failure or
    cancellation removes the temporary download and leaves the
    installed file untouched.

  Dependencies:
    reqwest byte streams, tokio::fs for async file I/O,
    tokio-util for cancellation.

  Operational Scope:
    Driven by the library session for single and batch
    updates and for fresh installs from catalog URLs.

  Revision History:
    2026-10-19 COD  Authored install/replace engine.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Download, back up, promote, then clean up
    - Cancellation treated as a first-class outcome
    - Progress reported only against a known total
============================================================*/

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TempyrError};
use crate::logger::Logger;

/// Backup directory created next to updated packages.
pub const ARCHIVE_DIR_NAME: &str = "Archive";

const TEMP_SUFFIX: &str = ".tmp";

/// Fractional progress callback, `0.0..=1.0`.
pub type ProgressFn<'a> = dyn Fn(f64) + Send + Sync + 'a;

/// Open body stream of a remote file.
pub struct DownloadStream {
    /// Total length when the server announced it.
    pub total: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes>>,
}

/// Transport seam for package downloads.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn open(&self, url: &str) -> Result<DownloadStream>;
}

/// Downloader backed by the shared HTTP client.
#[derive(Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn open(&self, url: &str) -> Result<DownloadStream> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| TempyrError::Network(format!("Download of {url} failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TempyrError::Network(format!(
                "Download of {url} failed with status {status}"
            )));
        }
        let total = response.content_length();
        let url = url.to_string();
        let chunks = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|err| {
                    TempyrError::Network(format!("Download of {url} interrupted: {err}"))
                })
            })
            .boxed();
        Ok(DownloadStream { total, chunks })
    }
}

/// Performs downloads and file promotion for package updates.
#[derive(Clone)]
pub struct Installer {
    downloader: Arc<dyn Downloader>,
}

impl Installer {
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self { downloader }
    }

    /// Replace `existing` with the file at `url`, saved as `target_name`.
    ///
    /// The previous file is copied into `Archive/` before the new file is
    /// promoted. Returns the path of the installed file.
    pub async fn update_in_place(
        &self,
        existing: &Path,
        url: &str,
        target_name: &str,
        progress: &ProgressFn<'_>,
        cancel: &CancellationToken,
        logger: &Logger,
    ) -> Result<PathBuf> {
        validate_file_name(target_name)?;
        let mods_dir = existing
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| {
                TempyrError::Filesystem(format!(
                    "Cannot determine mods directory of {}",
                    existing.display()
                ))
            })?;
        let existing_name = existing.file_name().ok_or_else(|| {
            TempyrError::Filesystem(format!("{} has no file name", existing.display()))
        })?;

        let archive_dir = mods_dir.join(ARCHIVE_DIR_NAME);
        fs::create_dir_all(&archive_dir).await.map_err(|err| {
            TempyrError::Filesystem(format!(
                "Failed to create archive directory {}: {err}",
                archive_dir.display()
            ))
        })?;

        let temp_path = temp_path_for(mods_dir, target_name);
        self.download_to(url, &temp_path, progress, cancel).await?;

        let backup_path = archive_dir.join(existing_name);
        if let Err(err) = fs::copy(existing, &backup_path).await {
            discard(&temp_path).await;
            return Err(TempyrError::Filesystem(format!(
                "Failed to back up {} to {}: {err}",
                existing.display(),
                backup_path.display()
            )));
        }

        let new_path = mods_dir.join(target_name);
        if let Err(err) = fs::rename(&temp_path, &new_path).await {
            discard(&temp_path).await;
            return Err(TempyrError::Filesystem(format!(
                "Failed to install {}: {err}",
                new_path.display()
            )));
        }

        // When the names match the rename above already replaced the old file.
        if !same_path_ignore_case(existing, &new_path) {
            if let Err(err) = fs::remove_file(existing).await {
                logger.warn(
                    "INSTALL",
                    format!(
                        "Installed {} but could not remove {}: {err}",
                        new_path.display(),
                        existing.display()
                    ),
                );
            }
        }

        logger.info(
            "INSTALL",
            format!(
                "Updated {} -> {} (backup at {})",
                existing.display(),
                new_path.display(),
                backup_path.display()
            ),
        );
        Ok(new_path)
    }

    /// Install a new package into `mods_dir` without touching existing files.
    pub async fn install_fresh(
        &self,
        mods_dir: &Path,
        url: &str,
        file_name: &str,
        progress: &ProgressFn<'_>,
        cancel: &CancellationToken,
        logger: &Logger,
    ) -> Result<PathBuf> {
        validate_file_name(file_name)?;
        fs::create_dir_all(mods_dir).await.map_err(|err| {
            TempyrError::Filesystem(format!(
                "Failed to create mods directory {}: {err}",
                mods_dir.display()
            ))
        })?;

        let dest = mods_dir.join(file_name);
        if exists(&dest).await {
            return Err(TempyrError::AlreadyInstalled {
                file_name: file_name.to_string(),
            });
        }

        let temp_path = temp_path_for(mods_dir, file_name);
        self.download_to(url, &temp_path, progress, cancel).await?;

        if let Err(err) = promote_new(&temp_path, &dest).await {
            discard(&temp_path).await;
            if err.kind() == io::ErrorKind::AlreadyExists {
                return Err(TempyrError::AlreadyInstalled {
                    file_name: file_name.to_string(),
                });
            }
            return Err(TempyrError::Filesystem(format!(
                "Failed to install {}: {err}",
                dest.display()
            )));
        }

        logger.info("INSTALL", format!("Installed {}", dest.display()));
        Ok(dest)
    }

    /// Stream `url` into `dest`, removing `dest` on any failure.
    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        progress: &ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let result = self.stream_into(url, dest, progress, cancel).await;
        if result.is_err() {
            discard(dest).await;
        }
        result
    }

    async fn stream_into(
        &self,
        url: &str,
        dest: &Path,
        progress: &ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TempyrError::Cancelled),
            opened = self.downloader.open(url) => opened?,
        };
        let known_total = stream.total.filter(|total| *total > 0);

        let mut file = fs::File::create(dest).await.map_err(|err| {
            TempyrError::Filesystem(format!("Failed to create {}: {err}", dest.display()))
        })?;
        let mut read: u64 = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TempyrError::Cancelled),
                next = stream.chunks.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            read += chunk.len() as u64;
            if let Some(total) = known_total {
                progress((read as f64 / total as f64).min(1.0));
            }
        }
        file.flush().await?;
        file.sync_all().await?;

        if known_total.is_none() {
            progress(1.0);
        }
        Ok(read)
    }
}

/// Reject names that would escape the mods directory.
fn validate_file_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(TempyrError::Filesystem(format!(
            "Refusing to install unsafe file name `{name}`"
        ))),
    }
}

/// Move `temp` to `dest`, failing with `AlreadyExists` instead of replacing
/// a file that is already there.
async fn promote_new(temp: &Path, dest: &Path) -> io::Result<()> {
    match fs::hard_link(temp, dest).await {
        Ok(()) => {
            discard(temp).await;
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(err),
        // Filesystems without hard links (FAT, exFAT) fall back to a checked rename.
        Err(_) => {
            if exists(dest).await {
                return Err(io::Error::from(io::ErrorKind::AlreadyExists));
            }
            fs::rename(temp, dest).await
        }
    }
}

fn temp_path_for(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(format!("{file_name}{TEMP_SUFFIX}"))
}

fn same_path_ignore_case(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

async fn discard(path: &Path) {
    // A leftover temp file is truncated by the next attempt.
    let _ = fs::remove_file(path).await;
}
