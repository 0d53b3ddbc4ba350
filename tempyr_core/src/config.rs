/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load, default, and persist Tempyr-Core configuration,
    including the operator's chosen install root.

  Security / Safety Notes:
    Reads and writes only the operator's own config directory.
    No secrets are stored.

  Dependencies:
    serde + toml for the file format, dirs for platform paths.

  Operational Scope:
    Loaded once at startup; saved when the install root is
    changed from the CLI.

  Revision History:
    2026-10-19 COD  Authored configuration layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit defaults for every field
    - Malformed configuration is reported, never guessed at
============================================================*/

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TempyrError};

const DEFAULT_CATALOG_URL: &str = "https://api.cfwidget.com";
const DEFAULT_CDN_URL: &str = "https://mediafilez.forgecdn.net";
const DEFAULT_USER_AGENT: &str = "Tempyr/1.0";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TempyrConfig {
    pub paths: PathsConfig,
    pub catalog: CatalogConfig,
    #[serde(skip)]
    source: Option<PathBuf>,
}

/// Filesystem locations used by the runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Game install root; mods live under `<install_root>/UserData/Mods`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

/// Catalog endpoint and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub cdn_base_url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub max_retries: usize,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.to_string(),
            cdn_base_url: DEFAULT_CDN_URL.to_string(),
            timeout: 30,
            max_retries: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TempyrConfig {
    /// Load from an explicit path, or from the default location when `None`.
    ///
    /// An explicit path must exist; the default location may be absent, in
    /// which case defaults are returned.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(TempyrError::Config(format!(
                        "Config file {} does not exist",
                        explicit.display()
                    )));
                }
                Self::load(explicit)
            }
            None => {
                let default_path = default_config_path()?;
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self {
                        source: Some(default_path),
                        ..Self::default()
                    })
                }
            }
        }
    }

    /// Parse the TOML document at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            TempyrError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        let mut config: TempyrConfig = toml::from_str(&raw).map_err(|err| {
            TempyrError::Config(format!("Malformed config {}: {err}", path.display()))
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Defaults bound to the default config location, used when the existing
    /// file cannot be parsed.
    pub fn fresh() -> Result<Self> {
        Ok(Self {
            source: Some(default_config_path()?),
            ..Self::default()
        })
    }

    /// Persist to the file this config was loaded from (or the default path).
    pub fn save(&self) -> Result<PathBuf> {
        let path = match &self.source {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                TempyrError::Filesystem(format!(
                    "Failed to create config directory {}: {err}",
                    parent.display()
                ))
            })?;
        }
        let rendered = toml::to_string_pretty(self)
            .map_err(|err| TempyrError::Serialization(format!("Failed to render config: {err}")))?;
        std::fs::write(&path, rendered).map_err(|err| {
            TempyrError::Filesystem(format!("Failed to write config {}: {err}", path.display()))
        })?;
        Ok(path)
    }

    /// Directory for per-session log files.
    pub fn log_dir(&self) -> PathBuf {
        self.paths
            .log_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("logs"))
    }

    /// Default output path for the status report.
    pub fn report_path(&self) -> PathBuf {
        self.paths
            .report
            .clone()
            .unwrap_or_else(|| data_dir().join("report.json"))
    }

    /// Configured install root, if any.
    pub fn install_root(&self) -> Option<&Path> {
        self.paths.install_root.as_deref()
    }

    /// Replace the persisted install root.
    pub fn set_install_root(&mut self, root: PathBuf) {
        self.paths.install_root = Some(root);
    }
}

fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("tempyr").join("config.toml"))
        .ok_or_else(|| TempyrError::Config("Unable to determine config directory".into()))
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tempyr")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[paths]\ninstall_root = \"/games/hytale\"\n\n[catalog]\nmax_retries = 5\n",
        )
        .unwrap();

        let config = TempyrConfig::load_from_optional_path(Some(&path)).unwrap();
        assert_eq!(config.install_root(), Some(Path::new("/games/hytale")));
        assert_eq!(config.catalog.max_retries, 5);
        assert_eq!(config.catalog.base_url, DEFAULT_CATALOG_URL);
        assert_eq!(config.catalog.timeout, 30);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths\ninstall_root = 3").unwrap();
        let err = TempyrConfig::load(&path).unwrap_err();
        assert!(matches!(err, TempyrError::Config(_)));
    }

    #[test]
    fn explicit_missing_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = TempyrConfig::load_from_optional_path(Some(&dir.path().join("nope.toml")))
            .unwrap_err();
        assert!(matches!(err, TempyrError::Config(_)));
    }

    #[test]
    fn save_round_trips_install_root() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();

        let mut config = TempyrConfig::load(&path).unwrap();
        assert!(config.install_root().is_none());
        config.set_install_root(PathBuf::from("/srv/hytale"));
        assert_eq!(config.save().unwrap(), path);

        let reloaded = TempyrConfig::load(&path).unwrap();
        assert_eq!(reloaded.install_root(), Some(Path::new("/srv/hytale")));
    }
}
