/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::install_root
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Resolve the game install root from operator input, the
    persisted configuration, or well-known install locations.

  Security / Safety Notes:
    Only checks directory existence; nothing is created here.

  Dependencies:
    dirs for platform-specific base directories.

  Operational Scope:
    Called once at startup by the CLI before any scan.

  Revision History:
    2026-10-19 COD  Added install root resolution.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic candidate ordering
    - Absence reported as `None`, never guessed
============================================================*/

use std::path::{Path, PathBuf};

/// Relative location of the mods directory under an install root.
pub const MODS_SUBPATH: [&str; 2] = ["UserData", "Mods"];

/// A path is a usable install root when it names an existing directory.
pub fn is_valid_install(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_dir()
}

/// Mods directory for the given install root.
pub fn mods_dir(root: &Path) -> PathBuf {
    MODS_SUBPATH
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Probe well-known install locations and return the first that exists.
pub fn detect() -> Option<PathBuf> {
    candidate_roots().into_iter().find(|path| is_valid_install(path))
}

/// Pick the first valid root in priority order: explicit, configured, detected.
pub fn resolve(explicit: Option<&Path>, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    configured
        .filter(|path| is_valid_install(path))
        .map(Path::to_path_buf)
        .or_else(detect)
}

fn candidate_roots() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(local) = dirs::data_local_dir() {
        candidates.push(local.join("Programs").join("Hytale"));
        candidates.push(local.join("Hytale"));
    }
    if let Some(data) = dirs::data_dir() {
        candidates.push(data.join("Hytale"));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("Games").join("Hytale"));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mods_dir_appends_fixed_subpath() {
        assert_eq!(
            mods_dir(Path::new("/games/hytale")),
            Path::new("/games/hytale/UserData/Mods")
        );
    }

    #[test]
    fn explicit_root_wins_over_configured() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve(Some(Path::new("/explicit")), Some(dir.path()));
        assert_eq!(resolved.as_deref(), Some(Path::new("/explicit")));
    }

    #[test]
    fn configured_root_must_exist() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve(None, Some(dir.path())).as_deref(), Some(dir.path()));
        assert!(is_valid_install(dir.path()));
        assert!(!is_valid_install(&dir.path().join("missing")));
        assert!(!is_valid_install(Path::new("")));
    }
}
