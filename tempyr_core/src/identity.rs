/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::identity
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Enumerate installed package archives and resolve each one
    into a canonical identity: name, version, authors, and the
    catalog slug used for update lookups.

  Security / Safety Notes:
    Read-only access to the mods directory. Resolution never
    fails; unreadable inputs degrade to default fields.

  Dependencies:
    regex for catalog URL matching, chrono for timestamps.

  Operational Scope:
    Feeds the library session on every scan or single-file
    reload.

  Revision History:
    2026-10-19 COD  Authored identity resolver and scanner.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Filesystem entry is the identity key
    - Deterministic, case-insensitive ordering
    - Confidence of derived slugs is recorded explicitly
============================================================*/

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;

use crate::archive::{read_manifest_logged, PackageManifest};
use crate::filename::parse_stem;
use crate::install_root::mods_dir;
use crate::logger::Logger;

/// Archive extensions recognised as packages.
pub const PACKAGE_EXTENSIONS: [&str; 2] = ["jar", "zip"];

/// Resolved, immutable snapshot of one installed package file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageIdentity {
    /// Archive filename; unique within the mods directory.
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub authors: Vec<String>,
    pub website: String,
    pub catalog_slug: Option<String>,
    pub catalog_slug_is_guessed: bool,
    pub file_path: PathBuf,
    pub installed_at: Option<DateTime<Local>>,
}

impl PackageIdentity {
    /// True when the package can be looked up in the catalog.
    pub fn has_catalog_slug(&self) -> bool {
        self.catalog_slug.is_some()
    }
}

fn catalog_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)curseforge\.com/hytale/mods/(?P<slug>[^/?#]+)")
            .expect("catalog url pattern is valid")
    })
}

/// Extract the catalog slug from a declared catalog URL.
pub fn extract_catalog_slug(url: &str) -> Option<String> {
    if url.trim().is_empty() {
        return None;
    }
    catalog_url_pattern()
        .captures(url)
        .map(|caps| caps["slug"].to_string())
}

/// Derive a kebab-case slug from a display name, e.g.
/// `"Violet's Music Players"` becomes `"violets-music-players"`.
pub fn slug_from_name(name: &str) -> Option<String> {
    let mut slug = String::with_capacity(name.len());
    // Start as if a hyphen was just written so leading separators are dropped.
    let mut prev_hyphen = true;

    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            slug.push(ch);
            prev_hyphen = false;
        } else if !prev_hyphen && matches!(ch, ' ' | '-' | '_') {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    if slug.ends_with('-') {
        slug.pop();
    }
    (!slug.is_empty()).then_some(slug)
}

/// Resolve one package file into its identity. Never fails.
pub fn resolve_file(path: &Path, logger: &Logger) -> PackageIdentity {
    let manifest = read_manifest_logged(path, logger);
    build_identity(path, manifest.as_ref())
}

fn build_identity(path: &Path, manifest: Option<&PackageManifest>) -> PackageIdentity {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (parsed_name, parsed_version) = parse_stem(&stem);

    let name = manifest
        .and_then(|m| m.name.as_deref())
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or(parsed_name);

    // Filenames carry the trustworthy version; manifests often hold placeholders.
    let version = if parsed_version.is_empty() {
        manifest
            .and_then(|m| m.version.clone())
            .unwrap_or_default()
    } else {
        parsed_version
    };

    let authors = manifest
        .map(|m| {
            m.authors
                .iter()
                .filter_map(|author| author.name.as_deref())
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let website = manifest
        .and_then(|m| m.website.clone())
        .unwrap_or_default();

    let (catalog_slug, catalog_slug_is_guessed) = match extract_catalog_slug(&website) {
        Some(slug) => (Some(slug), false),
        None => {
            let guessed = slug_from_name(&name);
            let is_guessed = guessed.is_some();
            (guessed, is_guessed)
        }
    };

    let installed_at = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .map(DateTime::<Local>::from);

    PackageIdentity {
        id: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        name,
        version,
        description: manifest
            .and_then(|m| m.description.clone())
            .unwrap_or_default(),
        authors,
        website,
        catalog_slug,
        catalog_slug_is_guessed,
        file_path: path.to_path_buf(),
        installed_at,
    }
}

/// Scan `<install_root>/UserData/Mods` and resolve every package archive.
///
/// A missing mods directory yields an empty list.
pub fn scan_directory(install_root: &Path, logger: &Logger) -> Vec<PackageIdentity> {
    let dir = mods_dir(install_root);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            logger.debug(
                "SCAN",
                format!("Mods directory {} unavailable: {err}", dir.display()),
            );
            return Vec::new();
        }
    };

    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_package_file(path))
        .map(|path| {
            // Upper-case folding, so `_` sorts after letters.
            let key = path
                .file_name()
                .map(|name| name.to_string_lossy().to_uppercase())
                .unwrap_or_default();
            (key, path)
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));

    files
        .iter()
        .map(|(_, path)| resolve_file(path, logger))
        .collect()
}

/// True when `path` carries one of the recognised archive extensions.
pub fn is_package_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PACKAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_archive;
    use tempfile::TempDir;

    fn mods_root() -> (TempDir, PathBuf) {
        let root = TempDir::new().unwrap();
        let mods = mods_dir(root.path());
        std::fs::create_dir_all(&mods).unwrap();
        (root, mods)
    }

    #[test]
    fn slug_from_name_examples() {
        assert_eq!(
            slug_from_name("Violet's Music Players").as_deref(),
            Some("violets-music-players")
        );
        assert_eq!(slug_from_name("  --Big__Tree  Pack-- ").as_deref(), Some("big-tree-pack"));
        assert_eq!(slug_from_name("!!! ???"), None);
        assert_eq!(slug_from_name("   "), None);
        assert_eq!(slug_from_name(""), None);
    }

    #[test]
    fn slug_derivation_is_idempotent() {
        let once = slug_from_name("Violet's Music Players").unwrap();
        assert_eq!(slug_from_name(&once).as_deref(), Some(once.as_str()));
    }

    #[test]
    fn extracts_declared_catalog_slug() {
        assert_eq!(
            extract_catalog_slug("https://www.CurseForge.com/hytale/mods/lanterns?tab=files")
                .as_deref(),
            Some("lanterns")
        );
        assert_eq!(
            extract_catalog_slug("https://curseforge.com/hytale/mods/better-chests/").as_deref(),
            Some("better-chests")
        );
        assert_eq!(extract_catalog_slug("https://example.com/mods/other"), None);
        assert_eq!(extract_catalog_slug(""), None);
    }

    #[test]
    fn filename_only_identity() {
        let (_root, mods) = mods_root();
        let path = mods.join("My_Mod-1.2.3.jar");
        write_archive(&path, &[("readme.txt", "x")]);

        let identity = resolve_file(&path, &Logger::stderr_only());
        assert_eq!(identity.id, "My_Mod-1.2.3.jar");
        assert_eq!(identity.name, "My Mod");
        assert_eq!(identity.version, "1.2.3");
        assert!(identity.authors.is_empty());
        assert_eq!(identity.website, "");
        assert_eq!(identity.catalog_slug.as_deref(), Some("my-mod"));
        assert!(identity.catalog_slug_is_guessed);
        assert!(identity.installed_at.is_some());
    }

    #[test]
    fn manifest_fields_and_declared_slug() {
        let (_root, mods) = mods_root();
        let path = mods.join("lanterns-2.0.jar");
        write_archive(
            &path,
            &[(
                "manifest.json",
                r#"{"Name":"Glowing Lanterns","Version":"0.0.0","Description":"Lights",
                    "Authors":[{"Name":"Ash"},{"Name":""},{"Url":"https://x"},{"Name":"Birch"}],
                    "Website":"https://www.curseforge.com/hytale/mods/glow-lanterns"}"#,
            )],
        );

        let identity = resolve_file(&path, &Logger::stderr_only());
        assert_eq!(identity.name, "Glowing Lanterns");
        assert_eq!(identity.version, "2.0");
        assert_eq!(identity.description, "Lights");
        assert_eq!(identity.authors, vec!["Ash".to_string(), "Birch".to_string()]);
        assert_eq!(identity.catalog_slug.as_deref(), Some("glow-lanterns"));
        assert!(!identity.catalog_slug_is_guessed);
    }

    #[test]
    fn manifest_version_used_when_filename_has_none() {
        let (_root, mods) = mods_root();
        let path = mods.join("Lanterns.zip");
        write_archive(&path, &[("manifest.json", r#"{"Name":" ","Version":"4.1"}"#)]);

        let identity = resolve_file(&path, &Logger::stderr_only());
        assert_eq!(identity.name, "Lanterns");
        assert_eq!(identity.version, "4.1");
    }

    #[test]
    fn malformed_manifest_matches_missing_manifest() {
        let (_root, mods) = mods_root();
        let broken_dir = mods.join("broken");
        let plain_dir = mods.join("plain");
        std::fs::create_dir_all(&broken_dir).unwrap();
        std::fs::create_dir_all(&plain_dir).unwrap();

        let broken = broken_dir.join("Cool Mod-1.0.jar");
        let plain = plain_dir.join("Cool Mod-1.0.jar");
        write_archive(&broken, &[("manifest.json", "{\"Name\": ")]);
        write_archive(&plain, &[("other.txt", "x")]);

        let logger = Logger::stderr_only();
        let mut a = resolve_file(&broken, &logger);
        let mut b = resolve_file(&plain, &logger);
        a.file_path = PathBuf::new();
        b.file_path = PathBuf::new();
        a.installed_at = None;
        b.installed_at = None;
        assert_eq!(a, b);
    }

    #[test]
    fn unnamed_package_has_no_slug() {
        let (_root, mods) = mods_root();
        let path = mods.join("___.jar");
        std::fs::write(&path, b"not an archive").unwrap();

        let identity = resolve_file(&path, &Logger::stderr_only());
        assert_eq!(identity.name, "");
        assert_eq!(identity.catalog_slug, None);
        assert!(!identity.catalog_slug_is_guessed);
    }

    #[test]
    fn scan_filters_and_sorts_case_insensitively() {
        let (root, mods) = mods_root();
        for name in ["beta-1.0.JAR", "Alpha-2.0.zip", "gamma.txt", "delta-1.jar.tmp"] {
            std::fs::write(mods.join(name), b"x").unwrap();
        }
        std::fs::create_dir_all(mods.join("Archive.zip")).unwrap();

        let found = scan_directory(root.path(), &Logger::stderr_only());
        let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["Alpha-2.0.zip", "beta-1.0.JAR"]);
    }

    #[test]
    fn scan_orders_punctuation_after_letters() {
        let (root, mods) = mods_root();
        for name in ["_core-1.0.jar", "alpha-1.0.jar", "Zeta-1.0.jar"] {
            std::fs::write(mods.join(name), b"x").unwrap();
        }

        let found = scan_directory(root.path(), &Logger::stderr_only());
        let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha-1.0.jar", "Zeta-1.0.jar", "_core-1.0.jar"]);
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let root = TempDir::new().unwrap();
        assert!(scan_directory(root.path(), &Logger::stderr_only()).is_empty());
    }
}
