/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::filename
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Split package filename stems into a display name and a
    version token, and extract bare version tokens used by the
    update reconciler.

  Security / Safety Notes:
    Pure string processing; no I/O performed in this module.

  Dependencies:
    regex for the two pattern matchers.

  Operational Scope:
    Called by the identity resolver for every scanned file and
    by the reconciler for local/remote version comparison.

  Revision History:
    2026-10-19 COD  Authored filename parsing helpers.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Narrow, independently anchored patterns
    - Deterministic output for identical input
============================================================*/

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Name/version splitter for a full filename stem.
fn stem_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>.+?)[\-_ ]v?(?P<version>\d+[\d.\-]*)(\s.*)?$")
            .expect("stem pattern is valid")
    })
}

/// Version-only extractor, anchored to the end of the stem.
fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\-_ ][vV]?(?P<ver>\d+[\d.\-]*)(?:[\-_ ].*)?$")
            .expect("version pattern is valid")
    })
}

/// Split a filename stem (extension already removed) into `(name, version)`.
///
/// When no version token is present the whole stem is returned, humanized,
/// with an empty version.
pub fn parse_stem(stem: &str) -> (String, String) {
    match stem_pattern().captures(stem) {
        Some(caps) => (humanize(&caps["name"]), caps["version"].to_string()),
        None => (humanize(stem), String::new()),
    }
}

/// Replace `_` and `-` with spaces and trim.
pub fn humanize(value: &str) -> String {
    value.replace(['_', '-'], " ").trim().to_string()
}

/// Extract the bare version token from a filename such as `my-mod-1.0.0.jar`.
pub fn version_from_filename(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    version_pattern()
        .captures(&stem)
        .map(|caps| caps["ver"].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_and_version() {
        assert_eq!(
            parse_stem("My_Mod-1.2.3"),
            ("My Mod".to_string(), "1.2.3".to_string())
        );
        assert_eq!(
            parse_stem("Better-Chests-2024.05-1"),
            ("Better Chests".to_string(), "2024.05-1".to_string())
        );
    }

    #[test]
    fn accepts_v_marker_and_discards_trailing_text() {
        assert_eq!(
            parse_stem("Fancy Lights v3.1 (hotfix)"),
            ("Fancy Lights".to_string(), "3.1".to_string())
        );
    }

    #[test]
    fn stem_without_version_is_humanized() {
        assert_eq!(
            parse_stem("_Violet-Music_Players_"),
            ("Violet Music Players".to_string(), String::new())
        );
        assert_eq!(parse_stem("mod"), ("mod".to_string(), String::new()));
    }

    #[test]
    fn extracts_versions_from_filenames() {
        assert_eq!(version_from_filename("mod-1.0.0.jar").as_deref(), Some("1.0.0"));
        assert_eq!(version_from_filename("mod-v2.jar").as_deref(), Some("2"));
        assert_eq!(version_from_filename("mod-V2.jar").as_deref(), Some("2"));
        assert_eq!(
            version_from_filename("mod_1.4.2-beta.zip").as_deref(),
            Some("1.4.2")
        );
    }

    #[test]
    fn version_extraction_needs_a_separator() {
        assert_eq!(version_from_filename("mod.jar"), None);
        assert_eq!(version_from_filename("mod2.jar"), None);
    }
}
