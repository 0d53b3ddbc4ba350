/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::archive
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Locate and parse the optional `manifest.json` descriptor
    embedded inside a package archive.

  Security / Safety Notes:
    Archives are opened read-only. Malformed or hostile
    archives degrade to "no manifest" rather than failing.

  Dependencies:
    zip for container access, serde_json for parsing.

  Operational Scope:
    Invoked once per scanned package by the identity resolver.

  Revision History:
    2026-10-19 COD  Authored archive manifest reader.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Absence is a typed outcome, not an error
    - No mutation of operator files
============================================================*/

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::Deserialize;
use zip::ZipArchive;

use crate::error::{Result, TempyrError};
use crate::logger::Logger;

/// Descriptor filename searched for inside package archives.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Raw descriptor as authored by the package developer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PackageManifest {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Version")]
    pub version: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Authors", default)]
    pub authors: Vec<ManifestAuthor>,
    #[serde(rename = "Website")]
    pub website: Option<String>,
    #[serde(rename = "Group")]
    pub group: Option<String>,
}

/// Single author record in a package manifest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ManifestAuthor {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Url")]
    pub url: Option<String>,
}

/// Read the manifest from `path`, treating every failure as absence.
pub fn read_manifest(path: &Path) -> Option<PackageManifest> {
    try_read_manifest(path).ok().flatten()
}

/// Same as [`read_manifest`], recording swallowed failures at DEBUG level.
pub fn read_manifest_logged(path: &Path, logger: &Logger) -> Option<PackageManifest> {
    match try_read_manifest(path) {
        Ok(manifest) => manifest,
        Err(err) => {
            logger.debug(
                "MANIFEST",
                format!("Ignoring manifest of {}: {err}", path.display()),
            );
            None
        }
    }
}

fn try_read_manifest(path: &Path) -> Result<Option<PackageManifest>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|err| {
        TempyrError::Serialization(format!("Unreadable archive {}: {err}", path.display()))
    })?;

    let Some(index) = find_manifest_index(&archive) else {
        return Ok(None);
    };

    let mut entry = archive.by_index(index).map_err(|err| {
        TempyrError::Serialization(format!(
            "Failed to open manifest in {}: {err}",
            path.display()
        ))
    })?;
    let mut raw = Vec::new();
    entry.read_to_end(&mut raw)?;

    let manifest = serde_json::from_slice::<PackageManifest>(strip_bom(&raw)).map_err(|err| {
        TempyrError::Serialization(format!("Malformed manifest in {}: {err}", path.display()))
    })?;
    Ok(Some(manifest))
}

fn find_manifest_index<R: Read + Seek>(archive: &ZipArchive<R>) -> Option<usize> {
    (0..archive.len()).find(|&index| {
        archive
            .name_for_index(index)
            .map(|entry_name| {
                let leaf = entry_name.rsplit('/').next().unwrap_or(entry_name);
                leaf.eq_ignore_ascii_case(MANIFEST_FILE_NAME)
            })
            .unwrap_or(false)
    })
}

fn strip_bom(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(raw)
}
