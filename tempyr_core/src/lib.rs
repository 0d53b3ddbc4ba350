/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Core library for the Tempyr mod manager: package
    discovery, catalog reconciliation, and safe replacement
    of installed mod archives.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTPS GET
    requests and writes only inside the selected mods
    directory and Tempyr's own config/data directories.

  Dependencies:
    See Cargo.toml; each module lists its own.

  Operational Scope:
    Linked by the `tempyr` CLI and by front-ends embedding the
    library session.

  Revision History:
    2026-10-19 COD  Established library layout.
  ------------------------------------------------------------
  SSE Principles Observed:
    - One module per concern
    - Injectable seams for every remote dependency
============================================================*/

pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filename;
pub mod http;
pub mod identity;
pub mod install;
pub mod install_root;
pub mod library;
pub mod logger;
pub mod reconcile;
pub mod report;

#[cfg(test)]
mod test_support;
