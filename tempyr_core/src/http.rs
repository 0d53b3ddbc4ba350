/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::http
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Own the process-wide HTTP connection pool shared by the
    catalog client and the package downloader.

  Security / Safety Notes:
    HTTPS by default; no credentials or cookies are stored.

  Dependencies:
    reqwest for the pooled async client.

  Operational Scope:
    Initialised lazily on first use; lives for the process.

  Revision History:
    2026-10-19 COD  Introduced shared HTTP client.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Single connection pool, no per-call mutable state
    - Construction failures surfaced as typed errors
============================================================*/

use std::sync::OnceLock;
use std::time::Duration;

use crate::config::CatalogConfig;
use crate::error::{Result, TempyrError};

static SHARED: OnceLock<reqwest::Client> = OnceLock::new();

/// Build a standalone client from catalog settings.
///
/// Only the connect phase is bounded here; catalog requests apply the full
/// request timeout individually so long package downloads are not cut off.
pub fn build_client(config: &CatalogConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.timeout.max(1)))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|err| TempyrError::Network(format!("Failed to build HTTP client: {err}")))
}

/// Process-wide client; the first caller's settings win.
pub fn shared_client(config: &CatalogConfig) -> Result<reqwest::Client> {
    if let Some(client) = SHARED.get() {
        return Ok(client.clone());
    }
    let client = build_client(config)?;
    Ok(SHARED.get_or_init(|| client).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_client_is_reused() {
        let config = CatalogConfig::default();
        assert!(shared_client(&config).is_ok());
        assert!(SHARED.get().is_some());
        assert!(shared_client(&config).is_ok());
    }
}
