/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::catalog
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Query the public mod catalog (via the CFWidget API) for the
    latest file published under a slug.

  Security / Safety Notes:
    Performs read-only HTTPS GET requests. No credentials are
    transmitted.

  Dependencies:
    reqwest for HTTP, serde for response parsing, async-trait
    for the injectable client seam.

  Operational Scope:
    Supplies the update reconciler and the install-from-URL
    flow with remote file metadata.

  Revision History:
    2026-10-19 COD  Adapted asynchronous catalog client.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Retry with exponential backoff on transient statuses
    - Missing catalog entries are absence, not failure
============================================================*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use urlencoding::encode;

use crate::config::CatalogConfig;
use crate::error::{Result, TempyrError};

/// Latest file known to the catalog for a slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLatestFile {
    pub file_name: String,
    pub display_name: String,
    /// `None` when the file is only available from an external host.
    pub download_url: Option<String>,
}

/// Remote catalog lookup seam.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Latest file for `slug`, or `None` when the catalog has no entry.
    async fn lookup_latest(&self, slug: &str) -> Result<Option<RemoteLatestFile>>;
}

/// Client for the CFWidget catalog API.
#[derive(Clone)]
pub struct CfWidgetClient {
    client: reqwest::Client,
    base_url: String,
    cdn_base_url: String,
    timeout: Duration,
    max_retries: usize,
}

impl CfWidgetClient {
    /// Construct a client over an existing (usually shared) connection pool.
    pub fn new(config: &CatalogConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cdn_base_url: config.cdn_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout.max(1)),
            max_retries: config.max_retries.max(1),
        }
    }

    fn compose_url(&self, slug: &str) -> String {
        format!("{}/hytale/mods/{}", self.base_url, encode(slug))
    }

    fn latest_file_from(&self, payload: CfWidgetResponse) -> Option<RemoteLatestFile> {
        let file = payload.download?;
        let download_url = if file.id > 0 {
            build_cdn_url(&self.cdn_base_url, file.id as u64, &file.name).or(file.url)
        } else {
            file.url
        };
        Some(RemoteLatestFile {
            file_name: file.name,
            display_name: file.display,
            download_url,
        })
    }
}

#[async_trait]
impl CatalogClient for CfWidgetClient {
    async fn lookup_latest(&self, slug: &str) -> Result<Option<RemoteLatestFile>> {
        let url = self.compose_url(slug);
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|err| {
                    TempyrError::Network(format!("Catalog request to {url} failed: {err}"))
                })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status.is_success() {
                let payload = response.json::<CfWidgetResponse>().await.map_err(|err| {
                    TempyrError::Serialization(format!(
                        "Failed to decode catalog response from {url}: {err}"
                    ))
                })?;
                return Ok(self.latest_file_from(payload));
            }

            attempt += 1;
            if !is_retryable(status) || attempt >= self.max_retries {
                return Err(TempyrError::Network(format!(
                    "Catalog request {url} failed with status {status} after {attempt} attempt(s)"
                )));
            }
            let exponent = (attempt as u32).min(8);
            sleep(Duration::from_millis(200_u64.saturating_mul(1_u64 << exponent))).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Direct CDN link for a numeric file id: the decimal id is split into its
/// first four digits and the remainder, e.g. `7649813` → `files/7649/813/<name>`.
pub fn build_cdn_url(cdn_base_url: &str, file_id: u64, file_name: &str) -> Option<String> {
    let digits = file_id.to_string();
    if digits.len() <= 4 || file_name.is_empty() {
        return None;
    }
    let (head, tail) = digits.split_at(4);
    Some(format!(
        "{}/files/{head}/{tail}/{file_name}",
        cdn_base_url.trim_end_matches('/')
    ))
}

#[derive(Debug, Deserialize)]
struct CfWidgetResponse {
    #[serde(default)]
    download: Option<CfWidgetFile>,
}

#[derive(Debug, Deserialize)]
struct CfWidgetFile {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    display: String,
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{http_response, serve};

    fn client_for(base_url: String) -> CfWidgetClient {
        let config = CatalogConfig {
            base_url,
            cdn_base_url: "https://cdn.example".into(),
            max_retries: 2,
            ..CatalogConfig::default()
        };
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        CfWidgetClient::new(&config, http)
    }

    #[test]
    fn cdn_url_splits_file_id() {
        assert_eq!(
            build_cdn_url("https://mediafilez.forgecdn.net/", 7649813, "Mod.jar").as_deref(),
            Some("https://mediafilez.forgecdn.net/files/7649/813/Mod.jar")
        );
        assert_eq!(build_cdn_url("https://cdn", 1234, "Mod.jar"), None);
    }

    #[test]
    fn slug_is_url_encoded() {
        let client = client_for("https://api.example/".into());
        assert_eq!(
            client.compose_url("a b"),
            "https://api.example/hytale/mods/a%20b"
        );
    }

    #[test]
    fn external_only_file_has_no_direct_link() {
        let client = client_for("https://api.example".into());
        let payload: CfWidgetResponse = serde_json::from_str(
            r#"{"download":{"id":0,"name":"Mod-1.0.jar","display":"1.0"}}"#,
        )
        .unwrap();
        let latest = client.latest_file_from(payload).unwrap();
        assert_eq!(latest.file_name, "Mod-1.0.jar");
        assert_eq!(latest.download_url, None);

        let empty: CfWidgetResponse = serde_json::from_str("{}").unwrap();
        assert!(client.latest_file_from(empty).is_none());
    }

    #[tokio::test]
    async fn missing_entry_is_absence() {
        let base = serve(vec![http_response("404 Not Found", "")]).await;
        let result = client_for(base).lookup_latest("ghost").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn retries_transient_status_then_parses() {
        let body = r#"{"title":"Lanterns","download":{"id":7649813,"name":"Lanterns-2.0.jar","display":"Lanterns 2.0","url":"https://www.curseforge.com/x"}}"#;
        let base = serve(vec![
            http_response("503 Service Unavailable", ""),
            http_response("200 OK", body),
        ])
        .await;

        let latest = client_for(base)
            .lookup_latest("lanterns")
            .await
            .unwrap()
            .expect("file present");
        assert_eq!(latest.file_name, "Lanterns-2.0.jar");
        assert_eq!(latest.display_name, "Lanterns 2.0");
        assert_eq!(
            latest.download_url.as_deref(),
            Some("https://cdn.example/files/7649/813/Lanterns-2.0.jar")
        );
    }

    #[tokio::test]
    async fn persistent_failure_is_network_error() {
        let base = serve(vec![
            http_response("500 Internal Server Error", ""),
            http_response("500 Internal Server Error", ""),
        ])
        .await;
        let err = client_for(base).lookup_latest("lanterns").await.unwrap_err();
        assert!(matches!(err, TempyrError::Network(_)));
    }
}
