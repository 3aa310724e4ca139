use std::future::Future;
use std::time::Duration;

use cinewall_shared::{CatalogPage, CatalogQuery};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog responded with status {0}")]
    Status(u16),
    #[error("catalog payload was malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Supplier of catalog pages. Pages are numbered from 1.
pub trait CatalogSource {
    fn fetch_page(
        &self,
        query: &CatalogQuery,
        page: u32,
    ) -> impl Future<Output = Result<CatalogPage, CatalogError>>;
}

/// Fetches pages from a cinewall server's `/api/discover` endpoint.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    discover_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("cinewall-client/0.1")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build configured HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            discover_url: discover_url(base_url),
        }
    }
}

impl CatalogSource for HttpCatalog {
    fn fetch_page(
        &self,
        query: &CatalogQuery,
        page: u32,
    ) -> impl Future<Output = Result<CatalogPage, CatalogError>> {
        let request = self
            .client
            .get(&self.discover_url)
            .query(&query.to_params(page));

        async move {
            let resp = request.send().await?;
            if !resp.status().is_success() {
                return Err(CatalogError::Status(resp.status().as_u16()));
            }
            let body = resp.bytes().await?;
            let page: CatalogPage = serde_json::from_slice(&body)?;
            Ok(page)
        }
    }
}

fn discover_url(base_url: &str) -> String {
    format!("{}/api/discover", base_url.trim_end_matches('/'))
}
