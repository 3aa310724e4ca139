use axum::http::StatusCode;
use cinewall_shared::{CatalogPage, CatalogQuery, DiscoverResponse};
use tracing::warn;

use crate::config::MAX_DISCOVER_PAGE;

/// Build the upstream discover URL for one page of `query`.
pub fn discover_url(
    base: &str,
    api_key: &str,
    query: &CatalogQuery,
    page: u32,
) -> Result<reqwest::Url, StatusCode> {
    let mut url = reqwest::Url::parse(base).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("api_key", api_key);
        if let Some(genre) = query.genre {
            pairs.append_pair("with_genres", &genre.to_string());
        }
        pairs.append_pair("sort_by", query.sort.as_param());
        if let Some(date) = query.released_after {
            pairs.append_pair(
                "primary_release_date.gte",
                &date.format("%Y-%m-%d").to_string(),
            );
        }
        pairs.append_pair("vote_count.gte", &query.min_votes.to_string());
        pairs.append_pair("include_adult", "false");
        pairs.append_pair("page", &page.to_string());
    }
    Ok(url)
}

/// Fetch and validate one discover page. Returns the page and how many
/// upstream results were rejected. Every upstream failure maps to 502.
pub async fn fetch_page(
    client: &reqwest::Client,
    base: &str,
    api_key: &str,
    query: &CatalogQuery,
    page: u32,
) -> Result<(CatalogPage, usize), StatusCode> {
    let url = discover_url(base, api_key, query, page)?;
    let resp = client.get(url).send().await.map_err(|e| {
        // The URL carries the API key; log only the page.
        warn!(page, error = %e.without_url(), "TMDB discover request failed");
        StatusCode::BAD_GATEWAY
    })?;

    if !resp.status().is_success() {
        warn!(page, status = %resp.status(), "TMDB discover returned an error status");
        return Err(StatusCode::BAD_GATEWAY);
    }

    let body = resp.bytes().await.map_err(|e| {
        warn!(page, error = %e.without_url(), "failed to read TMDB discover body");
        StatusCode::BAD_GATEWAY
    })?;
    let discover: DiscoverResponse = serde_json::from_slice(&body).map_err(|e| {
        warn!(page, error = %e, "TMDB discover payload was malformed");
        StatusCode::BAD_GATEWAY
    })?;

    let (mut catalog_page, rejected) = discover.into_page();
    catalog_page.page = page;
    if page >= MAX_DISCOVER_PAGE {
        catalog_page.has_more = false;
    }
    Ok((catalog_page, rejected))
}
