use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use cinewall_shared::{CatalogQuery, DEFAULT_MIN_VOTES, SortOrder};
use serde::Deserialize;
use tracing::debug;

use crate::config::MAX_DISCOVER_PAGE;
use crate::services::tmdb;
use crate::state::{AppState, CachedPage, PageKey};

const DISCOVER_CACHE_CONTROL: &str = "public, max-age=300";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "tmdb_configured": state.tmdb.api_key.is_some(),
        "page_cache_size": state.page_cache.len(),
        "observability": {
            "discover_requests_total": observability.discover_requests_total,
            "page_cache_hits_total": observability.page_cache_hits_total,
            "page_cache_misses_total": observability.page_cache_misses_total,
            "upstream_errors_total": observability.upstream_errors_total,
            "rejected_records_total": observability.rejected_records_total,
        }
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverParams {
    #[serde(default)]
    pub genre: Option<u32>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub released_after: Option<String>,
    #[serde(default)]
    pub min_votes: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
}

/// Serve one validated page of a catalog query, from cache when fresh.
pub async fn discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverParams>,
) -> Result<Response, StatusCode> {
    state.observability.record_discover_request();
    let key = parse_discover_params(params)?;

    let now = Utc::now();
    let cached = state
        .page_cache
        .get(&key)
        .filter(|cached| state.is_fresh(cached, now))
        .map(|cached| Arc::clone(&cached.json));
    if let Some(json) = cached {
        state.observability.record_page_cache_hit();
        return Ok(json_bytes_response(Bytes::clone(&json), DISCOVER_CACHE_CONTROL));
    }
    state.observability.record_page_cache_miss();

    let Some(api_key) = state.tmdb.api_key.as_deref() else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };
    let (query, page) = &key;
    let (catalog_page, rejected) = tmdb::fetch_page(
        &state.http_client,
        &state.tmdb.discover_url,
        api_key,
        query,
        *page,
    )
    .await
    .inspect_err(|_| state.observability.record_upstream_error())?;

    if rejected > 0 {
        state.observability.record_rejected_records(rejected as u64);
    }
    debug!(
        page,
        records = catalog_page.records.len(),
        rejected,
        has_more = catalog_page.has_more,
        "fetched discover page"
    );

    let json = serde_json::to_vec(&catalog_page)
        .map(Bytes::from)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    cache_page(&state, key, json.clone());

    Ok(json_bytes_response(json, DISCOVER_CACHE_CONTROL))
}

fn parse_discover_params(params: DiscoverParams) -> Result<PageKey, StatusCode> {
    let sort = match params.sort.as_deref().map(str::trim) {
        None | Some("") => SortOrder::default(),
        Some(raw) => raw.parse::<SortOrder>().map_err(|_| StatusCode::BAD_REQUEST)?,
    };
    let released_after = match params.released_after.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| StatusCode::BAD_REQUEST)?,
        ),
    };
    let page = params.page.unwrap_or(1);
    if page == 0 || page > MAX_DISCOVER_PAGE {
        return Err(StatusCode::BAD_REQUEST);
    }

    let query = CatalogQuery {
        genre: params.genre,
        sort,
        released_after,
        min_votes: params.min_votes.unwrap_or(DEFAULT_MIN_VOTES),
    };
    Ok((query, page))
}

fn cache_page(state: &AppState, key: PageKey, json: Bytes) {
    if !state.page_cache.contains_key(&key) {
        while state.page_cache.len() >= state.max_page_cache_entries {
            if !evict_oldest_page(state) {
                break;
            }
        }
    }

    state.page_cache.insert(
        key,
        CachedPage {
            json: Arc::new(json),
            fetched_at: Utc::now(),
        },
    );
}

fn evict_oldest_page(state: &AppState) -> bool {
    let Some(oldest) = state
        .page_cache
        .iter()
        .min_by_key(|entry| entry.value().fetched_at)
        .map(|entry| entry.key().clone())
    else {
        return false;
    };
    state.page_cache.remove(&oldest).is_some()
}

fn json_bytes_response(body: Bytes, cache_control: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    response
}
