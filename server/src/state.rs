use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use cinewall_shared::CatalogQuery;
use dashmap::DashMap;
use tracing::warn;

use crate::config::{
    max_page_cache_entries, page_cache_ttl_secs, tmdb_api_key, tmdb_discover_url,
    upstream_connect_timeout, upstream_http_timeout,
};

/// Cache key: one page of one query.
pub type PageKey = (CatalogQuery, u32);

/// Pre-serialized `CatalogPage` JSON, shared by every request via Arc.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub json: Arc<Bytes>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TmdbSettings {
    /// None when `TMDB_API_KEY` is unset; discover requests answer 503.
    pub api_key: Option<String>,
    pub discover_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub tmdb: Arc<TmdbSettings>,
    pub page_cache: Arc<DashMap<PageKey, CachedPage>>,
    pub page_cache_ttl_secs: i64,
    pub max_page_cache_entries: usize,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    discover_requests_total: AtomicU64,
    page_cache_hits_total: AtomicU64,
    page_cache_misses_total: AtomicU64,
    upstream_errors_total: AtomicU64,
    rejected_records_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub discover_requests_total: u64,
    pub page_cache_hits_total: u64,
    pub page_cache_misses_total: u64,
    pub upstream_errors_total: u64,
    pub rejected_records_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            discover_requests_total: self.discover_requests_total.load(Ordering::Relaxed),
            page_cache_hits_total: self.page_cache_hits_total.load(Ordering::Relaxed),
            page_cache_misses_total: self.page_cache_misses_total.load(Ordering::Relaxed),
            upstream_errors_total: self.upstream_errors_total.load(Ordering::Relaxed),
            rejected_records_total: self.rejected_records_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_discover_request(&self) {
        self.discover_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_cache_hit(&self) {
        self.page_cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_cache_miss(&self) {
        self.page_cache_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_records(&self, count: u64) {
        self.rejected_records_total
            .fetch_add(count, Ordering::Relaxed);
    }
}

impl AppState {
    /// State configured from the environment.
    pub fn from_env() -> Self {
        Self::new(TmdbSettings {
            api_key: tmdb_api_key(),
            discover_url: tmdb_discover_url(),
        })
    }

    pub fn new(tmdb: TmdbSettings) -> Self {
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("cinewall-server/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, falling back to defaults"
                );
                reqwest::Client::new()
            });
        Self {
            http_client,
            tmdb: Arc::new(tmdb),
            page_cache: Arc::new(DashMap::new()),
            page_cache_ttl_secs: page_cache_ttl_secs(),
            max_page_cache_entries: max_page_cache_entries(),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    pub fn is_fresh(&self, cached: &CachedPage, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(cached.fetched_at).num_seconds() < self.page_cache_ttl_secs
    }
}
