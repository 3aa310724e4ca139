use std::time::Duration;

pub const TMDB_DISCOVER_URL: &str = "https://api.themoviedb.org/3/discover/movie";
/// TMDB refuses pages past 500 regardless of `total_pages`.
pub const MAX_DISCOVER_PAGE: u32 = 500;

pub const DEFAULT_PAGE_CACHE_TTL_SECS: i64 = 900; // 15 minutes
pub const DEFAULT_MAX_PAGE_CACHE_ENTRIES: usize = 2048;
pub const PAGE_CACHE_EVICTION_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

pub fn tmdb_api_key() -> Option<String> {
    std::env::var("TMDB_API_KEY")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn tmdb_discover_url() -> String {
    std::env::var("TMDB_DISCOVER_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| reqwest::Url::parse(value).is_ok())
        .unwrap_or_else(|| TMDB_DISCOVER_URL.to_string())
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn page_cache_ttl_secs() -> i64 {
    std::env::var("PAGE_CACHE_TTL_SECS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PAGE_CACHE_TTL_SECS)
}

pub fn max_page_cache_entries() -> usize {
    std::env::var("MAX_PAGE_CACHE_ENTRIES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_PAGE_CACHE_ENTRIES)
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}
