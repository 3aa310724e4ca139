use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::PAGE_CACHE_EVICTION_INTERVAL_SECS;
use crate::state::AppState;

pub async fn run(state: AppState) {
    let mut interval =
        tokio::time::interval(Duration::from_secs(PAGE_CACHE_EVICTION_INTERVAL_SECS));

    loop {
        interval.tick().await;

        let evicted = evict_expired(&state, Utc::now());
        if evicted > 0 {
            info!(
                "evicted {evicted} expired discover pages ({} remaining)",
                state.page_cache.len()
            );
        }
    }
}

/// Drop every cached page older than the TTL. Returns how many were dropped.
pub fn evict_expired(state: &AppState, now: DateTime<Utc>) -> usize {
    let before = state.page_cache.len();
    state.page_cache.retain(|_, cached| state.is_fresh(cached, now));
    before.saturating_sub(state.page_cache.len())
}
