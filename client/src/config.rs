use std::time::Duration;

use crate::tile_grid::ViewportSize;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:3000";
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16; // ~60 fps
pub const DEFAULT_POOL_LOW_WATERMARK: usize = 20;
pub const DEFAULT_MAX_PAGES_PER_REFILL: usize = 3;
pub const DEFAULT_ASSIGNMENT_WARN_THRESHOLD: usize = 50_000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

pub fn api_base() -> String {
    std::env::var("CINEWALL_API_BASE")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

pub fn frame_interval() -> Duration {
    std::env::var("CINEWALL_FRAME_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS))
}

/// Viewport as `WIDTHxHEIGHT`, e.g. `1920x1080`.
pub fn viewport() -> ViewportSize {
    std::env::var("CINEWALL_VIEWPORT")
        .ok()
        .and_then(|value| parse_viewport(&value))
        .unwrap_or_default()
}

pub fn eviction_buffer(default: i32) -> i32 {
    std::env::var("CINEWALL_EVICTION_BUFFER")
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .filter(|value| *value >= 0)
        .unwrap_or(default)
}

pub fn pool_low_watermark() -> usize {
    std::env::var("CINEWALL_POOL_LOW_WATERMARK")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_POOL_LOW_WATERMARK)
}

fn parse_viewport(value: &str) -> Option<ViewportSize> {
    let (w, h) = value.trim().split_once(['x', 'X'])?;
    let width = w.trim().parse::<f64>().ok().filter(|v| *v > 0.0 && v.is_finite())?;
    let height = h.trim().parse::<f64>().ok().filter(|v| *v > 0.0 && v.is_finite())?;
    Some(ViewportSize { width, height })
}
