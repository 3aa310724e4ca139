use std::time::Duration;

use chrono::Local;
use cinewall_client::{
    CameraTransform, CatalogSource, DetailSink, Engine, EngineConfig, GridCoordinate,
    HttpCatalog, TileRenderer, config, render_loop,
};
use cinewall_shared::{CatalogQuery, CatalogRecord, QueryPreset};
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

/// Frames in the scripted session: a drag, a zoom, a lock, then a query change.
const SESSION_FRAMES: u64 = 240;

/// Stands in for a real renderer by logging tile lifecycle events.
#[derive(Default)]
struct LogRenderer {
    next_handle: u64,
    live: usize,
}

impl TileRenderer for LogRenderer {
    type Handle = u64;

    fn on_tile_create(&mut self, coord: GridCoordinate, record: &CatalogRecord) -> u64 {
        self.next_handle += 1;
        self.live += 1;
        tracing::trace!(%coord, id = %record.id, title = %record.title, "create tile");
        self.next_handle
    }

    fn on_tile_destroy(&mut self, coord: GridCoordinate, handle: u64) {
        self.live = self.live.saturating_sub(1);
        tracing::trace!(%coord, handle, "destroy tile");
    }

    fn on_camera_transform(&mut self, _transform: CameraTransform) {}

    fn on_lock_target(&mut self, coord: Option<GridCoordinate>) {
        tracing::info!(locked = ?coord.map(|c| c.to_string()), "lock highlight");
    }
}

struct LogDetail;

impl DetailSink for LogDetail {
    fn on_focus(&mut self, record: Option<&CatalogRecord>) {
        match record {
            Some(record) => tracing::info!(
                title = %record.title,
                year = ?record.release_year(),
                rating = ?record.vote_average,
                "detail shown"
            ),
            None => tracing::info!("detail hidden"),
        }
    }

    fn on_lock_changed(&mut self, locked: bool) {
        tracing::info!(locked, "detail lock changed");
    }

    fn on_scroll(&mut self, delta_y: f64) {
        tracing::debug!(delta_y, "detail scrolled");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let api_base = config::api_base();
    let interval = config::frame_interval();
    let engine_config = EngineConfig::from_env();
    tracing::info!(
        %api_base,
        frame_ms = interval.as_millis() as u64,
        width = engine_config.viewport.width,
        height = engine_config.viewport.height,
        "starting cinewall session"
    );

    let source = HttpCatalog::new(
        &api_base,
        Duration::from_secs(config::DEFAULT_HTTP_TIMEOUT_SECS),
    );
    let mut engine = Engine::new(
        source,
        LogRenderer::default(),
        LogDetail,
        CatalogQuery::default(),
        engine_config,
    );

    LocalSet::new()
        .run_until(async move {
            if engine.prime().await == 0 {
                tracing::warn!("catalog returned no records; is the server running?");
            }

            let summary =
                render_loop::run(&mut engine, interval, SESSION_FRAMES, script).await;

            let stats = engine.pool_stats();
            tracing::info!(
                frames = summary.frames,
                requested = summary.requested,
                evicted = summary.evicted,
                tiles = engine.tile_count(),
                live_handles = engine.renderer().live,
                bindings = engine.assignments().len(),
                pages = stats.pages_requested,
                failed_pages = stats.pages_failed,
                "session finished"
            );
        })
        .await;
}

/// Scripted input standing in for a user.
fn script<S, R, D>(engine: &mut Engine<S, R, D>, frame: u64)
where
    S: CatalogSource + 'static,
    R: TileRenderer + 'static,
    D: DetailSink,
{
    let viewport = engine.viewport();
    let (cx, cy) = (viewport.width / 2.0, viewport.height / 2.0);
    match frame {
        10 => engine.pointer_down(cx, cy, false),
        11..=70 => {
            let step = (frame - 10) as f64;
            engine.pointer_move(cx - step * 25.0, cy - step * 10.0, false);
        }
        71 => engine.pointer_up(),
        90 => engine.wheel(cx, cy, 200.0, false),
        120 => {
            engine.pointer_move(cx, cy, false);
            engine.double_click(cx, cy, false);
        }
        130 => engine.wheel(cx, cy, 120.0, false),
        160 => {
            let today = Local::now().date_naive();
            let query = CatalogQuery::with_genre(Some(878)).preset(QueryPreset::RecentLiked, today);
            engine.reset_universe(query);
        }
        _ => {}
    }
}
