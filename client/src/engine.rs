use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use cinewall_shared::{CatalogQuery, CatalogRecord};
use tracing::{debug, info, trace};

use crate::assignment::AssignmentCache;
use crate::camera::{Camera, CameraTransform};
use crate::catalog::CatalogSource;
use crate::config;
use crate::grid::{CellSize, GridCoordinate, GridRange};
use crate::interaction::{Effect, Hit, InteractionState, Phase};
use crate::record_pool::{PoolStats, RecordPool};
use crate::tile_grid::{
    CREATION_MARGIN, Completion, EVICTION_BUFFER, STARVATION_BACKOFF_FRAMES, TileGrid,
    TileGridConfig, ViewportSize,
};

/// Presentation side of a tile. The engine never looks inside a handle.
pub trait TileRenderer {
    type Handle;

    fn on_tile_create(&mut self, coord: GridCoordinate, record: &CatalogRecord) -> Self::Handle;
    fn on_tile_destroy(&mut self, coord: GridCoordinate, handle: Self::Handle);
    fn on_camera_transform(&mut self, transform: CameraTransform);

    /// Highlight the locked tile, or clear the highlight.
    fn on_lock_target(&mut self, _coord: Option<GridCoordinate>) {}
}

/// Receives the record the user is looking at.
pub trait DetailSink {
    fn on_focus(&mut self, record: Option<&CatalogRecord>);
    fn on_lock_changed(&mut self, locked: bool);
    fn on_scroll(&mut self, _delta_y: f64) {}
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cell: CellSize,
    pub creation_margin: i32,
    pub eviction_buffer: i32,
    pub pool_low_watermark: usize,
    pub max_pages_per_refill: usize,
    pub starvation_backoff_frames: u64,
    pub assignment_warn_threshold: usize,
    pub viewport: ViewportSize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cell: CellSize::default(),
            creation_margin: CREATION_MARGIN,
            eviction_buffer: EVICTION_BUFFER,
            pool_low_watermark: config::DEFAULT_POOL_LOW_WATERMARK,
            max_pages_per_refill: config::DEFAULT_MAX_PAGES_PER_REFILL,
            starvation_backoff_frames: STARVATION_BACKOFF_FRAMES,
            assignment_warn_threshold: config::DEFAULT_ASSIGNMENT_WARN_THRESHOLD,
            viewport: ViewportSize::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            eviction_buffer: config::eviction_buffer(EVICTION_BUFFER),
            pool_low_watermark: config::pool_low_watermark(),
            viewport: config::viewport(),
            ..Self::default()
        }
    }

    fn tile_grid(&self) -> TileGridConfig {
        TileGridConfig {
            cell: self.cell,
            creation_margin: self.creation_margin,
            eviction_buffer: self.eviction_buffer,
            starvation_backoff_frames: self.starvation_backoff_frames,
        }
    }
}

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    pub visible: GridRange,
    pub requested: usize,
    pub evicted: usize,
}

/// State reachable from spawned resolution tasks.
struct Shared<S, R: TileRenderer> {
    assignments: AssignmentCache<S>,
    tiles: RefCell<TileGrid<R::Handle>>,
    renderer: RefCell<R>,
    frame: Cell<u64>,
}

impl<S, R: TileRenderer> Shared<S, R> {
    fn finish_resolution(
        &self,
        coord: GridCoordinate,
        epoch: u64,
        resolution: crate::assignment::Resolution,
    ) {
        let frame = self.frame.get();
        let refill_generation = self.assignments.pool().refill_generation();
        let completion = self.tiles.borrow_mut().complete(
            coord,
            epoch,
            resolution,
            frame,
            refill_generation,
            |coord, record| self.renderer.borrow_mut().on_tile_create(coord, record),
        );
        match completion {
            Completion::Bound => trace!(%coord, "tile bound"),
            Completion::Reverted => trace!(%coord, "no record available, backing off"),
            Completion::Discarded => {}
        }
    }

    fn destroy_all(&self, released: Vec<(GridCoordinate, R::Handle)>) {
        let mut renderer = self.renderer.borrow_mut();
        for (coord, handle) in released {
            renderer.on_tile_destroy(coord, handle);
        }
    }
}

/// Owns the camera, the interaction state and the tile grid, and drives them
/// from input events and frame ticks.
///
/// Resolutions run as `spawn_local` tasks, so every method that can start one
/// (`tick`) must be called from inside a `tokio::task::LocalSet`.
pub struct Engine<S, R: TileRenderer, D> {
    shared: Rc<Shared<S, R>>,
    camera: Camera,
    interaction: InteractionState,
    detail: D,
    config: EngineConfig,
    viewport: ViewportSize,
}

impl<S, R, D> Engine<S, R, D>
where
    S: CatalogSource + 'static,
    R: TileRenderer + 'static,
    D: DetailSink,
{
    pub fn new(source: S, renderer: R, detail: D, query: CatalogQuery, config: EngineConfig) -> Self {
        let pool = RecordPool::new(source, query, config.max_pages_per_refill);
        let assignments = AssignmentCache::new(
            pool,
            config.pool_low_watermark,
            config.assignment_warn_threshold,
        );
        let shared = Rc::new(Shared {
            assignments,
            tiles: RefCell::new(TileGrid::new(config.tile_grid())),
            renderer: RefCell::new(renderer),
            frame: Cell::new(0),
        });
        Self {
            shared,
            camera: Camera::default(),
            interaction: InteractionState::new(),
            detail,
            viewport: config.viewport,
            config,
        }
    }

    /// Fill the pool before the first frame so the opening view binds at once.
    pub async fn prime(&self) -> usize {
        let assignments = &self.shared.assignments;
        let pooled = assignments
            .pool()
            .ensure_minimum(self.config.pool_low_watermark, |id| assignments.is_bound(id))
            .await;
        info!(pooled, "record pool primed");
        pooled
    }

    /// Advance one frame: smooth the camera, publish its transform and
    /// reconcile tiles against the visible range.
    pub fn tick(&mut self) -> TickReport {
        let frame = self.shared.frame.get() + 1;
        self.shared.frame.set(frame);

        self.camera.update();
        self.shared
            .renderer
            .borrow_mut()
            .on_camera_transform(self.camera.transform());

        let refill_generation = self.shared.assignments.pool().refill_generation();
        let (plan, epoch) = {
            let mut tiles = self.shared.tiles.borrow_mut();
            let visible = tiles.visible_range(&self.camera, self.viewport);
            let plan = tiles.reconcile(visible, self.interaction.locked(), frame, refill_generation);
            (plan, tiles.epoch())
        };

        let evicted = plan.evicted.len();
        self.shared.destroy_all(plan.evicted);

        let requested = plan.to_resolve.len();
        let assignment_epoch = self.shared.assignments.epoch();
        for coord in plan.to_resolve {
            self.spawn_resolution(coord, epoch, assignment_epoch);
        }

        if requested > 0 || evicted > 0 {
            debug!(
                frame,
                requested,
                evicted,
                tiles = self.shared.tiles.borrow().len(),
                "reconciled tiles"
            );
        }

        TickReport {
            frame,
            visible: plan.visible,
            requested,
            evicted,
        }
    }

    fn spawn_resolution(&self, coord: GridCoordinate, tile_epoch: u64, assignment_epoch: u64) {
        let shared = Rc::clone(&self.shared);
        tokio::task::spawn_local(async move {
            let resolution = shared.assignments.resolve(coord, assignment_epoch).await;
            shared.finish_resolution(coord, tile_epoch, resolution);
        });
    }

    /// Clear every tile, binding and pooled record, and switch to `query`.
    pub fn reset_universe(&mut self, query: CatalogQuery) {
        let effects = self.interaction.clear();
        self.apply(effects);

        let released = self.shared.tiles.borrow_mut().reset();
        let destroyed = released.len();
        self.shared.destroy_all(released);
        self.shared.assignments.reset(query.clone());

        info!(
            destroyed,
            epoch = self.shared.assignments.epoch(),
            genre = ?query.genre,
            sort = query.sort.as_param(),
            "universe reset"
        );
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.viewport = ViewportSize { width, height };
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, over_ui: bool) {
        let hit = self.hit_at(x, y);
        let effects = self.interaction.pointer_down(x, y, hit.as_ref(), over_ui);
        self.apply(effects);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, over_ui: bool) {
        let hit = self.hit_at(x, y);
        let effects = self.interaction.pointer_move(x, y, hit.as_ref(), over_ui);
        self.apply(effects);
    }

    pub fn pointer_up(&mut self) {
        self.interaction.pointer_up();
    }

    pub fn double_click(&mut self, x: f64, y: f64, over_ui: bool) {
        let hit = self.hit_at(x, y);
        let effects = self.interaction.double_click(hit.as_ref(), over_ui);
        self.apply(effects);
    }

    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64, over_ui: bool) {
        let effects = self.interaction.wheel(x, y, delta_y, over_ui);
        self.apply(effects);
    }

    pub fn set_input_suppressed(&mut self, suppressed: bool) {
        self.interaction.set_suppressed(suppressed);
    }

    /// Bound tile drawn under a screen point, using what is on screen now.
    pub fn hit_at(&self, x: f64, y: f64) -> Option<Hit> {
        let (wx, wy) = self.camera.screen_to_world(x, y);
        let coord = self.config.cell.coordinate_at(wx, wy)?;
        let tiles = self.shared.tiles.borrow();
        tiles.bound_at(coord).map(|record| Hit {
            coord,
            record: record.clone(),
        })
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Pan { dx, dy } => self.camera.pan(dx, dy),
                Effect::Zoom {
                    client_x,
                    client_y,
                    delta,
                } => self.camera.zoom_at(client_x, client_y, delta),
                Effect::Focus(record) => self.detail.on_focus(record.as_ref()),
                Effect::LockChanged(locked) => self.detail.on_lock_changed(locked),
                Effect::LockTarget(coord) => {
                    self.shared.renderer.borrow_mut().on_lock_target(coord);
                }
                Effect::ScrollDetail(delta) => self.detail.on_scroll(delta),
            }
        }
    }
}

impl<S, R: TileRenderer, D> Engine<S, R, D> {
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn phase(&self) -> Phase {
        self.interaction.phase()
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn frame(&self) -> u64 {
        self.shared.frame.get()
    }

    pub fn epoch(&self) -> u64 {
        self.shared.tiles.borrow().epoch()
    }

    pub fn visible_range(&self) -> GridRange {
        self.shared
            .tiles
            .borrow()
            .visible_range(&self.camera, self.viewport)
    }

    pub fn tile_count(&self) -> usize {
        self.shared.tiles.borrow().len()
    }

    pub fn bound_count(&self) -> usize {
        self.shared.tiles.borrow().bound_count()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.tiles.borrow().pending_count()
    }

    pub fn bound_at(&self, coord: GridCoordinate) -> Option<CatalogRecord> {
        self.shared.tiles.borrow().bound_at(coord).cloned()
    }

    pub fn is_pending(&self, coord: GridCoordinate) -> bool {
        self.shared.tiles.borrow().is_pending(coord)
    }

    pub fn tile_coords(&self) -> Vec<GridCoordinate> {
        self.shared.tiles.borrow().coords().collect()
    }

    pub fn assignments(&self) -> &AssignmentCache<S> {
        &self.shared.assignments
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.shared.assignments.pool().stats()
    }

    pub fn renderer(&self) -> Ref<'_, R> {
        self.shared.renderer.borrow()
    }

    pub fn detail(&self) -> &D {
        &self.detail
    }
}
