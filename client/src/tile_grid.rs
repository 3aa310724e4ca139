use std::collections::HashMap;

use cinewall_shared::CatalogRecord;
use tracing::trace;

use crate::assignment::Resolution;
use crate::camera::Camera;
use crate::grid::{CellSize, GridCoordinate, GridRange};

pub const CREATION_MARGIN: i32 = 1;
pub const EVICTION_BUFFER: i32 = 6;
pub const STARVATION_BACKOFF_FRAMES: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Lifecycle of one grid cell. Cells with no entry are absent.
#[derive(Debug)]
pub enum TileSlot<H> {
    /// A resolution is in flight. Written before the lookup suspends so the
    /// same coordinate is never resolved twice at once.
    Pending { epoch: u64 },
    Bound { record: CatalogRecord, handle: H },
}

/// Work produced by one reconciliation pass.
#[derive(Debug)]
pub struct ReconcilePlan<H> {
    pub visible: GridRange,
    pub to_resolve: Vec<GridCoordinate>,
    pub evicted: Vec<(GridCoordinate, H)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Bound,
    /// Nothing was available; the cell is absent again and backing off.
    Reverted,
    /// The cell was evicted or the universe reset before the lookup finished.
    Discarded,
}

#[derive(Debug, Clone, Copy)]
struct Starved {
    retry_at_frame: u64,
    refill_generation: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TileGridConfig {
    pub cell: CellSize,
    pub creation_margin: i32,
    pub eviction_buffer: i32,
    pub starvation_backoff_frames: u64,
}

impl Default for TileGridConfig {
    fn default() -> Self {
        Self {
            cell: CellSize::default(),
            creation_margin: CREATION_MARGIN,
            eviction_buffer: EVICTION_BUFFER,
            starvation_backoff_frames: STARVATION_BACKOFF_FRAMES,
        }
    }
}

/// Keeps one tile per cell near the viewport and none far away.
///
/// Tiles are created within the visible range (plus a one-cell margin) but
/// only evicted once they leave the visible range expanded by the eviction
/// buffer, so small camera oscillations never destroy and recreate a tile.
#[derive(Debug)]
pub struct TileGrid<H> {
    config: TileGridConfig,
    epoch: u64,
    tiles: HashMap<GridCoordinate, TileSlot<H>>,
    starved: HashMap<GridCoordinate, Starved>,
}

impl<H> TileGrid<H> {
    pub fn new(config: TileGridConfig) -> Self {
        Self {
            config,
            epoch: 0,
            tiles: HashMap::new(),
            starved: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TileGridConfig {
        &self.config
    }

    /// Cells covered by the viewport under the camera's target transform.
    pub fn visible_range(&self, camera: &Camera, viewport: ViewportSize) -> GridRange {
        let cell = self.config.cell;
        let margin = self.config.creation_margin;
        let left = -camera.target_x / camera.target_scale;
        let right = (-camera.target_x + viewport.width) / camera.target_scale;
        let top = -camera.target_y / camera.target_scale;
        let bottom = (-camera.target_y + viewport.height) / camera.target_scale;

        GridRange {
            min_col: (left / cell.width).floor() as i32 - margin,
            max_col: (right / cell.width).floor() as i32 + margin,
            min_row: (top / cell.height).floor() as i32 - margin,
            max_row: (bottom / cell.height).floor() as i32 + margin,
        }
    }

    /// Mark absent visible cells pending and evict bound tiles beyond the
    /// eviction buffer, except `locked`.
    pub fn reconcile(
        &mut self,
        visible: GridRange,
        locked: Option<GridCoordinate>,
        frame: u64,
        refill_generation: u64,
    ) -> ReconcilePlan<H> {
        let mut to_resolve = Vec::new();
        for coord in visible.iter() {
            if self.tiles.contains_key(&coord) {
                continue;
            }
            if let Some(starved) = self.starved.get(&coord) {
                let waited = frame >= starved.retry_at_frame;
                let refilled = refill_generation != starved.refill_generation;
                if !waited && !refilled {
                    continue;
                }
                self.starved.remove(&coord);
            }
            self.tiles.insert(coord, TileSlot::Pending { epoch: self.epoch });
            to_resolve.push(coord);
        }

        let keep = visible.expand(self.config.eviction_buffer);
        let doomed: Vec<GridCoordinate> = self
            .tiles
            .iter()
            .filter(|(coord, slot)| {
                matches!(slot, TileSlot::Bound { .. })
                    && !keep.contains(**coord)
                    && Some(**coord) != locked
            })
            .map(|(coord, _)| *coord)
            .collect();

        let mut evicted = Vec::with_capacity(doomed.len());
        for coord in doomed {
            if let Some(TileSlot::Bound { handle, .. }) = self.tiles.remove(&coord) {
                trace!(%coord, "evicting tile");
                evicted.push((coord, handle));
            }
        }
        self.starved.retain(|coord, _| keep.contains(*coord));

        ReconcilePlan {
            visible,
            to_resolve,
            evicted,
        }
    }

    /// Apply the result of a resolution started in `epoch`. `create` is only
    /// called when the cell is still pending in the same epoch.
    pub fn complete(
        &mut self,
        coord: GridCoordinate,
        epoch: u64,
        resolution: Resolution,
        frame: u64,
        refill_generation: u64,
        create: impl FnOnce(GridCoordinate, &CatalogRecord) -> H,
    ) -> Completion {
        let still_pending = matches!(
            self.tiles.get(&coord),
            Some(TileSlot::Pending { epoch: pending }) if *pending == epoch
        );
        if !still_pending || epoch != self.epoch {
            trace!(%coord, "dropping resolution for a cell that moved on");
            return Completion::Discarded;
        }

        match resolution {
            Resolution::Bound(record) => {
                let handle = create(coord, &record);
                self.tiles.insert(coord, TileSlot::Bound { record, handle });
                Completion::Bound
            }
            Resolution::Unassigned => {
                self.tiles.remove(&coord);
                self.starved.insert(
                    coord,
                    Starved {
                        retry_at_frame: frame + self.config.starvation_backoff_frames,
                        refill_generation,
                    },
                );
                Completion::Reverted
            }
            Resolution::Stale => {
                self.tiles.remove(&coord);
                Completion::Discarded
            }
        }
    }

    /// Drop every tile, locked or not, and start a new epoch. Returns the
    /// handles of bound tiles so they can be released.
    pub fn reset(&mut self) -> Vec<(GridCoordinate, H)> {
        self.epoch += 1;
        self.starved.clear();
        self.tiles
            .drain()
            .filter_map(|(coord, slot)| match slot {
                TileSlot::Bound { handle, .. } => Some((coord, handle)),
                TileSlot::Pending { .. } => None,
            })
            .collect()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn slot(&self, coord: GridCoordinate) -> Option<&TileSlot<H>> {
        self.tiles.get(&coord)
    }

    pub fn bound_at(&self, coord: GridCoordinate) -> Option<&CatalogRecord> {
        match self.tiles.get(&coord) {
            Some(TileSlot::Bound { record, .. }) => Some(record),
            _ => None,
        }
    }

    pub fn is_pending(&self, coord: GridCoordinate) -> bool {
        matches!(self.tiles.get(&coord), Some(TileSlot::Pending { .. }))
    }

    pub fn is_starved(&self, coord: GridCoordinate) -> bool {
        self.starved.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.tiles
            .values()
            .filter(|slot| matches!(slot, TileSlot::Pending { .. }))
            .count()
    }

    pub fn bound_count(&self) -> usize {
        self.len() - self.pending_count()
    }

    pub fn coords(&self) -> impl Iterator<Item = GridCoordinate> + '_ {
        self.tiles.keys().copied()
    }
}
