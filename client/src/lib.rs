//! Infinite pan/zoom poster wall: camera, tile virtualization and the
//! coordinate-to-record assignment that keeps revisited cells stable.

pub mod assignment;
pub mod camera;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod grid;
pub mod interaction;
pub mod record_pool;
pub mod render_loop;
pub mod tile_grid;

#[cfg(test)]
mod test_support;

pub use assignment::{AssignmentCache, Resolution};
pub use camera::{Camera, CameraTransform};
pub use catalog::{CatalogError, CatalogSource, HttpCatalog};
pub use engine::{DetailSink, Engine, EngineConfig, TickReport, TileRenderer};
pub use grid::{CellSize, GridCoordinate, GridRange};
pub use interaction::{InteractionState, Phase};
pub use record_pool::{PoolStats, RecordPool};
pub use tile_grid::{TileGrid, ViewportSize};
