//! Terrain elevation for 3D scenes.
//!
//! Two strategies share the [`ElevationSource`] contract: [`SinglePartElevation`] fetches
//! one grid covering the whole view, [`TiledElevation`] keeps a window of fixed-footprint
//! tiles a few zoom levels coarser than the map. Both sample in scene space, where the
//! scene spans `[0, width] × [0, depth]` and `z` grows southward.

pub mod grid;
pub mod parser;
pub mod provider;
pub mod single;
pub mod tiled;
pub mod tween;

pub use grid::HeightGrid;
pub use provider::{ArcGisElevationProvider, ElevationProvider};
pub use single::SinglePartElevation;
pub use tiled::TiledElevation;

use crate::cache::CacheStore;
use crate::core::config::{ElevationConfig, ElevationStrategy, SceneExtent};
use crate::core::geo::{GeoRect, LatLng};
use crate::core::viewport::Viewport;
use crate::prelude::Arc;
use crate::runtime::AsyncSpawner;
use crate::tiles::fetch::Fetcher;

pub trait ElevationSource: Send {
    /// Advances downloads and the tween by `dt` seconds. Returns `true` when the
    /// sampled surface changed.
    fn update(&mut self, viewport: &Viewport, dt: f32) -> bool;

    /// Height at scene position `(x, z)` where the scene shows `bounds`.
    ///
    /// The result is `sample × y_scale × scale`, or 0 when no data covers the point.
    fn elevation(&self, x: f64, z: f64, y_scale: f32, bounds: &GeoRect) -> f32;

    /// Extremes of the samples currently in view
    fn min_max(&mut self) -> Option<(i16, i16)>;

    /// Forgets the pending request so its result is ignored
    fn cancel_current_request(&mut self);

    fn has_data(&self) -> bool;
}

/// Collaborators shared by both strategies
#[derive(Clone)]
pub struct ElevationServices {
    pub provider: Arc<dyn ElevationProvider>,
    pub fetcher: Arc<dyn Fetcher>,
    pub cache: Arc<dyn CacheStore>,
    pub spawner: Arc<dyn AsyncSpawner>,
}

/// Builds the strategy named by the configuration
pub fn build_source(config: ElevationConfig, services: ElevationServices) -> Box<dyn ElevationSource> {
    match config.strategy {
        ElevationStrategy::SinglePart => Box::new(SinglePartElevation::new(config, services)),
        ElevationStrategy::Tiled => Box::new(TiledElevation::new(config, services)),
    }
}

/// Result of a spawned elevation download
#[derive(Debug)]
pub(crate) struct ElevationResponse {
    /// Request id (single-part) or tile generation (tiled)
    pub ticket: u64,
    pub key: u64,
    pub result: std::result::Result<HeightGrid, String>,
    pub from_cache: bool,
}

/// Maps a scene position onto the geographic box the scene shows
pub(crate) fn scene_to_geo(scene: &SceneExtent, x: f64, z: f64, bounds: &GeoRect) -> LatLng {
    let nx = (x / scene.width).clamp(0.0, 1.0);
    let nz = (z / scene.depth).clamp(0.0, 1.0);
    bounds.lerp(nx, nz)
}
