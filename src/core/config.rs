//! Configuration system for tile loading, elevation and overlay behavior
//!
//! Options can be built from presets ([`LoadingProfile`]), tweaked field by field, or
//! loaded from JSON. Every struct carries serde defaults so partial documents work.

use crate::core::constants::{
    DEFAULT_DOWNLOAD_ATTEMPTS, DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_RETRY_AFTER_SECS,
    DEFAULT_SCHEDULING_BUDGET_MS, FILL_BLOCK_SIZE, MAX_ZOOM,
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadingProfile {
    Balanced,
    LowBandwidth,
    Aggressive,
    Custom(TileLoadingConfig),
}

impl LoadingProfile {
    pub fn resolve(&self) -> TileLoadingConfig {
        match self {
            Self::Balanced => TileLoadingConfig::default(),
            Self::LowBandwidth => TileLoadingConfig {
                max_concurrent_downloads: 2,
                download_attempts: 2,
                retry_after_secs: Some(30.0),
                scheduling_budget_ms: 10,
                parent_levels: 1,
                unused_grace_passes: 2,
                memory_cache_size: 128,
            },
            Self::Aggressive => TileLoadingConfig {
                max_concurrent_downloads: 12,
                download_attempts: 5,
                retry_after_secs: Some(2.0),
                scheduling_budget_ms: 40,
                parent_levels: 3,
                unused_grace_passes: 1,
                memory_cache_size: 1024,
            },
            Self::Custom(options) => options.clone(),
        }
    }
}

impl Default for LoadingProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Knobs for the tile store and download scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoadingConfig {
    pub max_concurrent_downloads: usize,
    /// Total attempts per tile, the first download included
    pub download_attempts: u32,
    /// Delay before a failed tile becomes eligible again. `None` disables retries.
    pub retry_after_secs: Option<f64>,
    /// Wall-clock budget for one dispatch pass
    pub scheduling_budget_ms: u64,
    /// Coarser zoom levels kept alongside the view zoom as placeholders
    pub parent_levels: u8,
    /// Reconcile passes a tile may stay unused before it is disposed
    pub unused_grace_passes: u32,
    /// Entries in the in-memory byte cache
    pub memory_cache_size: usize,
}

impl TileLoadingConfig {
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_secs
            .filter(|secs| *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn scheduling_budget(&self) -> Duration {
        Duration::from_millis(self.scheduling_budget_ms)
    }
}

impl Default for TileLoadingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            download_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
            retry_after_secs: Some(DEFAULT_RETRY_AFTER_SECS),
            scheduling_budget_ms: DEFAULT_SCHEDULING_BUDGET_MS,
            parent_levels: 2,
            unused_grace_passes: 1,
            memory_cache_size: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElevationStrategy {
    /// One dataset covering the whole visible area
    #[default]
    SinglePart,
    /// A window of fixed-footprint tiles at a coarser zoom
    Tiled,
}

/// Extent of the host scene the terrain is laid out on. `z` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneExtent {
    pub width: f64,
    pub depth: f64,
}

impl Default for SceneExtent {
    fn default() -> Self {
        Self {
            width: 1000.0,
            depth: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    pub strategy: ElevationStrategy,
    /// Multiplier applied on top of the caller's `y_scale`
    pub scale: f32,
    pub tween_enabled: bool,
    pub tween_duration_secs: f32,
    pub scene: SceneExtent,
    /// Samples per axis requested by the single-part strategy
    pub grid_resolution: usize,
    /// How many zoom levels coarser than the map elevation tiles are
    pub zoom_offset: u8,
    /// Zoom levels searched above and below the exact tile when sampling
    pub search_depth: u8,
    pub max_concurrent_downloads: usize,
    pub download_attempts: u32,
    /// Delay before a failed elevation request is sent again; `None` disables retries
    pub retry_after_secs: Option<f64>,
}

impl ElevationConfig {
    pub fn tween_duration(&self) -> Duration {
        Duration::from_secs_f32(self.tween_duration_secs.max(0.0))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_secs
            .filter(|secs| *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            strategy: ElevationStrategy::SinglePart,
            scale: 1.0,
            tween_enabled: true,
            tween_duration_secs: 0.5,
            scene: SceneExtent::default(),
            grid_resolution: 32,
            zoom_offset: 3,
            search_depth: 3,
            max_concurrent_downloads: 2,
            download_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
            retry_after_secs: Some(DEFAULT_RETRY_AFTER_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    /// Clip overlay geometry against the view rectangle before stroking
    pub clip_to_view: bool,
    pub default_stroke_width: f64,
    pub fill_block_size: usize,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            clip_to_view: true,
            default_stroke_width: 2.0,
            fill_block_size: FILL_BLOCK_SIZE,
        }
    }
}

/// Top-level options handed to [`crate::MapContext`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    pub tiles: TileLoadingConfig,
    pub elevation: ElevationConfig,
    pub drawing: DrawingConfig,
}

impl MapOptions {
    pub fn with_profile(profile: LoadingProfile) -> Self {
        Self {
            tiles: profile.resolve(),
            ..Default::default()
        }
    }

    /// Parses and validates options from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let options: MapOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiles.max_concurrent_downloads == 0 {
            return Err(MapError::InvalidConfig(
                "max_concurrent_downloads must be at least 1".to_string(),
            ));
        }
        if self.tiles.download_attempts == 0 {
            return Err(MapError::InvalidConfig(
                "download_attempts must be at least 1".to_string(),
            ));
        }
        if self.tiles.memory_cache_size == 0 {
            return Err(MapError::InvalidConfig(
                "memory_cache_size must be at least 1".to_string(),
            ));
        }
        if self.elevation.zoom_offset > MAX_ZOOM {
            return Err(MapError::InvalidConfig(format!(
                "zoom_offset {} exceeds {}",
                self.elevation.zoom_offset, MAX_ZOOM
            )));
        }
        if self.elevation.grid_resolution < 2 {
            return Err(MapError::InvalidConfig(
                "grid_resolution must be at least 2".to_string(),
            ));
        }
        if self.elevation.scene.width <= 0.0 || self.elevation.scene.depth <= 0.0 {
            return Err(MapError::InvalidConfig(
                "scene extent must be positive".to_string(),
            ));
        }
        if self.elevation.max_concurrent_downloads == 0 {
            return Err(MapError::InvalidConfig(
                "elevation max_concurrent_downloads must be at least 1".to_string(),
            ));
        }
        if self.drawing.fill_block_size < 2 {
            return Err(MapError::InvalidConfig(
                "fill_block_size must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}
