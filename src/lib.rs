//! # terrascope
//!
//! An online map tiling engine: tiles are fetched from remote providers, kept in a
//! reconciled store keyed by `(zoom, x, y)`, and exposed to a host renderer together with
//! elevation data for 3D terrain and vector overlays (lines, polygons, rectangles).
//!
//! The crate does not render anything itself. The host engine consumes finished tile
//! buffers, elevation samples and overlay meshes, and listens to [`events::MapEvent`]s.

pub mod cache;
pub mod core;
pub mod drawing;
pub mod elevation;
pub mod events;
pub mod markers;
pub mod prelude;
pub mod runtime;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::MapOptions,
    geo::{GeoRect, LatLng, Point},
    map::{MapContext, MapServices},
    projection::Projection,
    viewport::Viewport,
};

pub use tiles::{
    key::TileId,
    manager::TileManager,
    tile::{Tile, TileStatus},
};

pub use elevation::{ElevationSource, SinglePartElevation, TiledElevation};

pub use drawing::{DrawingElement, DrawingEngine};

pub use events::{EventBus, MapEvent};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid element: {0}")]
    InvalidElement(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Error type alias for convenience
pub type Error = MapError;
