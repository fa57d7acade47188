//! Prelude module for common terrascope types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use terrascope::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{
        DrawingConfig, ElevationConfig, ElevationStrategy, LoadingProfile, MapOptions,
        SceneExtent, TileLoadingConfig,
    },
    geo::{GeoRect, LatLng, Point},
    map::{MapContext, MapServices},
    projection::Projection,
    viewport::Viewport,
};

pub use crate::tiles::{
    fetch::{Fetcher, HttpFetcher},
    key::{TileId, TileKey},
    manager::TileManager,
    source::{OpenStreetMapSource, TemplateSource, TileSource},
    tile::{Pixel, Tile, TileStatus},
};

pub use crate::elevation::{
    grid::HeightGrid, provider::ElevationProvider, ElevationSource, SinglePartElevation,
    TiledElevation,
};

pub use crate::drawing::{
    DrawingElement, DrawingEngine, DrawingStyle, ElementKind, GeometryBuffers, PointSequence,
};

pub use crate::cache::{CacheStore, FileCache, MemoryCache};
pub use crate::events::{EventBus, MapEvent};
pub use crate::markers::{Marker, MarkerTexture};

pub use crate::runtime::{default_spawner, spawn_on, AsyncHandle, AsyncSpawner, InlineSpawner};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::TokioSpawner;

pub use crate::{Error as MapError, Result};

pub use instant::Instant;
pub use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
