//! Core constants shared by the tile, elevation and drawing subsystems.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Number of pixels in one raster tile buffer.
pub const TILE_PIXELS: usize = (TILE_SIZE * TILE_SIZE) as usize;

/// Highest zoom level the packed tile key can represent without collisions.
pub const MAX_ZOOM: u8 = 29;

/// Latitude limit of the spherical Mercator projection.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_8;

/// Default number of simultaneous tile downloads.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 5;

/// Default number of download attempts before a tile stays in the error state.
pub const DEFAULT_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Default delay before a failed tile becomes eligible again.
pub const DEFAULT_RETRY_AFTER_SECS: f64 = 10.0;

/// Default time budget of one scheduling pass.
pub const DEFAULT_SCHEDULING_BUDGET_MS: u64 = 20;

/// Zoom levels a cached elevation tile may drift from the current elevation zoom
/// before it is dropped.
pub const ELEVATION_ZOOM_HYSTERESIS: u8 = 3;

/// Edge length of the pixel blocks used by the polygon fill.
pub const FILL_BLOCK_SIZE: usize = 5;
