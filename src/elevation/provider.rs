use super::grid::HeightGrid;
use super::parser::parse_height_grid;
use crate::cache::CacheStore;
use crate::core::geo::GeoRect;
use crate::core::projection::Projection;
use crate::prelude::Arc;
use crate::tiles::fetch::Fetcher;
use crate::tiles::key::TileId;
use crate::Result;
use fxhash::FxHasher;
use std::hash::{Hash, Hasher};

/// Where elevation comes from and how its payload is read
pub trait ElevationProvider: Send + Sync {
    /// Prefix that namespaces this provider's entries in a shared cache
    fn cache_prefix(&self) -> &str;

    /// URL for a `width`×`height` grid covering `bounds`
    fn area_url(&self, bounds: &GeoRect, width: usize, height: usize) -> String;

    /// Samples per axis of one elevation tile
    fn tile_resolution(&self) -> usize {
        32
    }

    /// Request for the box `tile` covers in `projection`
    fn tile_url(&self, tile: &TileId, projection: Projection) -> String {
        let size = self.tile_resolution();
        self.area_url(&tile.geo_rect(projection), size, size)
    }

    fn parse(&self, bytes: &[u8], width: usize, height: usize) -> Result<HeightGrid> {
        parse_height_grid(bytes, width, height)
    }

    fn tile_cache_key(&self, tile: &TileId, projection: Projection) -> String {
        match projection {
            Projection::SphericalMercator => format!("{}{}", self.cache_prefix(), tile.key()),
            Projection::Wgs84 => format!("{}wgs84_{}", self.cache_prefix(), tile.key()),
        }
    }

    /// Areas have no tile key, so the request parameters are hashed instead
    fn area_cache_key(&self, bounds: &GeoRect, width: usize, height: usize) -> String {
        let mut hasher = FxHasher::default();
        for value in [bounds.left, bounds.top, bounds.right, bounds.bottom] {
            ((value * 1e6).round() as i64).hash(&mut hasher);
        }
        width.hash(&mut hasher);
        height.hash(&mut hasher);
        format!("{}{}", self.cache_prefix(), hasher.finish())
    }
}

/// ArcGIS ImageServer `exportImage` endpoint returning JSON samples
#[derive(Debug, Clone)]
pub struct ArcGisElevationProvider {
    base_url: String,
    cache_prefix: String,
    tile_resolution: usize,
}

impl ArcGisElevationProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            cache_prefix: "arcgis_".to_string(),
            tile_resolution: 32,
        }
    }

    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    pub fn with_tile_resolution(mut self, resolution: usize) -> Self {
        self.tile_resolution = resolution.max(2);
        self
    }
}

impl Default for ArcGisElevationProvider {
    fn default() -> Self {
        Self::new("https://elevation.arcgis.com/arcgis/rest/services/WorldElevation/Terrain/ImageServer")
    }
}

impl ElevationProvider for ArcGisElevationProvider {
    fn cache_prefix(&self) -> &str {
        &self.cache_prefix
    }

    fn area_url(&self, bounds: &GeoRect, width: usize, height: usize) -> String {
        format!(
            "{}/exportImage?bbox={},{},{},{}&bboxSR=4326&size={},{}&pixelType=S16&format=json&f=pjson",
            self.base_url, bounds.left, bounds.bottom, bounds.right, bounds.top, width, height
        )
    }

    fn tile_resolution(&self) -> usize {
        self.tile_resolution
    }
}

/// Cache first, then network. Grids are cached in their bincode form once they parse.
pub(crate) async fn load_grid(
    provider: Arc<dyn ElevationProvider>,
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheStore>,
    url: String,
    cache_key: String,
    width: usize,
    height: usize,
) -> Result<(HeightGrid, bool)> {
    if let Some(grid) = cached_grid(cache.as_ref(), &cache_key, width, height) {
        return Ok((grid, true));
    }

    let bytes = fetcher.fetch(&url).await?;
    let grid = provider.parse(&bytes, width, height)?;
    store_grid(cache.as_ref(), &cache_key, &grid);
    Ok((grid, false))
}

/// Reads a cached grid, ignoring entries that fail to decode or have the wrong size
pub(crate) fn cached_grid(
    cache: &dyn CacheStore,
    cache_key: &str,
    width: usize,
    height: usize,
) -> Option<HeightGrid> {
    let bytes = cache.get(cache_key)?;
    match HeightGrid::from_bytes(&bytes) {
        Ok(grid) if grid.width() == width && grid.height() == height => Some(grid),
        Ok(grid) => {
            log::warn!(
                "cached elevation {} is {}x{}, expected {}x{}",
                cache_key,
                grid.width(),
                grid.height(),
                width,
                height
            );
            None
        }
        Err(e) => {
            log::warn!("cached elevation {} is unusable: {}", cache_key, e);
            None
        }
    }
}

pub(crate) fn store_grid(cache: &dyn CacheStore, cache_key: &str, grid: &HeightGrid) {
    let result = grid.to_bytes().and_then(|bytes| cache.add(cache_key, &bytes));
    if let Err(e) = result {
        log::warn!("failed to cache {}: {}", cache_key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_url_uses_lower_left_first() {
        let provider = ArcGisElevationProvider::new("https://example.com/ImageServer");
        let url = provider.area_url(&GeoRect::new(10.0, 50.0, 12.0, 48.0), 32, 32);
        assert!(url.starts_with("https://example.com/ImageServer/exportImage?bbox=10,48,12,50"));
        assert!(url.contains("size=32,32"));
    }

    #[test]
    fn test_tile_url_follows_projection() {
        let provider = ArcGisElevationProvider::new("https://example.com/ImageServer");
        let tile = TileId::new(3, 5, 2);
        for projection in [Projection::SphericalMercator, Projection::Wgs84] {
            let rect = tile.geo_rect(projection);
            let bbox = format!("bbox={},{},{},{}", rect.left, rect.bottom, rect.right, rect.top);
            assert!(provider.tile_url(&tile, projection).contains(&bbox));
        }
        assert_ne!(
            provider.tile_url(&tile, Projection::Wgs84),
            provider.tile_url(&tile, Projection::SphericalMercator)
        );
    }

    #[test]
    fn test_cache_keys_are_prefixed_and_stable() {
        let provider = ArcGisElevationProvider::default();
        let tile = TileId::new(5, 3, 9);
        assert_eq!(
            provider.tile_cache_key(&tile, Projection::SphericalMercator),
            format!("arcgis_{}", tile.key())
        );
        assert_ne!(
            provider.tile_cache_key(&tile, Projection::Wgs84),
            provider.tile_cache_key(&tile, Projection::SphericalMercator)
        );

        let rect = GeoRect::new(1.0, 2.0, 3.0, 1.0);
        let a = provider.area_cache_key(&rect, 32, 32);
        assert_eq!(a, provider.area_cache_key(&rect, 32, 32));
        assert_ne!(a, provider.area_cache_key(&rect, 16, 16));
        assert!(a.starts_with("arcgis_"));
    }

    #[test]
    fn test_cached_grid_checks_dimensions() {
        let cache = crate::cache::MemoryCache::new(4);
        let grid = HeightGrid::filled(4, 4, 7).unwrap();
        store_grid(&cache, "k", &grid);

        assert_eq!(cached_grid(&cache, "k", 4, 4), Some(grid));
        assert!(cached_grid(&cache, "k", 8, 8).is_none());
        assert!(cached_grid(&cache, "missing", 4, 4).is_none());
    }
}
