use super::grid::HeightGrid;
use super::provider::{cached_grid, load_grid};
use super::{scene_to_geo, ElevationResponse, ElevationServices, ElevationSource};
use crate::core::bounds::Bounds;
use crate::core::config::ElevationConfig;
use crate::core::constants::{ELEVATION_ZOOM_HYSTERESIS, MAX_ZOOM, TILE_SIZE};
use crate::core::geo::{GeoRect, LatLng, Point};
use crate::core::projection::{world_tiles, Projection};
use crate::core::viewport::Viewport;
use crate::prelude::{HashMap, Instant};
use crate::runtime::spawn_on;
use crate::tiles::key::{TileId, TileKey};
use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationTileState {
    Queued,
    Downloading,
    Loaded,
    Error,
}

#[derive(Debug, Clone)]
pub struct ElevationTile {
    pub id: TileId,
    pub state: ElevationTileState,
    grid: Option<HeightGrid>,
    /// Geographic box the grid was requested for
    pub bounds: GeoRect,
    pub used: bool,
    pub attempts_remaining: u32,
    /// When a failed tile goes back to the queue
    pub retry_at: Option<Instant>,
    generation: u64,
}

impl ElevationTile {
    pub fn grid(&self) -> Option<&HeightGrid> {
        self.grid.as_ref()
    }

    fn sample(&self, point: &LatLng) -> Option<f32> {
        let grid = self.grid.as_ref()?;
        let rect = &self.bounds;
        let lng = rect.left + (point.lng - rect.left).rem_euclid(360.0);
        let (nx, ny) = rect.normalize(&LatLng::new(point.lat, lng));
        Some(grid.sample(nx, ny))
    }
}

/// Elevation kept as a window of tiles `zoom_offset` levels coarser than the map
pub struct TiledElevation {
    config: ElevationConfig,
    services: ElevationServices,
    tiles: HashMap<TileKey, ElevationTile>,
    projection: Projection,
    map_zoom: u8,
    elevation_zoom: u8,
    /// Tiles around the view, nearest to the center first
    window: Vec<TileId>,
    /// Visible rectangle in elevation tile space
    view_rect: Bounds,
    in_flight: usize,
    next_generation: u64,
    dirty: bool,
    min_max: Option<(i16, i16)>,
    result_tx: Sender<ElevationResponse>,
    result_rx: Receiver<ElevationResponse>,
}

impl TiledElevation {
    pub fn new(config: ElevationConfig, services: ElevationServices) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            config,
            services,
            tiles: HashMap::default(),
            projection: Projection::SphericalMercator,
            map_zoom: 0,
            elevation_zoom: 0,
            window: Vec::new(),
            view_rect: Bounds::default(),
            in_flight: 0,
            next_generation: 1,
            dirty: false,
            min_max: None,
            result_tx,
            result_rx,
        }
    }

    pub fn elevation_zoom(&self) -> u8 {
        self.elevation_zoom
    }

    pub fn window(&self) -> &[TileId] {
        &self.window
    }

    pub fn tile(&self, id: &TileId) -> Option<&ElevationTile> {
        self.tiles.get(&id.key())
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Seeds a loaded tile, e.g. from a bundled dataset. The grid is taken to cover the
    /// tile in the projection of the last viewport.
    pub fn insert_tile(&mut self, id: TileId, grid: HeightGrid) {
        let generation = self.bump_generation();
        self.tiles.insert(
            id.key(),
            ElevationTile {
                id,
                state: ElevationTileState::Loaded,
                grid: Some(grid),
                bounds: id.geo_rect(self.projection),
                used: false,
                attempts_remaining: self.config.download_attempts,
                retry_at: None,
                generation,
            },
        );
        self.dirty = true;
    }

    fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Recomputes the tile window for the viewport
    fn compute_window(&mut self, viewport: &Viewport) {
        let ez = viewport.zoom.saturating_sub(self.config.zoom_offset);
        let footprint = TILE_SIZE as f64 * 2_f64.powi((viewport.zoom - ez) as i32);
        let n = world_tiles(ez) as i64;
        let cols = ((viewport.size.x / footprint).ceil() as i64 + 2).min(n);
        let rows = (viewport.size.y / footprint).ceil() as i64 + 2;

        let center = viewport
            .projection
            .coordinates_to_tile(viewport.center.lng, viewport.center.lat, ez);
        let start_x = (center.x - cols as f64 / 2.0).floor() as i64;
        let start_y = (center.y - rows as f64 / 2.0).floor() as i64;

        let mut window = Vec::with_capacity((cols * rows).max(0) as usize);
        for y in start_y.max(0)..(start_y + rows).min(n) {
            for x in start_x..start_x + cols {
                window.push((x, y));
            }
        }
        // Nearest to the center first, so downloads fill in from the middle.
        window.sort_by(|a, b| {
            let da = (a.0 as f64 + 0.5 - center.x).powi(2) + (a.1 as f64 + 0.5 - center.y).powi(2);
            let db = (b.0 as f64 + 0.5 - center.x).powi(2) + (b.1 as f64 + 0.5 - center.y).powi(2);
            da.total_cmp(&db)
        });

        self.projection = viewport.projection;
        self.map_zoom = viewport.zoom;
        self.elevation_zoom = ez;
        self.window = window
            .into_iter()
            .map(|(x, y)| TileId::new(ez, x, y))
            .collect();
        self.view_rect = viewport.tile_rect_at(ez);
    }

    /// Whether a tile of any zoom covers part of `rect` (elevation tile space)
    fn overlaps(&self, id: &TileId, rect: &Bounds) -> bool {
        let scale = 2_f64.powi(self.elevation_zoom as i32 - id.zoom as i32);
        let tile_rect = Bounds::from_coords(
            id.x as f64 * scale,
            id.y as f64 * scale,
            (id.x + 1) as f64 * scale,
            (id.y + 1) as f64 * scale,
        );
        let world = world_tiles(self.elevation_zoom);
        [-world, 0.0, world].iter().any(|shift| {
            tile_rect
                .translated(&Point::new(*shift, 0.0))
                .intersects(rect)
        })
    }

    fn mark_and_sweep(&mut self) -> bool {
        for tile in self.tiles.values_mut() {
            tile.used = false;
        }
        for id in self.window.clone() {
            let key = id.key();
            if !self.tiles.contains_key(&key) {
                let generation = self.bump_generation();
                self.tiles.insert(
                    key,
                    ElevationTile {
                        id,
                        state: ElevationTileState::Queued,
                        grid: None,
                        bounds: id.geo_rect(self.projection),
                        used: true,
                        attempts_remaining: self.config.download_attempts,
                        retry_at: None,
                        generation,
                    },
                );
            } else if let Some(tile) = self.tiles.get_mut(&key) {
                tile.used = true;
            }
        }

        let ez = self.elevation_zoom;
        let view = self.view_rect;
        let stale: Vec<TileKey> = self
            .tiles
            .values()
            .filter(|tile| !tile.used)
            .filter(|tile| {
                let keep = tile.state == ElevationTileState::Loaded
                    && tile.id.zoom.abs_diff(ez) <= ELEVATION_ZOOM_HYSTERESIS
                    && self.overlaps(&tile.id, &view);
                !keep
            })
            .map(|tile| tile.id.key())
            .collect();

        let mut removed_loaded = false;
        for key in stale {
            if let Some(tile) = self.tiles.remove(&key) {
                removed_loaded |= tile.state == ElevationTileState::Loaded;
            }
        }
        removed_loaded
    }

    /// Requeues failed tiles whose retry delay has passed
    fn promote_due_retries(&mut self, now: Instant) {
        for tile in self.tiles.values_mut() {
            if tile.state == ElevationTileState::Error
                && tile.retry_at.map_or(false, |at| at <= now)
            {
                log::debug!("retrying elevation tile {}", tile.id);
                tile.retry_at = None;
                tile.state = ElevationTileState::Queued;
            }
        }
    }

    fn dispatch(&mut self) -> bool {
        let mut changed = false;
        let size = self.services.provider.tile_resolution();

        for id in self.window.clone() {
            let key = id.key();
            let queued = self
                .tiles
                .get(&key)
                .map_or(false, |t| t.state == ElevationTileState::Queued);
            if !queued {
                continue;
            }

            let cache_key = self.services.provider.tile_cache_key(&id, self.projection);
            if let Some(grid) = cached_grid(self.services.cache.as_ref(), &cache_key, size, size) {
                if let Some(tile) = self.tiles.get_mut(&key) {
                    log::debug!("elevation tile {} loaded from cache", id);
                    tile.grid = Some(grid);
                    tile.state = ElevationTileState::Loaded;
                    changed = true;
                }
                continue;
            }

            if self.in_flight >= self.config.max_concurrent_downloads {
                continue;
            }
            let Some(tile) = self.tiles.get_mut(&key) else {
                continue;
            };
            tile.state = ElevationTileState::Downloading;
            let generation = tile.generation;
            self.in_flight += 1;

            let provider = self.services.provider.clone();
            let url = provider.tile_url(&id, self.projection);
            let fetcher = self.services.fetcher.clone();
            let cache = self.services.cache.clone();
            let result_tx = self.result_tx.clone();

            log::debug!("starting download for elevation tile {}", id);
            spawn_on(self.services.spawner.as_ref(), async move {
                let (result, from_cache) =
                    match load_grid(provider, fetcher, cache, url, cache_key, size, size).await {
                        Ok((grid, from_cache)) => (Ok(grid), from_cache),
                        Err(e) => (Err(e.to_string()), false),
                    };
                let response = ElevationResponse {
                    ticket: generation,
                    key,
                    result,
                    from_cache,
                };
                if result_tx.send(response).is_err() {
                    log::debug!("elevation source dropped before tile {} completed", id);
                }
            });
        }
        changed
    }

    fn drain_responses(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.result_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);

            let tile = match self.tiles.get_mut(&response.key) {
                Some(tile)
                    if tile.generation == response.ticket
                        && tile.state == ElevationTileState::Downloading =>
                {
                    tile
                }
                _ => {
                    log::debug!(
                        "dropping stale elevation tile {}",
                        TileId::from_key(response.key)
                    );
                    continue;
                }
            };

            match response.result {
                Ok(grid) => {
                    log::info!(
                        "elevation tile {} loaded{}",
                        tile.id,
                        if response.from_cache { " from cache" } else { "" }
                    );
                    tile.grid = Some(grid);
                    tile.state = ElevationTileState::Loaded;
                    changed = true;
                }
                Err(error) => {
                    tile.attempts_remaining = tile.attempts_remaining.saturating_sub(1);
                    tile.state = ElevationTileState::Error;
                    tile.retry_at = match self.config.retry_after() {
                        Some(delay) if tile.attempts_remaining > 0 => {
                            Some(Instant::now() + delay)
                        }
                        _ => None,
                    };
                    if tile.retry_at.is_some() {
                        log::warn!("elevation tile {} failed, will retry: {}", tile.id, error);
                    } else {
                        log::warn!("giving up on elevation tile {}: {}", tile.id, error);
                    }
                }
            }
        }
        changed
    }

    /// Loaded tile covering an elevation-tile-space point: exact zoom, then coarser,
    /// then finer, each at most `search_depth` levels away.
    fn find_loaded(&self, point: &Point) -> Option<&ElevationTile> {
        let ez = self.elevation_zoom;
        let lookup = |zoom: u8| {
            let factor = 2_f64.powi(zoom as i32 - ez as i32);
            let id = TileId::new(
                zoom,
                (point.x * factor).floor() as i64,
                (point.y * factor).floor() as i64,
            );
            self.tiles
                .get(&id.key())
                .filter(|tile| tile.state == ElevationTileState::Loaded)
        };

        let depth = self.config.search_depth;
        lookup(ez)
            .or_else(|| {
                (1..=depth.min(ez))
                    .map(|d| ez - d)
                    .find_map(|zoom| lookup(zoom))
            })
            .or_else(|| {
                (1..=depth)
                    .map(|d| ez.saturating_add(d))
                    .filter(|zoom| *zoom <= MAX_ZOOM)
                    .find_map(|zoom| lookup(zoom))
            })
    }
}

impl ElevationSource for TiledElevation {
    fn update(&mut self, viewport: &Viewport, _dt: f32) -> bool {
        let mut changed = self.drain_responses();
        self.compute_window(viewport);
        changed |= self.mark_and_sweep();
        self.promote_due_retries(Instant::now());
        changed |= self.dispatch();
        if changed {
            self.dirty = true;
        }
        changed
    }

    fn elevation(&self, x: f64, z: f64, y_scale: f32, bounds: &GeoRect) -> f32 {
        if self.tiles.is_empty() {
            return 0.0;
        }
        let geo = scene_to_geo(&self.config.scene, x, z, bounds);
        let map_tile = self
            .projection
            .coordinates_to_tile(geo.lng, geo.lat, self.map_zoom);
        let point = map_tile.multiply(2_f64.powi(self.elevation_zoom as i32 - self.map_zoom as i32));

        self.find_loaded(&point)
            .and_then(|tile| tile.sample(&geo))
            .map_or(0.0, |sample| sample * y_scale * self.config.scale)
    }

    fn min_max(&mut self) -> Option<(i16, i16)> {
        if self.dirty {
            let view = self.view_rect;
            self.min_max = self
                .tiles
                .values()
                .filter(|tile| self.overlaps(&tile.id, &view))
                .filter_map(|tile| tile.grid.as_ref())
                .fold(None, |acc, grid| match acc {
                    None => Some((grid.min(), grid.max())),
                    Some((lo, hi)) => Some((lo.min(grid.min()), hi.max(grid.max()))),
                });
            self.dirty = false;
        }
        self.min_max
    }

    fn cancel_current_request(&mut self) {
        let downloading: Vec<TileKey> = self
            .tiles
            .values()
            .filter(|tile| tile.state == ElevationTileState::Downloading)
            .map(|tile| tile.id.key())
            .collect();
        for key in downloading {
            let generation = self.bump_generation();
            if let Some(tile) = self.tiles.get_mut(&key) {
                tile.generation = generation;
                tile.state = ElevationTileState::Queued;
            }
        }
    }

    fn has_data(&self) -> bool {
        self.tiles
            .values()
            .any(|tile| tile.state == ElevationTileState::Loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryCache};
    use crate::elevation::provider::{store_grid, ArcGisElevationProvider, ElevationProvider};
    use crate::prelude::Arc;
    use crate::runtime::InlineSpawner;
    use crate::tiles::fetch::Fetcher;
    use crate::{MapError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FlatFetcher {
        value: i16,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for FlatFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            let samples = vec![self.value.to_string(); 32 * 32].join(",");
            Ok(format!("{{\"data\":[{samples}]}}").into_bytes())
        }
    }

    #[derive(Default)]
    struct FailingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(MapError::Http {
                status: 503,
                url: url.to_string(),
            })
        }
    }

    fn source_with(
        config: ElevationConfig,
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<MemoryCache>,
    ) -> TiledElevation {
        TiledElevation::new(
            config,
            ElevationServices {
                provider: Arc::new(ArcGisElevationProvider::default()),
                fetcher,
                cache,
                spawner: Arc::new(InlineSpawner),
            },
        )
    }

    fn wide_config() -> ElevationConfig {
        ElevationConfig {
            max_concurrent_downloads: 64,
            ..Default::default()
        }
    }

    fn setup(value: i16, cache: Arc<MemoryCache>) -> (TiledElevation, Arc<FlatFetcher>) {
        let fetcher = Arc::new(FlatFetcher {
            value,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        });
        let source = source_with(wide_config(), fetcher.clone(), cache);
        (source, fetcher)
    }

    fn viewport(zoom: u8) -> Viewport {
        Viewport::new(LatLng::new(46.5, 8.0), zoom, Point::new(512.0, 512.0))
    }

    #[test]
    fn test_window_size_from_footprint() {
        let (mut source, _) = setup(1, Arc::new(MemoryCache::new(64)));
        source.update(&viewport(10), 0.0);
        // 512 px over a 2048 px footprint: one tile plus two of padding per axis
        assert_eq!(source.elevation_zoom(), 7);
        assert_eq!(source.window().len(), 9);
        assert!(source.window().iter().all(|t| t.zoom == 7));
    }

    #[test]
    fn test_loaded_tiles_are_sampled() {
        let (mut source, fetcher) = setup(250, Arc::new(MemoryCache::new(64)));
        let vp = viewport(10);
        source.update(&vp, 0.0);
        source.update(&vp, 0.0);

        assert!(source.has_data());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 9);
        let bounds = vp.geo_rect();
        let value = source.elevation(500.0, 500.0, 1.0, &bounds);
        assert!((value - 250.0).abs() < 1e-3);
        assert_eq!(source.min_max(), Some((250, 250)));
    }

    #[test]
    fn test_cache_hit_skips_network() {
        let cache = Arc::new(MemoryCache::new(64));
        let provider = ArcGisElevationProvider::default();
        let vp = viewport(10);
        let center = vp
            .projection
            .coordinates_to_tile(vp.center.lng, vp.center.lat, 7);
        let id = TileId::new(7, center.x as i64, center.y as i64);
        store_grid(
            cache.as_ref(),
            &provider.tile_cache_key(&id, Projection::SphericalMercator),
            &HeightGrid::filled(32, 32, 42).unwrap(),
        );
        assert!(cache.contains(&provider.tile_cache_key(&id, Projection::SphericalMercator)));

        let (mut source, fetcher) = setup(1, cache);
        source.update(&vp, 0.0);
        assert_eq!(source.tile(&id).unwrap().state, ElevationTileState::Loaded);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_falls_back_to_coarser_tile() {
        let (mut source, _) = setup(1, Arc::new(MemoryCache::new(64)));
        let vp = viewport(10);
        source.compute_window(&vp);

        let center = vp
            .projection
            .coordinates_to_tile(vp.center.lng, vp.center.lat, 5);
        let coarse = TileId::new(5, center.x as i64, center.y as i64);
        source.insert_tile(coarse, HeightGrid::filled(32, 32, 77).unwrap());

        let value = source.elevation(500.0, 500.0, 2.0, &vp.geo_rect());
        assert!((value - 154.0).abs() < 1e-3);

        // Too far up for the configured search depth
        let (mut shallow, _) = setup(1, Arc::new(MemoryCache::new(64)));
        shallow.compute_window(&vp);
        let root = TileId::new(0, 0, 0);
        shallow.insert_tile(root, HeightGrid::filled(32, 32, 77).unwrap());
        assert_eq!(shallow.elevation(500.0, 500.0, 1.0, &vp.geo_rect()), 0.0);
    }

    #[test]
    fn test_hysteresis_keeps_nearby_zoom_levels() {
        let (mut source, _) = setup(5, Arc::new(MemoryCache::new(64)));
        let vp = viewport(10);
        source.update(&vp, 0.0);
        source.update(&vp, 0.0);
        let old: Vec<TileId> = source.window().to_vec();

        // One level in: old tiles still overlap the view and are within the band
        source.update(&viewport(11), 0.0);
        assert!(old.iter().any(|id| source.tile(id).is_some()));

        // Far beyond the band: every old tile is dropped
        source.update(&viewport(15), 0.0);
        assert!(old.iter().all(|id| source.tile(id).is_none()));
    }

    #[test]
    fn test_cancel_drops_in_flight_results() {
        let (mut source, fetcher) = setup(5, Arc::new(MemoryCache::new(64)));
        let vp = viewport(10);
        source.update(&vp, 0.0);
        assert_eq!(source.in_flight(), 9);

        source.cancel_current_request();
        assert!(source
            .window()
            .iter()
            .all(|id| source.tile(id).unwrap().state == ElevationTileState::Queued));

        // Stale results are dropped; the grids they cached are picked up on re-dispatch.
        source.update(&vp, 0.0);
        assert_eq!(source.in_flight(), 0);
        assert!(source.has_data());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_min_max_ignores_padding_tiles() {
        let (mut source, _) = setup(5, Arc::new(MemoryCache::new(64)));
        let vp = viewport(10);
        source.update(&vp, 0.0);
        source.update(&vp, 0.0);
        assert_eq!(source.min_max(), Some((5, 5)));

        let view = source.view_rect;
        let padding = *source
            .window()
            .iter()
            .find(|id| !source.overlaps(id, &view))
            .unwrap();
        source.insert_tile(padding, HeightGrid::filled(32, 32, 900).unwrap());
        assert_eq!(source.min_max(), Some((5, 5)));

        // The center tile is on screen, so its range counts.
        let center = source.window()[0];
        source.insert_tile(center, HeightGrid::filled(32, 32, 900).unwrap());
        assert_eq!(source.min_max(), Some((5, 900)));
    }

    #[test]
    fn test_failed_tile_waits_for_retry_delay() {
        let fetcher = Arc::new(FailingFetcher::default());
        let mut source = source_with(wide_config(), fetcher.clone(), Arc::new(MemoryCache::new(64)));
        let vp = viewport(10);
        for _ in 0..5 {
            source.update(&vp, 0.0);
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 9);

        let id = source.window()[0];
        let tile = source.tile(&id).unwrap();
        assert_eq!(tile.state, ElevationTileState::Error);
        assert_eq!(tile.attempts_remaining, 2);
        assert!(tile.retry_at.unwrap() > Instant::now());

        source.promote_due_retries(Instant::now() + Duration::from_secs(11));
        assert!(source
            .window()
            .iter()
            .all(|id| source.tile(id).unwrap().state == ElevationTileState::Queued));
        source.update(&vp, 0.0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 18);
    }

    #[test]
    fn test_failed_tile_gives_up_after_attempts() {
        let fetcher = Arc::new(FailingFetcher::default());
        let config = ElevationConfig {
            download_attempts: 2,
            retry_after_secs: Some(0.0),
            ..wide_config()
        };
        let mut source = source_with(config, fetcher.clone(), Arc::new(MemoryCache::new(64)));
        let vp = viewport(10);
        for _ in 0..6 {
            source.update(&vp, 0.0);
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 18);
        assert!(source.window().iter().all(|id| {
            let tile = source.tile(id).unwrap();
            tile.state == ElevationTileState::Error
                && tile.attempts_remaining == 0
                && tile.retry_at.is_none()
        }));
        assert!(!source.has_data());
    }

    #[test]
    fn test_wgs84_tiles_request_and_sample_wgs84_bounds() {
        let (mut source, fetcher) = setup(5, Arc::new(MemoryCache::new(64)));
        let vp = Viewport::new(LatLng::new(33.75, 67.5), 6, Point::new(512.0, 512.0))
            .with_projection(Projection::Wgs84);
        source.update(&vp, 0.0);

        let id = TileId::new(3, 5, 2);
        let rect = id.geo_rect(Projection::Wgs84);
        assert_eq!(source.tile(&id).unwrap().bounds, rect);
        let bbox = format!("bbox={},{},{},{}", rect.left, rect.bottom, rect.right, rect.top);
        assert!(fetcher.urls.lock().unwrap().iter().any(|url| url.contains(&bbox)));

        // First grid row is the top edge of the requested box.
        let mut grid = HeightGrid::filled(32, 32, 0).unwrap();
        for x in 0..32 {
            grid.set(x, 0, 100);
        }
        source.insert_tile(id, grid);
        let tile = source.tile(&id).unwrap();
        assert_eq!(tile.sample(&LatLng::new(rect.top, 60.0)), Some(100.0));
        assert_eq!(tile.sample(&LatLng::new(rect.bottom, 60.0)), Some(0.0));
    }
}
