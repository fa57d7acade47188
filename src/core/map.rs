use crate::{
    cache::{CacheStore, MemoryCache},
    core::{
        config::MapOptions,
        geo::{LatLng, Point},
        viewport::Viewport,
    },
    drawing::{DrawingElement, DrawingEngine, GeometryBuffers},
    elevation::{
        build_source, ArcGisElevationProvider, ElevationProvider, ElevationServices,
        ElevationSource,
    },
    events::{EventBus, MapEvent, SubscriptionId},
    markers::Marker,
    prelude::Arc,
    runtime::{default_spawner, AsyncSpawner},
    tiles::{
        fetch::{Fetcher, HttpFetcher},
        key::TileId,
        manager::TileManager,
        scheduler::TileServices,
        source::{OpenStreetMapSource, TileSource},
        tile::Tile,
    },
    Result,
};

/// Collaborators a [`MapContext`] is built from
#[derive(Clone)]
pub struct MapServices {
    pub spawner: Arc<dyn AsyncSpawner>,
    pub fetcher: Arc<dyn Fetcher>,
    pub tile_source: Arc<dyn TileSource>,
    pub tile_cache: Arc<dyn CacheStore>,
    pub elevation_provider: Arc<dyn ElevationProvider>,
    pub elevation_cache: Arc<dyn CacheStore>,
}

impl MapServices {
    /// OpenStreetMap tiles and ArcGIS elevation over HTTP, cached in memory
    pub fn new(spawner: Arc<dyn AsyncSpawner>, options: &MapOptions) -> Self {
        Self {
            spawner,
            fetcher: Arc::new(HttpFetcher),
            tile_source: Arc::new(OpenStreetMapSource::new()),
            tile_cache: Arc::new(MemoryCache::new(options.tiles.memory_cache_size)),
            elevation_provider: Arc::new(ArcGisElevationProvider::default()),
            elevation_cache: Arc::new(MemoryCache::new(options.tiles.memory_cache_size)),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_tile_source(mut self, source: Arc<dyn TileSource>) -> Self {
        self.tile_source = source;
        self
    }

    pub fn with_tile_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.tile_cache = cache;
        self
    }

    pub fn with_elevation_provider(mut self, provider: Arc<dyn ElevationProvider>) -> Self {
        self.elevation_provider = provider;
        self
    }

    pub fn with_elevation_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.elevation_cache = cache;
        self
    }

    fn tile_services(&self) -> TileServices {
        TileServices {
            source: self.tile_source.clone(),
            fetcher: self.fetcher.clone(),
            cache: self.tile_cache.clone(),
            spawner: self.spawner.clone(),
        }
    }

    fn elevation_services(&self) -> ElevationServices {
        ElevationServices {
            provider: self.elevation_provider.clone(),
            fetcher: self.fetcher.clone(),
            cache: self.elevation_cache.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

/// Composition root: owns the viewport and every engine, and runs them from one
/// update call on the host's update thread.
pub struct MapContext {
    viewport: Viewport,
    options: MapOptions,
    tiles: TileManager,
    elevation: Box<dyn ElevationSource>,
    drawing: DrawingEngine,
    buffers: GeometryBuffers,
    elements: Vec<DrawingElement>,
    markers: Vec<Marker>,
    events: EventBus,
    overlays_dirty: bool,
}

impl MapContext {
    pub fn new(viewport: Viewport, options: MapOptions, services: MapServices) -> Result<Self> {
        options.validate()?;
        let viewport = viewport.with_projection(services.tile_source.projection());

        Ok(Self {
            tiles: TileManager::new(options.tiles.clone(), services.tile_services()),
            elevation: build_source(options.elevation.clone(), services.elevation_services()),
            drawing: DrawingEngine::new(options.drawing.clone()),
            buffers: GeometryBuffers::new(),
            elements: Vec::new(),
            markers: Vec::new(),
            events: EventBus::new(),
            overlays_dirty: true,
            viewport,
            options,
        })
    }

    /// Default HTTP services. Downloads run on the caller's tokio runtime, or on a shared
    /// background runtime when called from plain synchronous code.
    pub fn with_defaults(center: LatLng, zoom: u8, size: Point) -> Result<Self> {
        let options = MapOptions::default();
        let services = MapServices::new(default_spawner(), &options);
        Self::new(Viewport::new(center, zoom, size), options, services)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn set_view(&mut self, center: LatLng, zoom: u8) {
        let (old_center, old_zoom) = (self.viewport.center, self.viewport.zoom);
        self.viewport.set_center(center);
        self.viewport.set_zoom(zoom);
        if self.viewport.center != old_center || self.viewport.zoom != old_zoom {
            self.overlays_dirty = true;
        }
    }

    pub fn set_size(&mut self, size: Point) {
        if self.viewport.size != size {
            self.viewport.set_size(size);
            self.overlays_dirty = true;
        }
    }

    pub fn tiles(&self) -> &TileManager {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileManager {
        &mut self.tiles
    }

    pub fn tile(&self, id: &TileId) -> Option<Tile> {
        self.tiles.tile(id)
    }

    pub fn elevation(&self) -> &dyn ElevationSource {
        self.elevation.as_ref()
    }

    pub fn elevation_mut(&mut self) -> &mut dyn ElevationSource {
        self.elevation.as_mut()
    }

    /// Terrain height at scene position `(x, z)`, with the scene showing the current view
    pub fn elevation_at(&self, x: f64, z: f64, y_scale: f32) -> f32 {
        self.elevation
            .elevation(x, z, y_scale, &self.viewport.geo_rect())
    }

    /// Adds an overlay after validating it. Returns its index.
    pub fn add_element(&mut self, element: DrawingElement) -> Result<usize> {
        element.validate()?;
        self.elements.push(element);
        self.overlays_dirty = true;
        Ok(self.elements.len() - 1)
    }

    pub fn remove_element(&mut self, index: usize) -> Option<DrawingElement> {
        if index >= self.elements.len() {
            return None;
        }
        let mut element = self.elements.remove(index);
        element.dispose();
        self.overlays_dirty = true;
        Some(element)
    }

    pub fn elements(&self) -> &[DrawingElement] {
        &self.elements
    }

    pub fn add_marker(&mut self, marker: Marker) -> usize {
        self.markers.push(marker);
        self.markers.len() - 1
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn visible_markers(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.markers
            .iter()
            .filter(|marker| marker.is_in_view(&self.viewport))
    }

    /// Register a listener for one event type, e.g. `"tileready"`
    pub fn on<F>(&mut self, event_type: &'static str, callback: F) -> SubscriptionId
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.events.on(event_type, callback)
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// One frame: tiles, elevation (`dt` seconds of tween), then overlays. Listeners are
    /// notified before this returns; the delivered events are returned as well.
    pub fn update(&mut self, dt: f32) -> Vec<MapEvent> {
        let tile_events = self.tiles.update(&self.viewport);
        self.events.emit_all(tile_events);

        if self.elevation.update(&self.viewport, dt) {
            self.events.emit(MapEvent::ElevationUpdated);
        }

        if self.overlays_dirty {
            self.overlays_dirty = false;
            match self
                .drawing
                .build_all(self.elements.iter_mut(), &self.viewport, &mut self.buffers)
            {
                Ok(0) => {}
                Ok(drawn) => {
                    log::debug!("rebuilt {} overlays", drawn);
                    self.events.emit(MapEvent::Redraw);
                }
                Err(e) => log::warn!("overlay rebuild incomplete: {}", e),
            }
        }

        self.events.process_events()
    }
}
