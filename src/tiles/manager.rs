use super::key::{TileId, TileKey};
use super::scheduler::{DownloadScheduler, TileServices};
use super::store::{StatusCounts, TileStore};
use super::tile::Tile;
use crate::core::config::TileLoadingConfig;
use crate::core::viewport::Viewport;
use crate::events::MapEvent;
use crate::prelude::{Arc, HashSet, Instant, Mutex};
use std::sync::{MutexGuard, PoisonError};

/// Drives the tile store and download scheduler from the update thread.
///
/// The store lives behind one coarse lock so renderers on other threads can read tile
/// buffers; only this manager mutates it.
pub struct TileManager {
    store: Arc<Mutex<TileStore>>,
    scheduler: DownloadScheduler,
    services: TileServices,
    config: TileLoadingConfig,
    /// Explicitly requested tiles, kept alive across reconcile passes
    pinned: HashSet<TileKey>,
    required: Vec<TileId>,
    target_zoom: u8,
}

impl TileManager {
    pub fn new(config: TileLoadingConfig, services: TileServices) -> Self {
        Self {
            store: Arc::new(Mutex::new(TileStore::new(config.download_attempts))),
            scheduler: DownloadScheduler::new(config.clone()),
            services,
            config,
            pinned: HashSet::default(),
            required: Vec::new(),
            target_zoom: 0,
        }
    }

    /// Shared handle to the tile collection
    pub fn store(&self) -> Arc<Mutex<TileStore>> {
        Arc::clone(&self.store)
    }

    pub fn services(&self) -> &TileServices {
        &self.services
    }

    pub fn config(&self) -> &TileLoadingConfig {
        &self.config
    }

    pub fn target_zoom(&self) -> u8 {
        self.target_zoom
    }

    pub fn in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    /// Tiles the viewport needs: the visible range plus `parent_levels` coarser levels
    pub fn required_tiles(viewport: &Viewport, parent_levels: u8) -> Vec<TileId> {
        let mut tiles = viewport.covering_tiles(viewport.zoom);
        for level in 1..=parent_levels.min(viewport.zoom) {
            tiles.extend(viewport.covering_tiles(viewport.zoom - level));
        }
        tiles
    }

    /// Reconciles against the viewport and runs one scheduling pass
    pub fn update(&mut self, viewport: &Viewport) -> Vec<MapEvent> {
        self.target_zoom = viewport.zoom;
        self.required = Self::required_tiles(viewport, self.config.parent_levels);

        let mut required = self.required.clone();
        required.extend(self.pinned.iter().map(|key| TileId::from_key(*key)));

        {
            let mut store = self.lock_store();
            let disposed = store.reconcile(&required, self.config.unused_grace_passes);
            if !disposed.is_empty() {
                log::debug!("pruned {} unused tiles", disposed.len());
            }
        }

        self.pump()
    }

    /// Runs a scheduling pass without touching the required set
    pub fn pump(&mut self) -> Vec<MapEvent> {
        let mut store = self
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        store.promote_due_retries(Instant::now());
        let mut events = self.scheduler.apply_completions(&mut store);
        self.scheduler
            .dispatch(&mut store, self.target_zoom, &self.services);
        // Inline spawners finish during dispatch; their results are applied right away.
        events.extend(self.scheduler.apply_completions(&mut store));
        events
    }

    /// Registers a tile outside the viewport-driven set. It stays until released.
    pub fn request_tile(&mut self, zoom: u8, x: i64, y: i64) -> TileId {
        let id = TileId::new(zoom, x, y);
        self.pinned.insert(id.key());
        if self.required.is_empty() {
            self.target_zoom = id.zoom;
        }
        let mut store = self.lock_store();
        let tile = store.ensure_tile(id);
        tile.used = true;
        tile.unused_passes = 0;
        id
    }

    /// Unpins a tile previously passed to [`TileManager::request_tile`]
    pub fn release_tile(&mut self, id: &TileId) -> bool {
        self.pinned.remove(&id.key())
    }

    /// Snapshot of one tile. Pixels are shared, not copied.
    pub fn tile(&self, id: &TileId) -> Option<Tile> {
        self.lock_store().tile(id).cloned()
    }

    /// Nearest loaded ancestor to draw while `id` is loading
    pub fn placeholder_for(&self, id: &TileId) -> Option<Tile> {
        self.lock_store().placeholder_for(id.key()).cloned()
    }

    pub fn counts(&self) -> StatusCounts {
        self.lock_store().counts()
    }

    pub fn len(&self) -> usize {
        self.lock_store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_store(&self) -> MutexGuard<'_, TileStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
