//! Bounded-concurrency download scheduling.
//!
//! Candidates are tiles with status `None`. Each pass keeps only the best `N` of them
//! (N = free download slots) ordered by distance to the target zoom, dispatches them
//! within a wall-clock budget, and the spawned tasks report back over a channel that is
//! drained on the update thread.

use super::decode::decode_tile;
use super::fetch::Fetcher;
use super::key::{TileId, TileKey};
use super::source::TileSource;
use super::store::{CompletionOutcome, TileStore};
use super::tile::{Pixel, Tile, TileStatus};
use crate::cache::CacheStore;
use crate::core::config::TileLoadingConfig;
use crate::events::MapEvent;
use crate::prelude::{Arc, Instant};
use crate::runtime::{spawn_on, AsyncSpawner};
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Collaborators a download needs, shared with the spawned tasks
#[derive(Clone)]
pub struct TileServices {
    pub source: Arc<dyn TileSource>,
    pub fetcher: Arc<dyn Fetcher>,
    pub cache: Arc<dyn CacheStore>,
    pub spawner: Arc<dyn AsyncSpawner>,
}

/// Result of a tile loading operation
#[derive(Debug)]
pub struct TileCompletion {
    pub key: TileKey,
    pub generation: u64,
    pub result: std::result::Result<Vec<Pixel>, String>,
    pub from_cache: bool,
}

/// Picks up to `limit` candidate tiles closest to `target_zoom`.
///
/// A partial insertion sort keeps only the best `limit` entries, so a pass costs
/// O(candidates × limit). Ties keep iteration order, which makes selection deterministic.
pub fn select_candidates<'a>(
    tiles: impl IntoIterator<Item = &'a Tile>,
    target_zoom: u8,
    limit: usize,
) -> Vec<TileKey> {
    if limit == 0 {
        return Vec::new();
    }

    let mut best: Vec<(u8, TileKey)> = Vec::with_capacity(limit + 1);
    for tile in tiles {
        if tile.status != TileStatus::None {
            continue;
        }
        let distance = tile.id.zoom.abs_diff(target_zoom);
        if best.len() == limit && best.last().map_or(false, |(d, _)| distance >= *d) {
            continue;
        }
        let pos = best
            .iter()
            .position(|(d, _)| *d > distance)
            .unwrap_or(best.len());
        best.insert(pos, (distance, tile.key()));
        best.truncate(limit);
    }

    best.into_iter().map(|(_, key)| key).collect()
}

/// Cache first, then network. Bytes are only cached once they decode.
async fn load_tile(
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheStore>,
    url: String,
    cache_key: String,
) -> Result<(Vec<Pixel>, bool)> {
    if let Some(bytes) = cache.get(&cache_key) {
        match decode_tile(&bytes) {
            Ok(pixels) => return Ok((pixels, true)),
            Err(e) => log::warn!("cached entry {} is unusable: {}", cache_key, e),
        }
    }

    let bytes = fetcher.fetch(&url).await?;
    let pixels = decode_tile(&bytes)?;
    if let Err(e) = cache.add(&cache_key, &bytes) {
        log::warn!("failed to cache {}: {}", cache_key, e);
    }
    Ok((pixels, false))
}

pub struct DownloadScheduler {
    config: TileLoadingConfig,
    in_flight: usize,
    result_tx: Sender<TileCompletion>,
    result_rx: Receiver<TileCompletion>,
}

impl DownloadScheduler {
    pub fn new(config: TileLoadingConfig) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            config,
            in_flight: 0,
            result_tx,
            result_rx,
        }
    }

    pub fn config(&self) -> &TileLoadingConfig {
        &self.config
    }

    /// Downloads started and not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn has_pending_results(&self) -> bool {
        !self.result_rx.is_empty()
    }

    pub fn free_slots(&self) -> usize {
        self.config
            .max_concurrent_downloads
            .saturating_sub(self.in_flight)
    }

    /// Starts downloads for the best candidates and returns the dispatched tiles
    pub fn dispatch(
        &mut self,
        store: &mut TileStore,
        target_zoom: u8,
        services: &TileServices,
    ) -> Vec<TileId> {
        let candidates = select_candidates(store.iter(), target_zoom, self.free_slots());
        if candidates.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let budget = self.config.scheduling_budget();
        let mut dispatched = Vec::with_capacity(candidates.len());

        for key in candidates {
            if !dispatched.is_empty() && started.elapsed() >= budget {
                log::debug!(
                    "scheduling budget spent after {} dispatches",
                    dispatched.len()
                );
                break;
            }
            let Some(generation) = store.begin_loading(key) else {
                continue;
            };

            let id = TileId::from_key(key);
            let url = services.source.url(&id);
            let cache_key = services.source.cache_key(&id);
            let fetcher = services.fetcher.clone();
            let cache = services.cache.clone();
            let result_tx = self.result_tx.clone();

            log::debug!("starting download for tile {} from {}", id, url);
            self.in_flight += 1;
            dispatched.push(id);

            spawn_on(services.spawner.as_ref(), async move {
                let (result, from_cache) = match load_tile(fetcher, cache, url, cache_key).await {
                    Ok((pixels, from_cache)) => (Ok(pixels), from_cache),
                    Err(e) => (Err(e.to_string()), false),
                };
                let completion = TileCompletion {
                    key,
                    generation,
                    result,
                    from_cache,
                };
                if result_tx.send(completion).is_err() {
                    log::debug!("scheduler dropped before tile {} completed", id);
                }
            });
        }

        dispatched
    }

    /// Drains finished downloads into the store and returns the resulting events
    pub fn apply_completions(&mut self, store: &mut TileStore) -> Vec<MapEvent> {
        let mut events = Vec::new();
        let mut loaded_any = false;

        while let Ok(completion) = self.result_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);

            let retry_at = self
                .config
                .retry_after()
                .map(|delay| Instant::now() + delay);
            let from_cache = completion.from_cache;
            let result = completion.result.map(Arc::<[Pixel]>::from);

            match store.complete(completion.key, completion.generation, result, retry_at) {
                CompletionOutcome::Loaded(id) => {
                    log::info!(
                        "tile {} loaded{}",
                        id,
                        if from_cache { " from cache" } else { "" }
                    );
                    loaded_any = true;
                    events.push(MapEvent::TileReady(id));
                }
                CompletionOutcome::Failed {
                    tile,
                    error,
                    retry_scheduled,
                } => {
                    if retry_scheduled {
                        log::warn!("tile {} failed, will retry: {}", tile, error);
                    } else {
                        log::warn!("giving up on tile {}: {}", tile, error);
                    }
                    events.push(MapEvent::TileFailed {
                        tile,
                        error,
                        retry_scheduled,
                    });
                }
                CompletionOutcome::Stale => {}
            }
        }

        if loaded_any {
            events.push(MapEvent::Redraw);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::prelude::HashSet;
    use crate::runtime::AsyncHandle;
    use crate::tiles::fetch::HttpFetcher;
    use crate::tiles::source::TemplateSource;
    use futures::future::BoxFuture;

    /// Accepts tasks without running them, so dispatch can be observed on its own
    struct ParkedSpawner;

    struct ParkedHandle;

    impl AsyncHandle for ParkedHandle {
        fn is_finished(&self) -> bool {
            false
        }

        fn cancel(&self) {}
    }

    impl AsyncSpawner for ParkedSpawner {
        fn spawn_boxed(&self, _future: BoxFuture<'static, ()>) -> Box<dyn AsyncHandle> {
            Box::new(ParkedHandle)
        }
    }

    fn parked_services() -> TileServices {
        TileServices {
            source: Arc::new(TemplateSource::new("https://tiles.test/{z}/{x}/{y}.png", "test_")),
            fetcher: Arc::new(HttpFetcher),
            cache: Arc::new(MemoryCache::new(8)),
            spawner: Arc::new(ParkedSpawner),
        }
    }

    fn store_with(zooms: &[u8]) -> TileStore {
        let mut store = TileStore::default();
        for (i, zoom) in zooms.iter().enumerate() {
            store.ensure_tile(TileId::new(*zoom, i as i64, 0));
        }
        store
    }

    #[test]
    fn test_selects_closest_zooms() {
        let store = store_with(&[8, 6, 10, 7, 9, 8, 6, 10, 9, 7, 8]);
        let keys = select_candidates(store.iter(), 8, 5);
        let zooms: Vec<u8> = keys.iter().map(|k| TileId::from_key(*k).zoom).collect();

        assert_eq!(zooms.len(), 5);
        assert_eq!(&zooms[..3], &[8, 8, 8]);
        assert!(zooms[3..].iter().all(|z| z.abs_diff(8) == 1));
    }

    #[test]
    fn test_ties_keep_store_order() {
        let store = store_with(&[5, 5, 5, 5]);
        let keys = select_candidates(store.iter(), 5, 2);
        assert_eq!(keys, vec![store.keys()[0], store.keys()[1]]);
    }

    #[test]
    fn test_only_idle_tiles_are_candidates() {
        let mut store = store_with(&[3, 3]);
        let first = store.keys()[0];
        store.begin_loading(first);
        let keys = select_candidates(store.iter(), 3, 5);
        assert_eq!(keys, vec![store.keys()[1]]);
        assert!(select_candidates(store.iter(), 3, 0).is_empty());
    }

    #[test]
    fn test_zero_budget_dispatches_one_tile_per_pass() {
        let services = parked_services();
        let mut store = store_with(&[4, 4, 4, 4]);
        let mut scheduler = DownloadScheduler::new(TileLoadingConfig {
            max_concurrent_downloads: 5,
            scheduling_budget_ms: 0,
            ..Default::default()
        });

        let mut seen = HashSet::default();
        for _ in 0..4 {
            let dispatched = scheduler.dispatch(&mut store, 4, &services);
            assert_eq!(dispatched.len(), 1);
            seen.insert(dispatched[0].key());
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(scheduler.in_flight(), 4);
        assert!(scheduler.dispatch(&mut store, 4, &services).is_empty());

        // With time to spare the same tiles go out in a single pass.
        let mut store = store_with(&[4, 4, 4, 4]);
        let mut scheduler = DownloadScheduler::new(TileLoadingConfig {
            max_concurrent_downloads: 5,
            scheduling_budget_ms: 10_000,
            ..Default::default()
        });
        assert_eq!(scheduler.dispatch(&mut store, 4, &services).len(), 4);
    }
}
