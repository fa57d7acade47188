//! Tile dictionary with ordered iteration and mark-and-sweep reconciliation.

use super::key::{TileId, TileKey};
use super::tile::{Pixel, Tile, TileStatus};
use crate::prelude::{Arc, HashMap, HashSet, Instant};

/// Number of tiles per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub none: usize,
    pub loading: usize,
    pub loaded: usize,
    pub error: usize,
}

/// Outcome of applying a download result to the store
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Loaded(TileId),
    Failed {
        tile: TileId,
        error: String,
        retry_scheduled: bool,
    },
    /// The tile was disposed or re-created since dispatch
    Stale,
}

#[derive(Debug)]
pub struct TileStore {
    tiles: HashMap<TileKey, Tile>,
    order: Vec<TileKey>,
    next_generation: u64,
    default_attempts: u32,
}

impl TileStore {
    pub fn new(default_attempts: u32) -> Self {
        Self {
            tiles: HashMap::default(),
            order: Vec::new(),
            next_generation: 1,
            default_attempts: default_attempts.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: TileKey) -> Option<&Tile> {
        self.tiles.get(&key)
    }

    pub fn get_mut(&mut self, key: TileKey) -> Option<&mut Tile> {
        self.tiles.get_mut(&key)
    }

    pub fn tile(&self, id: &TileId) -> Option<&Tile> {
        self.get(id.key())
    }

    pub fn contains(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    /// Tiles in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.order.iter().filter_map(move |key| self.tiles.get(key))
    }

    pub fn keys(&self) -> &[TileKey] {
        &self.order
    }

    /// Returns the tile for `id`, registering a fresh one if absent.
    ///
    /// New tiles are linked to their parent and to any of their children already present.
    pub fn ensure_tile(&mut self, id: TileId) -> &mut Tile {
        let key = id.key();
        if !self.tiles.contains_key(&key) {
            self.insert_new(id);
        }
        let (attempts, generation) = (self.default_attempts, self.next_generation);
        self.tiles
            .entry(key)
            .or_insert_with(|| Tile::new(id, attempts, generation))
    }

    fn insert_new(&mut self, id: TileId) {
        let key = id.key();
        let mut tile = Tile::new(id, self.default_attempts, self.next_generation);
        self.next_generation += 1;

        if let Some(parent_key) = id.parent().map(|p| p.key()) {
            if let Some(parent) = self.tiles.get_mut(&parent_key) {
                parent.children.push(key);
                tile.parent = Some(parent_key);
            }
        }
        if let Some(children) = id.children() {
            for child_key in children.iter().map(|c| c.key()) {
                if let Some(child) = self.tiles.get_mut(&child_key) {
                    child.parent = Some(key);
                    tile.children.push(child_key);
                }
            }
        }

        log::debug!("registered tile {} (generation {})", id, tile.generation);
        self.tiles.insert(key, tile);
        self.order.push(key);
    }

    /// Two-phase mark and sweep.
    ///
    /// Every required tile is marked used (and created when missing) before any tile is
    /// considered for disposal. A tile that stays unused for more than `grace_passes`
    /// consecutive passes is disposed. Returns the disposed ids.
    pub fn reconcile(&mut self, required: &[TileId], grace_passes: u32) -> Vec<TileId> {
        let mut required_keys = HashSet::default();
        for id in required {
            let tile = self.ensure_tile(*id);
            tile.used = true;
            tile.unused_passes = 0;
            required_keys.insert(id.key());
        }

        let mut expired = Vec::new();
        for key in &self.order {
            if required_keys.contains(key) {
                continue;
            }
            if let Some(tile) = self.tiles.get_mut(key) {
                tile.used = false;
                tile.unused_passes += 1;
                if tile.unused_passes > grace_passes {
                    expired.push(*key);
                }
            }
        }

        expired
            .into_iter()
            .filter_map(|key| self.dispose(key).map(|tile| tile.id))
            .collect()
    }

    /// Removes a tile, releasing its pixels and unlinking it from its relatives.
    ///
    /// Safe while a download is in flight: the completion will fail the generation check.
    pub fn dispose(&mut self, key: TileKey) -> Option<Tile> {
        let mut tile = self.tiles.remove(&key)?;
        self.order.retain(|k| *k != key);

        if let Some(parent) = tile.parent.and_then(|p| self.tiles.get_mut(&p)) {
            parent.children.retain(|k| *k != key);
        }
        for child_key in &tile.children {
            if let Some(child) = self.tiles.get_mut(child_key) {
                child.parent = None;
            }
        }

        if tile.status == TileStatus::Loading {
            log::debug!("disposing tile {} with a download in flight", tile.id);
        }
        tile.release();
        Some(tile)
    }

    /// Nearest loaded ancestor, walking parent links
    pub fn placeholder_for(&self, key: TileKey) -> Option<&Tile> {
        let mut current = self.tiles.get(&key)?.parent;
        while let Some(parent_key) = current {
            let parent = self.tiles.get(&parent_key)?;
            if parent.is_loaded() {
                return Some(parent);
            }
            current = parent.parent;
        }
        None
    }

    /// Failed tiles whose retry deadline has passed go back to `None`
    pub fn promote_due_retries(&mut self, now: Instant) -> usize {
        let mut promoted = 0;
        for tile in self.tiles.values_mut() {
            if tile.status != TileStatus::Error {
                continue;
            }
            if let Some(retry_at) = tile.retry_at {
                if retry_at <= now {
                    tile.status = TileStatus::None;
                    tile.retry_at = None;
                    promoted += 1;
                    log::debug!("tile {} eligible for retry", tile.id);
                }
            }
        }
        promoted
    }

    /// Marks a tile as dispatched and returns its generation
    pub(crate) fn begin_loading(&mut self, key: TileKey) -> Option<u64> {
        let tile = self.tiles.get_mut(&key)?;
        if tile.status != TileStatus::None {
            return None;
        }
        tile.status = TileStatus::Loading;
        Some(tile.generation)
    }

    /// Applies a finished download if the tile it was started for still exists
    pub(crate) fn complete(
        &mut self,
        key: TileKey,
        generation: u64,
        result: Result<Arc<[Pixel]>, String>,
        retry_at: Option<Instant>,
    ) -> CompletionOutcome {
        let tile = match self.tiles.get_mut(&key) {
            Some(tile) if tile.generation == generation && tile.status == TileStatus::Loading => {
                tile
            }
            _ => {
                log::debug!(
                    "dropping stale completion for {} (generation {})",
                    TileId::from_key(key),
                    generation
                );
                return CompletionOutcome::Stale;
            }
        };

        match result {
            Ok(pixels) => {
                tile.set_loaded(pixels);
                CompletionOutcome::Loaded(tile.id)
            }
            Err(error) => {
                let retry_scheduled = tile.set_failed(error.clone(), retry_at);
                CompletionOutcome::Failed {
                    tile: tile.id,
                    error,
                    retry_scheduled,
                }
            }
        }
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for tile in self.tiles.values() {
            match tile.status {
                TileStatus::None => counts.none += 1,
                TileStatus::Loading => counts.loading += 1,
                TileStatus::Loaded => counts.loaded += 1,
                TileStatus::Error => counts.error += 1,
                TileStatus::Disposed => {}
            }
        }
        counts
    }
}

impl Default for TileStore {
    fn default() -> Self {
        Self::new(crate::core::constants::DEFAULT_DOWNLOAD_ATTEMPTS)
    }
}
