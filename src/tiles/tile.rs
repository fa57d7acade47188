use super::key::{TileId, TileKey};
use crate::prelude::{Arc, Instant};

/// One RGBA pixel
pub type Pixel = [u8; 4];

/// Lifecycle of a raster tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileStatus {
    /// Registered, waiting for the scheduler
    None,
    Loading,
    Loaded,
    Error,
    Disposed,
}

/// A raster tile owned by the [`super::store::TileStore`].
///
/// Parent and children are stored as keys, never as owning references; following one
/// may yield nothing if the linked tile was disposed in the meantime.
#[derive(Debug, Clone)]
pub struct Tile {
    pub id: TileId,
    pub status: TileStatus,
    pixels: Option<Arc<[Pixel]>>,
    pub parent: Option<TileKey>,
    pub children: Vec<TileKey>,
    pub attempts_remaining: u32,
    pub used: bool,
    /// Consecutive reconcile passes spent unused
    pub unused_passes: u32,
    pub retry_at: Option<Instant>,
    pub last_error: Option<String>,
    /// Store-unique stamp used to recognise stale completions
    pub generation: u64,
}

impl Tile {
    pub(crate) fn new(id: TileId, attempts: u32, generation: u64) -> Self {
        Self {
            id,
            status: TileStatus::None,
            pixels: None,
            parent: None,
            children: Vec::with_capacity(4),
            attempts_remaining: attempts,
            used: true,
            unused_passes: 0,
            retry_at: None,
            last_error: None,
            generation,
        }
    }

    pub fn key(&self) -> TileKey {
        self.id.key()
    }

    /// Shared read-only view of the decoded pixels
    pub fn pixels(&self) -> Option<Arc<[Pixel]>> {
        self.pixels.clone()
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.as_ref().map_or(0, |p| p.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.status == TileStatus::Loaded
    }

    pub(crate) fn set_loaded(&mut self, pixels: Arc<[Pixel]>) {
        self.pixels = Some(pixels);
        self.status = TileStatus::Loaded;
        self.retry_at = None;
        self.last_error = None;
    }

    /// Records a failure. Returns `true` if a retry was scheduled.
    pub(crate) fn set_failed(&mut self, error: String, retry_at: Option<Instant>) -> bool {
        self.status = TileStatus::Error;
        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
        self.last_error = Some(error);
        self.retry_at = if self.attempts_remaining > 0 {
            retry_at
        } else {
            None
        };
        self.retry_at.is_some()
    }

    pub(crate) fn release(&mut self) {
        self.pixels = None;
        self.parent = None;
        self.children.clear();
        self.status = TileStatus::Disposed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::Duration;

    #[test]
    fn test_failure_consumes_attempts() {
        let mut tile = Tile::new(TileId::new(3, 5, 2), 2, 1);
        let later = Instant::now() + Duration::from_secs(1);

        assert!(tile.set_failed("boom".to_string(), Some(later)));
        assert_eq!(tile.attempts_remaining, 1);
        assert_eq!(tile.status, TileStatus::Error);

        assert!(!tile.set_failed("boom".to_string(), Some(later)));
        assert_eq!(tile.attempts_remaining, 0);
        assert!(tile.retry_at.is_none());
    }

    #[test]
    fn test_release_drops_pixels() {
        let mut tile = Tile::new(TileId::new(1, 0, 0), 3, 1);
        tile.set_loaded(Arc::from(vec![[0u8; 4]; 16]));
        assert_eq!(tile.pixel_count(), 16);

        tile.release();
        assert_eq!(tile.status, TileStatus::Disposed);
        assert_eq!(tile.pixel_count(), 0);
    }
}
