use crate::core::constants::MAX_ZOOM;
use crate::core::geo::{GeoRect, Point};
use crate::core::projection::{wrap_tile_x, Projection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Packed `(zoom << 58) | (x << 29) | y`
pub type TileKey = u64;

const COORD_BITS: u32 = 29;
const COORD_MASK: u64 = (1 << COORD_BITS) - 1;

/// Tile coordinate in the standard XYZ scheme, `x` always wrapped into `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    /// Creates a tile id, wrapping `x` around the world and clamping `y` to the valid rows.
    pub fn new(zoom: u8, x: i64, y: i64) -> Self {
        let zoom = zoom.min(MAX_ZOOM);
        let n = 1i64 << zoom;
        Self {
            zoom,
            x: wrap_tile_x(x, zoom),
            y: y.clamp(0, n - 1) as u32,
        }
    }

    pub fn key(&self) -> TileKey {
        ((self.zoom as u64) << (2 * COORD_BITS))
            | (((self.x as u64) & COORD_MASK) << COORD_BITS)
            | ((self.y as u64) & COORD_MASK)
    }

    pub fn from_key(key: TileKey) -> Self {
        Self {
            zoom: (key >> (2 * COORD_BITS)) as u8,
            x: ((key >> COORD_BITS) & COORD_MASK) as u32,
            y: (key & COORD_MASK) as u32,
        }
    }

    /// The covering tile one level up, `None` at zoom 0
    pub fn parent(&self) -> Option<TileId> {
        if self.zoom == 0 {
            return None;
        }
        Some(TileId {
            zoom: self.zoom - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// The covering tile at a coarser zoom
    pub fn ancestor(&self, zoom: u8) -> Option<TileId> {
        if zoom > self.zoom {
            return None;
        }
        let shift = self.zoom - zoom;
        Some(TileId {
            zoom,
            x: self.x >> shift,
            y: self.y >> shift,
        })
    }

    /// The four tiles one level down, row-major
    pub fn children(&self) -> Option<[TileId; 4]> {
        if self.zoom >= MAX_ZOOM {
            return None;
        }
        let zoom = self.zoom + 1;
        let (x, y) = (self.x * 2, self.y * 2);
        Some([
            TileId { zoom, x, y },
            TileId { zoom, x: x + 1, y },
            TileId { zoom, x, y: y + 1 },
            TileId { zoom, x: x + 1, y: y + 1 },
        ])
    }

    /// Bing-style quadkey
    pub fn quadkey(&self) -> String {
        let mut key = String::with_capacity(self.zoom as usize);
        for level in (1..=self.zoom).rev() {
            let mask = 1u32 << (level - 1);
            let mut digit = b'0';
            if self.x & mask != 0 {
                digit += 1;
            }
            if self.y & mask != 0 {
                digit += 2;
            }
            key.push(digit as char);
        }
        key
    }

    /// Tile-space coordinate of the top-left corner
    pub fn origin(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// Geographic footprint of the tile
    pub fn geo_rect(&self, projection: Projection) -> GeoRect {
        let n = (1u64 << self.zoom) as f64;
        let top_left = projection.tile_to_coordinates(self.x as f64, self.y as f64, self.zoom);
        let bottom_right =
            projection.tile_to_coordinates((self.x + 1) as f64, (self.y + 1) as f64, self.zoom);
        let left = self.x as f64 / n * 360.0 - 180.0;
        let right = (self.x + 1) as f64 / n * 360.0 - 180.0;
        GeoRect::new(left, top_left.lat, right, bottom_right.lat)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}
