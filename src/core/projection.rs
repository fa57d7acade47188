//! Geographic ↔ tile-space conversions.
//!
//! Tile space is continuous: at zoom `z` the world spans `2^z` tiles on each axis, and
//! `(tx, ty) = (1.5, 2.25)` lies a quarter of the way down tile `(1, 2)`. Multiplying by
//! [`TILE_SIZE`] gives world pixels.

use super::constants::{MAX_MERCATOR_LATITUDE, TILE_SIZE};
use super::geo::{LatLng, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Projection used by a tile provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Projection {
    /// EPSG:3857, used by almost every slippy-map provider
    #[default]
    SphericalMercator,
    /// Plain equirectangular (EPSG:4326) tiling
    Wgs84,
}

/// Number of tiles on one axis at `zoom`.
pub fn world_tiles(zoom: u8) -> f64 {
    (1u64 << zoom) as f64
}

/// Wraps an integer tile column into `[0, 2^zoom)`.
pub fn wrap_tile_x(x: i64, zoom: u8) -> u32 {
    let n = 1i64 << zoom;
    x.rem_euclid(n) as u32
}

/// Converts tile-space coordinates to world pixels.
pub fn tile_to_pixel(tile: Point) -> Point {
    tile.multiply(TILE_SIZE as f64)
}

/// Converts world pixels to tile-space coordinates.
pub fn pixel_to_tile(pixel: Point) -> Point {
    pixel.multiply(1.0 / TILE_SIZE as f64)
}

impl Projection {
    /// Latitude limit of the projection
    pub fn max_latitude(&self) -> f64 {
        match self {
            Projection::SphericalMercator => MAX_MERCATOR_LATITUDE,
            Projection::Wgs84 => 90.0,
        }
    }

    pub fn clamp_lat(&self, lat: f64) -> f64 {
        let limit = self.max_latitude();
        lat.clamp(-limit, limit)
    }

    /// Projects a coordinate into tile space at `zoom`.
    ///
    /// Longitude is wrapped into [-180, 180] first, so the result's `x` always lies in
    /// `[0, 2^zoom]`. Latitude is clamped to the projection limits.
    pub fn coordinates_to_tile(&self, lng: f64, lat: f64, zoom: u8) -> Point {
        self.coordinates_to_tile_f(lng, lat, zoom as f64)
    }

    /// Fractional-zoom variant of [`Projection::coordinates_to_tile`]
    pub fn coordinates_to_tile_f(&self, lng: f64, lat: f64, zoom: f64) -> Point {
        let n = 2_f64.powf(zoom);
        let lng = LatLng::wrap_lng(lng);
        let lat = self.clamp_lat(lat);

        let x = (lng + 180.0) / 360.0 * n;
        let y = match self {
            Projection::SphericalMercator => {
                let lat_rad = lat.to_radians();
                (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n
            }
            Projection::Wgs84 => (90.0 - lat) / 180.0 * n,
        };

        Point::new(x, y)
    }

    /// Inverse of [`Projection::coordinates_to_tile`].
    ///
    /// `tx` outside `[0, 2^zoom]` is accepted and the resulting longitude wrapped, which
    /// is what unwrapped drawing geometry needs when mapping back.
    pub fn tile_to_coordinates(&self, tx: f64, ty: f64, zoom: u8) -> LatLng {
        self.tile_to_coordinates_f(tx, ty, zoom as f64)
    }

    pub fn tile_to_coordinates_f(&self, tx: f64, ty: f64, zoom: f64) -> LatLng {
        let n = 2_f64.powf(zoom);
        let lng = LatLng::wrap_lng(tx / n * 360.0 - 180.0);
        let lat = match self {
            Projection::SphericalMercator => {
                let lat_rad = (PI * (1.0 - 2.0 * ty / n)).sinh().atan();
                lat_rad.to_degrees()
            }
            Projection::Wgs84 => 90.0 - ty / n * 180.0,
        };

        LatLng::new(self.clamp_lat(lat), lng)
    }

    /// Projects a coordinate straight to world pixels at `zoom`
    pub fn project(&self, lat_lng: &LatLng, zoom: f64) -> Point {
        tile_to_pixel(self.coordinates_to_tile_f(lat_lng.lng, lat_lng.lat, zoom))
    }

    /// Converts world pixels at `zoom` back to a coordinate
    pub fn unproject(&self, pixel: &Point, zoom: f64) -> LatLng {
        let tile = pixel_to_tile(*pixel);
        self.tile_to_coordinates_f(tile.x, tile.y, zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mercator_round_trip_is_within_a_micro_degree() {
        let projection = Projection::SphericalMercator;
        for zoom in [0u8, 1, 5, 12, 18, 22] {
            for &(lng, lat) in &[
                (0.0, 0.0),
                (-122.4194, 37.7749),
                (139.6503, 35.6762),
                (-179.999, -84.9),
                (179.5, 85.0),
                (12.5, -33.3),
            ] {
                let tile = projection.coordinates_to_tile(lng, lat, zoom);
                let back = projection.tile_to_coordinates(tile.x, tile.y, zoom);
                assert!((back.lng - lng).abs() < 1e-6, "lng {lng} at zoom {zoom}");
                assert!((back.lat - lat).abs() < 1e-6, "lat {lat} at zoom {zoom}");
            }
        }
    }

    #[test]
    fn wgs84_round_trip_is_within_a_micro_degree() {
        let projection = Projection::Wgs84;
        for zoom in [0u8, 3, 10, 17] {
            for &(lng, lat) in &[(0.0, 0.0), (45.0, 89.0), (-170.25, -89.5)] {
                let tile = projection.coordinates_to_tile(lng, lat, zoom);
                let back = projection.tile_to_coordinates(tile.x, tile.y, zoom);
                assert!((back.lng - lng).abs() < 1e-6);
                assert!((back.lat - lat).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn mercator_clamps_latitude() {
        let projection = Projection::SphericalMercator;
        let north = projection.coordinates_to_tile(0.0, 89.9, 4);
        let limit = projection.coordinates_to_tile(0.0, MAX_MERCATOR_LATITUDE, 4);
        assert_eq!(north, limit);
        assert!(north.y.abs() < 1e-6);
    }

    #[test]
    fn longitude_wraps_before_projection() {
        let projection = Projection::SphericalMercator;
        let a = projection.coordinates_to_tile(-170.0, 10.0, 3);
        let b = projection.coordinates_to_tile(190.0, 10.0, 3);
        assert!(a.approx_eq(&b, 1e-9));
    }

    #[test]
    fn tile_x_wraps_modulo_world_width() {
        assert_eq!(wrap_tile_x(8, 3), 0);
        assert_eq!(wrap_tile_x(-1, 3), 7);
        assert_eq!(wrap_tile_x(5, 3), 5);
        assert_eq!(wrap_tile_x(-17, 2), 3);
    }

    #[test]
    fn known_tile_for_san_francisco() {
        let tile = Projection::SphericalMercator.coordinates_to_tile(-122.4194, 37.7749, 10);
        assert_eq!(tile.x.floor() as u32, 163);
        assert_eq!(tile.y.floor() as u32, 395);
    }
}
