use crate::core::{
    bounds::Bounds,
    constants::TILE_SIZE,
    geo::{GeoRect, LatLng, Point},
    projection::{world_tiles, Projection},
};
use crate::tiles::key::TileId;

/// Camera state the tile, elevation and drawing engines derive their work from.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
    /// Size of the rendered map in pixels
    pub size: Point,
    pub projection: Projection,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: u8, size: Point) -> Self {
        Self {
            center: center.wrapped(),
            zoom: zoom.min(20),
            size,
            projection: Projection::SphericalMercator,
            min_zoom: 0,
            max_zoom: 20,
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Sets the center, wrapping longitude and clamping latitude
    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(
            self.projection.clamp_lat(center.lat),
            LatLng::wrap_lng(center.lng),
        );
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    pub fn set_zoom_limits(&mut self, min_zoom: u8, max_zoom: u8) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom.max(min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Center of the view in tile space at the view zoom
    pub fn center_tile(&self) -> Point {
        self.projection
            .coordinates_to_tile(self.center.lng, self.center.lat, self.zoom)
    }

    /// Visible rectangle in tile space at the view zoom.
    ///
    /// `min.x` may be negative or `max.x` exceed the world width when the view crosses
    /// the antimeridian; consumers wrap columns themselves.
    pub fn tile_rect(&self) -> Bounds {
        let center = self.center_tile();
        let half_w = self.size.x / TILE_SIZE as f64 / 2.0;
        let half_h = self.size.y / TILE_SIZE as f64 / 2.0;
        Bounds::from_coords(
            center.x - half_w,
            center.y - half_h,
            center.x + half_w,
            center.y + half_h,
        )
    }

    /// Visible rectangle at another zoom level
    pub fn tile_rect_at(&self, zoom: u8) -> Bounds {
        let factor = 2_f64.powi(zoom as i32 - self.zoom as i32);
        self.tile_rect().scaled(factor)
    }

    /// Geographic bounds of the view. `right` is not wrapped, so it may exceed 180.
    pub fn geo_rect(&self) -> GeoRect {
        let rect = self.tile_rect();
        let n = world_tiles(self.zoom);
        let top = self
            .projection
            .tile_to_coordinates(rect.min.x, rect.min.y.max(0.0), self.zoom);
        let bottom = self
            .projection
            .tile_to_coordinates(rect.max.x, rect.max.y.min(n), self.zoom);
        let left = rect.min.x / n * 360.0 - 180.0;
        let right = rect.max.x / n * 360.0 - 180.0;
        GeoRect::new(left, top.lat, right, bottom.lat)
    }

    /// Tiles covering the view at `zoom`, row-major, columns wrapped, rows clipped.
    pub fn covering_tiles(&self, zoom: u8) -> Vec<TileId> {
        let rect = self.tile_rect_at(zoom);
        let n = world_tiles(zoom) as i64;
        let min_x = rect.min.x.floor() as i64;
        let max_x = (rect.max.x.ceil() as i64 - 1).max(min_x);
        let min_y = (rect.min.y.floor() as i64).max(0);
        let max_y = ((rect.max.y.ceil() as i64 - 1).max(min_y)).min(n - 1);

        let width = (max_x - min_x + 1).min(n);
        let mut tiles = Vec::with_capacity((width * (max_y - min_y + 1)).max(0) as usize);
        for y in min_y..=max_y {
            for x in min_x..min_x + width {
                tiles.push(TileId::new(zoom, x, y));
            }
        }
        tiles
    }

    /// Converts a coordinate into pixels relative to the top-left of the view
    pub fn lat_lng_to_view_pixel(&self, lat_lng: &LatLng) -> Point {
        let rect = self.tile_rect();
        let tile = self
            .projection
            .coordinates_to_tile(lat_lng.lng, lat_lng.lat, self.zoom);
        tile.subtract(&rect.min).multiply(TILE_SIZE as f64)
    }

    /// Converts view pixels back into a coordinate
    pub fn view_pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let rect = self.tile_rect();
        let tile = rect.min.add(&pixel.multiply(1.0 / TILE_SIZE as f64));
        self.projection
            .tile_to_coordinates(tile.x, tile.y, self.zoom)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::default(), 2, Point::new(1024.0, 768.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_creation() {
        let viewport = Viewport::new(LatLng::new(51.5, -0.12), 10, Point::new(800.0, 600.0));
        assert_eq!(viewport.zoom, 10);
        assert_eq!(viewport.size, Point::new(800.0, 600.0));
        let rect = viewport.tile_rect();
        assert!((rect.width() - 800.0 / 256.0).abs() < 1e-9);
        assert!((rect.height() - 600.0 / 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_limits() {
        let mut viewport = Viewport::default();
        viewport.set_zoom_limits(3, 8);
        viewport.set_zoom(12);
        assert_eq!(viewport.zoom, 8);
        viewport.set_zoom(1);
        assert_eq!(viewport.zoom, 3);
    }

    #[test]
    fn test_view_pixel_roundtrip() {
        let viewport = Viewport::new(LatLng::new(37.7749, -122.4194), 12, Point::new(512.0, 512.0));
        let center_px = viewport.lat_lng_to_view_pixel(&viewport.center);
        assert!(center_px.approx_eq(&Point::new(256.0, 256.0), 1e-6));

        let back = viewport.view_pixel_to_lat_lng(&center_px);
        assert!((back.lat - 37.7749).abs() < 1e-9);
        assert!((back.lng + 122.4194).abs() < 1e-9);
    }

    #[test]
    fn test_covering_tiles_wrap_across_antimeridian() {
        let viewport = Viewport::new(LatLng::new(0.0, 180.0), 2, Point::new(512.0, 256.0));
        let tiles = viewport.covering_tiles(2);
        let columns: Vec<u32> = tiles.iter().map(|t| t.x).collect();
        assert!(columns.contains(&3));
        assert!(columns.contains(&0));
        assert!(tiles.iter().all(|t| t.y < 4));
    }

    #[test]
    fn test_covering_tiles_at_zoom_zero_is_single_tile() {
        let viewport = Viewport::new(LatLng::default(), 0, Point::new(2048.0, 2048.0));
        let tiles = viewport.covering_tiles(0);
        assert_eq!(tiles, vec![TileId::new(0, 0, 0)]);
    }
}
