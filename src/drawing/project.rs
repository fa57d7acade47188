//! Geographic points to view pixels, unwrapped across the antimeridian.

use crate::core::constants::TILE_SIZE;
use crate::core::geo::{LatLng, Point};
use crate::core::projection::world_tiles;
use crate::core::viewport::Viewport;

/// Returns whichever of `x`, `x + world` and `x - world` lies nearest `reference`
pub fn unwrap_x(x: f64, reference: f64, world: f64) -> f64 {
    [x, x + world, x - world]
        .into_iter()
        .min_by(|a, b| (a - reference).abs().total_cmp(&(b - reference).abs()))
        .unwrap_or(x)
}

/// Projects `points` into pixels relative to the view's top-left corner.
///
/// The first point is unwrapped toward the view center, every later point toward its
/// predecessor, so a line crossing the antimeridian stays continuous.
pub fn project_points(points: &[LatLng], viewport: &Viewport, out: &mut Vec<Point>) {
    out.clear();
    out.reserve(points.len());

    let rect = viewport.tile_rect();
    let world = world_tiles(viewport.zoom);
    let tile_size = TILE_SIZE as f64;
    let mut reference = rect.center().x;

    for point in points {
        let tile = viewport
            .projection
            .coordinates_to_tile(point.lng, point.lat, viewport.zoom);
        let x = unwrap_x(tile.x, reference, world);
        reference = x;
        out.push(Point::new(
            (x - rect.min.x) * tile_size,
            (tile.y - rect.min.y) * tile_size,
        ));
    }
}
