use crate::core::bounds::Bounds;
use crate::core::geo::Point;

/// Even-odd point in polygon test. Rings with fewer than three points contain nothing.
pub fn contains_point(ring: &[Point], point: &Point) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let pi = &ring[i];
        let pj = &ring[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Pixel coverage of a filled polygon over the view
#[derive(Debug, Clone, PartialEq)]
pub struct FillMask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl FillMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }

    pub fn filled_count(&self) -> usize {
        self.data.iter().filter(|filled| **filled).count()
    }

    fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize) {
        for y in y0..y1 {
            let row = y * self.width;
            self.data[row + x0..row + x1].fill(true);
        }
    }
}

/// Rasterizes `ring` (view pixels) into a `width`×`height` mask.
///
/// Pixels are sampled at their centers in `block`×`block` blocks: when all four corner
/// samples of a block agree the whole block takes that value, otherwise every pixel in
/// it is tested on its own.
pub fn fill_polygon(ring: &[Point], width: usize, height: usize, block: usize) -> FillMask {
    let mut mask = FillMask::new(width, height);
    let Some(bounds) = Bounds::from_points(ring.iter()) else {
        return mask;
    };
    if ring.len() < 3 || width == 0 || height == 0 {
        return mask;
    }

    let block = block.max(1);
    let x_start = (bounds.min.x.floor().max(0.0) as usize).min(width);
    let y_start = (bounds.min.y.floor().max(0.0) as usize).min(height);
    let x_end = (bounds.max.x.ceil().max(0.0) as usize).min(width);
    let y_end = (bounds.max.y.ceil().max(0.0) as usize).min(height);

    let inside = |x: usize, y: usize| contains_point(ring, &Point::new(x as f64 + 0.5, y as f64 + 0.5));

    let mut by = y_start;
    while by < y_end {
        let by_end = (by + block).min(y_end);
        let mut bx = x_start;
        while bx < x_end {
            let bx_end = (bx + block).min(x_end);
            let corners = [
                inside(bx, by),
                inside(bx_end - 1, by),
                inside(bx, by_end - 1),
                inside(bx_end - 1, by_end - 1),
            ];

            if corners.iter().all(|c| *c) {
                mask.fill_rect(bx, by, bx_end, by_end);
            } else if corners.iter().any(|c| *c) {
                for y in by..by_end {
                    for x in bx..bx_end {
                        if inside(x, y) {
                            mask.data[y * width + x] = true;
                        }
                    }
                }
            }
            bx = bx_end;
        }
        by = by_end;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_unit_square_contains() {
        let ring = square(0.0, 0.0, 1.0);
        assert!(contains_point(&ring, &Point::new(0.5, 0.5)));
        assert!(!contains_point(&ring, &Point::new(2.0, 2.0)));
        assert!(!contains_point(&ring[..2], &Point::new(0.5, 0.5)));
    }

    #[test]
    fn test_block_fill_agrees_with_per_pixel_fill() {
        let triangle = vec![
            Point::new(3.0, 2.0),
            Point::new(37.0, 9.0),
            Point::new(12.0, 31.0),
        ];
        let blocks = fill_polygon(&triangle, 40, 40, 5);
        let exact = fill_polygon(&triangle, 40, 40, 1);
        assert!(blocks.filled_count() > 300);

        // A convex shape never gains pixels; only a vertex tucked between block
        // corners can lose a sliver.
        for y in 0..40 {
            for x in 0..40 {
                assert!(!blocks.get(x, y) || exact.get(x, y));
            }
        }
        assert!(exact.filled_count() - blocks.filled_count() <= 3);
    }

    #[test]
    fn test_fill_clips_to_mask() {
        let mask = fill_polygon(&square(-10.0, -10.0, 20.0), 16, 16, 5);
        assert_eq!(mask.filled_count(), 100);
        assert!(mask.get(0, 0));
        assert!(mask.get(9, 9));
        assert!(!mask.get(10, 10));
        assert!(!mask.get(100, 0));
    }

    #[test]
    fn test_degenerate_ring_fills_nothing() {
        let mask = fill_polygon(&[Point::new(0.0, 0.0), Point::new(5.0, 5.0)], 8, 8, 5);
        assert_eq!(mask.filled_count(), 0);
    }
}
