//! Polyline offsetting into triangle strips.

use crate::core::geo::Point;

/// Interior angles below this get an extra vertex instead of a miter
const SHARP_TURN_RADIANS: f64 = std::f64::consts::FRAC_PI_3;
/// Cross products below this treat adjacent segments as parallel
const PARALLEL_EPSILON: f64 = 1e-6;

/// Offsets `points` by half of `width` on both sides and writes the result into `out`
/// as `left, right` vertex pairs, which form a triangle strip.
///
/// Interior joins sit on the intersection of the neighbouring offset lines. Near-parallel
/// segments and miters longer than twice the width fall back to a plain offset along the
/// averaged normal. Turns sharper than 60° emit two pairs, one per segment.
pub fn stroke_polyline(points: &[Point], width: f64, closed: bool, out: &mut Vec<Point>) {
    out.clear();
    let half = width / 2.0;

    let mut path: Vec<Point> = Vec::with_capacity(points.len() + 1);
    for point in points {
        if path.last().map_or(true, |last| !last.approx_eq(point, 1e-9)) {
            path.push(*point);
        }
    }
    if closed && path.len() > 2 {
        if path.last().map_or(false, |last| last.approx_eq(&path[0], 1e-9)) {
            path.pop();
        }
        let first = path[0];
        path.push(first);
    }
    if path.len() < 2 {
        return;
    }

    let directions: Vec<Point> = path
        .windows(2)
        .map(|pair| pair[1].subtract(&pair[0]).normalized())
        .collect();

    for (i, point) in path.iter().enumerate() {
        let before = if i > 0 {
            Some(directions[i - 1])
        } else if closed {
            directions.last().copied()
        } else {
            None
        };
        let after = if i < directions.len() {
            Some(directions[i])
        } else if closed {
            directions.first().copied()
        } else {
            None
        };

        match (before, after) {
            (Some(d0), Some(d1)) => push_join(out, *point, d0, d1, half, width),
            (Some(d), None) | (None, Some(d)) => push_pair(out, *point, d.perpendicular(), half),
            (None, None) => {}
        }
    }
}

fn push_pair(out: &mut Vec<Point>, point: Point, normal: Point, half: f64) {
    let offset = normal.multiply(half);
    out.push(point.add(&offset));
    out.push(point.subtract(&offset));
}

fn push_join(out: &mut Vec<Point>, point: Point, d0: Point, d1: Point, half: f64, width: f64) {
    let n0 = d0.perpendicular();
    let n1 = d1.perpendicular();

    // Angle between the incoming segment reversed and the outgoing one
    let interior = (-d0.dot(&d1)).clamp(-1.0, 1.0).acos();
    if interior < SHARP_TURN_RADIANS {
        push_pair(out, point, n0, half);
        push_pair(out, point, n1, half);
        return;
    }

    let cross = d0.cross(&d1);
    if cross.abs() < PARALLEL_EPSILON {
        push_pair(out, point, unmitered_normal(n0, n1), half);
        return;
    }

    // Left offset lines: (point + n0·half) + t·d0 and (point + n1·half) + s·d1
    let a = point.add(&n0.multiply(half));
    let b = point.add(&n1.multiply(half));
    let t = b.subtract(&a).cross(&d1) / cross;
    let left = a.add(&d0.multiply(t));

    if left.distance_to(&point) > 2.0 * width {
        push_pair(out, point, unmitered_normal(n0, n1), half);
        return;
    }

    // The right offset lines are the left ones mirrored through the vertex.
    out.push(left);
    out.push(point.multiply(2.0).subtract(&left));
}

fn unmitered_normal(n0: Point, n1: Point) -> Point {
    let sum = n0.add(&n1);
    if sum.length() < PARALLEL_EPSILON {
        n1
    } else {
        sum.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line_offsets() {
        let mut out = Vec::new();
        stroke_polyline(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)], 4.0, false, &mut out);
        assert_eq!(out.len(), 4);
        assert!(out[0].approx_eq(&Point::new(0.0, 2.0), 1e-9));
        assert!(out[1].approx_eq(&Point::new(0.0, -2.0), 1e-9));
        assert!(out[3].approx_eq(&Point::new(10.0, -2.0), 1e-9));
    }

    #[test]
    fn test_right_angle_uses_miter() {
        let mut out = Vec::new();
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        stroke_polyline(&points, 2.0, false, &mut out);

        assert_eq!(out.len(), 6);
        // Miter corners of a 90° turn sit half the width out on both axes.
        assert!(out[2].approx_eq(&Point::new(9.0, 1.0), 1e-9));
        assert!(out[3].approx_eq(&Point::new(11.0, -1.0), 1e-9));
    }

    #[test]
    fn test_collinear_points_do_not_miter() {
        let mut out = Vec::new();
        let points = [Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)];
        stroke_polyline(&points, 2.0, false, &mut out);
        assert_eq!(out.len(), 6);
        assert!(out[2].approx_eq(&Point::new(5.0, 1.0), 1e-9));
        assert!(out[3].approx_eq(&Point::new(5.0, -1.0), 1e-9));
    }

    #[test]
    fn test_sharp_turn_inserts_extra_vertex() {
        let mut out = Vec::new();
        // Doubles back at about 11°
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 2.0)];
        stroke_polyline(&points, 2.0, false, &mut out);
        assert_eq!(out.len(), 8);
        for p in &out {
            assert!(p.distance_to(&Point::new(10.0, 0.0)) < 20.0);
        }
    }

    #[test]
    fn test_miter_length_stays_bounded() {
        let mut out = Vec::new();
        // 70° interior angle
        let points = [Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(65.8, 94.0)];
        stroke_polyline(&points, 10.0, false, &mut out);
        assert_eq!(out.len(), 6);
        for p in &out[2..4] {
            assert!(p.distance_to(&Point::new(100.0, 0.0)) <= 20.0);
        }
    }

    #[test]
    fn test_degenerate_input_yields_nothing() {
        let mut out = vec![Point::new(1.0, 1.0)];
        stroke_polyline(&[Point::new(3.0, 3.0)], 2.0, false, &mut out);
        assert!(out.is_empty());
        stroke_polyline(&[Point::new(3.0, 3.0), Point::new(3.0, 3.0)], 2.0, false, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_closed_ring_has_joins_everywhere() {
        let mut out = Vec::new();
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        stroke_polyline(&square, 2.0, true, &mut out);
        // Four corners plus the repeated first corner closing the strip
        assert_eq!(out.len(), 10);
        assert!(out[0].approx_eq(&out[8], 1e-9));
    }
}
