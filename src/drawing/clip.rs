use crate::core::bounds::Bounds;
use crate::core::geo::Point;

const EPSILON: f64 = 1e-9;

/// Clips segment `a → b` against `rect` using the parametric form `a + t·(b − a)`.
///
/// Returns the visible part and whether its start and end were moved, or `None` when
/// the segment lies entirely outside.
pub fn clip_segment(a: Point, b: Point, rect: &Bounds) -> Option<(Point, Point, bool, bool)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let checks = [
        (-dx, a.x - rect.min.x),
        (dx, rect.max.x - a.x),
        (-dy, a.y - rect.min.y),
        (dy, rect.max.y - a.y),
    ];
    for (p, q) in checks {
        if p.abs() < EPSILON {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }

    let start = if t0 > 0.0 { a.lerp(&b, t0) } else { a };
    let end = if t1 < 1.0 { a.lerp(&b, t1) } else { b };
    Some((start, end, t0 > 0.0, t1 < 1.0))
}

/// Clips a polyline, writing each visible run into `runs`.
///
/// Segments outside the rectangle are dropped and crossing segments truncated, so one
/// polyline may come back as several runs. Runs shorter than two points are discarded.
pub fn clip_polyline(points: &[Point], rect: &Bounds, runs: &mut Vec<Vec<Point>>) {
    runs.clear();
    let mut current: Vec<Point> = Vec::new();

    for pair in points.windows(2) {
        let Some((start, end, entered, exited)) = clip_segment(pair[0], pair[1], rect) else {
            flush(&mut current, runs);
            continue;
        };

        let continues = !entered
            && current
                .last()
                .map_or(false, |last| last.approx_eq(&start, EPSILON));
        if !continues {
            flush(&mut current, runs);
            current.push(start);
        }
        current.push(end);

        if exited {
            flush(&mut current, runs);
        }
    }
    flush(&mut current, runs);
}

fn flush(current: &mut Vec<Point>, runs: &mut Vec<Vec<Point>>) {
    if current.len() >= 2 {
        runs.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> Bounds {
        Bounds::from_coords(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_inside_segment_untouched() {
        let (a, b, entered, exited) =
            clip_segment(Point::new(10.0, 10.0), Point::new(90.0, 50.0), &view()).unwrap();
        assert_eq!((a, b), (Point::new(10.0, 10.0), Point::new(90.0, 50.0)));
        assert!(!entered && !exited);
    }

    #[test]
    fn test_crossing_segment_truncated() {
        let (a, b, entered, exited) =
            clip_segment(Point::new(-50.0, 50.0), Point::new(150.0, 50.0), &view()).unwrap();
        assert!(a.approx_eq(&Point::new(0.0, 50.0), 1e-9));
        assert!(b.approx_eq(&Point::new(100.0, 50.0), 1e-9));
        assert!(entered && exited);
    }

    #[test]
    fn test_outside_segment_dropped() {
        assert!(clip_segment(Point::new(-10.0, -10.0), Point::new(-5.0, 200.0), &view()).is_none());
        assert!(clip_segment(Point::new(150.0, 10.0), Point::new(200.0, 10.0), &view()).is_none());
    }

    #[test]
    fn test_polyline_splits_into_runs() {
        // In, out through the right edge, back in, then stays inside.
        let points = [
            Point::new(50.0, 20.0),
            Point::new(150.0, 20.0),
            Point::new(150.0, 80.0),
            Point::new(50.0, 80.0),
            Point::new(20.0, 80.0),
        ];
        let mut runs = Vec::new();
        clip_polyline(&points, &view(), &mut runs);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 2);
        assert!(runs[0][1].approx_eq(&Point::new(100.0, 20.0), 1e-9));
        assert_eq!(runs[1].len(), 3);
        assert!(runs[1][0].approx_eq(&Point::new(100.0, 80.0), 1e-9));
        assert_eq!(runs[1][2], Point::new(20.0, 80.0));
    }
}
