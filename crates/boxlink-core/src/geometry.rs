//! Pure geometry helpers used by hit-testing, routing and rendering.

use kurbo::{CubicBez, ParamCurve, Point, Rect, Vec2};

/// Number of uniform samples used to flatten a curved arrow for hit-testing.
pub const CURVE_SAMPLES: usize = 20;

/// Length of each arrowhead stroke.
pub const ARROWHEAD_LENGTH: f64 = 15.0;

/// Half-angle between the shaft and each arrowhead stroke.
pub const ARROWHEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Open-interval containment: points on the boundary are outside.
pub fn point_in_rect_open(point: Point, rect: Rect) -> bool {
    point.x > rect.x0 && point.x < rect.x1 && point.y > rect.y0 && point.y < rect.y1
}

/// Distance from a point to the segment a→b.
///
/// A zero-length segment has no direction to project on, so it reports an
/// infinite distance and never counts as a hit.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return f64::INFINITY;
    }
    let t = ((point - a).dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    point.distance(proj)
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Sample a cubic Bezier at `steps` uniform parameter steps (inclusive of both ends).
pub fn sample_cubic(curve: CubicBez, steps: usize) -> Vec<Point> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| curve.eval(i as f64 / steps as f64))
        .collect()
}

/// Normalize a rectangle spanned by two arbitrary corners.
pub fn normalized_rect(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}

/// Separating-axis overlap test for axis-aligned rectangles.
///
/// Rectangles that merely touch along an edge overlap.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    let a = a.abs();
    let b = b.abs();
    !(a.x1 < b.x0 || b.x1 < a.x0 || a.y1 < b.y0 || b.y1 < a.y0)
}

/// The two arrowhead stroke endpoints for a shaft arriving at `tip` from `from`.
///
/// Returns `None` when the final segment is degenerate.
pub fn arrowhead(from: Point, tip: Point) -> Option<[Point; 2]> {
    let dir = tip - from;
    let len = dir.hypot();
    if len < f64::EPSILON {
        return None;
    }
    let back = -dir / len;
    let rotate = |v: Vec2, angle: f64| {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
    };
    Some([
        tip + rotate(back, ARROWHEAD_ANGLE) * ARROWHEAD_LENGTH,
        tip + rotate(back, -ARROWHEAD_ANGLE) * ARROWHEAD_LENGTH,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_in_rect_excludes_boundary() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(point_in_rect_open(Point::new(50.0, 50.0), rect));
        assert!(!point_in_rect_open(Point::new(0.0, 50.0), rect));
        assert!(!point_in_rect_open(Point::new(100.0, 50.0), rect));
        assert!(!point_in_rect_open(Point::new(50.0, 100.0), rect));
    }

    #[test]
    fn test_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(100.0, 0.0);
        assert!((point_to_segment_dist(Point::new(50.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        // Beyond the end the distance is measured to the endpoint
        assert!((point_to_segment_dist(Point::new(103.0, 4.0), a, b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_segment_never_hits() {
        let p = Point::new(10.0, 10.0);
        assert!(point_to_segment_dist(p, p, p).is_infinite());
    }

    #[test]
    fn test_sample_cubic_endpoints() {
        let curve = CubicBez::new(
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 100.0),
            Point::new(100.0, 100.0),
        );
        let pts = sample_cubic(curve, CURVE_SAMPLES);
        assert_eq!(pts.len(), CURVE_SAMPLES + 1);
        assert_eq!(pts[0], Point::new(0.0, 0.0));
        assert_eq!(pts[CURVE_SAMPLES], Point::new(100.0, 100.0));
    }

    #[test]
    fn test_normalized_rect_any_direction() {
        let forward = normalized_rect(Point::new(10.0, 10.0), Point::new(50.0, 50.0));
        let backward = normalized_rect(Point::new(50.0, 50.0), Point::new(10.0, 10.0));
        assert_eq!(forward, backward);
        assert!(forward.width() >= 0.0 && forward.height() >= 0.0);
    }

    #[test]
    fn test_rects_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rects_overlap(a, Rect::new(5.0, 5.0, 20.0, 20.0)));
        assert!(rects_overlap(a, Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!rects_overlap(a, Rect::new(11.0, 0.0, 20.0, 10.0)));
        assert!(!rects_overlap(a, Rect::new(0.0, -20.0, 10.0, -1.0)));
    }

    #[test]
    fn test_arrowhead_points_back_along_shaft() {
        let [left, right] = arrowhead(Point::new(0.0, 0.0), Point::new(100.0, 0.0)).unwrap();
        let half = ARROWHEAD_ANGLE;
        assert!((left.x - (100.0 - ARROWHEAD_LENGTH * half.cos())).abs() < 1e-9);
        assert!((right.x - left.x).abs() < 1e-9);
        assert!((left.y + right.y).abs() < 1e-9);
        assert!((left.y.abs() - ARROWHEAD_LENGTH * half.sin()).abs() < 1e-9);
        assert!(arrowhead(Point::new(1.0, 1.0), Point::new(1.0, 1.0)).is_none());
    }
}
