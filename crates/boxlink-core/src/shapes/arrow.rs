//! Arrow connector between two boxes.

use super::{Border, BoxElement, ElementId};
use crate::geometry::{CURVE_SAMPLES, arrowhead, point_to_polyline_dist, sample_cubic};
use kurbo::{BezPath, CubicBez, Point};
use serde::{Deserialize, Serialize};

/// Maximum pointer distance (inclusive) at which an arrow counts as hit.
pub const ARROW_HIT_THRESHOLD: f64 = 5.0;

/// How an arrow is routed between its two anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrowStyle {
    /// Straight segment.
    #[default]
    Direct,
    /// Horizontal, vertical, horizontal elbow through the horizontal midpoint.
    RightAngle,
    /// Cubic Bezier with horizontal tangents at both ends.
    Curve,
}

impl ArrowStyle {
    pub fn name(&self) -> &'static str {
        match self {
            ArrowStyle::Direct => "direct",
            ArrowStyle::RightAngle => "right-angle",
            ArrowStyle::Curve => "curve",
        }
    }

    pub fn all() -> &'static [ArrowStyle] {
        &[ArrowStyle::Direct, ArrowStyle::RightAngle, ArrowStyle::Curve]
    }
}

/// Unordered pair of element ids; `A→B` and `B→A` share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(ElementId, ElementId)", into = "(ElementId, ElementId)")]
pub struct ArrowKey {
    low: ElementId,
    high: ElementId,
}

impl ArrowKey {
    pub fn new(a: ElementId, b: ElementId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.low == id || self.high == id
    }

    pub fn ids(&self) -> (ElementId, ElementId) {
        (self.low, self.high)
    }
}

impl From<(ElementId, ElementId)> for ArrowKey {
    fn from((a, b): (ElementId, ElementId)) -> Self {
        Self::new(a, b)
    }
}

impl From<ArrowKey> for (ElementId, ElementId) {
    fn from(key: ArrowKey) -> Self {
        key.ids()
    }
}

/// The result of a finished arrow draw, before it is admitted to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrowCandidate {
    pub start_element_id: ElementId,
    pub end_element_id: ElementId,
    pub start_border: Border,
    pub end_border: Border,
}

/// A directed connector anchored on an edge of each of two boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrow {
    pub start_element_id: ElementId,
    pub end_element_id: ElementId,
    pub start_border: Border,
    pub end_border: Border,
    pub style: ArrowStyle,
}

impl Arrow {
    pub fn from_candidate(candidate: ArrowCandidate, style: ArrowStyle) -> Self {
        Self {
            start_element_id: candidate.start_element_id,
            end_element_id: candidate.end_element_id,
            start_border: candidate.start_border,
            end_border: candidate.end_border,
            style,
        }
    }

    pub fn key(&self) -> ArrowKey {
        ArrowKey::new(self.start_element_id, self.end_element_id)
    }

    /// Whether either endpoint is `id`.
    pub fn references(&self, id: ElementId) -> bool {
        self.start_element_id == id || self.end_element_id == id
    }

    /// Route between the anchors of the two resolved endpoint boxes.
    pub fn route(&self, start: &BoxElement, end: &BoxElement) -> ArrowRoute {
        ArrowRoute::new(
            start.anchor(Some(self.start_border)),
            end.anchor(Some(self.end_border)),
            self.style,
        )
    }
}

/// Concrete geometry of a routed arrow.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowRoute {
    Polyline(Vec<Point>),
    Curve(CubicBez),
}

impl ArrowRoute {
    pub fn new(start: Point, end: Point, style: ArrowStyle) -> Self {
        match style {
            ArrowStyle::Direct => ArrowRoute::Polyline(vec![start, end]),
            ArrowStyle::RightAngle => {
                let mid_x = (start.x + end.x) / 2.0;
                ArrowRoute::Polyline(vec![
                    start,
                    Point::new(mid_x, start.y),
                    Point::new(mid_x, end.y),
                    end,
                ])
            }
            ArrowStyle::Curve => {
                let dx = end.x - start.x;
                ArrowRoute::Curve(CubicBez::new(
                    start,
                    Point::new(start.x + dx * 0.5, start.y),
                    Point::new(start.x + dx * 0.5, end.y),
                    end,
                ))
            }
        }
    }

    pub fn tip(&self) -> Point {
        match self {
            ArrowRoute::Polyline(points) => points.last().copied().unwrap_or_default(),
            ArrowRoute::Curve(curve) => curve.p3,
        }
    }

    /// Polyline approximation; curves are sampled uniformly.
    pub fn points(&self) -> Vec<Point> {
        match self {
            ArrowRoute::Polyline(points) => points.clone(),
            ArrowRoute::Curve(curve) => sample_cubic(*curve, CURVE_SAMPLES),
        }
    }

    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        match self {
            ArrowRoute::Polyline(points) => {
                let mut iter = points.iter();
                if let Some(first) = iter.next() {
                    path.move_to(*first);
                    for p in iter {
                        path.line_to(*p);
                    }
                }
            }
            ArrowRoute::Curve(curve) => {
                path.move_to(curve.p0);
                path.curve_to(curve.p1, curve.p2, curve.p3);
            }
        }
        path
    }

    /// The two arrowhead stroke endpoints, oriented along the final segment.
    pub fn arrowhead(&self) -> Option<[Point; 2]> {
        let tip = self.tip();
        let controls = match self {
            ArrowRoute::Polyline(points) => points.clone(),
            ArrowRoute::Curve(curve) => vec![curve.p0, curve.p1, curve.p2, curve.p3],
        };
        let from = controls.iter().rev().find(|p| **p != tip)?;
        arrowhead(*from, tip)
    }

    pub fn hit_test(&self, point: Point, threshold: f64) -> bool {
        point_to_polyline_dist(point, &self.points()) <= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_hit_threshold() {
        let route = ArrowRoute::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), ArrowStyle::Direct);
        assert!(route.hit_test(Point::new(50.0, 3.0), ARROW_HIT_THRESHOLD));
        assert!(route.hit_test(Point::new(50.0, 5.0), ARROW_HIT_THRESHOLD));
        assert!(!route.hit_test(Point::new(50.0, 10.0), ARROW_HIT_THRESHOLD));
    }

    #[test]
    fn test_right_angle_elbows() {
        let route = ArrowRoute::new(Point::new(0.0, 0.0), Point::new(100.0, 60.0), ArrowStyle::RightAngle);
        assert_eq!(
            route.points(),
            vec![
                Point::new(0.0, 0.0),
                Point::new(50.0, 0.0),
                Point::new(50.0, 60.0),
                Point::new(100.0, 60.0),
            ]
        );
        assert!(route.hit_test(Point::new(52.0, 30.0), ARROW_HIT_THRESHOLD));
        assert!(!route.hit_test(Point::new(30.0, 30.0), ARROW_HIT_THRESHOLD));
    }

    #[test]
    fn test_curve_controls_and_hit() {
        let route = ArrowRoute::new(Point::new(0.0, 0.0), Point::new(100.0, 100.0), ArrowStyle::Curve);
        let ArrowRoute::Curve(curve) = route.clone() else {
            panic!("expected a curve");
        };
        assert_eq!(curve.p1, Point::new(50.0, 0.0));
        assert_eq!(curve.p2, Point::new(50.0, 100.0));
        // The curve passes through its midpoint by symmetry
        assert!(route.hit_test(Point::new(50.0, 50.0), ARROW_HIT_THRESHOLD));
        assert!(!route.hit_test(Point::new(90.0, 10.0), ARROW_HIT_THRESHOLD));
    }

    #[test]
    fn test_zero_length_never_hits() {
        let p = Point::new(10.0, 10.0);
        let route = ArrowRoute::new(p, p, ArrowStyle::Direct);
        assert!(!route.hit_test(p, ARROW_HIT_THRESHOLD));
        assert!(route.arrowhead().is_none());
    }

    #[test]
    fn test_arrowhead_follows_last_segment() {
        let route = ArrowRoute::new(Point::new(0.0, 0.0), Point::new(100.0, 60.0), ArrowStyle::RightAngle);
        let [a, b] = route.arrowhead().unwrap();
        // Final segment is horizontal, so both strokes sit left of the tip
        assert!(a.x < 100.0 && b.x < 100.0);
        assert!(((a.y - 60.0).abs() - (b.y - 60.0).abs()).abs() < 1e-9);
    }

    #[test]
    fn test_key_is_unordered() {
        assert_eq!(ArrowKey::new(1, 2), ArrowKey::new(2, 1));
        assert!(ArrowKey::new(1, 2).contains(2));
        assert!(!ArrowKey::new(1, 2).contains(3));
        let parsed: ArrowKey = serde_json::from_str("[5, 2]").unwrap();
        assert_eq!(parsed.ids(), (2, 5));
    }

    #[test]
    fn test_style_wire_names() {
        assert_eq!(serde_json::to_string(&ArrowStyle::RightAngle).unwrap(), "\"right-angle\"");
        let parsed: ArrowStyle = serde_json::from_str("\"curve\"").unwrap();
        assert_eq!(parsed, ArrowStyle::Curve);
    }
}
