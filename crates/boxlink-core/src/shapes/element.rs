//! The box element.

use super::text::longest_line_width;
use super::{Border, BoxStyles, ElementId, TextMeasure, border_anchor};
use crate::geometry::point_in_rect_open;
use kurbo::{Point, Rect, Vec2};

/// Width of the band around each edge in which the pointer engages that border.
pub const BORDER_BAND: f64 = 10.0;

/// Maximum pointer-to-center distance for the nearest box to show border snapping.
pub const ENGAGEMENT_RADIUS: f64 = 50.0;

/// Horizontal plus vertical slack kept around label text when auto-growing.
pub const TEXT_PADDING: f64 = 20.0;

/// A rectangular diagram element.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxElement {
    pub(crate) id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub styles: BoxStyles,
    /// Mirrors membership in the scene's committed (or previewed) selection.
    pub is_selected: bool,
    /// Closest box to the pointer.
    pub is_nearest: bool,
    /// Edge currently within snapping distance of the pointer.
    pub proximate_border: Option<Border>,
    pub is_arrow_source: bool,
    pub is_arrow_target: bool,
    /// Provisional arrow start while this box is the arrow-draw source.
    pub arrow_start: Option<Point>,
    /// Provisional arrow end while this box is the arrow-draw source.
    pub arrow_end: Option<Point>,
    pub is_editing: bool,
}

impl BoxElement {
    /// Create a box with default geometry and styles.
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            text: String::new(),
            styles: BoxStyles::default(),
            is_selected: false,
            is_nearest: false,
            proximate_border: None,
            is_arrow_source: false,
            is_arrow_target: false,
            arrow_start: None,
            arrow_end: None,
            is_editing: false,
        }
    }

    /// Rebuild a box from its persistent attributes; transient flags start cleared.
    pub fn reconstruct(
        id: ElementId,
        bounds: Rect,
        text: String,
        styles: BoxStyles,
    ) -> Self {
        Self {
            x: bounds.x0,
            y: bounds.y0,
            width: bounds.width(),
            height: bounds.height(),
            text,
            styles,
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the point lies strictly inside the box.
    pub fn is_inside(&self, point: Point) -> bool {
        point_in_rect_open(point, self.bounds())
    }

    /// Attachment point for `border`, or the center when there is none.
    pub fn anchor(&self, border: Option<Border>) -> Point {
        border_anchor(self.bounds(), border)
    }

    /// The edge whose band contains `point`, if any.
    ///
    /// The smallest perpendicular distance wins; exact ties go to the edge
    /// that comes first in [`Border::ALL`].
    pub fn detect_border(&self, point: Point) -> Option<Border> {
        let r = self.bounds();
        let within = |v: f64, lo: f64, hi: f64| v >= lo - BORDER_BAND && v <= hi + BORDER_BAND;

        let mut best: Option<(Border, f64)> = None;
        for border in Border::ALL {
            let (dist, along) = match border {
                Border::Top => ((point.y - r.y0).abs(), within(point.x, r.x0, r.x1)),
                Border::Bottom => ((point.y - r.y1).abs(), within(point.x, r.x0, r.x1)),
                Border::Left => ((point.x - r.x0).abs(), within(point.y, r.y0, r.y1)),
                Border::Right => ((point.x - r.x1).abs(), within(point.y, r.y0, r.y1)),
            };
            if !along || dist >= BORDER_BAND {
                continue;
            }
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((border, dist));
            }
        }
        best.map(|(border, _)| border)
    }

    /// Corner handles drawn around a selected box.
    pub fn handles(&self) -> [Point; 4] {
        let r = self.bounds();
        [
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x1, r.y1),
            Point::new(r.x0, r.y1),
        ]
    }

    pub fn on_drag(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Grow the box so its text fits; never shrinks.
    pub fn grow_to_fit_text(&mut self, measure: &mut dyn TextMeasure) {
        let font = self.styles.font();
        let longest = longest_line_width(&self.text, &font, measure);
        if longest > self.width - TEXT_PADDING {
            self.width = longest + TEXT_PADDING;
        }

        let line_count = self.text.split('\n').count() as f64;
        let needed = line_count * font.line_height() + TEXT_PADDING;
        if needed > self.height {
            self.height = needed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::text::tests::FixedAdvance;

    fn boxed(x: f64, y: f64, w: f64, h: f64) -> BoxElement {
        BoxElement::reconstruct(1, Rect::new(x, y, x + w, y + h), String::new(), BoxStyles::default())
    }

    #[test]
    fn test_defaults() {
        let b = BoxElement::new(7);
        assert_eq!(b.id(), 7);
        assert_eq!(b.bounds(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(b.text.is_empty());
        assert_eq!(b.styles, BoxStyles::default());
        assert!(!b.is_selected && !b.is_editing);
    }

    #[test]
    fn test_is_inside_excludes_edges() {
        let b = boxed(10.0, 10.0, 100.0, 50.0);
        assert!(b.is_inside(Point::new(11.0, 11.0)));
        assert!(!b.is_inside(Point::new(10.0, 30.0)));
        assert!(!b.is_inside(Point::new(110.0, 30.0)));
        assert!(!b.is_inside(Point::new(50.0, 60.0)));
    }

    #[test]
    fn test_detect_border() {
        let b = boxed(0.0, 0.0, 100.0, 100.0);
        assert_eq!(b.detect_border(Point::new(5.0, 50.0)), Some(Border::Left));
        assert_eq!(b.detect_border(Point::new(50.0, 97.0)), Some(Border::Bottom));
        assert_eq!(b.detect_border(Point::new(104.0, 50.0)), Some(Border::Right));
        assert_eq!(b.detect_border(Point::new(50.0, 50.0)), None);
        // Exactly on the band limit is outside
        assert_eq!(b.detect_border(Point::new(50.0, 10.0)), None);
    }

    #[test]
    fn test_detect_border_corner_tie_prefers_top() {
        let b = boxed(0.0, 0.0, 100.0, 100.0);
        assert_eq!(b.detect_border(Point::new(3.0, 3.0)), Some(Border::Top));
        assert_eq!(b.detect_border(Point::new(97.0, 97.0)), Some(Border::Bottom));
    }

    #[test]
    fn test_detect_border_requires_edge_span() {
        let b = boxed(0.0, 0.0, 100.0, 100.0);
        // Level with the top edge but far past its end
        assert_eq!(b.detect_border(Point::new(150.0, 2.0)), None);
    }

    #[test]
    fn test_drag_moves_by_delta() {
        let mut b = boxed(10.0, 20.0, 100.0, 100.0);
        b.on_drag(Vec2::new(5.0, -3.0));
        assert!((b.x - 15.0).abs() < f64::EPSILON);
        assert!((b.y - 17.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_growth_never_shrinks() {
        let mut b = boxed(0.0, 0.0, 100.0, 100.0);
        b.text = "a".repeat(12);
        b.grow_to_fit_text(&mut FixedAdvance);
        assert!((b.width - 140.0).abs() < f64::EPSILON);

        b.text = "ab".to_string();
        b.grow_to_fit_text(&mut FixedAdvance);
        assert!((b.width - 140.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_growth_within_padding_keeps_width() {
        let mut b = boxed(0.0, 0.0, 100.0, 100.0);
        b.text = "a".repeat(8);
        b.grow_to_fit_text(&mut FixedAdvance);
        assert!((b.width - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_growth_height_follows_line_count() {
        let mut b = boxed(0.0, 0.0, 100.0, 50.0);
        b.text = "a\nb\nc".to_string();
        b.grow_to_fit_text(&mut FixedAdvance);
        let expected = 3.0 * 16.0 * 1.2 + TEXT_PADDING;
        assert!((b.height - expected).abs() < 1e-9);
    }
}
