//! Drawing surface capability consumed by the renderer.

use boxlink_core::shapes::{FontSpec, TextMeasure};
use kurbo::{BezPath, PathEl, Point, Rect};
use peniko::Color;

/// Horizontal anchoring of `fill_text` relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical anchoring of `fill_text` relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    Top,
    Middle,
    #[default]
    Alphabetic,
    Bottom,
}

/// An immediate-mode 2D canvas.
///
/// Paint state (colors, line width, font, alignment) persists across calls
/// until changed, like an HTML canvas context. Every surface also measures
/// text so layout can be computed against the same font metrics it draws with.
pub trait DrawingSurface: TextMeasure {
    fn set_fill_color(&mut self, color: Color);
    fn set_stroke_color(&mut self, color: Color);
    fn set_line_width(&mut self, width: f64);
    fn set_font(&mut self, font: &FontSpec);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);

    fn fill_rect(&mut self, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);

    /// Discard the current path and start a new one.
    fn begin_path(&mut self);
    fn move_to(&mut self, point: Point);
    fn line_to(&mut self, point: Point);
    fn bezier_curve_to(&mut self, c1: Point, c2: Point, end: Point);
    /// Stroke the current path with the stroke color and line width.
    fn stroke(&mut self);

    /// Draw a single line of text with the fill color.
    fn fill_text(&mut self, text: &str, at: Point);
}

/// Replay a kurbo path onto the surface as a fresh path (not stroked).
pub fn draw_path<S: DrawingSurface + ?Sized>(surface: &mut S, path: &BezPath) {
    surface.begin_path();
    let mut start = Point::ZERO;
    let mut last = Point::ZERO;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                surface.move_to(p);
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                surface.line_to(p);
                last = p;
            }
            PathEl::QuadTo(q, p) => {
                // Elevate to cubic
                let c1 = last + (q - last) * (2.0 / 3.0);
                let c2 = p + (q - p) * (2.0 / 3.0);
                surface.bezier_curve_to(c1, c2, p);
                last = p;
            }
            PathEl::CurveTo(c1, c2, p) => {
                surface.bezier_curve_to(c1, c2, p);
                last = p;
            }
            PathEl::ClosePath => {
                surface.line_to(start);
                last = start;
            }
        }
    }
}
