//! Headless surface that records draw commands.

use crate::surface::{DrawingSurface, TextAlign, TextBaseline};
use boxlink_core::shapes::{FontSpec, TextMeasure};
use kurbo::{BezPath, Point, Rect};
use peniko::Color;

/// Fixed per-character advance, as a fraction of the font size.
const CHAR_ADVANCE: f64 = 0.6;

/// A draw call captured with the paint state it was issued under.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f64,
    },
    StrokePath {
        path: BezPath,
        color: Color,
        width: f64,
    },
    FillText {
        text: String,
        at: Point,
        font: FontSpec,
        color: Color,
        align: TextAlign,
        baseline: TextBaseline,
    },
}

/// A [`DrawingSurface`] that only remembers what was drawn.
///
/// Text is measured with a fixed advance of `0.6 × font_size` per character,
/// which keeps layout deterministic without any font data.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
    fill: Color,
    stroke: Color,
    line_width: f64,
    font: FontSpec,
    align: TextAlign,
    baseline: TextBaseline,
    path: BezPath,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            font: FontSpec::default(),
            align: TextAlign::default(),
            baseline: TextBaseline::default(),
            path: BezPath::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Text of every `FillText` command, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Start a subpath when a segment arrives without a current point.
    fn ensure_subpath(&mut self, point: Point) -> bool {
        if self.path.elements().is_empty() {
            self.path.move_to(point);
            return false;
        }
        true
    }
}

impl TextMeasure for RecordingSurface {
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> f64 {
        text.chars().count() as f64 * font.size * CHAR_ADVANCE
    }
}

impl DrawingSurface for RecordingSurface {
    fn set_fill_color(&mut self, color: Color) {
        self.fill = color;
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.stroke = color;
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.font = font.clone();
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.align = align;
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.baseline = baseline;
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            color: self.fill,
        });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color: self.stroke,
            width: self.line_width,
        });
    }

    fn begin_path(&mut self) {
        self.path = BezPath::new();
    }

    fn move_to(&mut self, point: Point) {
        self.path.move_to(point);
    }

    fn line_to(&mut self, point: Point) {
        if self.ensure_subpath(point) {
            self.path.line_to(point);
        }
    }

    fn bezier_curve_to(&mut self, c1: Point, c2: Point, end: Point) {
        self.ensure_subpath(c1);
        self.path.curve_to(c1, c2, end);
    }

    fn stroke(&mut self) {
        if self.path.elements().is_empty() {
            return;
        }
        self.commands.push(DrawCommand::StrokePath {
            path: self.path.clone(),
            color: self.stroke,
            width: self.line_width,
        });
    }

    fn fill_text(&mut self, text: &str, at: Point) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            at,
            font: self.font.clone(),
            color: self.fill,
            align: self.align,
            baseline: self.baseline,
        });
    }
}
