//! Vello-backed drawing surface.

use crate::surface::{DrawingSurface, TextAlign, TextBaseline};
use boxlink_core::shapes::{FontSpec, FontStyle, FontWeight, TextMeasure};
use kurbo::{Affine, BezPath, Point, Rect, Stroke, Vec2};
use parley::layout::{Layout, PositionedLayoutItem};
use parley::{FontContext, LayoutContext, StyleProperty};
use peniko::{Brush, Color, Fill};
use vello::Scene;

/// Encodes draw calls into a [`vello::Scene`], laying text out with Parley.
///
/// Fonts come from the system collection; extra faces can be added with
/// [`register_font`](Self::register_font).
pub struct VelloSurface {
    /// The Vello scene being built.
    scene: Scene,
    /// Font context for text layout (cached across frames).
    font_cx: FontContext,
    layout_cx: LayoutContext<Brush>,
    /// Applied to everything drawn, e.g. the HiDPI scale factor.
    transform: Affine,
    fill: Color,
    stroke: Color,
    line_width: f64,
    font: FontSpec,
    align: TextAlign,
    baseline: TextBaseline,
    path: BezPath,
}

impl Default for VelloSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloSurface {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            transform: Affine::IDENTITY,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            font: FontSpec::default(),
            align: TextAlign::default(),
            baseline: TextBaseline::default(),
            path: BezPath::new(),
        }
    }

    /// Add a font face (TTF/OTF bytes) to the collection used for text.
    pub fn register_font(&mut self, data: Vec<u8>) {
        let families = self
            .font_cx
            .collection
            .register_fonts(vello::peniko::Blob::new(std::sync::Arc::new(data)), None);
        log::debug!("Registered {} font families", families.len());
    }

    /// Set the scale factor for HiDPI.
    pub fn set_scale_factor(&mut self, scale: f64) {
        self.transform = Affine::scale(scale);
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Clear the scene before drawing the next frame.
    pub fn reset(&mut self) {
        self.scene.reset();
        self.path = BezPath::new();
    }

    fn layout(&mut self, text: &str, font: &FontSpec, brush: Brush) -> Layout<Brush> {
        let weight = match font.weight {
            FontWeight::Normal => parley::FontWeight::NORMAL,
            FontWeight::Bold => parley::FontWeight::BOLD,
        };
        let style = match font.style {
            FontStyle::Normal => parley::FontStyle::Normal,
            FontStyle::Italic => parley::FontStyle::Italic,
        };

        let mut builder = self.layout_cx.ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(font.size as f32));
        builder.push_default(StyleProperty::Brush(brush));
        builder.push_default(StyleProperty::FontWeight(weight));
        builder.push_default(StyleProperty::FontStyle(style));
        builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
            parley::FontFamily::Named(font.family.clone().into()),
        )));
        let mut layout = builder.build(text);

        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());
        layout
    }

    fn ensure_subpath(&mut self, point: Point) -> bool {
        if self.path.elements().is_empty() {
            self.path.move_to(point);
            return false;
        }
        true
    }
}

/// Offset from the requested text position to the layout's top-left corner.
fn anchor_offset(align: TextAlign, baseline: TextBaseline, width: f64, height: f64, first_baseline: f64) -> Vec2 {
    let x = match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => -width / 2.0,
        TextAlign::Right => -width,
    };
    let y = match baseline {
        TextBaseline::Top => 0.0,
        TextBaseline::Middle => -height / 2.0,
        TextBaseline::Alphabetic => -first_baseline,
        TextBaseline::Bottom => -height,
    };
    Vec2::new(x, y)
}

impl TextMeasure for VelloSurface {
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        let layout = self.layout(text, font, Brush::Solid(Color::BLACK));
        layout.width() as f64
    }
}

impl DrawingSurface for VelloSurface {
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
        self.scene.fill(Fill::NonZero, self.transform, self.fill, None, &rect);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let stroke = Stroke::new(self.line_width);
        self.scene.stroke(&stroke, self.transform, self.stroke, None, &rect);
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
        let stroke = Stroke::new(self.line_width);
        self.scene.stroke(&stroke, self.transform, self.stroke, None, &self.path);
    }

    fn fill_text(&mut self, text: &str, at: Point) {
        if text.is_empty() {
            return;
        }
        let brush = Brush::Solid(self.fill);
        let font = self.font.clone();
        let layout = self.layout(text, &font, brush.clone());

        let first_baseline = layout
            .lines()
            .next()
            .map(|line| line.metrics().baseline as f64)
            .unwrap_or_default();
        let offset = anchor_offset(
            self.align,
            self.baseline,
            layout.width() as f64,
            layout.height() as f64,
            first_baseline,
        );
        let text_transform = self.transform * Affine::translate(at.to_vec2() + offset);

        // Adapted from Parley's vello example
        let mut glyph_count = 0;
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let run = glyph_run.run();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));

                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        vello::Glyph { id: glyph.id, x: gx, y: gy }
                    })
                    .collect();
                glyph_count += glyphs.len();

                if !glyphs.is_empty() {
                    self.scene
                        .draw_glyphs(run.font())
                        .brush(&brush)
                        .hint(true)
                        .transform(text_transform)
                        .glyph_transform(glyph_xform)
                        .font_size(run.font_size())
                        .normalized_coords(run.normalized_coords())
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
            }
        }

        if glyph_count == 0 {
            log::warn!("No glyphs rendered for font family {}", self.font.family);
        }
    }
}
