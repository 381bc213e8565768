//! Scene renderer.

use crate::surface::{DrawingSurface, TextAlign, TextBaseline, draw_path};
use boxlink_core::Scene;
use boxlink_core::selection::HANDLE_SIZE;
use boxlink_core::shapes::{
    ArrowRoute, BORDER_BAND, Border, BoxElement, TEXT_PADDING, wrap_lines,
};
use kurbo::{Point, Rect};
use peniko::Color;

/// Colors and line widths used for a frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Selected boxes, selected arrows and the marquee outline.
    pub selection_color: Color,
    /// Marquee interior.
    pub marquee_fill: Color,
    /// Border snapping band and arrow-draw target outline.
    pub highlight_color: Color,
    pub arrow_color: Color,
    pub line_width: f64,
    pub selected_line_width: f64,
    pub handle_size: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            marquee_fill: Color::from_rgba8(59, 130, 246, 25),
            highlight_color: Color::from_rgba8(249, 115, 22, 110), // Orange
            arrow_color: Color::BLACK,
            line_width: 1.0,
            selected_line_width: 2.0,
            handle_size: HANDLE_SIZE,
        }
    }
}

impl RenderOptions {
    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    pub fn with_marquee_fill(mut self, color: Color) -> Self {
        self.marquee_fill = color;
        self
    }

    pub fn with_highlight_color(mut self, color: Color) -> Self {
        self.highlight_color = color;
        self
    }

    pub fn with_arrow_color(mut self, color: Color) -> Self {
        self.arrow_color = color;
        self
    }
}

/// Redraws a whole [`Scene`] onto a [`DrawingSurface`].
#[derive(Debug, Clone, Default)]
pub struct SceneRenderer {
    options: RenderOptions,
}

impl SceneRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Paint one full frame.
    pub fn render<S: DrawingSurface>(&self, scene: &Scene, surface: &mut S) {
        self.render_background(scene, surface);
        if let Some(rect) = scene.selection().marquee() {
            self.render_marquee(rect, surface);
        }
        self.render_arrows(scene, surface);
        // Tail first so the head ends up on top
        for element in scene.elements().iter().rev() {
            self.render_element(element, surface);
        }
    }

    fn render_background<S: DrawingSurface>(&self, scene: &Scene, surface: &mut S) {
        let options = scene.options();
        surface.set_fill_color(options.background.into());
        surface.fill_rect(Rect::new(0.0, 0.0, options.width, options.height));
    }

    fn render_marquee<S: DrawingSurface>(&self, rect: Rect, surface: &mut S) {
        surface.set_fill_color(self.options.marquee_fill);
        surface.fill_rect(rect);
        surface.set_stroke_color(self.options.selection_color);
        surface.set_line_width(self.options.line_width);
        surface.stroke_rect(rect);
    }

    fn render_arrows<S: DrawingSurface>(&self, scene: &Scene, surface: &mut S) {
        let selected = scene.selected_arrow();
        for arrow in scene.arrows() {
            let (Some(start), Some(end)) = (
                scene.element(arrow.start_element_id),
                scene.element(arrow.end_element_id),
            ) else {
                log::debug!(
                    "Skipping arrow {} -> {} with a missing endpoint",
                    arrow.start_element_id,
                    arrow.end_element_id
                );
                continue;
            };
            let route = arrow.route(start, end);
            if selected == Some(arrow.key()) {
                self.stroke_route(
                    &route,
                    self.options.selection_color,
                    self.options.selected_line_width,
                    surface,
                );
            } else {
                self.stroke_route(&route, self.options.arrow_color, self.options.line_width, surface);
            }
        }

        if let Some((start, end)) = scene.provisional_arrow() {
            let route = ArrowRoute::new(start, end, scene.arrow_style());
            self.stroke_route(&route, self.options.selection_color, self.options.line_width, surface);
        }
    }

    fn stroke_route<S: DrawingSurface>(&self, route: &ArrowRoute, color: Color, width: f64, surface: &mut S) {
        surface.set_stroke_color(color);
        surface.set_line_width(width);
        draw_path(surface, &route.to_path());
        surface.stroke();

        if let Some([left, right]) = route.arrowhead() {
            surface.begin_path();
            surface.move_to(left);
            surface.line_to(route.tip());
            surface.line_to(right);
            surface.stroke();
        }
    }

    fn render_element<S: DrawingSurface>(&self, element: &BoxElement, surface: &mut S) {
        let bounds = element.bounds();
        surface.set_fill_color(element.styles.fill_color.into());
        surface.fill_rect(bounds);

        if element.is_arrow_target {
            surface.set_stroke_color(self.options.highlight_color);
            surface.set_line_width(self.options.selected_line_width);
        } else {
            surface.set_stroke_color(element.styles.stroke_color.into());
            surface.set_line_width(self.options.line_width);
        }
        surface.stroke_rect(bounds);

        if element.is_selected {
            self.render_handles(element, surface);
        }
        if let Some(border) = element.proximate_border {
            surface.set_fill_color(self.options.highlight_color);
            surface.fill_rect(border_band(bounds, border));
        }
        // The inline editor overlays the box while it is being edited
        if !element.is_editing {
            self.render_text(element, surface);
        }
    }

    fn render_handles<S: DrawingSurface>(&self, element: &BoxElement, surface: &mut S) {
        let half = self.options.handle_size / 2.0;
        surface.set_fill_color(Color::WHITE);
        surface.set_stroke_color(self.options.selection_color);
        surface.set_line_width(self.options.line_width);
        for corner in element.handles() {
            let handle = Rect::new(corner.x - half, corner.y - half, corner.x + half, corner.y + half);
            surface.fill_rect(handle);
            surface.stroke_rect(handle);
        }
    }

    fn render_text<S: DrawingSurface>(&self, element: &BoxElement, surface: &mut S) {
        if element.text.is_empty() {
            return;
        }
        let font = element.styles.font();
        let max_width = (element.width - TEXT_PADDING).max(0.0);
        let lines = wrap_lines(&element.text, max_width, &font, surface);

        let line_height = font.line_height();
        let center = element.center();
        let first_y = center.y - line_height * (lines.len() as f64 - 1.0) / 2.0;

        surface.set_font(&font);
        surface.set_fill_color(element.styles.stroke_color.into());
        surface.set_text_align(TextAlign::Center);
        surface.set_text_baseline(TextBaseline::Middle);
        for (i, line) in lines.iter().enumerate() {
            surface.fill_text(line, Point::new(center.x, first_y + i as f64 * line_height));
        }
    }
}

/// Band of width [`BORDER_BAND`] straddling one edge of `rect`.
fn border_band(rect: Rect, border: Border) -> Rect {
    let half = BORDER_BAND / 2.0;
    match border {
        Border::Top => Rect::new(rect.x0, rect.y0 - half, rect.x1, rect.y0 + half),
        Border::Bottom => Rect::new(rect.x0, rect.y1 - half, rect.x1, rect.y1 + half),
        Border::Left => Rect::new(rect.x0 - half, rect.y0, rect.x0 + half, rect.y1),
        Border::Right => Rect::new(rect.x1 - half, rect.y0, rect.x1 + half, rect.y1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCommand, RecordingSurface};
    use boxlink_core::shapes::{ArrowCandidate, ArrowStyle};
    use boxlink_core::{CanvasOptions, SelectionMode};
    use kurbo::Vec2;

    fn rgba(color: Color) -> [u8; 4] {
        let c = color.to_rgba8();
        [c.r, c.g, c.b, c.a]
    }

    fn render(scene: &Scene) -> RecordingSurface {
        let mut surface = RecordingSurface::new();
        SceneRenderer::default().render(scene, &mut surface);
        surface
    }

    fn fill_rects(surface: &RecordingSurface) -> Vec<(Rect, [u8; 4])> {
        surface
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, color } => Some((*rect, rgba(*color))),
                _ => None,
            })
            .collect()
    }

    fn stroke_paths(surface: &RecordingSurface) -> Vec<([u8; 4], f64)> {
        surface
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokePath { color, width, .. } => Some((rgba(*color), *width)),
                _ => None,
            })
            .collect()
    }

    /// Two boxes side by side joined right -> left.
    fn linked_scene() -> (Scene, u64, u64) {
        let mut scene = Scene::default();
        let a = scene.add_element();
        let b = scene.add_element();
        scene.move_elements(&[b], Vec2::new(300.0, 0.0));
        assert!(scene.add_arrow(ArrowCandidate {
            start_element_id: a,
            end_element_id: b,
            start_border: Border::Right,
            end_border: Border::Left,
        }));
        (scene, a, b)
    }

    #[test]
    fn test_empty_scene_paints_background() {
        let scene = Scene::new(
            CanvasOptions {
                width: 640.0,
                height: 480.0,
                ..CanvasOptions::default()
            },
            ArrowStyle::Direct,
        );
        let surface = render(&scene);
        assert_eq!(surface.commands().len(), 1);
        assert_eq!(
            fill_rects(&surface),
            vec![(Rect::new(0.0, 0.0, 640.0, 480.0), [255, 255, 255, 255])]
        );
    }

    #[test]
    fn test_elements_drawn_tail_first() {
        let mut scene = Scene::default();
        let first = scene.add_element();
        let second = scene.add_element();
        scene.move_elements(&[second], Vec2::new(10.0, 10.0));

        let surface = render(&scene);
        let fills = fill_rects(&surface);
        // Background, then the older box, then the newer one on top
        assert_eq!(fills.len(), 3);
        assert_eq!(fills[1].0, scene.element(first).unwrap().bounds());
        assert_eq!(fills[2].0, scene.element(second).unwrap().bounds());
    }

    #[test]
    fn test_arrow_with_arrowhead() {
        let (scene, _, _) = linked_scene();
        let surface = render(&scene);
        let paths = stroke_paths(&surface);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|(color, _)| *color == [0, 0, 0, 255]));
    }

    #[test]
    fn test_selected_arrow_highlighted() {
        let (mut scene, a, b) = linked_scene();
        scene.select_arrow(Some(boxlink_core::shapes::ArrowKey::new(b, a)));
        let surface = render(&scene);
        let paths = stroke_paths(&surface);
        assert_eq!(paths.len(), 2);
        for (color, width) in paths {
            assert_eq!(color, [59, 130, 246, 255]);
            assert!((width - 2.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_arrows_drawn_before_elements() {
        let (scene, _, _) = linked_scene();
        let surface = render(&scene);
        let first_path = surface
            .commands()
            .iter()
            .position(|c| matches!(c, DrawCommand::StrokePath { .. }))
            .unwrap();
        let first_box = surface
            .commands()
            .iter()
            .position(|c| matches!(c, DrawCommand::StrokeRect { .. }))
            .unwrap();
        assert!(first_path < first_box);
    }

    #[test]
    fn test_selected_box_gets_four_handles() {
        let mut scene = Scene::default();
        let id = scene.add_element();
        scene.set_selection(&[id], SelectionMode::Replace);
        let surface = render(&scene);
        let handles: Vec<_> = fill_rects(&surface)
            .into_iter()
            .filter(|(rect, _)| (rect.width() - HANDLE_SIZE).abs() < f64::EPSILON)
            .collect();
        assert_eq!(handles.len(), 4);
        assert_eq!(handles[0].0, Rect::new(-4.0, -4.0, 4.0, 4.0));
    }

    #[test]
    fn test_marquee_drawn_translucent() {
        let mut scene = Scene::default();
        scene.begin_marquee(Point::new(10.0, 10.0));
        scene.update_marquee(Point::new(50.0, 60.0));
        let surface = render(&scene);
        let fills = fill_rects(&surface);
        assert_eq!(fills[1], (Rect::new(10.0, 10.0, 50.0, 60.0), [59, 130, 246, 25]));
        assert!(matches!(surface.commands()[2], DrawCommand::StrokeRect { .. }));
    }

    #[test]
    fn test_proximate_border_band() {
        let mut scene = Scene::default();
        scene.add_element();
        scene.update_proximity(Point::new(97.0, 50.0), None);
        let surface = render(&scene);
        let band = fill_rects(&surface)
            .into_iter()
            .find(|(rect, _)| *rect == Rect::new(95.0, 0.0, 105.0, 100.0));
        assert!(band.is_some());
    }

    #[test]
    fn test_text_wrapped_and_centered() {
        let mut scene = Scene::default();
        let id = scene.add_element();
        // Set directly so the box keeps its width: 0.6 * 16 = 9.6 per char,
        // and the inner width of 80 fits 8 chars
        scene.element_mut(id).unwrap().text = "hello world".to_string();
        let surface = render(&scene);
        assert_eq!(surface.texts(), vec!["hello", "world"]);

        let positions: Vec<Point> = surface
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { at, align, baseline, .. } => {
                    assert_eq!(*align, TextAlign::Center);
                    assert_eq!(*baseline, TextBaseline::Middle);
                    Some(*at)
                }
                _ => None,
            })
            .collect();
        let center = scene.element(id).unwrap().center();
        assert!((positions[0].x - center.x).abs() < 1e-9);
        assert!((positions[1].y - positions[0].y - 16.0 * 1.2).abs() < 1e-9);
        assert!(((positions[0].y + positions[1].y) / 2.0 - center.y).abs() < 1e-9);
    }

    #[test]
    fn test_editing_box_text_left_to_overlay() {
        let mut scene = Scene::default();
        let id = scene.add_element();
        scene.update_element_text(id, "hi", &mut RecordingSurface::new());
        assert!(scene.begin_text_edit(id));
        assert!(render(&scene).texts().is_empty());
    }
}
