//! Per-tab editor context tying the scene, the pointer controller and replication together.

use crate::collaboration::ReplicationClient;
use crate::config::EditorConfig;
use crate::controller::{InteractionController, InteractionState};
use crate::input::{MouseButton, PointerEvent};
use crate::scene::Scene;
use crate::shapes::{ArrowStyle, ElementId, FontSpec, StylePatch, TextMeasure};
use crate::sync;
use kurbo::Rect;

/// Requests for the inline text-edit widget hosted outside the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Show an editor over `bounds` prefilled with `text`.
    OpenTextEditor {
        id: ElementId,
        text: String,
        bounds: Rect,
        font: FontSpec,
    },
    /// Hide the editor for `id`.
    CloseTextEditor { id: ElementId },
}

/// One editor tab: owns the scene and everything that mutates it.
///
/// The host feeds pointer events and toolbar actions in, then drains
/// [`take_events`](Self::take_events) and runs the renderer whenever
/// [`take_redraw`](Self::take_redraw) reports a pending redraw.
pub struct Editor {
    scene: Scene,
    controller: InteractionController,
    replication: Option<ReplicationClient>,
    events: Vec<EditorEvent>,
    needs_redraw: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Scene::default())
    }
}

impl Editor {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            controller: InteractionController::new(),
            replication: None,
            events: Vec::new(),
            // The first frame always needs painting
            needs_redraw: true,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(Scene::new(config.canvas.clone(), config.arrow_style))
    }

    pub fn with_replication(mut self, client: ReplicationClient) -> Self {
        self.replication = Some(client);
        self
    }

    pub fn set_replication(&mut self, client: Option<ReplicationClient>) {
        self.replication = client;
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn interaction(&self) -> &InteractionState {
        self.controller.state()
    }

    pub fn replication(&self) -> Option<&ReplicationClient> {
        self.replication.as_ref()
    }

    // --- Pointer input ---

    /// Feed a pointer event; returns whether a redraw is now due.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        if let PointerEvent::Down { button, .. } | PointerEvent::Up { button, .. } = event {
            if button != MouseButton::Left {
                return false;
            }
        }
        self.commit(|scene, controller| {
            let changed = controller.handle(scene, event);
            (changed, changed)
        })
    }

    /// Abort the current pointer interaction, e.g. when the pointer leaves the canvas.
    pub fn cancel_interaction(&mut self) -> bool {
        self.commit(|scene, controller| {
            let changed = controller.cancel(scene);
            (changed, changed)
        })
    }

    // --- Toolbar actions ---

    pub fn add_element(&mut self) -> ElementId {
        self.commit(|scene, _| (scene.add_element(), true))
    }

    pub fn delete_selected(&mut self) -> bool {
        self.commit(|scene, _| {
            let changed = scene.delete_selected();
            (changed, changed)
        })
    }

    pub fn set_arrow_style(&mut self, style: ArrowStyle) {
        self.commit(|scene, _| {
            scene.set_arrow_style(style);
            ((), true)
        })
    }

    /// Apply a style patch to every selected box.
    pub fn update_selected_style(&mut self, patch: &StylePatch, measure: &mut dyn TextMeasure) {
        self.commit(|scene, _| {
            let ids = scene.selected_ids().to_vec();
            scene.update_element_style(&ids, patch, measure);
            ((), !ids.is_empty())
        })
    }

    // --- Inline text editing ---

    /// The text-edit widget reports new content for the box being edited.
    pub fn text_changed(&mut self, text: &str, measure: &mut dyn TextMeasure) -> bool {
        self.commit(|scene, _| {
            let changed = match scene.editing_id() {
                Some(id) => scene.update_element_text(id, text, measure),
                None => false,
            };
            (changed, changed)
        })
    }

    /// The text-edit widget was dismissed by the user.
    pub fn close_text_editor(&mut self) -> bool {
        self.commit(|scene, _| {
            let closed = scene.end_text_edit().is_some();
            (closed, closed)
        })
    }

    // --- Host loop ---

    /// Drain pending text-editor requests.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether a redraw is due; clears the flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Publish the scene if it changed since the last sync.
    pub fn flush_replication(&mut self) -> sync::Result<bool> {
        match self.replication.as_mut() {
            Some(client) => client.publish(&self.scene),
            None => Ok(false),
        }
    }

    /// Adopt the newest remote snapshot, if one arrived.
    ///
    /// Returns whether the scene changed.
    pub fn poll_replication(&mut self) -> sync::Result<bool> {
        let Some(client) = self.replication.as_mut() else {
            return Ok(false);
        };
        let Some(incoming) = client.poll()? else {
            return Ok(false);
        };

        let editing = self.scene.editing_id();
        self.scene.apply_snapshot(incoming);
        client.mark_synced(&self.scene)?;
        self.emit_editing_changes(editing);
        self.needs_redraw = true;
        Ok(true)
    }

    /// Run a mutation, then emit editor events, flag a redraw and publish when it changed something.
    fn commit<R>(&mut self, f: impl FnOnce(&mut Scene, &mut InteractionController) -> (R, bool)) -> R {
        let editing = self.scene.editing_id();
        let (result, changed) = f(&mut self.scene, &mut self.controller);
        self.emit_editing_changes(editing);
        if changed {
            self.needs_redraw = true;
            if let Err(e) = self.flush_replication() {
                log::warn!("Failed to publish snapshot: {e}");
            }
        }
        result
    }

    fn emit_editing_changes(&mut self, before: Option<ElementId>) {
        let after = self.scene.editing_id();
        if before == after {
            return;
        }
        if let Some(id) = before {
            self.events.push(EditorEvent::CloseTextEditor { id });
        }
        if let Some(element) = after.and_then(|id| self.scene.element(id)) {
            self.events.push(EditorEvent::OpenTextEditor {
                id: element.id(),
                text: element.text.clone(),
                bounds: element.bounds(),
                font: element.styles.font(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use crate::sync::MemoryHub;
    use kurbo::Point;

    struct FixedAdvance;

    impl TextMeasure for FixedAdvance {
        fn measure_text(&mut self, text: &str, _font: &FontSpec) -> f64 {
            text.chars().count() as f64 * 10.0
        }
    }

    fn click(editor: &mut Editor, x: f64, y: f64) {
        editor.handle_pointer(PointerEvent::down(Point::new(x, y)));
        editor.handle_pointer(PointerEvent::up(Point::new(x, y)));
    }

    #[test]
    fn test_first_frame_and_mutations_request_redraw() {
        let mut editor = Editor::default();
        assert!(editor.take_redraw());
        assert!(!editor.take_redraw());
        editor.add_element();
        assert!(editor.take_redraw());
    }

    #[test]
    fn test_click_opens_and_canvas_click_closes_editor() {
        let mut editor = Editor::default();
        let id = editor.add_element();
        click(&mut editor, 50.0, 50.0);
        let events = editor.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            EditorEvent::OpenTextEditor { id: opened, bounds, .. }
                if *opened == id && *bounds == Rect::new(0.0, 0.0, 100.0, 100.0)
        ));

        click(&mut editor, 600.0, 600.0);
        assert_eq!(editor.take_events(), vec![EditorEvent::CloseTextEditor { id }]);
    }

    #[test]
    fn test_text_changed_grows_edited_box() {
        let mut editor = Editor::default();
        let id = editor.add_element();
        assert!(!editor.text_changed("ignored", &mut FixedAdvance));
        click(&mut editor, 50.0, 50.0);
        assert!(editor.text_changed(&"w".repeat(20), &mut FixedAdvance));
        let element = editor.scene().element(id).unwrap();
        assert!((element.width - 220.0).abs() < f64::EPSILON);
        assert_eq!(element.text.len(), 20);
    }

    #[test]
    fn test_delete_closes_editor_of_deleted_box() {
        let mut editor = Editor::default();
        let id = editor.add_element();
        click(&mut editor, 50.0, 50.0);
        editor.take_events();
        assert!(editor.delete_selected());
        assert_eq!(editor.take_events(), vec![EditorEvent::CloseTextEditor { id }]);
        assert!(editor.scene().is_empty());
    }

    #[test]
    fn test_secondary_button_ignored() {
        let mut editor = Editor::default();
        editor.add_element();
        editor.take_redraw();
        let handled = editor.handle_pointer(PointerEvent::Down {
            position: Point::new(50.0, 50.0),
            button: MouseButton::Right,
            modifiers: Modifiers::NONE,
        });
        assert!(!handled);
        assert!(editor.scene().selected_ids().is_empty());
    }

    #[test]
    fn test_update_selected_style() {
        let mut editor = Editor::default();
        let a = editor.add_element();
        editor.add_element();
        click(&mut editor, 50.0, 50.0);
        // The head box (id 1) sits on top at the same spot
        let selected = editor.scene().selected_ids().to_vec();
        assert_eq!(selected.len(), 1);
        editor.update_selected_style(&StylePatch::font_family("Courier"), &mut FixedAdvance);
        for element in editor.scene().elements() {
            let expected = if selected.contains(&element.id()) { "Courier" } else { "Arial" };
            assert_eq!(element.styles.font_family, expected);
        }
        assert!(editor.scene().element(a).is_some());
    }

    #[test]
    fn test_two_tabs_mirror_each_other() {
        let hub = MemoryHub::new();
        let mut left = Editor::default().with_replication(ReplicationClient::new(Box::new(hub.join("s"))));
        let mut right = Editor::default().with_replication(ReplicationClient::new(Box::new(hub.join("s"))));

        left.add_element();
        left.add_element();
        assert!(right.poll_replication().unwrap());
        assert_eq!(right.scene().len(), 2);
        assert_eq!(right.scene().next_id(), 2);

        // Adopting a snapshot does not bounce it back
        assert!(!left.poll_replication().unwrap());

        let id = right.add_element();
        assert_eq!(id, 2);
        assert!(left.poll_replication().unwrap());
        assert_eq!(left.scene().len(), 3);
        assert_eq!(left.scene().next_id(), 3);
    }

    #[test]
    fn test_remote_delete_closes_local_editor() {
        let hub = MemoryHub::new();
        let mut left = Editor::default().with_replication(ReplicationClient::new(Box::new(hub.join("s"))));
        let mut right = Editor::default().with_replication(ReplicationClient::new(Box::new(hub.join("s"))));

        let id = left.add_element();
        right.poll_replication().unwrap();
        click(&mut left, 50.0, 50.0);
        left.take_events();

        // Right selects and deletes the same box
        right.handle_pointer(PointerEvent::down(Point::new(50.0, 50.0)));
        right.handle_pointer(PointerEvent::up(Point::new(50.0, 50.0)));
        right.delete_selected();

        assert!(left.poll_replication().unwrap());
        assert!(left.scene().is_empty());
        assert_eq!(left.take_events(), vec![EditorEvent::CloseTextEditor { id }]);
    }
}
