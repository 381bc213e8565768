//! Pointer-driven interaction state machine.

use crate::input::{Modifiers, PointerEvent};
use crate::scene::Scene;
use crate::selection::SelectionMode;
use crate::shapes::{ArrowCandidate, Border, ElementId};
use kurbo::Point;

/// Current pointer interaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Moving `ids` with the pointer; `clicked` is the box under the press.
    Dragging {
        ids: Vec<ElementId>,
        clicked: ElementId,
        origin: Point,
        moved: bool,
    },
    /// Rubber-band selection; the rectangle itself lives in the scene's selection.
    MarqueeSelecting { anchor: Point },
    /// Drawing a new arrow out of `source`.
    DrawingArrow {
        source: ElementId,
        source_border: Border,
    },
}

/// Translates pointer events into scene mutations.
///
/// Every handler returns whether the scene changed and needs a redraw.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    state: InteractionState,
    /// Set by a press that should close the text editor once released.
    close_editor_on_release: bool,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn handle(&mut self, scene: &mut Scene, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down {
                position,
                modifiers,
                ..
            } => self.pointer_down(scene, position, modifiers),
            PointerEvent::Move { position } => self.pointer_move(scene, position),
            PointerEvent::Up { position, .. } => self.pointer_up(scene, position),
        }
    }

    pub fn pointer_down(&mut self, scene: &mut Scene, position: Point, modifiers: Modifiers) -> bool {
        if !self.is_idle() {
            // A press without a matching release; drop the stale interaction first
            self.cancel(scene);
        }
        self.close_editor_on_release = false;

        let Some(id) = scene.element_at(position) else {
            return self.press_empty_canvas(scene, position);
        };

        let border = scene
            .update_proximity(position, None)
            .filter(|p| p.element == id)
            .and_then(|p| p.border);
        if let Some(border) = border {
            scene.begin_arrow_draw(id, border, position);
            log::debug!("Arrow draw from {id} ({border:?})");
            self.state = InteractionState::DrawingArrow {
                source: id,
                source_border: border,
            };
            return true;
        }
        scene.clear_proximity();

        if modifiers.is_toggle() {
            scene.set_selection(&[id], SelectionMode::Toggle);
            self.close_editor_on_release = scene.editing_id().is_some_and(|editing| editing != id);
            return true;
        }

        let ids = if scene.selection().contains(id) {
            scene.selected_ids().to_vec()
        } else {
            scene.set_selection(&[id], SelectionMode::Replace);
            vec![id]
        };
        scene.set_drag_origin(Some(position));
        self.state = InteractionState::Dragging {
            ids,
            clicked: id,
            origin: position,
            moved: false,
        };
        true
    }

    fn press_empty_canvas(&mut self, scene: &mut Scene, position: Point) -> bool {
        self.close_editor_on_release = scene.editing_id().is_some();
        if let Some(key) = scene.arrow_at(position) {
            scene.clear_selection();
            scene.select_arrow(Some(key));
            return true;
        }
        scene.clear_proximity();
        scene.begin_marquee(position);
        self.state = InteractionState::MarqueeSelecting { anchor: position };
        true
    }

    pub fn pointer_move(&mut self, scene: &mut Scene, position: Point) -> bool {
        match &mut self.state {
            InteractionState::Idle => {
                let before = hover_flags(scene);
                scene.update_proximity(position, None);
                hover_flags(scene) != before
            }
            InteractionState::Dragging { ids, moved, .. } => {
                let previous = scene.drag_origin().unwrap_or(position);
                let delta = position - previous;
                scene.set_drag_origin(Some(position));
                if delta.x == 0.0 && delta.y == 0.0 {
                    return false;
                }
                scene.move_elements(ids, delta);
                *moved = true;
                true
            }
            InteractionState::MarqueeSelecting { .. } => {
                scene.update_marquee(position);
                true
            }
            InteractionState::DrawingArrow { source, .. } => {
                let source = *source;
                let (target, end) = snap_target(scene, source, position);
                scene.update_arrow_draw(source, end, target.map(|(id, _)| id));
                true
            }
        }
    }

    pub fn pointer_up(&mut self, scene: &mut Scene, position: Point) -> bool {
        let close_editor = std::mem::take(&mut self.close_editor_on_release);
        let changed = match std::mem::take(&mut self.state) {
            InteractionState::Idle => false,
            InteractionState::Dragging { clicked, moved, .. } => {
                scene.set_drag_origin(None);
                if moved {
                    scene.end_text_edit();
                } else {
                    scene.begin_text_edit(clicked);
                }
                true
            }
            InteractionState::MarqueeSelecting { .. } => {
                let ids = scene.commit_marquee();
                log::debug!("Marquee selected {} elements", ids.len());
                true
            }
            InteractionState::DrawingArrow {
                source,
                source_border,
            } => {
                if let (Some((target, end_border)), _) = snap_target(scene, source, position) {
                    scene.add_arrow(ArrowCandidate {
                        start_element_id: source,
                        end_element_id: target,
                        start_border: source_border,
                        end_border,
                    });
                }
                scene.clear_arrow_draw();
                scene.update_proximity(position, None);
                true
            }
        };
        if close_editor && scene.end_text_edit().is_some() {
            return true;
        }
        changed
    }

    /// Abandon the current interaction without committing an arrow.
    pub fn cancel(&mut self, scene: &mut Scene) -> bool {
        self.close_editor_on_release = false;
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => false,
            InteractionState::Dragging { .. } => {
                scene.set_drag_origin(None);
                true
            }
            InteractionState::MarqueeSelecting { .. } => {
                scene.commit_marquee();
                true
            }
            InteractionState::DrawingArrow { .. } => {
                scene.clear_arrow_draw();
                true
            }
        }
    }
}

/// Target box and border for the arrow being drawn, plus where its end should sit.
fn snap_target(
    scene: &mut Scene,
    source: ElementId,
    pointer: Point,
) -> (Option<(ElementId, Border)>, Point) {
    let Some(proximity) = scene.update_proximity(pointer, Some(source)) else {
        return (None, pointer);
    };
    match (proximity.border, scene.element(proximity.element)) {
        (Some(border), Some(target)) => {
            let anchor = target.anchor(Some(border));
            (Some((proximity.element, border)), anchor)
        }
        _ => (None, pointer),
    }
}

fn hover_flags(scene: &Scene) -> Vec<(ElementId, bool, Option<Border>)> {
    scene
        .elements()
        .iter()
        .filter(|e| e.is_nearest || e.proximate_border.is_some())
        .map(|e| (e.id(), e.is_nearest, e.proximate_border))
        .collect()
}
