//! The scene store: every box, arrow and selection of one editor tab.

use crate::geometry::{normalized_rect, rects_overlap};
use crate::selection::{Selection, SelectionMode};
use crate::shapes::{
    ARROW_HIT_THRESHOLD, Arrow, ArrowCandidate, ArrowKey, ArrowStyle, Border, BoxElement,
    ENGAGEMENT_RADIUS, ElementId, SerializableColor, StylePatch, TextMeasure,
};
use crate::snapshot::{ElementRecord, IncomingSnapshot, SceneSnapshot};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Canvas size and background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasOptions {
    pub width: f64,
    pub height: f64,
    pub background: SerializableColor,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: SerializableColor::white(),
        }
    }
}

/// Result of a proximity pass: the nearest box and the border it engages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proximity {
    pub element: ElementId,
    pub border: Option<Border>,
}

/// Owns all mutable editor state. Every mutation goes through here.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Head is the most recently added box and the front-most for hit-testing.
    elements: Vec<BoxElement>,
    arrows: Vec<Arrow>,
    selection: Selection,
    selected_arrow: Option<ArrowKey>,
    drag_origin: Option<Point>,
    options: CanvasOptions,
    arrow_style: ArrowStyle,
    next_id: ElementId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(CanvasOptions::default(), ArrowStyle::default())
    }
}

impl Scene {
    pub fn new(options: CanvasOptions, arrow_style: ArrowStyle) -> Self {
        Self {
            elements: Vec::new(),
            arrows: Vec::new(),
            selection: Selection::default(),
            selected_arrow: None,
            drag_origin: None,
            options,
            arrow_style,
            next_id: 0,
        }
    }

    pub fn elements(&self) -> &[BoxElement] {
        &self.elements
    }

    pub fn arrows(&self) -> &[Arrow] {
        &self.arrows
    }

    pub fn element(&self, id: ElementId) -> Option<&BoxElement> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut BoxElement> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_ids(&self) -> &[ElementId] {
        self.selection.ids()
    }

    pub fn selected_arrow(&self) -> Option<ArrowKey> {
        self.selected_arrow
    }

    pub fn drag_origin(&self) -> Option<Point> {
        self.drag_origin
    }

    pub fn set_drag_origin(&mut self, origin: Option<Point>) {
        self.drag_origin = origin;
    }

    pub fn options(&self) -> &CanvasOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: CanvasOptions) {
        self.options = options;
    }

    pub fn arrow_style(&self) -> ArrowStyle {
        self.arrow_style
    }

    pub fn next_id(&self) -> ElementId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    // --- Elements ---

    /// Insert a new default box at the head and return its id.
    pub fn add_element(&mut self) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        self.elements.insert(0, BoxElement::new(id));
        log::debug!("Added element {id}");
        id
    }

    /// Delete the selected boxes and the selected arrow, cascading to arrows.
    ///
    /// Returns whether anything was removed.
    pub fn delete_selected(&mut self) -> bool {
        let doomed: HashSet<ElementId> = self.selection.ids().iter().copied().collect();
        let before = (self.elements.len(), self.arrows.len());

        self.elements.retain(|e| !doomed.contains(&e.id()));
        let selected_arrow = self.selected_arrow.take();
        self.arrows.retain(|a| {
            !doomed.contains(&a.start_element_id)
                && !doomed.contains(&a.end_element_id)
                && Some(a.key()) != selected_arrow
        });
        self.selection = Selection::default();
        self.sync_selection_flags();

        let changed = before != (self.elements.len(), self.arrows.len());
        if changed {
            log::debug!(
                "Deleted {} elements and {} arrows",
                before.0 - self.elements.len(),
                before.1 - self.arrows.len()
            );
        }
        changed
    }

    /// Move the given boxes by `delta`; unknown ids are ignored.
    pub fn move_elements(&mut self, ids: &[ElementId], delta: Vec2) {
        for element in self.elements.iter_mut().filter(|e| ids.contains(&e.id())) {
            element.on_drag(delta);
        }
    }

    /// Apply a style patch to the given boxes, then regrow them to fit their text.
    pub fn update_element_style(
        &mut self,
        ids: &[ElementId],
        patch: &StylePatch,
        measure: &mut dyn TextMeasure,
    ) {
        for element in self.elements.iter_mut().filter(|e| ids.contains(&e.id())) {
            element.styles.apply(patch);
            element.grow_to_fit_text(measure);
        }
    }

    /// Replace a box's text and regrow it. Returns false for unknown ids.
    pub fn update_element_text(
        &mut self,
        id: ElementId,
        text: &str,
        measure: &mut dyn TextMeasure,
    ) -> bool {
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        element.text = text.to_string();
        element.grow_to_fit_text(measure);
        true
    }

    // --- Selection ---

    pub fn set_selection(&mut self, ids: &[ElementId], mode: SelectionMode) {
        let live: Vec<ElementId> = ids
            .iter()
            .copied()
            .filter(|id| self.element(*id).is_some())
            .collect();
        self.selection.apply(&live, mode);
        if mode == SelectionMode::Replace {
            self.selected_arrow = None;
        }
        self.sync_selection_flags();
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(&[], SelectionMode::Replace);
    }

    /// Select an arrow by its endpoint pair; unknown pairs clear the arrow selection.
    pub fn select_arrow(&mut self, key: Option<ArrowKey>) {
        self.selected_arrow = key.filter(|k| self.arrows.iter().any(|a| a.key() == *k));
    }

    fn sync_selection_flags(&mut self) {
        for element in &mut self.elements {
            element.is_selected = self.selection.contains(element.id());
        }
    }

    /// Boxes whose bounds overlap `rect` (drawn in any direction).
    pub fn elements_in_rect(&self, rect: Rect) -> Vec<ElementId> {
        let rect = rect.abs();
        self.elements
            .iter()
            .filter(|e| rects_overlap(e.bounds(), rect))
            .map(|e| e.id())
            .collect()
    }

    /// Replace the selection with a zero-size marquee at `anchor`.
    pub fn begin_marquee(&mut self, anchor: Point) {
        self.selected_arrow = None;
        self.selection = Selection::Marquee {
            anchor,
            rect: Rect::from_points(anchor, anchor),
            preview: Vec::new(),
        };
        self.sync_selection_flags();
    }

    /// Stretch the open marquee to `point` and refresh its preview.
    pub fn update_marquee(&mut self, point: Point) {
        let Selection::Marquee { anchor, .. } = self.selection else {
            return;
        };
        let rect = normalized_rect(anchor, point);
        let preview = self.elements_in_rect(rect);
        self.selection = Selection::Marquee {
            anchor,
            rect,
            preview,
        };
        self.sync_selection_flags();
    }

    /// Turn the marquee preview into the committed selection.
    pub fn commit_marquee(&mut self) -> Vec<ElementId> {
        if let Selection::Marquee { preview, .. } = &self.selection {
            self.selection = Selection::Ids(preview.clone());
        }
        self.sync_selection_flags();
        self.selection.ids().to_vec()
    }

    // --- Hit-testing ---

    /// Front-most box strictly containing `point`.
    pub fn element_at(&self, point: Point) -> Option<ElementId> {
        self.elements.iter().find(|e| e.is_inside(point)).map(|e| e.id())
    }

    /// Most recently added arrow within the hit threshold of `point`.
    pub fn arrow_at(&self, point: Point) -> Option<ArrowKey> {
        self.arrows.iter().rev().find_map(|arrow| {
            let start = self.element(arrow.start_element_id)?;
            let end = self.element(arrow.end_element_id)?;
            arrow
                .route(start, end)
                .hit_test(point, ARROW_HIT_THRESHOLD)
                .then(|| arrow.key())
        })
    }

    /// Box whose center is closest to `point`; ties go to the head-most.
    pub fn nearest_element(&self, point: Point, exclude: Option<ElementId>) -> Option<ElementId> {
        let mut best: Option<(ElementId, f64)> = None;
        for element in self.elements.iter().filter(|e| Some(e.id()) != exclude) {
            let dist = element.center().distance(point);
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((element.id(), dist));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Recompute the nearest-box and proximate-border flags for `point`.
    ///
    /// Only the nearest box can have a proximate border, and only when its
    /// center lies within the engagement radius.
    pub fn update_proximity(&mut self, point: Point, exclude: Option<ElementId>) -> Option<Proximity> {
        let nearest = self.nearest_element(point, exclude);
        self.clear_proximity();
        let element = self.element_mut(nearest?)?;
        element.is_nearest = true;
        if element.center().distance(point) <= ENGAGEMENT_RADIUS {
            element.proximate_border = element.detect_border(point);
        }
        Some(Proximity {
            element: element.id(),
            border: element.proximate_border,
        })
    }

    /// Drop every nearest-box and proximate-border flag.
    pub fn clear_proximity(&mut self) {
        for element in &mut self.elements {
            element.is_nearest = false;
            element.proximate_border = None;
        }
    }

    // --- Arrows ---

    /// Admit a finished arrow draw using the default style.
    ///
    /// Rejects missing endpoints, self-loops and any second arrow between the
    /// same pair of boxes in either direction.
    pub fn add_arrow(&mut self, candidate: ArrowCandidate) -> bool {
        let (start, end) = (candidate.start_element_id, candidate.end_element_id);
        if start == end || self.element(start).is_none() || self.element(end).is_none() {
            return false;
        }
        let key = ArrowKey::new(start, end);
        if self.arrows.iter().any(|a| a.key() == key) {
            log::debug!("Rejected duplicate arrow {start} -> {end}");
            return false;
        }
        self.arrows.push(Arrow::from_candidate(candidate, self.arrow_style));
        log::debug!("Added arrow {start} -> {end}");
        true
    }

    /// Remove every arrow joining `a` and `b` in either direction.
    pub fn remove_arrow(&mut self, a: ElementId, b: ElementId) -> bool {
        let key = ArrowKey::new(a, b);
        let before = self.arrows.len();
        self.arrows.retain(|arrow| arrow.key() != key);
        if self.selected_arrow == Some(key) {
            self.selected_arrow = None;
        }
        self.arrows.len() != before
    }

    /// Set the default style and restyle every existing arrow.
    pub fn set_arrow_style(&mut self, style: ArrowStyle) {
        self.arrow_style = style;
        for arrow in &mut self.arrows {
            arrow.style = style;
        }
    }

    /// Mark `source` as the arrow-draw origin anchored at `border`.
    pub fn begin_arrow_draw(&mut self, source: ElementId, border: Border, pointer: Point) {
        self.clear_arrow_draw();
        if let Some(element) = self.element_mut(source) {
            element.is_arrow_source = true;
            element.arrow_start = Some(element.anchor(Some(border)));
            element.arrow_end = Some(pointer);
        }
    }

    /// Move the provisional arrow end and mark the current target, if any.
    pub fn update_arrow_draw(&mut self, source: ElementId, end: Point, target: Option<ElementId>) {
        for element in &mut self.elements {
            element.is_arrow_target = Some(element.id()) == target;
            if element.id() == source {
                element.arrow_end = Some(end);
            }
        }
    }

    /// Forget all provisional arrow state.
    pub fn clear_arrow_draw(&mut self) {
        for element in &mut self.elements {
            element.is_arrow_source = false;
            element.is_arrow_target = false;
            element.arrow_start = None;
            element.arrow_end = None;
        }
    }

    /// Start and end of the arrow being drawn.
    pub fn provisional_arrow(&self) -> Option<(Point, Point)> {
        self.elements
            .iter()
            .find(|e| e.is_arrow_source)
            .and_then(|e| Some((e.arrow_start?, e.arrow_end?)))
    }

    // --- Text editing ---

    pub fn editing_id(&self) -> Option<ElementId> {
        self.elements.iter().find(|e| e.is_editing).map(|e| e.id())
    }

    /// Put `id` into text-edit mode, taking every other box out of it.
    pub fn begin_text_edit(&mut self, id: ElementId) -> bool {
        if self.element(id).is_none() {
            return false;
        }
        for element in &mut self.elements {
            element.is_editing = element.id() == id;
        }
        true
    }

    /// Leave text-edit mode; returns the box that was being edited.
    pub fn end_text_edit(&mut self) -> Option<ElementId> {
        let editing = self.editing_id();
        for element in &mut self.elements {
            element.is_editing = false;
        }
        editing
    }

    // --- Replication ---

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            elements: self.elements.iter().map(ElementRecord::from).collect(),
            arrows: self.arrows.clone(),
            selected_ids: self.selection.ids().to_vec(),
            selected_arrow: self.selected_arrow,
            options: self.options.clone(),
            arrow_style: self.arrow_style,
            next_id: self.next_id,
        }
    }

    /// Merge a remote snapshot into this scene.
    ///
    /// The replacement collections are built completely before being swapped
    /// in. Absent fields keep local values. Transient flags of boxes that
    /// survive the merge are carried over.
    pub fn apply_snapshot(&mut self, incoming: IncomingSnapshot) {
        let elements = match incoming.elements {
            Some(records) => {
                let previous: HashMap<ElementId, &BoxElement> =
                    self.elements.iter().map(|e| (e.id(), e)).collect();
                let mut seen = HashSet::new();
                let mut rebuilt = Vec::with_capacity(records.len());
                for record in records {
                    if !seen.insert(record.id) {
                        log::warn!("Dropping duplicate element record {}", record.id);
                        continue;
                    }
                    let mut element = record.to_element();
                    if let Some(old) = previous.get(&record.id) {
                        element.is_nearest = old.is_nearest;
                        element.proximate_border = old.proximate_border;
                        element.is_arrow_source = old.is_arrow_source;
                        element.is_arrow_target = old.is_arrow_target;
                        element.arrow_start = old.arrow_start;
                        element.arrow_end = old.arrow_end;
                        element.is_editing = old.is_editing;
                    }
                    rebuilt.push(element);
                }
                // A dropped record never erases the local box it describes
                for (index, id) in incoming.dropped_elements {
                    if let Some(old) = previous.get(&id).filter(|_| seen.insert(id)) {
                        rebuilt.insert(index.min(rebuilt.len()), (*old).clone());
                    }
                }
                rebuilt
            }
            None => self.elements.clone(),
        };
        let live: HashSet<ElementId> = elements.iter().map(|e| e.id()).collect();

        let mut pairs = HashSet::new();
        let arrows: Vec<Arrow> = incoming
            .arrows
            .unwrap_or_else(|| self.arrows.clone())
            .into_iter()
            .filter(|a| {
                let keep = a.start_element_id != a.end_element_id
                    && live.contains(&a.start_element_id)
                    && live.contains(&a.end_element_id)
                    && pairs.insert(a.key());
                if !keep {
                    log::warn!(
                        "Dropping arrow {} -> {} from snapshot",
                        a.start_element_id,
                        a.end_element_id
                    );
                }
                keep
            })
            .collect();

        let selection = match &self.selection {
            Selection::Marquee { anchor, rect, .. } => Selection::Marquee {
                anchor: *anchor,
                rect: *rect,
                preview: elements
                    .iter()
                    .filter(|e| rects_overlap(e.bounds(), *rect))
                    .map(|e| e.id())
                    .collect(),
            },
            Selection::Ids(local) => {
                let ids = incoming.selected_ids.unwrap_or_else(|| local.clone());
                Selection::Ids(ids.into_iter().filter(|id| live.contains(id)).collect())
            }
        };

        let selected_arrow = incoming
            .selected_arrow
            .unwrap_or(self.selected_arrow)
            .filter(|key| arrows.iter().any(|a| a.key() == *key));

        let max_id = elements.iter().map(|e| e.id() + 1).max().unwrap_or(0);
        let next_id = self
            .next_id
            .max(incoming.next_id.unwrap_or(0))
            .max(max_id);

        self.elements = elements;
        self.arrows = arrows;
        self.selection = selection;
        self.selected_arrow = selected_arrow;
        if let Some(options) = incoming.options {
            self.options = options;
        }
        if let Some(style) = incoming.arrow_style {
            self.arrow_style = style;
        }
        self.next_id = next_id;
        self.sync_selection_flags();
        log::debug!(
            "Applied snapshot: {} elements, {} arrows",
            self.elements.len(),
            self.arrows.len()
        );
    }
}
