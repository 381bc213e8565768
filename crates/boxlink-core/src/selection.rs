//! Element selection state.

use crate::shapes::ElementId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Side length of the square corner handles drawn around selected boxes.
pub const HANDLE_SIZE: f64 = 8.0;

/// How a set of ids is combined with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// The ids become the whole selection.
    Replace,
    /// Each id is added if absent, removed if present.
    Toggle,
}

/// Either a committed set of ids or an in-progress marquee with its preview.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Ids(Vec<ElementId>),
    Marquee {
        anchor: Point,
        rect: Rect,
        preview: Vec<ElementId>,
    },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Ids(Vec::new())
    }
}

impl Selection {
    /// Ids currently shown as selected (the preview while a marquee is open).
    pub fn ids(&self) -> &[ElementId] {
        match self {
            Selection::Ids(ids) => ids,
            Selection::Marquee { preview, .. } => preview,
        }
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.ids().contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    pub fn marquee(&self) -> Option<Rect> {
        match self {
            Selection::Marquee { rect, .. } => Some(*rect),
            Selection::Ids(_) => None,
        }
    }

    /// Combine `ids` into a committed selection.
    ///
    /// An open marquee is discarded first; toggling starts from its preview.
    pub fn apply(&mut self, ids: &[ElementId], mode: SelectionMode) {
        let mut current = match std::mem::take(self) {
            Selection::Ids(current) => current,
            Selection::Marquee { preview, .. } => preview,
        };
        match mode {
            SelectionMode::Replace => {
                current.clear();
                for id in ids {
                    if !current.contains(id) {
                        current.push(*id);
                    }
                }
            }
            SelectionMode::Toggle => {
                for id in ids {
                    if let Some(pos) = current.iter().position(|c| c == id) {
                        current.remove(pos);
                    } else {
                        current.push(*id);
                    }
                }
            }
        }
        *self = Selection::Ids(current);
    }

    /// Drop ids for which `keep` returns false.
    pub fn retain(&mut self, keep: impl Fn(ElementId) -> bool) {
        match self {
            Selection::Ids(ids) => ids.retain(|id| keep(*id)),
            Selection::Marquee { preview, .. } => preview.retain(|id| keep(*id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_toggle() {
        let mut sel = Selection::default();
        sel.apply(&[1, 2], SelectionMode::Replace);
        assert_eq!(sel.ids(), &[1, 2]);

        sel.apply(&[2, 3], SelectionMode::Toggle);
        assert_eq!(sel.ids(), &[1, 3]);

        sel.apply(&[4], SelectionMode::Replace);
        assert_eq!(sel.ids(), &[4]);
    }

    #[test]
    fn test_replace_dedupes() {
        let mut sel = Selection::default();
        sel.apply(&[5, 5, 6], SelectionMode::Replace);
        assert_eq!(sel.ids(), &[5, 6]);
    }

    #[test]
    fn test_marquee_commits_to_ids() {
        let mut sel = Selection::Marquee {
            anchor: Point::ZERO,
            rect: Rect::ZERO,
            preview: vec![7],
        };
        assert!(sel.marquee().is_some());
        assert!(sel.contains(7));

        sel.apply(&[8], SelectionMode::Toggle);
        assert_eq!(sel, Selection::Ids(vec![7, 8]));
        assert!(sel.marquee().is_none());
    }
}
