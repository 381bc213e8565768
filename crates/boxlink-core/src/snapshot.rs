//! Plain-data scene snapshots exchanged between tabs.
//!
//! Outgoing snapshots are strict; incoming ones are decoded leniently so a
//! partial or slightly malformed payload from another tab still applies as
//! much as it can.

use crate::scene::CanvasOptions;
use crate::shapes::{Arrow, ArrowKey, ArrowStyle, BoxElement, BoxStyles, ElementId};
use kurbo::Rect;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Snapshot decoding errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot payload is not a JSON object")]
    NotAnObject,
}

/// Persistent attributes of a box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub styles: BoxStyles,
}

impl From<&BoxElement> for ElementRecord {
    fn from(element: &BoxElement) -> Self {
        Self {
            id: element.id(),
            x: element.x,
            y: element.y,
            width: element.width,
            height: element.height,
            text: element.text.clone(),
            styles: element.styles.clone(),
        }
    }
}

impl ElementRecord {
    pub fn to_element(&self) -> BoxElement {
        BoxElement::reconstruct(
            self.id,
            Rect::new(self.x, self.y, self.x + self.width, self.y + self.height),
            self.text.clone(),
            self.styles.clone(),
        )
    }

    fn is_valid(&self) -> bool {
        self.width >= 0.0 && self.height >= 0.0
    }
}

/// Serializable copy of the replicated parts of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Head (front-most) first.
    pub elements: Vec<ElementRecord>,
    pub arrows: Vec<Arrow>,
    pub selected_ids: Vec<ElementId>,
    pub selected_arrow: Option<ArrowKey>,
    pub options: CanvasOptions,
    pub arrow_style: ArrowStyle,
    pub next_id: ElementId,
}

/// A snapshot tagged with the client that published it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: Uuid,
    pub snapshot: SceneSnapshot,
}

/// A leniently decoded snapshot; `None` fields fall back to local state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingSnapshot {
    pub origin: Option<Uuid>,
    pub elements: Option<Vec<ElementRecord>>,
    /// Element records that were dropped but carried a readable id, with
    /// their position in the incoming list. Local boxes with these ids are kept.
    pub dropped_elements: Vec<(usize, ElementId)>,
    pub arrows: Option<Vec<Arrow>>,
    pub selected_ids: Option<Vec<ElementId>>,
    pub selected_arrow: Option<Option<ArrowKey>>,
    pub options: Option<CanvasOptions>,
    pub arrow_style: Option<ArrowStyle>,
    pub next_id: Option<ElementId>,
}

impl From<SceneSnapshot> for IncomingSnapshot {
    fn from(snapshot: SceneSnapshot) -> Self {
        Self {
            origin: None,
            elements: Some(snapshot.elements),
            dropped_elements: Vec::new(),
            arrows: Some(snapshot.arrows),
            selected_ids: Some(snapshot.selected_ids),
            selected_arrow: Some(snapshot.selected_arrow),
            options: Some(snapshot.options),
            arrow_style: Some(snapshot.arrow_style),
            next_id: Some(snapshot.next_id),
        }
    }
}

impl IncomingSnapshot {
    /// Decode either an [`Envelope`] or a bare snapshot object.
    pub fn decode(payload: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        let Value::Object(mut root) = value else {
            return Err(SnapshotError::NotAnObject);
        };

        let (origin, fields) = match root.remove("snapshot") {
            Some(Value::Object(inner)) => {
                let origin = root
                    .get("origin")
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok());
                (origin, inner)
            }
            Some(other) => {
                log::warn!("Ignoring non-object snapshot field: {other}");
                (None, root)
            }
            None => (None, root),
        };

        let (elements, dropped_elements) = match element_records(&fields) {
            Some((records, dropped)) => (Some(records), dropped),
            None => (None, Vec::new()),
        };

        Ok(Self {
            origin,
            elements,
            dropped_elements,
            arrows: records(&fields, "arrows"),
            selected_ids: records(&fields, "selected_ids"),
            selected_arrow: field(&fields, "selected_arrow"),
            options: field(&fields, "options"),
            arrow_style: field(&fields, "arrow_style"),
            next_id: field(&fields, "next_id"),
        })
    }
}

/// Decode a single field, falling back to `None` when absent or malformed.
fn field<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str) -> Option<T> {
    let value = fields.get(name)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Ignoring malformed snapshot field `{name}`: {e}");
            None
        }
    }
}

/// Decode element records whole; incomplete or invalid ones are dropped,
/// remembering their ids when readable.
fn element_records(
    fields: &Map<String, Value>,
) -> Option<(Vec<ElementRecord>, Vec<(usize, ElementId)>)> {
    let Some(Value::Array(items)) = fields.get("elements") else {
        if fields.contains_key("elements") {
            log::warn!("Ignoring non-array snapshot field `elements`");
        }
        return None;
    };
    let mut records = Vec::with_capacity(items.len());
    let mut dropped = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let reason = match serde_json::from_value::<ElementRecord>(item.clone()) {
            Ok(record) if record.is_valid() => {
                records.push(record);
                continue;
            }
            Ok(_) => "negative size".to_string(),
            Err(e) => e.to_string(),
        };
        let id = item.get("id").and_then(Value::as_u64);
        log::warn!("Dropping element record {id:?}: {reason}");
        if let Some(id) = id {
            dropped.push((index, id));
        }
    }
    Some((records, dropped))
}

/// Decode an array field record by record, dropping records that fail.
fn records<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str) -> Option<Vec<T>> {
    let Some(Value::Array(items)) = fields.get(name) else {
        if fields.contains_key(name) {
            log::warn!("Ignoring non-array snapshot field `{name}`");
        }
        return None;
    };
    let decoded = items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Dropping malformed `{name}` record: {e}");
                None
            }
        })
        .collect();
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Border;
    use serde_json::json;

    fn sample() -> SceneSnapshot {
        let mut a = ElementRecord::from(&BoxElement::new(1));
        a.text = "hello".to_string();
        SceneSnapshot {
            elements: vec![a, ElementRecord::from(&BoxElement::new(0))],
            arrows: vec![Arrow {
                start_element_id: 0,
                end_element_id: 1,
                start_border: Border::Right,
                end_border: Border::Left,
                style: ArrowStyle::Curve,
            }],
            selected_ids: vec![1],
            selected_arrow: None,
            options: CanvasOptions::default(),
            arrow_style: ArrowStyle::Curve,
            next_id: 2,
        }
    }

    #[test]
    fn test_envelope_decodes_fully() {
        let origin = Uuid::new_v4();
        let payload = serde_json::to_string(&Envelope {
            origin,
            snapshot: sample(),
        })
        .unwrap();
        let incoming = IncomingSnapshot::decode(&payload).unwrap();
        assert_eq!(incoming.origin, Some(origin));
        assert_eq!(
            IncomingSnapshot { origin: None, ..incoming },
            IncomingSnapshot::from(sample())
        );
    }

    #[test]
    fn test_missing_fields_are_none() {
        let incoming = IncomingSnapshot::decode(r#"{"next_id": 9}"#).unwrap();
        assert_eq!(incoming.next_id, Some(9));
        assert!(incoming.elements.is_none());
        assert!(incoming.arrows.is_none());
        assert!(incoming.selected_arrow.is_none());
    }

    #[test]
    fn test_malformed_record_dropped_siblings_kept() {
        let full = |id: u64, width: f64| {
            let mut record = serde_json::to_value(ElementRecord::from(&BoxElement::new(id))).unwrap();
            record["width"] = json!(width);
            record
        };
        let value = json!({
            "elements": [
                full(1, 100.0),
                {"id": "two", "x": 0.0},
                full(3, -1.0),
                {"id": 4, "x": 5.0, "y": 5.0, "width": 10.0, "height": 10.0, "text": "no styles"},
                full(5, 20.0)
            ],
            "arrow_style": "zigzag"
        });
        let incoming = IncomingSnapshot::from_value(value).unwrap();
        let ids: Vec<_> = incoming.elements.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(incoming.dropped_elements, vec![(2, 3), (3, 4)]);
        assert!(incoming.arrow_style.is_none());
    }

    #[test]
    fn test_record_missing_style_field_dropped() {
        let mut record = serde_json::to_value(ElementRecord::from(&BoxElement::new(0))).unwrap();
        record["styles"].as_object_mut().unwrap().remove("font_weight");
        let incoming = IncomingSnapshot::from_value(json!({ "elements": [record] })).unwrap();
        assert!(incoming.elements.unwrap().is_empty());
        assert_eq!(incoming.dropped_elements, vec![(0, 0)]);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            IncomingSnapshot::decode("[1, 2]"),
            Err(SnapshotError::NotAnObject)
        ));
        assert!(matches!(
            IncomingSnapshot::decode("{not json"),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn test_record_round_trip_keeps_attributes() {
        let mut element = BoxElement::new(3);
        element.x = 12.0;
        element.text = "label".to_string();
        element.is_selected = true;
        let rebuilt = ElementRecord::from(&element).to_element();
        assert_eq!(rebuilt.id(), 3);
        assert_eq!(rebuilt.bounds(), element.bounds());
        assert_eq!(rebuilt.text, "label");
        assert!(!rebuilt.is_selected);
    }
}
