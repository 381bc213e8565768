//! Element and connector definitions for the diagram canvas.

mod arrow;
mod element;
mod text;

pub use arrow::{ARROW_HIT_THRESHOLD, Arrow, ArrowCandidate, ArrowKey, ArrowRoute, ArrowStyle};
pub use element::{BORDER_BAND, BoxElement, ENGAGEMENT_RADIUS, TEXT_PADDING};
pub use text::{
    FontSpec, FontStyle, FontWeight, LINE_HEIGHT, TextMeasure, longest_line_width, wrap_lines,
};

use kurbo::{Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Unique, monotonically increasing element identifier.
pub type ElementId = u64;

/// Serializable color representation (RGBA8), stored as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a CSS-style color: `#rgb`, `#rrggbb`, `#rrggbbaa` or a few names.
    pub fn parse(color: &str) -> Option<Self> {
        let color = color.trim();
        match color.to_ascii_lowercase().as_str() {
            "black" => return Some(Self::black()),
            "white" => return Some(Self::white()),
            "transparent" => return Some(Self::transparent()),
            "red" => return Some(Self::new(255, 0, 0, 255)),
            "green" => return Some(Self::new(0, 128, 0, 255)),
            "blue" => return Some(Self::new(0, 0, 255, 255)),
            "gray" | "grey" => return Some(Self::new(128, 128, 128, 255)),
            _ => {}
        }

        let hex = color.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => Some(Self::new(
                channel(&hex[0..1])? * 17,
                channel(&hex[1..2])? * 17,
                channel(&hex[2..3])? * 17,
                255,
            )),
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// One of the four edges of a box, used as an arrow attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Border {
    Top,
    Bottom,
    Left,
    Right,
}

impl Border {
    /// Fixed evaluation order; earlier borders win exact distance ties.
    pub const ALL: [Border; 4] = [Border::Top, Border::Bottom, Border::Left, Border::Right];

    /// Midpoint of this edge of `rect`.
    pub fn anchor(self, rect: Rect) -> Point {
        let cx = rect.x0 + rect.width() / 2.0;
        let cy = rect.y0 + rect.height() / 2.0;
        match self {
            Border::Top => Point::new(cx, rect.y0),
            Border::Bottom => Point::new(cx, rect.y1),
            Border::Left => Point::new(rect.x0, cy),
            Border::Right => Point::new(rect.x1, cy),
        }
    }
}

/// Anchor point for an optional border; no border means the box center.
pub fn border_anchor(rect: Rect, border: Option<Border>) -> Point {
    match border {
        Some(border) => border.anchor(rect),
        None => rect.center(),
    }
}

/// Visual style of a box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStyles {
    /// Font family name.
    pub font_family: String,
    /// Font size in canvas units.
    pub font_size: f64,
    /// Font weight.
    pub font_weight: FontWeight,
    /// Font style.
    pub font_style: FontStyle,
    /// Outline (and text) color.
    pub stroke_color: SerializableColor,
    /// Fill color.
    pub fill_color: SerializableColor,
}

impl Default for BoxStyles {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 16.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            stroke_color: SerializableColor::black(),
            fill_color: SerializableColor::white(),
        }
    }
}

impl BoxStyles {
    /// Font description used for measuring and drawing this box's text.
    pub fn font(&self) -> FontSpec {
        FontSpec {
            family: self.font_family.clone(),
            size: self.font_size,
            weight: self.font_weight,
            style: self.font_style,
        }
    }

    /// Apply every field present in `patch`.
    pub fn apply(&mut self, patch: &StylePatch) {
        if let Some(family) = &patch.font_family {
            self.font_family = family.clone();
        }
        if let Some(size) = patch.font_size {
            if size > 0.0 {
                self.font_size = size;
            }
        }
        if let Some(weight) = patch.font_weight {
            self.font_weight = weight;
        }
        if let Some(style) = patch.font_style {
            self.font_style = style;
        }
        if let Some(stroke) = patch.stroke_color {
            self.stroke_color = stroke;
        }
        if let Some(fill) = patch.fill_color {
            self.fill_color = fill;
        }
    }
}

/// Partial style update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePatch {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<FontWeight>,
    pub font_style: Option<FontStyle>,
    pub stroke_color: Option<SerializableColor>,
    pub fill_color: Option<SerializableColor>,
}

impl StylePatch {
    /// Patch only the fill color.
    pub fn fill(color: SerializableColor) -> Self {
        Self {
            fill_color: Some(color),
            ..Self::default()
        }
    }

    /// Patch only the stroke color.
    pub fn stroke(color: SerializableColor) -> Self {
        Self {
            stroke_color: Some(color),
            ..Self::default()
        }
    }

    /// Patch only the font family.
    pub fn font_family(family: impl Into<String>) -> Self {
        Self {
            font_family: Some(family.into()),
            ..Self::default()
        }
    }

    /// Patch only the font size.
    pub fn font_size(size: f64) -> Self {
        Self {
            font_size: Some(size),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(SerializableColor::parse("#fff"), Some(SerializableColor::white()));
        assert_eq!(
            SerializableColor::parse("#3b82f6"),
            Some(SerializableColor::new(59, 130, 246, 255))
        );
        assert_eq!(
            SerializableColor::parse("#00000080"),
            Some(SerializableColor::new(0, 0, 0, 128))
        );
        assert_eq!(SerializableColor::parse("Black"), Some(SerializableColor::black()));
        assert_eq!(SerializableColor::parse("#12"), None);
        assert_eq!(SerializableColor::parse("#zzzzzz"), None);
    }

    #[test]
    fn test_hex_format() {
        assert_eq!(SerializableColor::new(59, 130, 246, 255).to_hex(), "#3b82f6");
        assert_eq!(SerializableColor::new(0, 0, 0, 128).to_hex(), "#00000080");
    }

    #[test]
    fn test_color_serde_as_hex() {
        let json = serde_json::to_string(&SerializableColor::new(255, 0, 0, 255)).unwrap();
        assert_eq!(json, "\"#ff0000\"");
        let parsed: SerializableColor = serde_json::from_str("\"#0f0\"").unwrap();
        assert_eq!(parsed, SerializableColor::new(0, 255, 0, 255));
        assert!(serde_json::from_str::<SerializableColor>("\"nope\"").is_err());
    }

    #[test]
    fn test_border_anchor() {
        let rect = Rect::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(Border::Top.anchor(rect), Point::new(60.0, 20.0));
        assert_eq!(Border::Bottom.anchor(rect), Point::new(60.0, 70.0));
        assert_eq!(Border::Left.anchor(rect), Point::new(10.0, 45.0));
        assert_eq!(Border::Right.anchor(rect), Point::new(110.0, 45.0));
        assert_eq!(border_anchor(rect, None), Point::new(60.0, 45.0));
    }

    #[test]
    fn test_style_patch_applies_only_present_fields() {
        let mut styles = BoxStyles::default();
        styles.apply(&StylePatch::fill(SerializableColor::black()));
        assert_eq!(styles.fill_color, SerializableColor::black());
        assert_eq!(styles.stroke_color, SerializableColor::black());
        assert_eq!(styles.font_family, "Arial");

        // Non-positive sizes are ignored
        styles.apply(&StylePatch::font_size(0.0));
        assert!((styles.font_size - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_border_serializes_lowercase() {
        let json = serde_json::to_string(&Border::Right).unwrap();
        assert_eq!(json, "\"right\"");
    }
}
