//! Font description, text measurement and line layout for box labels.

use serde::{Deserialize, Serialize};

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.2;

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn name(&self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }

    pub fn all() -> &'static [FontWeight] {
        &[FontWeight::Normal, FontWeight::Bold]
    }
}

/// Font style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    pub fn name(&self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        }
    }

    pub fn all() -> &'static [FontStyle] {
        &[FontStyle::Normal, FontStyle::Italic]
    }
}

/// Everything a text backend needs to pick and size a face.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub weight: FontWeight,
    pub style: FontStyle,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            size: 16.0,
            weight: FontWeight::Normal,
            style: FontStyle::Normal,
        }
    }
}

impl FontSpec {
    /// CSS shorthand, e.g. `italic bold 16px Arial`.
    pub fn css(&self) -> String {
        format!(
            "{} {} {}px {}",
            self.style.name(),
            self.weight.name(),
            self.size,
            self.family
        )
    }

    /// Distance between consecutive baselines.
    pub fn line_height(&self) -> f64 {
        self.size * LINE_HEIGHT
    }
}

/// Measures the advance width of a run of text.
pub trait TextMeasure {
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> f64;
}

/// Width of the longest explicit line in `text`.
pub fn longest_line_width(text: &str, font: &FontSpec, measure: &mut dyn TextMeasure) -> f64 {
    text.split('\n')
        .map(|line| measure.measure_text(line, font))
        .fold(0.0, f64::max)
}

/// Break `text` into lines no wider than `max_width`.
///
/// Explicit newlines always break. Within a line, words are packed greedily;
/// a single word wider than `max_width` gets a line of its own.
pub fn wrap_lines(
    text: &str,
    max_width: f64,
    font: &FontSpec,
    measure: &mut dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure.measure_text(&candidate, font) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixed-advance measurer: every char is 10 units wide.
    pub(crate) struct FixedAdvance;

    impl TextMeasure for FixedAdvance {
        fn measure_text(&mut self, text: &str, _font: &FontSpec) -> f64 {
            text.chars().count() as f64 * 10.0
        }
    }

    #[test]
    fn test_css_shorthand() {
        let font = FontSpec {
            weight: FontWeight::Bold,
            style: FontStyle::Italic,
            ..FontSpec::default()
        };
        assert_eq!(font.css(), "italic bold 16px Arial");
        assert!((font.line_height() - 19.2).abs() < 1e-9);
    }

    #[test]
    fn test_longest_line() {
        let w = longest_line_width("ab\nabcd\nabc", &FontSpec::default(), &mut FixedAdvance);
        assert!((w - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wrap_packs_words_greedily() {
        let lines = wrap_lines("aa bb cc dd", 50.0, &FontSpec::default(), &mut FixedAdvance);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn test_wrap_keeps_explicit_breaks_and_long_words() {
        let lines = wrap_lines(
            "short\nextraordinarily long",
            60.0,
            &FontSpec::default(),
            &mut FixedAdvance,
        );
        assert_eq!(lines, vec!["short", "extraordinarily", "long"]);
    }

    #[test]
    fn test_empty_text_is_one_empty_line() {
        let lines = wrap_lines("", 100.0, &FontSpec::default(), &mut FixedAdvance);
        assert_eq!(lines, vec![String::new()]);
    }
}
