//! Text metrics: the one capability layout cannot do without.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub font_weight: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 14.0,
            font_weight: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;
}

/// Deterministic approximation used for tests and headless snapshots: a fixed width factor
/// per character and a fixed line-height factor, both relative to the font size.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };

        let font_size = style.font_size.max(1.0);
        let lines: Vec<&str> = text.split('\n').collect();
        let max_chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        TextMetrics {
            width: max_chars as f64 * font_size * char_width_factor,
            height: lines.len() as f64 * font_size * line_height_factor,
            line_count: lines.len(),
        }
    }
}

/// Greedy word wrap against a device-independent width limit (the `maxWidth` attribute).
///
/// Words never split; a word that alone exceeds the limit gets its own line.
pub fn wrap_to_width(
    text: &str,
    max_width: f64,
    style: &TextStyle,
    measurer: &dyn TextMeasurer,
) -> String {
    let mut wrapped = String::new();
    let mut current_line = String::new();

    for word in text.split(' ') {
        let candidate = if current_line.is_empty() {
            word.to_string()
        } else {
            format!("{current_line} {word}")
        };

        if !current_line.is_empty() && measurer.measure(&candidate, style).width > max_width {
            wrapped.push_str(&current_line);
            wrapped.push('\n');
            current_line = word.to_string();
        } else {
            current_line = candidate;
        }
    }

    wrapped.push_str(&current_line);
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_measure_scales_with_longest_line() {
        let measurer = DeterministicTextMeasurer::default();
        let style = TextStyle::default();
        let metrics = measurer.measure("short\na much longer line", &style);
        assert_eq!(metrics.line_count, 2);
        assert!((metrics.width - 18.0 * 14.0 * 0.6).abs() < 1e-9);
        assert!((metrics.height - 2.0 * 14.0 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn wrap_breaks_before_the_word_that_overflows() {
        let measurer = DeterministicTextMeasurer::default();
        let style = TextStyle::default();
        // 14 * 0.6 = 8.4 per char; 10 chars fit in 84.
        let wrapped = wrap_to_width("one two three four", 84.0, &style, &measurer);
        assert_eq!(wrapped, "one two\nthree four");
    }

    #[test]
    fn wrap_leaves_short_text_alone() {
        let measurer = DeterministicTextMeasurer::default();
        let wrapped = wrap_to_width("fits", 100.0, &TextStyle::default(), &measurer);
        assert_eq!(wrapped, "fits");
    }
}
