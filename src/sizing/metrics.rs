//! Character-advance font metrics.
//!
//! Real glyph metrics live in the renderer; the engine only needs estimates
//! good enough to pick a font size that will not overflow its container.
//! The model sums per-character advance factors (fractions of the em size)
//! adjusted by family and weight hints, and wraps greedily at word
//! boundaries.

/// Width/line estimation with a character-advance model.
#[derive(Debug, Clone, Default)]
pub struct FontMetricsService;

impl FontMetricsService {
    pub fn new() -> Self {
        Self
    }

    /// Estimated rendered width of a single line.
    pub fn measure_width(&self, text: &str, font_size: f64, family: &str, weight: &str) -> f64 {
        let advance_sum: f64 = text.chars().map(char_advance).sum();
        advance_sum * font_size * family_factor(family) * weight_factor(weight)
    }

    /// Line height for a font size.
    pub fn line_height(&self, font_size: f64) -> f64 {
        font_size * 1.2
    }

    /// Greedy word wrap within `max_width`.
    ///
    /// A single word wider than the container gets its own line; the caller
    /// detects the overflow by re-measuring each returned line.
    pub fn wrap_lines(
        &self,
        text: &str,
        font_size: f64,
        max_width: f64,
        family: &str,
        weight: &str,
    ) -> Vec<String> {
        let mut lines = Vec::new();

        for paragraph in text.split('\n') {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{current} {word}")
                };
                if self.measure_width(&candidate, font_size, family, weight) <= max_width
                    || current.is_empty()
                {
                    current = candidate;
                } else {
                    lines.push(std::mem::take(&mut current));
                    current = word.to_string();
                }
            }
            if !current.is_empty() {
                lines.push(current);
            }
        }

        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    /// Number of wrapped lines for a text at a size.
    pub fn estimate_lines(
        &self,
        text: &str,
        font_size: f64,
        max_width: f64,
        family: &str,
        weight: &str,
    ) -> usize {
        self.wrap_lines(text, font_size, max_width, family, weight).len()
    }
}

/// Advance width of one character as a fraction of the em size.
fn char_advance(c: char) -> f64 {
    match c {
        ' ' => 0.28,
        'i' | 'j' | 'l' | 't' | 'f' | '.' | ',' | '\'' | ':' | ';' | '|' | '!' | 'I' => 0.30,
        'm' | 'w' | 'M' | 'W' | '@' => 0.95,
        '0'..='9' => 0.60,
        'A'..='Z' => 0.72,
        c if c.is_alphabetic() => 0.52,
        _ => 0.55,
    }
}

fn family_factor(family: &str) -> f64 {
    match family {
        "Inter" | "system-ui" | "Roboto" => 1.0,
        "Georgia" | "Playfair Display" => 1.05,
        "Montserrat" => 1.06,
        "JetBrains Mono" | "Courier New" => 1.15,
        _ => 1.0,
    }
}

fn weight_factor(weight: &str) -> f64 {
    match weight {
        "bold" => 1.05,
        "semibold" => 1.03,
        "medium" => 1.01,
        _ => 1.0,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_scales_linearly_with_size() {
        let metrics = FontMetricsService::new();
        let at_10 = metrics.measure_width("Hello world", 10.0, "Inter", "normal");
        let at_20 = metrics.measure_width("Hello world", 20.0, "Inter", "normal");
        assert!((at_20 - 2.0 * at_10).abs() < 1e-9);
    }

    #[test]
    fn test_wide_chars_measure_wider() {
        let metrics = FontMetricsService::new();
        let narrow = metrics.measure_width("iiii", 16.0, "Inter", "normal");
        let wide = metrics.measure_width("wwww", 16.0, "Inter", "normal");
        assert!(wide > 2.0 * narrow);
    }

    #[test]
    fn test_bold_is_wider() {
        let metrics = FontMetricsService::new();
        let normal = metrics.measure_width("Revenue", 24.0, "Inter", "normal");
        let bold = metrics.measure_width("Revenue", 24.0, "Inter", "bold");
        assert!(bold > normal);
    }

    #[test]
    fn test_wrap_respects_width() {
        let metrics = FontMetricsService::new();
        let text = "one two three four five six seven eight";
        let lines = metrics.wrap_lines(text, 16.0, 200.0, "Inter", "normal");
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(
                metrics.measure_width(line, 16.0, "Inter", "normal") <= 200.0,
                "line '{line}' overflows"
            );
        }
        // No words lost.
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_single_overwide_word() {
        let metrics = FontMetricsService::new();
        let lines = metrics.wrap_lines("incomprehensibilities", 40.0, 50.0, "Inter", "normal");
        // The word cannot fit but is still placed on its own line.
        assert_eq!(lines.len(), 1);
        assert!(metrics.measure_width(&lines[0], 40.0, "Inter", "normal") > 50.0);
    }

    #[test]
    fn test_wrap_preserves_paragraph_breaks() {
        let metrics = FontMetricsService::new();
        let lines = metrics.wrap_lines("alpha\nbeta", 16.0, 10_000.0, "Inter", "normal");
        assert_eq!(lines, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_line_count_monotone_in_width() {
        let metrics = FontMetricsService::new();
        let text = "a modest sentence that wraps a couple of times at least";
        let narrow = metrics.estimate_lines(text, 16.0, 150.0, "Inter", "normal");
        let wide = metrics.estimate_lines(text, 16.0, 600.0, "Inter", "normal");
        assert!(wide <= narrow);
    }

    #[test]
    fn test_empty_text_single_empty_line() {
        let metrics = FontMetricsService::new();
        assert_eq!(
            metrics.wrap_lines("", 16.0, 100.0, "Inter", "normal"),
            vec![String::new()]
        );
    }
}
