//! Deck-wide theme model and generation.
//!
//! A theme is produced exactly once per deck, persisted before any slide
//! starts, and read-only afterwards. It carries the palette, font pairing,
//! visual style, and the style manifesto that every slide prompt quotes.

mod generator;

pub use generator::{StyleSpec, ThemeGenerator};

use serde::{Deserialize, Serialize};

// =============================================================================
// Colors and Fonts
// =============================================================================

/// The deck color system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub primary_background: String,
    pub secondary_background: String,
    pub primary_text: String,
    pub secondary_text: String,
    pub accent_1: String,
    pub accent_2: String,
    pub accent_3: String,
}

/// The deck font pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFonts {
    /// Display font for titles and headings.
    pub hero: String,
    /// Body font for paragraphs and labels.
    pub body: String,
}

/// Quick-access subset of the theme colors handed to slide prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub background: String,
    pub text: String,
    pub accents: Vec<String>,
}

// =============================================================================
// Theme Spec
// =============================================================================

/// The complete deck theme. Immutable after `theme_generated` is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSpec {
    pub palette_name: String,
    pub colors: ThemeColors,
    pub fonts: ThemeFonts,

    /// One-word style register ("minimal", "editorial", "vibrant", ...).
    pub visual_style: String,

    /// Compact instruction paragraph quoted verbatim in slide prompts.
    pub style_manifesto: String,
}

impl ThemeSpec {
    /// Materialize the quick-access palette.
    pub fn palette(&self) -> Palette {
        Palette {
            background: self.colors.primary_background.clone(),
            text: self.colors.primary_text.clone(),
            accents: vec![
                self.colors.accent_1.clone(),
                self.colors.accent_2.clone(),
                self.colors.accent_3.clone(),
            ],
        }
    }

    /// Whether the theme's visual style asks for slow image motion.
    pub fn wants_image_motion(&self) -> bool {
        matches!(self.visual_style.as_str(), "cinematic" | "editorial")
    }

    /// The deterministic fallback used when theme generation keeps failing:
    /// neutral dark palette, system font pairing.
    pub fn fallback() -> Self {
        Self {
            palette_name: "Neutral Dark".into(),
            colors: ThemeColors {
                primary_background: "#0A0A0A".into(),
                secondary_background: "#1A1A2E".into(),
                primary_text: "#FFFFFF".into(),
                secondary_text: "#A0A0B0".into(),
                accent_1: "#00D4FF".into(),
                accent_2: "#0088CC".into(),
                accent_3: "#005580".into(),
            },
            fonts: ThemeFonts {
                hero: "Inter".into(),
                body: "system-ui".into(),
            },
            visual_style: "minimal".into(),
            style_manifesto: "Dark, quiet canvas. High-contrast white text on \
                near-black backgrounds, a single cyan accent used sparingly, \
                generous whitespace, no decoration that does not carry meaning."
                .into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::is_hex_color;

    #[test]
    fn test_fallback_is_well_formed() {
        let theme = ThemeSpec::fallback();
        for color in [
            &theme.colors.primary_background,
            &theme.colors.secondary_background,
            &theme.colors.primary_text,
            &theme.colors.secondary_text,
            &theme.colors.accent_1,
            &theme.colors.accent_2,
            &theme.colors.accent_3,
        ] {
            assert!(is_hex_color(color), "bad color {color}");
        }
        assert!(!theme.style_manifesto.is_empty());
    }

    #[test]
    fn test_palette_materialization() {
        let theme = ThemeSpec::fallback();
        let palette = theme.palette();
        assert_eq!(palette.background, theme.colors.primary_background);
        assert_eq!(palette.text, theme.colors.primary_text);
        assert_eq!(palette.accents.len(), 3);
    }

    #[test]
    fn test_serde_camel_case() {
        let theme = ThemeSpec::fallback();
        let json = serde_json::to_value(&theme).unwrap();
        assert!(json.get("paletteName").is_some());
        assert!(json.get("styleManifesto").is_some());
        assert!(json.get("visualStyle").is_some());
    }
}
