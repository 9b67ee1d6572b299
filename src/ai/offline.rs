//! Deterministic offline AI client.
//!
//! Produces schema-valid responses from the prompt alone, with no provider
//! behind it. The `compose` CLI uses it so a full pipeline run works on a
//! laptop with no credentials, and tests use it when they need a client
//! that always succeeds.
//!
//! The slide prompts built by the composer carry `Slide id:` / `Slide
//! title:` lines (see `compose::context`); this client reads them back and
//! falls back to placeholders when absent, so it also tolerates hand-written
//! prompts.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::AiError;

use super::{AiClient, AiRequest, TargetSchema};

/// Offline client producing deterministic, schema-valid output.
#[derive(Debug, Clone, Default)]
pub struct OfflineAiClient;

impl OfflineAiClient {
    pub fn new() -> Self {
        Self
    }

    fn slide_response(&self, prompt: &str) -> Value {
        let id = extract_field(prompt, "Slide id:").unwrap_or_else(|| "slide".into());
        let title = extract_field(prompt, "Slide title:").unwrap_or_else(|| "Untitled".into());
        let background = extract_field(prompt, "Primary background:")
            .unwrap_or_else(|| "#0A0A0A".into());
        let text_color = extract_field(prompt, "Primary text:").unwrap_or_else(|| "#FFFFFF".into());
        let body = extract_field(prompt, "Slide content:")
            .unwrap_or_else(|| "Generated content".into());

        json!({
            "id": id,
            "title": title,
            "components": [
                {
                    "id": format!("{id}-bg"),
                    "type": "Background",
                    "position": {"x": 0.0, "y": 0.0},
                    "width": 1920.0,
                    "height": 1080.0,
                    "props": {"backgroundColor": background}
                },
                {
                    "id": format!("{id}-title"),
                    "type": "Title",
                    "position": {"x": 120.0, "y": 120.0},
                    "width": 1680.0,
                    "height": 200.0,
                    "props": {"text": title, "color": text_color}
                },
                {
                    "id": format!("{id}-body"),
                    "type": "TextBlock",
                    "position": {"x": 120.0, "y": 400.0},
                    "width": 1680.0,
                    "height": 520.0,
                    "props": {"text": body, "color": text_color}
                }
            ]
        })
    }

    fn theme_response(&self, prompt: &str) -> Value {
        // Style hints steer between two fixed palettes so runs stay
        // reproducible while still reacting to the outline.
        let light = prompt.to_lowercase().contains("light");
        if light {
            json!({
                "paletteName": "Paper & Ink",
                "colors": {
                    "primary_background": "#FAFAF7",
                    "secondary_background": "#EDEDE6",
                    "primary_text": "#1A1A1A",
                    "secondary_text": "#5A5A52",
                    "accent_1": "#C0392B",
                    "accent_2": "#8E3022",
                    "accent_3": "#5C1F16"
                },
                "fonts": {"hero": "Inter", "body": "Inter"},
                "visualStyle": "editorial",
                "styleManifesto": "Warm paper background, near-black ink text, \
                    one deep red accent for emphasis. Typography does the work; \
                    ornament stays home."
            })
        } else {
            json!({
                "paletteName": "Slate & Ember",
                "colors": {
                    "primary_background": "#10131A",
                    "secondary_background": "#1C2230",
                    "primary_text": "#F5F7FA",
                    "secondary_text": "#9AA3B2",
                    "accent_1": "#FF6B35",
                    "accent_2": "#CC5429",
                    "accent_3": "#8A3A1D"
                },
                "fonts": {"hero": "Inter", "body": "Inter"},
                "visualStyle": "minimal",
                "styleManifesto": "Deep slate canvas with ember-orange accents. \
                    Large type, hard grid, plenty of negative space."
            })
        }
    }
}

#[async_trait]
impl AiClient for OfflineAiClient {
    async fn generate(&self, request: AiRequest) -> Result<Value, AiError> {
        let prompt = request.user_content();
        Ok(match request.target_schema {
            TargetSchema::SlideMinimal => self.slide_response(&prompt),
            TargetSchema::ThemeSpec => self.theme_response(&prompt),
        })
    }
}

/// First line starting with `prefix`, trimmed, if non-empty.
fn extract_field(prompt: &str, prefix: &str) -> Option<String> {
    prompt.lines().find_map(|line| {
        line.trim()
            .strip_prefix(prefix)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    })
}

// =============================================================================
// Tests
// =============================================================================
