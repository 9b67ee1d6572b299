//! Theme generation.
//!
//! One AI call per deck produces the palette, font pairing, and style
//! manifesto. Retryable provider failures go through the retrier; when the
//! provider keeps failing, generation falls back to the deterministic
//! neutral theme and the deck is flagged `theme_fallback` instead of dying.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::ai::{AiClient, AiMessage, AiRequest, TargetSchema};
use crate::error::{AiError, ComposeError};
use crate::limits::{RateLimiter, Retrier};
use crate::outline::DeckOutline;

use super::{Palette, ThemeColors, ThemeFonts, ThemeSpec};

// =============================================================================
// Style Spec
// =============================================================================

/// Loosely-typed AI output for a theme. Anything missing is filled from the
/// fallback; absent colors make the response invalid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    pub palette_name: Option<String>,
    pub colors: Option<ThemeColors>,
    pub fonts: Option<ThemeFonts>,
    pub visual_style: Option<String>,
    pub style_manifesto: Option<String>,
}

// =============================================================================
// Theme Generator
// =============================================================================

/// Produces the deck-wide [`ThemeSpec`].
pub struct ThemeGenerator {
    ai: Arc<dyn AiClient>,
    limiter: Arc<RateLimiter>,
    retrier: Retrier,
}

impl ThemeGenerator {
    pub fn new(ai: Arc<dyn AiClient>, limiter: Arc<RateLimiter>, retrier: Retrier) -> Self {
        Self {
            ai,
            limiter,
            retrier,
        }
    }

    /// Generate the deck theme.
    ///
    /// Returns the theme plus a flag marking whether the deterministic
    /// fallback was used. Only cancellation propagates as an error.
    pub async fn generate_theme(
        &self,
        outline: &DeckOutline,
    ) -> Result<(ThemeSpec, bool), ComposeError> {
        let request = AiRequest::new(
            vec![
                AiMessage::system(
                    "You are a presentation art director. Respond with a single JSON \
                     object describing the deck theme: paletteName, colors \
                     (primary_background, secondary_background, primary_text, \
                     secondary_text, accent_1, accent_2, accent_3 as hex strings), \
                     fonts (hero, body), visualStyle, styleManifesto.",
                ),
                AiMessage::user(theme_prompt(outline)),
            ],
            TargetSchema::ThemeSpec,
        )
        .with_temperature(0.4);

        let ai = self.ai.clone();
        let limiter = self.limiter.clone();
        let result = self
            .retrier
            .run("theme_generation", move |_| {
                let ai = ai.clone();
                let limiter = limiter.clone();
                let request = request.clone();
                async move {
                    limiter.acquire().await;
                    let value = ai.generate(request).await?;
                    parse_theme(value).map_err(ComposeError::from)
                }
            })
            .await;

        match result {
            Ok(theme) => {
                info!(palette = %theme.palette_name, "theme generated");
                Ok((theme, false))
            }
            Err(ComposeError::Cancelled) => Err(ComposeError::Cancelled),
            Err(err) => {
                warn!(error = %err, "theme generation failed, using fallback theme");
                Ok((ThemeSpec::fallback(), true))
            }
        }
    }

    /// Materialize the quick-access palette handed to slide prompts and the
    /// `theme_generated` event.
    pub fn generate_palette(&self, theme: &ThemeSpec) -> Palette {
        theme.palette()
    }
}

/// Render a style spec into the manifesto paragraph slide prompts quote.
pub fn create_style_manifesto(spec: &StyleSpec) -> String {
    let fallback = ThemeSpec::fallback();
    let colors = spec.colors.as_ref().unwrap_or(&fallback.colors);
    let fonts = spec.fonts.as_ref().unwrap_or(&fallback.fonts);
    let style = spec.visual_style.as_deref().unwrap_or("minimal");

    format!(
        "A {style} deck. Backgrounds stay on {} with {} for contrast panels; \
         text is {} with {} for secondary lines. {} carries headlines, {} \
         carries body copy. Accents ({}, {}, {}) are for emphasis only.",
        colors.primary_background,
        colors.secondary_background,
        colors.primary_text,
        colors.secondary_text,
        fonts.hero,
        fonts.body,
        colors.accent_1,
        colors.accent_2,
        colors.accent_3,
    )
}

fn theme_prompt(outline: &DeckOutline) -> String {
    let mut prompt = format!("Deck: {}\n", outline.title);
    if let Some(hints) = &outline.style_hints {
        prompt.push_str(&format!("Style hints: {hints}\n"));
    }
    prompt.push_str("Slide titles:\n");
    for title in outline.slide_titles() {
        prompt.push_str(&format!("- {title}\n"));
    }
    prompt
}

fn parse_theme(value: serde_json::Value) -> Result<ThemeSpec, AiError> {
    let spec: StyleSpec = serde_json::from_value(value)
        .map_err(|e| AiError::InvalidResponse(format!("theme: {e}")))?;

    let colors = spec
        .colors
        .clone()
        .ok_or_else(|| AiError::InvalidResponse("theme missing colors".into()))?;

    let manifesto = match &spec.style_manifesto {
        Some(manifesto) if !manifesto.trim().is_empty() => manifesto.clone(),
        _ => create_style_manifesto(&spec),
    };

    Ok(ThemeSpec {
        palette_name: spec.palette_name.unwrap_or_else(|| "Untitled".into()),
        colors,
        fonts: spec.fonts.unwrap_or(ThemeFonts {
            hero: "Inter".into(),
            body: "system-ui".into(),
        }),
        visual_style: spec.visual_style.unwrap_or_else(|| "minimal".into()),
        style_manifesto: manifesto,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::OfflineAiClient;
    use crate::outline::SlideOutline;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn outline() -> DeckOutline {
        DeckOutline::new(
            "o1",
            "Launch Plan",
            vec![SlideOutline::new("s1", "Intro", "welcome")],
        )
    }

    fn open_limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(1000, std::time::Duration::from_secs(1)))
    }

    #[tokio::test]
    async fn test_offline_theme_generation() {
        let generator = ThemeGenerator::new(
            Arc::new(OfflineAiClient::new()),
            open_limiter(),
            Retrier::new(0).without_jitter(),
        );
        let (theme, fell_back) = generator.generate_theme(&outline()).await.unwrap();
        assert!(!fell_back);
        assert_eq!(theme.palette_name, "Slate & Ember");
        assert!(!theme.style_manifesto.is_empty());
    }

    #[tokio::test]
    async fn test_generate_palette_matches_theme_colors() {
        let generator = ThemeGenerator::new(
            Arc::new(OfflineAiClient::new()),
            open_limiter(),
            Retrier::new(0).without_jitter(),
        );
        let (theme, _) = generator.generate_theme(&outline()).await.unwrap();
        let palette = generator.generate_palette(&theme);
        assert_eq!(palette.background, theme.colors.primary_background);
        assert_eq!(palette.text, theme.colors.primary_text);
        assert_eq!(palette.accents.len(), 3);
    }

    struct AlwaysInvalid;

    #[async_trait]
    impl AiClient for AlwaysInvalid {
        async fn generate(&self, _request: AiRequest) -> Result<serde_json::Value, AiError> {
            Err(AiError::InvalidResponse("nonsense".into()))
        }
    }

    #[tokio::test]
    async fn test_persistent_failure_falls_back() {
        let generator = ThemeGenerator::new(
            Arc::new(AlwaysInvalid),
            open_limiter(),
            Retrier::new(0).without_jitter(),
        );
        let (theme, fell_back) = generator.generate_theme(&outline()).await.unwrap();
        assert!(fell_back);
        assert_eq!(theme.palette_name, "Neutral Dark");
    }

    struct FailsOnce {
        calls: AtomicU32,
    }

    #[async_trait]
    impl AiClient for FailsOnce {
        async fn generate(&self, request: AiRequest) -> Result<serde_json::Value, AiError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AiError::Overloaded("busy".into()))
            } else {
                OfflineAiClient::new().generate(request).await
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_retries() {
        let generator = ThemeGenerator::new(
            Arc::new(FailsOnce {
                calls: AtomicU32::new(0),
            }),
            open_limiter(),
            Retrier::new(2).without_jitter(),
        );
        let (theme, fell_back) = generator.generate_theme(&outline()).await.unwrap();
        assert!(!fell_back);
        assert_eq!(theme.palette_name, "Slate & Ember");
    }

    #[test]
    fn test_manifesto_from_spec() {
        let spec = StyleSpec {
            palette_name: Some("Test".into()),
            colors: Some(ThemeSpec::fallback().colors),
            fonts: None,
            visual_style: Some("vibrant".into()),
            style_manifesto: None,
        };
        let manifesto = create_style_manifesto(&spec);
        assert!(manifesto.contains("vibrant"));
        assert!(manifesto.contains("#0A0A0A"));
    }

    #[test]
    fn test_parse_theme_requires_colors() {
        let result = parse_theme(serde_json::json!({"paletteName": "X"}));
        assert!(matches!(result, Err(AiError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_theme_fills_manifesto() {
        let mut value = serde_json::to_value(ThemeSpec::fallback()).unwrap();
        value["styleManifesto"] = serde_json::json!("");
        let theme = parse_theme(value).unwrap();
        assert!(!theme.style_manifesto.is_empty());
    }
}
