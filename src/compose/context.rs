//! Slide generation context and prompt assembly.
//!
//! A [`SlideContext`] is everything one slide's generation needs: its
//! outline entry, position in the deck, the immutable theme, candidate
//! images, and tagged media. The prompt builder renders it, together with
//! the retrieved design context, into the chat messages handed to the AI
//! client.

use std::sync::Arc;

use crate::ai::{AiMessage, AiRequest, TargetSchema};
use crate::image::ImageAsset;
use crate::outline::{MediaItem, SlideOutline};
use crate::rag::DesignContext;
use crate::theme::{Palette, ThemeSpec};

// =============================================================================
// Slide Context
// =============================================================================

/// Everything required to generate one slide.
#[derive(Debug, Clone)]
pub struct SlideContext {
    pub outline: SlideOutline,
    pub index: usize,
    pub total_slides: usize,
    pub theme: Arc<ThemeSpec>,
    pub palette: Palette,
    pub style_manifesto: String,
    pub available_images: Vec<ImageAsset>,
    pub tagged_media: Vec<MediaItem>,
    pub has_chart_data: bool,
    pub has_tabular_data: bool,
    pub deck_id: String,
}

impl SlideContext {
    pub fn new(
        outline: SlideOutline,
        index: usize,
        total_slides: usize,
        theme: Arc<ThemeSpec>,
        deck_id: impl Into<String>,
    ) -> Self {
        let palette = theme.palette();
        let style_manifesto = theme.style_manifesto.clone();
        let tagged_media = outline.tagged_media.clone();
        let has_chart_data = outline.has_chart_data();
        let has_tabular_data = outline.has_tabular_data();
        Self {
            outline,
            index,
            total_slides,
            theme,
            palette,
            style_manifesto,
            available_images: Vec::new(),
            tagged_media,
            has_chart_data,
            has_tabular_data,
            deck_id: deck_id.into(),
        }
    }

    pub fn with_images(mut self, images: Vec<ImageAsset>) -> Self {
        self.available_images = images;
        self
    }
}

// =============================================================================
// Prompt Assembly
// =============================================================================

/// Build the chat request for one slide.
pub fn build_slide_request(context: &SlideContext, design: &DesignContext) -> AiRequest {
    AiRequest::new(
        vec![
            AiMessage::system(system_prompt(context, design)),
            AiMessage::user(user_prompt(context)),
        ],
        TargetSchema::SlideMinimal,
    )
}

fn system_prompt(context: &SlideContext, design: &DesignContext) -> String {
    let mut prompt = String::from(
        "You compose one presentation slide as a JSON object with fields \
         id, title, and components. Components carry type, position {x, y}, \
         width, height, and props; the canvas is 1920x1080.\n\n",
    );

    prompt.push_str("Style manifesto: ");
    prompt.push_str(&context.style_manifesto);
    prompt.push('\n');

    prompt.push_str(&format!(
        "Palette: background {}, text {}, accents {}\n",
        context.palette.background,
        context.palette.text,
        context.palette.accents.join(", ")
    ));
    prompt.push_str(&format!(
        "Fonts: hero {}, body {}\n\n",
        context.theme.fonts.hero, context.theme.fonts.body
    ));

    prompt.push_str(&format!(
        "Expected components: {}\n",
        design.predicted_components.join(", ")
    ));
    if !design.layout_hints.is_empty() {
        prompt.push_str(&format!("Layout: {}\n", design.layout_hints.join("; ")));
    }
    if !design.design_guidelines.is_empty() {
        prompt.push_str(&format!(
            "Guidelines: {}\n",
            design.design_guidelines.join("; ")
        ));
    }
    if !design.critical_rules.is_empty() {
        prompt.push_str(&format!(
            "Critical rules: {}\n",
            design.critical_rules.join("; ")
        ));
    }

    prompt
}

fn user_prompt(context: &SlideContext) -> String {
    let outline = &context.outline;
    let mut prompt = format!(
        "Slide id: {}\nSlide title: {}\nSlide content: {}\nSlide {} of {}\n",
        outline.id,
        outline.title,
        outline.content.replace('\n', " "),
        context.index + 1,
        context.total_slides,
    );

    // The palette lines let prompt-reading stub clients stay on theme.
    prompt.push_str(&format!(
        "Primary background: {}\nPrimary text: {}\n",
        context.palette.background, context.palette.text
    ));

    if let Some(hint) = &outline.layout_hint {
        prompt.push_str(&format!("Layout hint: {hint}\n"));
    }

    if let Some(comparison) = &outline.comparison {
        prompt.push_str("Comparison:\n");
        if let (Some(left), Some(right)) = (&comparison.left_label, &comparison.right_label) {
            prompt.push_str(&format!("  {left} vs {right}\n"));
        }
        for bullet in &comparison.left_bullets {
            prompt.push_str(&format!("  left: {bullet}\n"));
        }
        for bullet in &comparison.right_bullets {
            prompt.push_str(&format!("  right: {bullet}\n"));
        }
    }

    if let Some(data) = &outline.extracted_data {
        prompt.push_str(&format!(
            "Extracted data from {}: {} rows{}\n",
            data.source,
            data.data.len(),
            data.chart_type
                .as_deref()
                .map(|t| format!(", suggested chart: {t}"))
                .unwrap_or_default()
        ));
    }

    if !context.available_images.is_empty() {
        prompt.push_str("Available images (use empty src for Image components; \
                         candidates are applied after validation):\n");
        for image in &context.available_images {
            prompt.push_str(&format!("  - {} ({})\n", image.url, image.alt));
        }
    }

    for media in &context.tagged_media {
        if let Some(interpretation) = &media.interpretation {
            prompt.push_str(&format!(
                "Tagged media {}: {interpretation}\n",
                media.filename
            ));
        }
    }

    prompt
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::ExtractedData;
    use crate::rag::RagService;

    fn context() -> SlideContext {
        SlideContext::new(
            SlideOutline::new("s3", "Growth", "Revenue up 45%"),
            2,
            5,
            Arc::new(ThemeSpec::fallback()),
            "d1",
        )
    }

    #[test]
    fn test_context_derives_from_theme() {
        let context = context();
        assert_eq!(context.palette.background, "#0A0A0A");
        assert_eq!(context.style_manifesto, context.theme.style_manifesto);
        assert!(!context.has_chart_data);
    }

    #[test]
    fn test_prompt_carries_slide_identity() {
        let request = build_slide_request(&context(), &RagService::fallback_context());
        let user = request.user_content();
        assert!(user.contains("Slide id: s3"));
        assert!(user.contains("Slide title: Growth"));
        assert!(user.contains("Slide 3 of 5"));
        assert!(user.contains("Primary background: #0A0A0A"));
    }

    #[test]
    fn test_system_prompt_quotes_design_context() {
        let design = RagService::fallback_context();
        let request = build_slide_request(&context(), &design);
        let system = &request.messages[0].content;
        assert!(system.contains("Background, Heading, TextBlock"));
        assert!(system.contains("Style manifesto"));
        assert!(system.contains("Critical rules"));
    }

    #[test]
    fn test_prompt_lists_images() {
        let context = context().with_images(vec![ImageAsset {
            url: "https://img.invalid/a.jpg".into(),
            alt: "skyline".into(),
            source: "t".into(),
            topic: None,
        }]);
        let request = build_slide_request(&context, &RagService::fallback_context());
        assert!(request.user_content().contains("https://img.invalid/a.jpg"));
    }

    #[test]
    fn test_prompt_mentions_extracted_data() {
        let mut slide = SlideOutline::new("s1", "Data", "numbers");
        slide.extracted_data = Some(ExtractedData {
            source: "rev.csv".into(),
            chart_type: Some("bar".into()),
            data: vec![serde_json::json!({"v": 1}), serde_json::json!({"v": 2})],
            title: None,
        });
        let context = SlideContext::new(slide, 0, 1, Arc::new(ThemeSpec::fallback()), "d1");
        let request = build_slide_request(&context, &RagService::fallback_context());
        let user = request.user_content();
        assert!(user.contains("rev.csv"));
        assert!(user.contains("2 rows"));
        assert!(user.contains("suggested chart: bar"));
    }
}
