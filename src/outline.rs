//! Deck outline input model.
//!
//! The outline is the user-provided plan for a deck: a title, optional style
//! hints, and one entry per slide. It is accepted once, validated up front,
//! and treated as immutable for the rest of the generation.
//!
//! Wire shape is camelCase JSON, matching the client payloads the engine
//! receives.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// Media
// =============================================================================

/// A media item attached to the outline or tagged onto a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Unique identifier for the media item.
    pub id: String,

    /// Original filename.
    pub filename: String,

    /// Media kind: `image`, `chart`, `data`, `pdf`, or `other`.
    #[serde(rename = "type")]
    pub media_type: String,

    /// Preview URL. Either a durable `https://` URL or a `data:` URL that
    /// still needs processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    /// AI-generated interpretation of the media content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,

    /// Set when processing this item failed; the item is kept as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            media_type: media_type.into(),
            preview_url: None,
            interpretation: None,
            error: None,
        }
    }

    /// Whether this item is an image still carried as an inline data URL.
    pub fn needs_upload(&self) -> bool {
        self.media_type == "image"
            && self
                .preview_url
                .as_deref()
                .is_some_and(|u| u.starts_with("data:"))
    }
}

// =============================================================================
// Structured Slide Content
// =============================================================================

/// Two-column comparison content for side-by-side layouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonBlock {
    /// Preferred layout: `split_50_50`, `split_60_40`, or `split_left_right`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_label: Option<String>,

    #[serde(default)]
    pub left_bullets: Vec<String>,

    #[serde(default)]
    pub right_bullets: Vec<String>,
}

/// Tabular data extracted from an uploaded file, candidate for a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    /// Filename or description of where the data came from.
    pub source: String,

    /// Suggested chart type (`bar`, `line`, `pie`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    /// The rows, usually an array of objects.
    #[serde(default)]
    pub data: Vec<serde_json::Value>,

    /// Title for the visualization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ExtractedData {
    /// Whether the rows look chartable (non-empty, numeric-bearing).
    pub fn is_chartable(&self) -> bool {
        !self.data.is_empty()
            && self.data.iter().any(|row| {
                row.as_object()
                    .is_some_and(|obj| obj.values().any(|v| v.is_number()))
            })
    }
}

// =============================================================================
// Slide Outline
// =============================================================================

/// One planned slide: title, narrative content, and optional structure hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideOutline {
    /// Unique identifier for the slide.
    pub id: String,

    /// Title of the slide.
    pub title: String,

    /// Main content/notes for the slide.
    pub content: String,

    /// Optional layout preference from the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_hint: Option<String>,

    /// Structured two-column comparison content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonBlock>,

    /// Extracted tabular data for chart generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedData>,

    /// Media items tagged to this slide.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tagged_media: Vec<MediaItem>,
}

impl SlideOutline {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            layout_hint: None,
            comparison: None,
            extracted_data: None,
            tagged_media: Vec::new(),
        }
    }

    /// Whether this slide carries chartable extracted data.
    pub fn has_chart_data(&self) -> bool {
        self.extracted_data
            .as_ref()
            .is_some_and(ExtractedData::is_chartable)
    }

    /// Whether this slide carries any tabular data at all.
    pub fn has_tabular_data(&self) -> bool {
        self.extracted_data
            .as_ref()
            .is_some_and(|d| !d.data.is_empty())
    }
}

// =============================================================================
// Deck Outline
// =============================================================================

/// The complete plan for a deck. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckOutline {
    /// Unique identifier for the outline.
    pub id: String,

    /// Deck title.
    pub title: String,

    /// Freeform style guidance from the user ("minimal", "bold brand", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_hints: Option<String>,

    /// The planned slides, in presentation order.
    pub slides: Vec<SlideOutline>,

    /// Media uploaded with the outline, before per-slide tagging.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploaded_media: Vec<MediaItem>,

    /// Speaker notes or other freeform notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DeckOutline {
    pub fn new(id: impl Into<String>, title: impl Into<String>, slides: Vec<SlideOutline>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            style_hints: None,
            slides,
            uploaded_media: Vec::new(),
            notes: None,
        }
    }

    /// Validate the outline before any generation work starts.
    ///
    /// Requirements: non-empty title, at least one slide, and every slide has
    /// a title and content. Errors name the offending slide by 1-based index.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::Invalid("deck outline must have a title".into()));
        }
        if self.slides.is_empty() {
            return Err(ConfigError::Invalid(
                "deck outline must have at least one slide".into(),
            ));
        }
        for (i, slide) in self.slides.iter().enumerate() {
            if slide.title.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "slide {} must have a title",
                    i + 1
                )));
            }
            if slide.content.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "slide {} must have content",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    /// Titles of all slides, in order.
    pub fn slide_titles(&self) -> Vec<String> {
        self.slides.iter().map(|s| s.title.clone()).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
