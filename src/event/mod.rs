//! Generation progress events.
//!
//! Every observable step of a composition is a [`GenerationEvent`]: a typed
//! payload plus an ISO-8601 timestamp. The wire shape is flat JSON with a
//! `type` discriminator:
//!
//! ```json
//! {"type": "slide_started", "timestamp": "2026-01-01T00:00:00Z",
//!  "slide_index": 0, "slide_title": "Intro"}
//! ```
//!
//! Events flow from the slide generators through the [`ThrottledEmitter`]
//! into the consumer's stream, and in parallel through the [`EventBus`] to
//! in-process subscribers.

mod bus;
mod throttle;

pub use bus::{EventBus, SubscriptionId};
pub use throttle::{ThrottledEmitter, DEFAULT_MIN_EMIT_INTERVAL};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deck::Slide;
use crate::image::ImageAsset;
use crate::theme::{Palette, ThemeFonts};

// =============================================================================
// Substeps
// =============================================================================

/// Named phases inside a single slide's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstepKind {
    PreparingContext,
    RagLookup,
    AiGeneration,
    Saving,
}

impl SubstepKind {
    /// Coarse progress milestone reported for this substep.
    pub fn progress(self) -> u8 {
        match self {
            SubstepKind::PreparingContext => 10,
            SubstepKind::RagLookup => 25,
            SubstepKind::AiGeneration => 60,
            SubstepKind::Saving => 90,
        }
    }
}

// =============================================================================
// Event Payloads
// =============================================================================

/// Typed payload of a generation event. Serialized flat, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Started {
        message: String,
    },
    OutlineStructure {
        title: String,
        #[serde(rename = "slideCount")]
        slide_count: usize,
        #[serde(rename = "slideTitles")]
        slide_titles: Vec<String>,
    },
    ThemeGenerated {
        palette: Palette,
        fonts: ThemeFonts,
    },
    MediaProcessed {
        count: usize,
    },
    SlideStarted {
        slide_index: usize,
        slide_title: String,
    },
    SlideSubstep {
        slide_index: usize,
        step: SubstepKind,
        progress: u8,
    },
    SlideGenerated {
        slide_index: usize,
        slide_data: Box<Slide>,
        /// Wall-clock seconds spent generating this slide.
        generation_time: f64,
    },
    SlideSkipped {
        slide_index: usize,
        reason: String,
    },
    SlideError {
        slide_index: usize,
        error: String,
    },
    TopicImagesFound {
        topic: String,
        images_count: usize,
        slides_using_topic: Vec<String>,
    },
    SlideImagesFound {
        slide_id: String,
        slide_index: usize,
        slide_title: String,
        images_count: usize,
        images: Vec<ImageAsset>,
        topics_used: Vec<String>,
    },
    DeckComplete {
        deck_id: String,
        success: bool,
        message: String,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    End {
        message: String,
    },
}

impl EventPayload {
    /// The wire name of this payload's `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::Started { .. } => "started",
            EventPayload::OutlineStructure { .. } => "outline_structure",
            EventPayload::ThemeGenerated { .. } => "theme_generated",
            EventPayload::MediaProcessed { .. } => "media_processed",
            EventPayload::SlideStarted { .. } => "slide_started",
            EventPayload::SlideSubstep { .. } => "slide_substep",
            EventPayload::SlideGenerated { .. } => "slide_generated",
            EventPayload::SlideSkipped { .. } => "slide_skipped",
            EventPayload::SlideError { .. } => "slide_error",
            EventPayload::TopicImagesFound { .. } => "topic_images_found",
            EventPayload::SlideImagesFound { .. } => "slide_images_found",
            EventPayload::DeckComplete { .. } => "deck_complete",
            EventPayload::Error { .. } => "error",
            EventPayload::End { .. } => "end",
        }
    }

    /// The progress value carried by this payload, if any.
    ///
    /// Only progress-carrying events are subject to throttling; everything
    /// else is a priority event and always passes through.
    pub fn progress_value(&self) -> Option<u8> {
        match self {
            EventPayload::SlideSubstep { progress, .. } => Some(*progress),
            _ => None,
        }
    }

    /// Whether this event bypasses throttling.
    pub fn is_priority(&self) -> bool {
        self.progress_value().is_none()
    }
}

// =============================================================================
// Generation Event
// =============================================================================

/// A discrete step in the composition pipeline, delivered to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationEvent {
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub payload: EventPayload,
}

impl GenerationEvent {
    /// Stamp a payload with the current time.
    pub fn now(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }

    /// The terminal marker every stream ends with.
    pub fn end() -> Self {
        Self::now(EventPayload::End {
            message: "Stream complete".into(),
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }
}

// =============================================================================
// Tests
// =============================================================================
