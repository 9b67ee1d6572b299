//! Persisted deck and slide model.
//!
//! A deck owns its slides and status. Only the persistence layer mutates
//! stored decks; the rest of the pipeline works on values and hands them to
//! the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::outline::{DeckOutline, ExtractedData};
use crate::registry::Component;
use crate::theme::ThemeSpec;

/// Canvas width in logical pixels.
pub const CANVAS_WIDTH: f64 = 1920.0;

/// Canvas height in logical pixels.
pub const CANVAS_HEIGHT: f64 = 1080.0;

// =============================================================================
// Slide
// =============================================================================

/// Lifecycle state of a single slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideStatus {
    Pending,
    Generating,
    Completed,
    Failed,
    Skipped,
}

impl SlideStatus {
    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SlideStatus::Completed | SlideStatus::Failed | SlideStatus::Skipped
        )
    }
}

/// A canvas-sized page of typed components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub components: Vec<Component>,

    pub status: SlideStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedData>,
}

impl Slide {
    /// A pending placeholder slide, created when the deck record is first
    /// written so clients can render progress per slide.
    pub fn pending(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            components: Vec::new(),
            status: SlideStatus::Pending,
            extracted_data: None,
        }
    }
}

// =============================================================================
// Deck
// =============================================================================

/// Canvas dimensions stored on the deck record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeckSize {
    pub width: f64,
    pub height: f64,
}

impl Default for DeckSize {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        }
    }
}

/// Coarse deck-level state reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckState {
    Pending,
    Generating,
    Complete,
    CompleteWithErrors,
    Failed,
}

/// Progress summary embedded on the deck record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStatus {
    pub state: DeckState,
    pub current_slide: usize,
    pub total_slides: usize,
    pub message: String,
    /// 0..=100.
    pub progress: u8,
}

impl DeckStatus {
    pub fn pending(total_slides: usize) -> Self {
        Self {
            state: DeckState::Pending,
            current_slide: 0,
            total_slides,
            message: "Deck created".into(),
            progress: 0,
        }
    }
}

/// The persisted deck record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub uuid: String,
    pub name: String,
    pub slides: Vec<Slide>,

    #[serde(default)]
    pub size: DeckSize,

    pub status: DeckStatus,

    pub outline: DeckOutline,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Set when theme generation fell back to the deterministic default.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub theme_fallback: bool,

    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deck {
    /// Create the initial deck record from an accepted outline: one pending
    /// slide per outline entry, status pending.
    pub fn from_outline(deck_id: impl Into<String>, outline: &DeckOutline) -> Self {
        let now = Utc::now();
        let slides: Vec<Slide> = outline
            .slides
            .iter()
            .map(|s| Slide::pending(&s.id, &s.title))
            .collect();
        let total = slides.len();
        Self {
            uuid: deck_id.into(),
            name: outline.title.clone(),
            slides,
            size: DeckSize::default(),
            status: DeckStatus::pending(total),
            outline: outline.clone(),
            theme: None,
            notes: outline.notes.clone(),
            theme_fallback: false,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Count of slides in a terminal state.
    pub fn terminal_slides(&self) -> usize {
        self.slides
            .iter()
            .filter(|s| s.status.is_terminal())
            .count()
    }

    /// Whether any slide failed or was skipped.
    pub fn has_slide_errors(&self) -> bool {
        self.slides
            .iter()
            .any(|s| matches!(s.status, SlideStatus::Failed | SlideStatus::Skipped))
    }
}

// =============================================================================
// Tests
// =============================================================================
