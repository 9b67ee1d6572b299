//! # Deck Composer
//!
//! A staged concurrent engine for composing AI-generated presentation
//! decks. Given a structured outline and a component schema registry, it
//! produces persisted slides while streaming progress events to the
//! caller, under strict ordering, parallelism, rate-limit, cancellation,
//! and resume guarantees.
//!
//! ## Features
//!
//! - **Staged orchestration**: theme, media preparation, background image
//!   search, parallel slide generation, finalization
//! - **Per-slide pipeline**: design-context retrieval, prompt assembly,
//!   retried and rate-limited AI calls, schema validation with adaptive
//!   font sizing, atomic image application, persisted writes
//! - **Typed event stream**: flat JSON events with a `type` discriminator,
//!   progress throttling, and an in-process event bus
//! - **Pause/resume**: durable generation snapshots; completed slides are
//!   never regenerated
//! - **Resource limits**: per-deck exclusive locks, a three-dimension slide
//!   gate (global/user/deck), and a token-bucket rate limiter
//!
//! ## Architecture
//!
//! The library is organized into focused modules:
//!
//! - [`outline`] / [`deck`] - input and persisted data models
//! - [`registry`] - component types and compiled prop schemas
//! - [`validate`] / [`sizing`] - component validation and font fitting
//! - [`limits`] - rate limiting, concurrency gates, retries
//! - [`event`] - event model, bus, and throttled emission
//! - [`ai`] / [`rag`] / [`image`] / [`media`] / [`persist`] - collaborator
//!   boundaries with offline/in-memory implementations
//! - [`theme`] - deck theme model and generation
//! - [`compose`] - slide generator, orchestrator, pause/resume, facade
//! - [`config`] - options, process config, CLI
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use deck_composer::{
//!     ai::OfflineAiClient,
//!     compose::DeckComposer,
//!     config::{ComposerConfig, GenerationOptions},
//!     image::PlaceholderImageProvider,
//!     media::InMemoryMediaStorage,
//!     outline::{DeckOutline, SlideOutline},
//!     persist::{InMemoryDeckStore, InMemorySnapshotStore},
//! };
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() {
//!     let composer = DeckComposer::new(
//!         ComposerConfig::default(),
//!         Arc::new(OfflineAiClient::new()),
//!         Arc::new(InMemoryDeckStore::new()),
//!         Arc::new(InMemorySnapshotStore::new()),
//!         vec![Arc::new(PlaceholderImageProvider::new())],
//!         Arc::new(InMemoryMediaStorage::new()),
//!     )
//!     .expect("valid config");
//!
//!     let outline = DeckOutline::new(
//!         "o1",
//!         "Launch Plan",
//!         vec![SlideOutline::new("s1", "Intro", "Why we are here")],
//!     );
//!
//!     let (deck_id, mut events) =
//!         composer.compose_deck(outline, None, GenerationOptions::default());
//!     while let Some(event) = events.next().await {
//!         println!("{}", serde_json::to_string(&event).unwrap());
//!     }
//!     println!("deck {deck_id} done");
//! }
//! ```

pub mod ai;
pub mod compose;
pub mod config;
pub mod deck;
pub mod error;
pub mod event;
pub mod image;
pub mod limits;
pub mod media;
pub mod outline;
pub mod persist;
pub mod rag;
pub mod registry;
pub mod sizing;
pub mod theme;
pub mod validate;

// Re-export commonly used types
pub use ai::{AiClient, AiMessage, AiRequest, AiRole, OfflineAiClient, TargetSchema};
pub use compose::{
    collect_events, DeckComposer, DeckOrchestrator, EventStream, GenerationState,
    PauseResumeManager, ResumeContext, RunState, SlideContext, SlideGenerator, SlideOutcome,
};
pub use config::{
    Cli, Command, ComposerConfig, DisconnectPolicy, GenerationOptions, DEFAULT_MAX_PARALLEL,
    DEFAULT_TIMEOUT_SECONDS,
};
pub use deck::{Deck, DeckState, DeckStatus, Slide, SlideStatus, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use error::{
    AiError, BackoffKind, ComposeError, ConfigError, Disposition, ErrorKind, MediaError, RagError,
    StoreError, ValidateError, DECK_GENERATION_IN_PROGRESS,
};
pub use event::{
    EventBus, EventPayload, GenerationEvent, SubstepKind, ThrottledEmitter,
    DEFAULT_MIN_EMIT_INTERVAL,
};
pub use image::{
    ImageAsset, ImageProvider, ImageService, PendingImageMap, PlaceholderImageProvider,
};
pub use limits::{ConcurrencyManager, ConcurrencyStats, RateLimiter, Retrier};
pub use media::{InMemoryMediaStorage, MediaProcessor, MediaStorage};
pub use outline::{DeckOutline, MediaItem, SlideOutline};
pub use persist::{
    DeckStore, FileSnapshotStore, InMemoryDeckStore, InMemorySnapshotStore, SnapshotRecord,
    SnapshotStore,
};
pub use rag::{DesignContext, RagService, SlideSignature};
pub use registry::{Component, ComponentRegistry, ComponentType, Position};
pub use sizing::{AdaptiveFontSizer, FitResult, FontMetricsService};
pub use theme::{Palette, ThemeColors, ThemeFonts, ThemeGenerator, ThemeSpec};
pub use validate::ComponentValidator;
