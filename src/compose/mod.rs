//! Deck composition engine.
//!
//! The composer is the main entry point: it wires the boundary
//! implementations (AI client, stores, image providers, media storage) into
//! the orchestrator and exposes compose/pause/resume.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DeckComposer                          │
//! │  ┌──────────────────┐   ┌────────────────────────────────┐   │
//! │  │ DeckOrchestrator │──▶│ SlideGenerator (x max_parallel)│   │
//! │  │  theme → media → │   │  rag → prompt → ai → validate  │   │
//! │  │  slides → final  │   │  → images → persist → emit     │   │
//! │  └───────┬──────────┘   └───────────────┬────────────────┘   │
//! │          │                              │                    │
//! │          ▼                              ▼                    │
//! │  ┌──────────────┐  ┌────────────┐  ┌─────────────────────┐   │
//! │  │ PauseResume  │  │  EventBus  │  │ ConcurrencyManager  │   │
//! │  │  (snapshots) │  │ + Throttle │  │ + RateLimiter       │   │
//! │  └──────────────┘  └────────────┘  └─────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod context;
mod orchestrator;
mod pause;
mod slide;

pub use context::{build_slide_request, SlideContext};
pub use orchestrator::{DeckOrchestrator, EventStream};
pub use pause::{
    GenerationState, PauseResumeManager, ResumeContext, RunState, SlideGenState,
};
pub use slide::{SlideGenerator, SlideOutcome};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::ai::AiClient;
use crate::config::{ComposerConfig, GenerationOptions};
use crate::error::{ComposeError, ConfigError};
use crate::event::EventBus;
use crate::image::{ImageProvider, ImageService};
use crate::limits::{ConcurrencyManager, ConcurrencyStats, RateLimiter, Retrier};
use crate::media::{MediaProcessor, MediaStorage};
use crate::outline::DeckOutline;
use crate::persist::{DeckStore, SnapshotStore};
use crate::rag::RagService;
use crate::registry::ComponentRegistry;
use crate::theme::ThemeGenerator;

// =============================================================================
// Deck Composer
// =============================================================================

/// Wires the pipeline together and exposes the public operations.
pub struct DeckComposer {
    orchestrator: Arc<DeckOrchestrator>,
    pause: Arc<PauseResumeManager>,
    bus: Arc<EventBus>,
    concurrency: Arc<ConcurrencyManager>,
}

impl DeckComposer {
    /// Build a composer from its boundary implementations.
    pub fn new(
        config: ComposerConfig,
        ai: Arc<dyn AiClient>,
        deck_store: Arc<dyn DeckStore>,
        snapshot_store: Arc<dyn SnapshotStore>,
        image_providers: Vec<Arc<dyn ImageProvider>>,
        media_storage: Arc<dyn MediaStorage>,
    ) -> Result<Self, ConfigError> {
        Self::with_registry(
            config,
            ai,
            deck_store,
            snapshot_store,
            image_providers,
            media_storage,
            ComponentRegistry::builtin(),
        )
    }

    /// Build a composer with a custom component registry.
    #[allow(clippy::too_many_arguments)]
    pub fn with_registry(
        config: ComposerConfig,
        ai: Arc<dyn AiClient>,
        deck_store: Arc<dyn DeckStore>,
        snapshot_store: Arc<dyn SnapshotStore>,
        image_providers: Vec<Arc<dyn ImageProvider>>,
        media_storage: Arc<dyn MediaStorage>,
        registry: ComponentRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let bus = Arc::new(EventBus::new());
        let concurrency = ConcurrencyManager::new(
            config.global_max_concurrent_slides,
            config.per_user_max_slides,
        );
        let limiter = Arc::new(RateLimiter::new(
            config.rate_capacity,
            config.rate_window(),
        ));
        let rag = Arc::new(RagService::new());
        let registry = Arc::new(registry);
        let images = Arc::new(ImageService::new(image_providers));
        let media = Arc::new(MediaProcessor::new(media_storage));
        let pause = Arc::new(PauseResumeManager::new(snapshot_store));
        let theme = Arc::new(ThemeGenerator::new(
            ai.clone(),
            limiter.clone(),
            Retrier::default(),
        ));

        let slides = Arc::new(SlideGenerator::new(
            ai,
            rag,
            registry,
            images.clone(),
            deck_store.clone(),
            limiter,
            concurrency.clone(),
        ));

        let orchestrator = Arc::new(DeckOrchestrator::new(
            theme,
            slides,
            media,
            images,
            deck_store,
            concurrency.clone(),
            bus.clone(),
            pause.clone(),
        ));

        info!("deck composer initialized");
        Ok(Self {
            orchestrator,
            pause,
            bus,
            concurrency,
        })
    }

    /// Compose a deck from an outline.
    ///
    /// Returns the deck id (generated when absent) and the lazy event
    /// stream. Every failure mode arrives on the stream as an `error`
    /// event; the stream always terminates with `end`.
    pub fn compose_deck(
        &self,
        outline: DeckOutline,
        deck_id: Option<String>,
        options: GenerationOptions,
    ) -> (String, EventStream) {
        let deck_id = deck_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        info!(deck_id, title = %outline.title, "starting deck composition");
        let stream = self
            .orchestrator
            .orchestrate(outline, deck_id.clone(), options);
        (deck_id, stream)
    }

    /// Pause an active generation. Cancels in-flight slides and persists a
    /// resumable snapshot.
    pub async fn pause(&self, generation_id: &str) -> bool {
        self.pause.pause(generation_id).await
    }

    /// Whether a paused snapshot exists for this generation.
    pub async fn can_resume(&self, generation_id: &str) -> bool {
        self.pause.can_resume(generation_id).await
    }

    /// Resume a paused generation. Completed slides are not regenerated;
    /// the stream replays the deck-level phases and continues with the
    /// pending slides only.
    pub async fn resume(&self, generation_id: &str) -> Result<EventStream, ComposeError> {
        let context = self
            .pause
            .resume_context(generation_id)
            .await?
            .ok_or_else(|| {
                ComposeError::Deck(format!("generation {generation_id} cannot be resumed"))
            })?;

        self.pause.mark_resumed(generation_id).await?;

        let mut options = context.options;
        options.generation_id = Some(generation_id.to_string());
        let completed: HashSet<String> = context.completed_slides.into_iter().collect();

        info!(
            generation_id,
            deck_id = %context.deck_id,
            pending = context.pending_slides.len(),
            "resuming deck composition"
        );
        Ok(self.orchestrator.orchestrate_with_completed(
            context.outline,
            context.deck_id,
            options,
            completed,
        ))
    }

    /// The in-process event bus; subscribe for side-channel consumers.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The pause/resume manager, for status queries.
    pub fn pause_manager(&self) -> &Arc<PauseResumeManager> {
        &self.pause
    }

    /// Concurrency counters for monitoring.
    pub fn stats(&self) -> ConcurrencyStats {
        self.concurrency.stats()
    }
}

/// Convenience: drain a stream into a vector with a timeout per event.
/// Intended for tests and the CLI's non-streaming paths.
pub async fn collect_events(
    mut stream: EventStream,
    per_event_timeout: Duration,
) -> Vec<crate::event::GenerationEvent> {
    use tokio_stream::StreamExt;

    let mut events = Vec::new();
    loop {
        match tokio::time::timeout(per_event_timeout, stream.next()).await {
            Ok(Some(event)) => {
                let is_end = event.type_name() == "end";
                events.push(event);
                if is_end {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }
    events
}
