//! Deck-level orchestration.
//!
//! Drives one deck through its phases: initialize, theme, media, image
//! search, parallel slide generation, finalize. Events stream to the
//! consumer through a bounded channel; the producer runs as a spawned task
//! so the sequence is lazy and survives slow consumers.
//!
//! ```text
//! initializing -> theme_generation -> media_preparation -+-> slides_in_progress -> finalizing
//!                                                        |        (fan-out, max_parallel)
//!                                                        +-> image_search (background)
//! ```
//!
//! Terminal states: complete, complete_with_errors, failed, paused.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{DisconnectPolicy, GenerationOptions};
use crate::deck::{Deck, DeckState, SlideStatus};
use crate::error::{ComposeError, DECK_GENERATION_IN_PROGRESS};
use crate::event::{EventBus, EventPayload, GenerationEvent, ThrottledEmitter};
use crate::image::{ImageService, SearchHandle};
use crate::limits::{ConcurrencyManager, Retrier};
use crate::media::MediaProcessor;
use crate::outline::{DeckOutline, MediaItem};
use crate::persist::DeckStore;
use crate::theme::{ThemeGenerator, ThemeSpec};

use super::pause::{GenerationState, PauseResumeManager, RunState};
use super::slide::{SlideGenerator, SlideOutcome};
use super::SlideContext;

/// Bounded capacity of the consumer event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The lazy event sequence returned to the consumer.
pub type EventStream = ReceiverStream<GenerationEvent>;

// =============================================================================
// Deck Orchestrator
// =============================================================================

/// Owns the per-deck lifecycle: lock, phases, fan-out, terminal events.
pub struct DeckOrchestrator {
    theme: Arc<ThemeGenerator>,
    slides: Arc<SlideGenerator>,
    media: Arc<MediaProcessor>,
    images: Arc<ImageService>,
    store: Arc<dyn DeckStore>,
    concurrency: Arc<ConcurrencyManager>,
    bus: Arc<EventBus>,
    pause: Arc<PauseResumeManager>,
}

impl DeckOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        theme: Arc<ThemeGenerator>,
        slides: Arc<SlideGenerator>,
        media: Arc<MediaProcessor>,
        images: Arc<ImageService>,
        store: Arc<dyn DeckStore>,
        concurrency: Arc<ConcurrencyManager>,
        bus: Arc<EventBus>,
        pause: Arc<PauseResumeManager>,
    ) -> Self {
        Self {
            theme,
            slides,
            media,
            images,
            store,
            concurrency,
            bus,
            pause,
        }
    }

    /// Start orchestrating a deck. Returns the lazy event stream; all
    /// failures, including validation and the busy-deck case, arrive as
    /// events on the stream.
    pub fn orchestrate(
        self: &Arc<Self>,
        outline: DeckOutline,
        deck_id: String,
        options: GenerationOptions,
    ) -> EventStream {
        self.orchestrate_with_completed(outline, deck_id, options, HashSet::new())
    }

    /// Orchestrate, skipping slides already completed by a previous run.
    pub(super) fn orchestrate_with_completed(
        self: &Arc<Self>,
        outline: DeckOutline,
        deck_id: String,
        options: GenerationOptions,
        completed: HashSet<String>,
    ) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let emitter = ThrottledEmitter::new(tx, self.bus.clone(), options.emit_interval());
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator
                .run(outline, deck_id, options, completed, emitter)
                .await;
        });
        ReceiverStream::new(rx)
    }

    async fn run(
        &self,
        outline: DeckOutline,
        deck_id: String,
        options: GenerationOptions,
        completed: HashSet<String>,
        emitter: ThrottledEmitter,
    ) {
        let generation_id = options
            .generation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        // The snapshot must carry the id a resume will look up.
        let mut options = options;
        options.generation_id = Some(generation_id.clone());

        let result = self
            .run_phases(&outline, &deck_id, &generation_id, &options, completed, &emitter)
            .await;

        match result {
            Ok(()) => {}
            Err(ComposeError::Cancelled) => {
                // Pause or disconnect-cancel: make sure the durable state is
                // resumable, then close the stream without a terminal deck
                // event.
                let _ = self
                    .pause
                    .update(&generation_id, |state| {
                        if state.run_state != RunState::Paused {
                            state.run_state = RunState::Paused;
                            state.current_phase = "paused".into();
                        }
                    })
                    .await;
                info!(deck_id, generation_id, "orchestration stopped, snapshot is resumable");
            }
            Err(err) => {
                error!(deck_id, error = %err, "orchestration failed");
                let _ = self
                    .pause
                    .update(&generation_id, |state| {
                        state.run_state = RunState::Failed;
                        state.current_phase = "failed".into();
                    })
                    .await;
                // Best-effort terminal status on the deck record. A busy
                // deck belongs to another orchestration and is left alone.
                if !matches!(err, ComposeError::DeckBusy { .. }) {
                    if let Ok(Some(mut deck)) = self.store.get_deck(&deck_id).await {
                        deck.status.state = DeckState::Failed;
                        deck.status.message = err.to_string();
                        let _ = self.store.save_deck(&deck).await;
                    }
                }
                emitter
                    .deliver(GenerationEvent::now(error_event(&err)))
                    .await;
            }
        }

        emitter.flush_pending().await;
        emitter.deliver(GenerationEvent::end()).await;
        self.pause.finish(&generation_id).await;
    }

    async fn run_phases(
        &self,
        outline: &DeckOutline,
        deck_id: &str,
        generation_id: &str,
        options: &GenerationOptions,
        completed: HashSet<String>,
        emitter: &ThrottledEmitter,
    ) -> Result<(), ComposeError> {
        // ---- initializing -------------------------------------------------
        outline.validate()?;
        options.validate()?;

        emitter
            .deliver(GenerationEvent::now(EventPayload::Started {
                message: format!("Starting deck generation for '{}'", outline.title),
            }))
            .await;
        emitter
            .deliver(GenerationEvent::now(EventPayload::OutlineStructure {
                title: outline.title.clone(),
                slide_count: outline.slides.len(),
                slide_titles: outline.slide_titles(),
            }))
            .await;

        let Some(_deck_lock) = self
            .concurrency
            .acquire_deck_lock(deck_id, options.max_parallel)
        else {
            return Err(ComposeError::DeckBusy {
                deck_id: deck_id.to_string(),
            });
        };

        let cancel = CancellationToken::new();
        let mut initial_state = GenerationState::new(
            generation_id,
            deck_id,
            outline.clone(),
            options.clone(),
        );
        for slide_id in &completed {
            if let Some(slide_state) = initial_state.slide_states.get_mut(slide_id) {
                slide_state.status = SlideStatus::Completed;
                initial_state.completed_steps += 1;
            }
        }
        if let Err(err) = self.pause.register(initial_state, cancel.clone()).await {
            // The run continues without resume coverage rather than dying.
            warn!(generation_id, error = %err, "failed to persist initial snapshot");
        }

        let retrier = Retrier::new(options.max_retries);
        let mut deck = match self.store.get_deck(deck_id).await? {
            Some(existing) if !completed.is_empty() => existing,
            _ => Deck::from_outline(deck_id, outline),
        };
        deck.status.state = DeckState::Generating;
        self.save_deck(&retrier, &deck).await?;

        // ---- theme_generation ---------------------------------------------
        self.transition(generation_id, RunState::Theme, "theme_generation").await;
        let (theme, theme_fallback) = match &deck.theme {
            // A resumed deck keeps its persisted theme.
            Some(existing) => (existing.clone(), deck.theme_fallback),
            None => tokio::select! {
                _ = cancel.cancelled() => return Err(ComposeError::Cancelled),
                result = self.theme.generate_theme(outline) => result?,
            },
        };

        emitter
            .deliver(GenerationEvent::now(EventPayload::ThemeGenerated {
                palette: self.theme.generate_palette(&theme),
                fonts: theme.fonts.clone(),
            }))
            .await;

        deck.theme = Some(theme.clone());
        deck.theme_fallback = theme_fallback;
        self.save_deck(&retrier, &deck).await?;
        self.step_done(generation_id).await;

        // ---- media_preparation --------------------------------------------
        self.transition(generation_id, RunState::Media, "media_preparation").await;
        if cancel.is_cancelled() {
            return Err(ComposeError::Cancelled);
        }
        let mut outline = outline.clone();
        if !outline.uploaded_media.is_empty() {
            let processed = self.media.process(outline.uploaded_media.clone()).await;
            emitter
                .deliver(GenerationEvent::now(EventPayload::MediaProcessed {
                    count: processed.len(),
                }))
                .await;
            apply_processed_media(&mut outline, processed);
            deck.outline = outline.clone();
            self.save_deck(&retrier, &deck).await?;
        }
        self.step_done(generation_id).await;

        // ---- image_search --------------------------------------------------
        let search_handle = self
            .start_image_search(&outline, deck_id, options, emitter, &cancel)
            .await;

        // ---- slides_in_progress -------------------------------------------
        self.transition(generation_id, RunState::SlidesInProgress, "slides_in_progress")
            .await;
        let had_errors = self
            .generate_slides(
                &outline,
                deck_id,
                generation_id,
                options,
                &completed,
                &theme,
                emitter,
                &cancel,
            )
            .await;

        if let Some(handle) = search_handle {
            handle.cancel();
        }
        if cancel.is_cancelled() {
            return Err(ComposeError::Cancelled);
        }

        // ---- finalizing ----------------------------------------------------
        self.transition(generation_id, RunState::Finalizing, "finalizing").await;
        let mut deck = self
            .store
            .get_deck(deck_id)
            .await?
            .unwrap_or(deck);
        let has_errors = had_errors || deck.has_slide_errors();
        deck.status.state = if has_errors {
            DeckState::CompleteWithErrors
        } else {
            DeckState::Complete
        };
        deck.status.current_slide = deck.slides.len();
        deck.status.progress = 100;
        deck.status.message = if has_errors {
            "Deck generation completed with_errors".into()
        } else {
            "Deck generation completed".into()
        };
        self.save_deck(&retrier, &deck).await?;

        let _ = self
            .pause
            .update(generation_id, |state| {
                state.run_state = RunState::Complete;
                state.current_phase = "complete".into();
                state.completed_steps = state.total_steps;
            })
            .await;

        emitter
            .deliver(GenerationEvent::now(EventPayload::DeckComplete {
                deck_id: deck_id.to_string(),
                success: !has_errors,
                message: deck.status.message.clone(),
            }))
            .await;
        info!(deck_id, success = !has_errors, "deck orchestration finished");
        Ok(())
    }

    /// Kick off image search per the configured mode. Synchronous mode runs
    /// to completion before slides start; async mode returns a handle, and
    /// with prefetch the orchestrator waits for full slide coverage first.
    async fn start_image_search(
        &self,
        outline: &DeckOutline,
        deck_id: &str,
        options: &GenerationOptions,
        emitter: &ThrottledEmitter,
        cancel: &CancellationToken,
    ) -> Option<SearchHandle> {
        if !options.async_images {
            self.images
                .run_search(outline, deck_id, emitter, cancel)
                .await;
            return None;
        }

        let handle = self.images.start_background_search(
            outline.clone(),
            deck_id.to_string(),
            emitter.clone(),
        );

        if options.prefetch_images {
            debug!(deck_id, "waiting for image prefetch");
            while !self.images.all_slides_covered(outline)
                && !handle.is_finished()
                && !cancel.is_cancelled()
            {
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
            }
        }
        Some(handle)
    }

    /// Fan out slide generation under the per-deck parallelism gate. Returns
    /// whether any slide failed or was skipped.
    #[allow(clippy::too_many_arguments)]
    async fn generate_slides(
        &self,
        outline: &DeckOutline,
        deck_id: &str,
        generation_id: &str,
        options: &GenerationOptions,
        completed: &HashSet<String>,
        theme: &ThemeSpec,
        emitter: &ThrottledEmitter,
        cancel: &CancellationToken,
    ) -> bool {
        let theme = Arc::new(theme.clone());
        let total = outline.slides.len();
        let mut tasks: JoinSet<(String, SlideOutcome)> = JoinSet::new();
        let mut started_any = false;

        for (index, slide_outline) in outline.slides.iter().enumerate() {
            if completed.contains(&slide_outline.id) {
                debug!(slide_id = %slide_outline.id, "skipping already-completed slide");
                continue;
            }
            if cancel.is_cancelled() {
                break;
            }

            // Pace starts; the first slide starts immediately.
            if started_any && options.delay_between_slides > 0.0 {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(options.slide_start_delay()) => {}
                }
            }
            started_any = true;

            let context = SlideContext::new(
                slide_outline.clone(),
                index,
                total,
                theme.clone(),
                deck_id,
            )
            .with_images(self.images.pending_for(&slide_outline.id));

            let generator = self.slides.clone();
            let options = options.clone();
            let emitter = emitter.clone();
            let cancel = cancel.clone();
            let slide_id = slide_outline.id.clone();
            tasks.spawn(async move {
                let outcome = generator.generate(context, &options, &emitter, &cancel).await;
                (slide_id, outcome)
            });
        }

        let mut had_errors = false;
        while let Some(joined) = tasks.join_next().await {
            let (slide_id, outcome) = match joined {
                Ok(result) => result,
                Err(join_err) => {
                    error!(error = %join_err, "slide task panicked");
                    had_errors = true;
                    continue;
                }
            };

            let status = match &outcome {
                SlideOutcome::Generated => SlideStatus::Completed,
                SlideOutcome::Skipped { .. } => {
                    had_errors = true;
                    SlideStatus::Skipped
                }
                SlideOutcome::Failed { .. } => {
                    had_errors = true;
                    SlideStatus::Failed
                }
                SlideOutcome::Cancelled => SlideStatus::Pending,
            };

            let _ = self
                .pause
                .update(generation_id, |state| {
                    if let Some(slide_state) = state.slide_states.get_mut(&slide_id) {
                        slide_state.status = status;
                        slide_state.attempts += 1;
                    }
                    if status == SlideStatus::Completed {
                        state.completed_steps += 1;
                    }
                })
                .await;

            // Consumer gone: apply the disconnect policy.
            if emitter.is_detached().await
                && options.on_disconnect == DisconnectPolicy::Cancel
                && !cancel.is_cancelled()
            {
                info!(deck_id, "consumer disconnected, cancelling remaining slides");
                cancel.cancel();
            }
        }

        had_errors
    }

    async fn transition(&self, generation_id: &str, run_state: RunState, phase: &str) {
        debug!(generation_id, phase, "phase transition");
        let phase = phase.to_string();
        let _ = self
            .pause
            .update(generation_id, move |state| {
                state.run_state = run_state;
                state.current_phase = phase;
            })
            .await;
    }

    async fn step_done(&self, generation_id: &str) {
        let _ = self
            .pause
            .update(generation_id, |state| {
                state.completed_steps += 1;
            })
            .await;
    }

    async fn save_deck(&self, retrier: &Retrier, deck: &Deck) -> Result<(), ComposeError> {
        retrier
            .run("save_deck", |_| {
                let store = self.store.clone();
                let deck = deck.clone();
                async move { store.save_deck(&deck).await.map_err(ComposeError::from) }
            })
            .await
    }
}

/// Map a fatal orchestration error onto the wire `error` event.
fn error_event(err: &ComposeError) -> EventPayload {
    let error = match err {
        ComposeError::DeckBusy { .. } => DECK_GENERATION_IN_PROGRESS.to_string(),
        other => other.kind().as_str().to_string(),
    };
    EventPayload::Error {
        error,
        message: Some(err.to_string()),
    }
}

/// Fold processed media back into the outline: replace the uploaded list
/// and rewrite matching tagged-media entries on each slide.
fn apply_processed_media(outline: &mut DeckOutline, processed: Vec<MediaItem>) {
    for slide in &mut outline.slides {
        for tagged in &mut slide.tagged_media {
            if let Some(done) = processed.iter().find(|p| p.id == tagged.id) {
                tagged.preview_url = done.preview_url.clone();
                tagged.error = done.error.clone();
            }
        }
    }
    outline.uploaded_media = processed;
}

// =============================================================================
// Tests
// =============================================================================
