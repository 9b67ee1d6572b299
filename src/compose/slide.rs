//! Single-slide generation pipeline.
//!
//! One slide moves through: context prep, design-context lookup, the
//! retried and rate-limited AI call, coercion to a minimum-viable slide,
//! component validation, pending-image application, and the persisted
//! write. Exactly one terminal event leaves this module per slide:
//! `slide_generated`, `slide_skipped`, or `slide_error`. A cancelled slide
//! emits no terminal event; it stays pending for resume.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ai::AiClient;
use crate::config::GenerationOptions;
use crate::deck::{Slide, SlideStatus};
use crate::error::{AiError, ComposeError, Disposition};
use crate::event::{EventPayload, GenerationEvent, SubstepKind, ThrottledEmitter};
use crate::image::ImageService;
use crate::limits::{ConcurrencyManager, RateLimiter, Retrier};
use crate::outline::SlideOutline;
use crate::persist::DeckStore;
use crate::rag::RagService;
use crate::registry::{Component, ComponentRegistry, ComponentType, Position};
use crate::theme::ThemeSpec;
use crate::validate::ComponentValidator;

use super::context::{build_slide_request, SlideContext};

// =============================================================================
// Outcome
// =============================================================================

/// Terminal result of one slide generation, for orchestrator bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideOutcome {
    Generated,
    Skipped { reason: String },
    Failed { error: String },
    /// Cancelled mid-flight; no terminal event was emitted.
    Cancelled,
}

// =============================================================================
// Slide Generator
// =============================================================================

/// Generates, validates, and persists a single slide.
pub struct SlideGenerator {
    ai: Arc<dyn AiClient>,
    rag: Arc<RagService>,
    registry: Arc<ComponentRegistry>,
    images: Arc<ImageService>,
    store: Arc<dyn DeckStore>,
    limiter: Arc<RateLimiter>,
    concurrency: Arc<ConcurrencyManager>,
}

impl SlideGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ai: Arc<dyn AiClient>,
        rag: Arc<RagService>,
        registry: Arc<ComponentRegistry>,
        images: Arc<ImageService>,
        store: Arc<dyn DeckStore>,
        limiter: Arc<RateLimiter>,
        concurrency: Arc<ConcurrencyManager>,
    ) -> Self {
        Self {
            ai,
            rag,
            registry,
            images,
            store,
            limiter,
            concurrency,
        }
    }

    /// Run the full pipeline for one slide.
    pub async fn generate(
        &self,
        context: SlideContext,
        options: &GenerationOptions,
        emitter: &ThrottledEmitter,
        cancel: &CancellationToken,
    ) -> SlideOutcome {
        let index = context.index;
        let deck_id = context.deck_id.clone();
        let outline = context.outline.clone();
        let started = Instant::now();

        emitter
            .deliver(GenerationEvent::now(EventPayload::SlideStarted {
                slide_index: index,
                slide_title: outline.title.clone(),
            }))
            .await;
        self.substep(emitter, index, SubstepKind::PreparingContext).await;

        if cancel.is_cancelled() {
            return SlideOutcome::Cancelled;
        }

        // Design-context lookup is non-blocking on failure: fall back to the
        // static minimal context.
        self.substep(emitter, index, SubstepKind::RagLookup).await;
        let design = match self.rag.get_context(&context).await {
            Ok(design) => design,
            Err(err) => {
                warn!(slide_index = index, error = %err, "rag lookup failed, using fallback");
                RagService::fallback_context()
            }
        };

        self.substep(emitter, index, SubstepKind::AiGeneration).await;
        let slot = tokio::select! {
            _ = cancel.cancelled() => return SlideOutcome::Cancelled,
            slot = self
                .concurrency
                .acquire_slide_slot(&deck_id, options.user_id.as_deref()) => slot,
        };
        let Some(_slot) = slot else {
            let err = ComposeError::Slide {
                index,
                message: "slide slot unavailable: deck lock not held".into(),
            };
            return self
                .terminal_failure(&deck_id, index, &outline, err, emitter)
                .await;
        };

        let request = build_slide_request(&context, &design);
        let retrier = Retrier::new(options.max_retries);
        let timeout = options.timeout();
        let timeout_secs = options.timeout_seconds;

        let parsed = retrier
            .run("slide_generation", |attempt| {
                let request = request.clone();
                let ai = self.ai.clone();
                let limiter = self.limiter.clone();
                let cancel = cancel.clone();
                async move {
                    if attempt > 0 {
                        debug!(slide_index = index, attempt, "retrying slide generation");
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => Err(ComposeError::Cancelled),
                        result = async {
                            limiter.acquire().await;
                            match tokio::time::timeout(timeout, ai.generate(request)).await {
                                Err(_) => Err(AiError::Timeout { seconds: timeout_secs }.into()),
                                Ok(Ok(value)) => parse_minimal_slide(value).map_err(ComposeError::from),
                                Ok(Err(err)) => Err(err.into()),
                            }
                        } => result,
                    }
                }
            })
            .await;

        let minimal = match parsed {
            Ok(minimal) => minimal,
            Err(ComposeError::Cancelled) => return SlideOutcome::Cancelled,
            Err(err) => {
                return self
                    .terminal_failure(&deck_id, index, &outline, err, emitter)
                    .await;
            }
        };

        // Coerce: identity comes from the outline, missing pieces from the
        // theme.
        let title = minimal
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| outline.title.clone());
        let mut components = minimal.components;
        if components.is_empty() {
            debug!(slide_index = index, "AI returned no components, injecting minimum viable slide");
            components = minimum_viable_components(&outline, &context.theme);
        }

        let validator = ComponentValidator::new(options.strict_mode);
        let mut components =
            match validator.validate(components, &self.registry, &context.theme) {
                Ok(components) => components,
                Err(err) => {
                    return self
                        .terminal_failure(&deck_id, index, &outline, err.into(), emitter)
                        .await;
                }
            };

        self.apply_pending_images(&outline.id, &mut components, &context.theme);

        let slide = Slide {
            id: outline.id.clone(),
            title,
            components,
            status: SlideStatus::Completed,
            extracted_data: outline.extracted_data.clone(),
        };

        // Persistence must commit before slide_generated is emitted.
        self.substep(emitter, index, SubstepKind::Saving).await;
        let persisted = retrier
            .run("persist_slide", |_| {
                let store = self.store.clone();
                let deck_id = deck_id.clone();
                let slide = slide.clone();
                async move {
                    store
                        .update_slide(&deck_id, index, &slide)
                        .await
                        .map_err(ComposeError::from)
                }
            })
            .await;

        if let Err(err) = persisted {
            return self
                .terminal_failure(&deck_id, index, &outline, err, emitter)
                .await;
        }

        let generation_time = started.elapsed().as_secs_f64();
        info!(slide_index = index, generation_time, "slide generated");
        emitter
            .deliver(GenerationEvent::now(EventPayload::SlideGenerated {
                slide_index: index,
                slide_data: Box::new(slide),
                generation_time,
            }))
            .await;
        SlideOutcome::Generated
    }

    async fn substep(&self, emitter: &ThrottledEmitter, index: usize, step: SubstepKind) {
        emitter
            .deliver(GenerationEvent::now(EventPayload::SlideSubstep {
                slide_index: index,
                step,
                progress: step.progress(),
            }))
            .await;
    }

    /// Consume pending candidates for this slide and fill empty Image
    /// components in order. The entry is taken atomically; if nothing was
    /// applicable it is put back untouched.
    fn apply_pending_images(
        &self,
        slide_id: &str,
        components: &mut [Component],
        theme: &ThemeSpec,
    ) {
        let Some(pending) = self.images.take_pending(slide_id) else {
            return;
        };

        let mut candidates = pending.iter();
        let mut applied = 0;
        for component in components.iter_mut() {
            if component.component_type != ComponentType::Image {
                continue;
            }
            let src = component.prop_str("src").unwrap_or_default();
            if !src.is_empty() && src != "placeholder" {
                continue;
            }
            let Some(image) = candidates.next() else {
                break;
            };
            component.props.insert("src".into(), json!(image.url));
            component.props.insert("alt".into(), json!(image.alt));
            if theme.wants_image_motion() {
                component.props.insert(
                    "animation".into(),
                    json!({"type": "ken-burns", "duration": 20, "scale": 1.1}),
                );
            }
            applied += 1;
        }

        if applied == 0 {
            // Nothing consumed; leave the candidates for a later pass.
            self.images.pending_map().insert(slide_id, pending);
        } else {
            debug!(slide_id, applied, "applied pending images");
        }
    }

    /// Persist the terminal status best-effort and emit the terminal event
    /// for a failed slide.
    async fn terminal_failure(
        &self,
        deck_id: &str,
        index: usize,
        outline: &SlideOutline,
        err: ComposeError,
        emitter: &ThrottledEmitter,
    ) -> SlideOutcome {
        let skippable = matches!(err.disposition(), Disposition::Skippable);
        let status = if skippable {
            SlideStatus::Skipped
        } else {
            SlideStatus::Failed
        };

        let record = Slide {
            id: outline.id.clone(),
            title: outline.title.clone(),
            components: Vec::new(),
            status,
            extracted_data: outline.extracted_data.clone(),
        };
        if let Err(store_err) = self.store.update_slide(deck_id, index, &record).await {
            warn!(slide_index = index, error = %store_err, "failed to persist slide status");
        }

        if skippable {
            let reason = err.kind().as_str().to_string();
            warn!(slide_index = index, reason = %reason, "slide skipped");
            emitter
                .deliver(GenerationEvent::now(EventPayload::SlideSkipped {
                    slide_index: index,
                    reason: reason.clone(),
                }))
                .await;
            SlideOutcome::Skipped { reason }
        } else {
            error!(slide_index = index, error = %err, "slide failed");
            let message = err.to_string();
            emitter
                .deliver(GenerationEvent::now(EventPayload::SlideError {
                    slide_index: index,
                    error: message.clone(),
                }))
                .await;
            SlideOutcome::Failed { error: message }
        }
    }
}

// =============================================================================
// Minimal Slide Parsing
// =============================================================================

/// The slide identity always comes from the outline, so the AI's own `id`
/// field is ignored during deserialization.
#[derive(Debug, Deserialize)]
struct MinimalSlide {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    components: Vec<Component>,
}

fn parse_minimal_slide(value: serde_json::Value) -> Result<MinimalSlide, AiError> {
    serde_json::from_value(value).map_err(|e| AiError::InvalidResponse(format!("slide: {e}")))
}

/// The smallest acceptable slide: themed background, title, body text.
fn minimum_viable_components(outline: &SlideOutline, theme: &ThemeSpec) -> Vec<Component> {
    vec![
        Component::full_canvas(format!("{}-bg", outline.id), ComponentType::Background)
            .with_prop("backgroundColor", json!(theme.colors.primary_background)),
        Component::new(
            format!("{}-title", outline.id),
            ComponentType::Title,
            Position::new(120.0, 120.0),
            1680.0,
            200.0,
        )
        .with_prop("text", json!(outline.title))
        .with_prop("color", json!(theme.colors.primary_text)),
        Component::new(
            format!("{}-body", outline.id),
            ComponentType::TextBlock,
            Position::new(120.0, 400.0),
            1680.0,
            520.0,
        )
        .with_prop("text", json!(outline.content))
        .with_prop("color", json!(theme.colors.secondary_text)),
    ]
}

// =============================================================================
// Tests
// =============================================================================
