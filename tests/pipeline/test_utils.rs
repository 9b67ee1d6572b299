//! Test utilities for pipeline integration tests.
//!
//! Provides the composer harness, a slide-update-tracking deck store, and
//! scriptable AI clients (failure injection and gating).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use deck_composer::{
    ai::{AiClient, AiRequest, OfflineAiClient, TargetSchema},
    compose::{collect_events, DeckComposer, EventStream},
    config::{ComposerConfig, GenerationOptions},
    deck::{Deck, Slide, SlideStatus},
    error::{AiError, StoreError},
    event::{EventPayload, GenerationEvent},
    image::PlaceholderImageProvider,
    media::InMemoryMediaStorage,
    outline::{DeckOutline, SlideOutline},
    persist::{DeckStore, InMemoryDeckStore, InMemorySnapshotStore},
};

// =============================================================================
// Tracking Deck Store
// =============================================================================

/// A deck store that records every `update_slide` call.
pub struct TrackingDeckStore {
    inner: InMemoryDeckStore,
    updates: Mutex<Vec<(String, usize, SlideStatus)>>,
}

impl TrackingDeckStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryDeckStore::new(),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// All recorded `(deck_id, index, status)` updates, in call order.
    pub fn updates(&self) -> Vec<(String, usize, SlideStatus)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn clear_updates(&self) {
        self.updates.lock().unwrap().clear();
    }

    pub fn updates_for_index(&self, index: usize) -> Vec<SlideStatus> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, i, _)| *i == index)
            .map(|(_, _, status)| *status)
            .collect()
    }
}

#[async_trait]
impl DeckStore for TrackingDeckStore {
    async fn save_deck(&self, deck: &Deck) -> Result<(), StoreError> {
        self.inner.save_deck(deck).await
    }

    async fn update_slide(
        &self,
        deck_id: &str,
        index: usize,
        slide: &Slide,
    ) -> Result<(), StoreError> {
        self.updates
            .lock()
            .unwrap()
            .push((deck_id.to_string(), index, slide.status));
        self.inner.update_slide(deck_id, index, slide).await
    }

    async fn get_deck(&self, deck_id: &str) -> Result<Option<Deck>, StoreError> {
        self.inner.get_deck(deck_id).await
    }
}

// =============================================================================
// Scripted AI Client
// =============================================================================

struct FailurePlan {
    error: AiError,
    /// `Some(n)`: fail the next n calls then succeed. `None`: always fail.
    remaining: Option<u32>,
}

/// Offline client with injectable per-slide and theme failures.
pub struct ScriptedAiClient {
    inner: OfflineAiClient,
    slide_failures: Mutex<HashMap<String, FailurePlan>>,
    theme_failures: Mutex<u32>,
}

impl ScriptedAiClient {
    pub fn new() -> Self {
        Self {
            inner: OfflineAiClient::new(),
            slide_failures: Mutex::new(HashMap::new()),
            theme_failures: Mutex::new(0),
        }
    }

    /// Fail generation for one slide: the next `times` calls when given,
    /// or every call when `times` is `None`.
    pub fn fail_slide(&self, slide_id: &str, error: AiError, times: Option<u32>) {
        self.slide_failures.lock().unwrap().insert(
            slide_id.to_string(),
            FailurePlan {
                error,
                remaining: times,
            },
        );
    }

    /// Fail the next `times` theme generations.
    pub fn fail_theme(&self, times: u32) {
        *self.theme_failures.lock().unwrap() = times;
    }
}

#[async_trait]
impl AiClient for ScriptedAiClient {
    async fn generate(&self, request: AiRequest) -> Result<Value, AiError> {
        match request.target_schema {
            TargetSchema::ThemeSpec => {
                {
                    let mut failures = self.theme_failures.lock().unwrap();
                    if *failures > 0 {
                        *failures -= 1;
                        return Err(AiError::Overloaded("scripted theme failure".into()));
                    }
                }
                self.inner.generate(request).await
            }
            TargetSchema::SlideMinimal => {
                let slide_id = extract_slide_id(&request.user_content());
                {
                    let mut failures = self.slide_failures.lock().unwrap();
                    if let Some(plan) = slide_id.as_deref().and_then(|id| failures.get_mut(id)) {
                        match &mut plan.remaining {
                            None => return Err(plan.error.clone()),
                            Some(0) => {}
                            Some(n) => {
                                *n -= 1;
                                return Err(plan.error.clone());
                            }
                        }
                    }
                }
                self.inner.generate(request).await
            }
        }
    }
}

// =============================================================================
// Gate Client
// =============================================================================

/// Offline client whose gated slides block until the gate is opened.
/// Blocked calls park on a notify, so they abort cleanly at the caller's
/// cancellation point.
pub struct GateClient {
    inner: OfflineAiClient,
    gated: HashSet<String>,
    open: AtomicBool,
    notify: Notify,
}

impl GateClient {
    pub fn new<const N: usize>(gated: [&str; N]) -> Self {
        Self {
            inner: OfflineAiClient::new(),
            gated: gated.iter().map(|s| s.to_string()).collect(),
            open: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl AiClient for GateClient {
    async fn generate(&self, request: AiRequest) -> Result<Value, AiError> {
        if request.target_schema == TargetSchema::SlideMinimal {
            let gated = extract_slide_id(&request.user_content())
                .is_some_and(|id| self.gated.contains(&id));
            if gated {
                while !self.open.load(Ordering::SeqCst) {
                    let _ = tokio::time::timeout(
                        Duration::from_millis(20),
                        self.notify.notified(),
                    )
                    .await;
                }
            }
        }
        self.inner.generate(request).await
    }
}

fn extract_slide_id(prompt: &str) -> Option<String> {
    prompt.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Slide id:")
            .map(str::trim)
            .map(String::from)
    })
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub composer: DeckComposer,
    pub store: Arc<TrackingDeckStore>,
    pub snapshots: Arc<InMemorySnapshotStore>,
}

/// Build a composer around the given AI client. `with_images` controls
/// whether the placeholder image provider is wired in; without it no image
/// events interleave with the deck events.
pub fn harness(ai: Arc<dyn AiClient>, config: ComposerConfig, with_images: bool) -> Harness {
    let store = Arc::new(TrackingDeckStore::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let providers: Vec<Arc<dyn deck_composer::image::ImageProvider>> = if with_images {
        vec![Arc::new(PlaceholderImageProvider::new())]
    } else {
        Vec::new()
    };
    let composer = DeckComposer::new(
        config,
        ai,
        store.clone(),
        snapshots.clone(),
        providers,
        Arc::new(InMemoryMediaStorage::new()),
    )
    .expect("valid config");
    Harness {
        composer,
        store,
        snapshots,
    }
}

/// A config with a generous rate limit so tests are not paced.
pub fn generous_config() -> ComposerConfig {
    ComposerConfig {
        rate_capacity: 1000,
        rate_window_secs: 1,
        ..ComposerConfig::default()
    }
}

/// An outline with `n` slides: ids s1..sn, titles A, B, C, ...
pub fn outline(n: usize) -> DeckOutline {
    let slides = (0..n)
        .map(|i| {
            SlideOutline::new(
                format!("s{}", i + 1),
                char::from(b'A' + (i % 26) as u8).to_string(),
                format!("content {}", i + 1),
            )
        })
        .collect();
    DeckOutline::new("o1", "T", slides)
}

/// Options tuned for fast, deterministic tests.
pub fn fast_options() -> GenerationOptions {
    GenerationOptions {
        max_parallel: 2,
        timeout_seconds: 30,
        max_retries: 0,
        delay_between_slides: 0.0,
        async_images: false,
        min_emit_interval: 0.0,
        ..GenerationOptions::default()
    }
}

/// Drain a stream to completion (until `end` or a quiet timeout).
pub async fn drain(stream: EventStream) -> Vec<GenerationEvent> {
    collect_events(stream, Duration::from_secs(60)).await
}

pub fn type_names(events: &[GenerationEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.type_name()).collect()
}

pub fn slide_started_indices(events: &[GenerationEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::SlideStarted { slide_index, .. } => Some(*slide_index),
            _ => None,
        })
        .collect()
}

pub fn slide_generated_indices(events: &[GenerationEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::SlideGenerated { slide_index, .. } => Some(*slide_index),
            _ => None,
        })
        .collect()
}

pub fn deck_complete(events: &[GenerationEvent]) -> Option<(bool, String)> {
    events.iter().find_map(|e| match &e.payload {
        EventPayload::DeckComplete {
            success, message, ..
        } => Some((*success, message.clone())),
        _ => None,
    })
}

/// Position of the first event of a type, if any.
pub fn position_of(events: &[GenerationEvent], type_name: &str) -> Option<usize> {
    events.iter().position(|e| e.type_name() == type_name)
}
