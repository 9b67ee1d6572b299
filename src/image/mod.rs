//! Background image search and slide assignment.
//!
//! While slides generate, the image service derives search topics from the
//! outline, queries its providers, and parks candidate lists in the
//! [`PendingImageMap`] keyed by slide id. The slide generator later applies
//! them to empty `Image` components and removes the entry atomically, so a
//! retried slide can never double-apply.
//!
//! Two event kinds surface to the client as the search progresses:
//! `topic_images_found` per resolved topic and `slide_images_found` per
//! slide that received candidates.

mod provider;
mod topics;

pub use provider::{ImageAsset, ImageProvider, PlaceholderImageProvider, ProviderError};
pub use topics::{derive_topics, topics_for_slide, Topic, MAX_TOPICS_PER_DECK, MAX_TOPICS_PER_SLIDE};

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::event::{EventPayload, GenerationEvent, ThrottledEmitter};
use crate::outline::DeckOutline;

/// Default candidate images handed to one slide.
pub const DEFAULT_MAX_IMAGES_PER_SLIDE: usize = 6;

/// Topics cached across searches.
const TOPIC_CACHE_CAPACITY: usize = 256;

// =============================================================================
// Pending Image Map
// =============================================================================

/// Candidate images waiting to be applied, keyed by slide id.
///
/// The service is the only writer, the slide generator the only
/// reader/remover per key. [`PendingImageMap::take`] removes and returns in
/// one step so application is race-free under retries.
#[derive(Debug, Default)]
pub struct PendingImageMap {
    inner: Mutex<HashMap<String, Vec<ImageAsset>>>,
}

impl PendingImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending list for a slide.
    pub fn insert(&self, slide_id: impl Into<String>, images: Vec<ImageAsset>) {
        self.inner
            .lock()
            .expect("pending image map poisoned")
            .insert(slide_id.into(), images);
    }

    /// Current list for a slide. Idempotent: the entry stays.
    pub fn peek(&self, slide_id: &str) -> Vec<ImageAsset> {
        self.inner
            .lock()
            .expect("pending image map poisoned")
            .get(slide_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Atomically remove and return the entry.
    pub fn take(&self, slide_id: &str) -> Option<Vec<ImageAsset>> {
        self.inner
            .lock()
            .expect("pending image map poisoned")
            .remove(slide_id)
    }

    pub fn contains(&self, slide_id: &str) -> bool {
        self.inner
            .lock()
            .expect("pending image map poisoned")
            .contains_key(slide_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("pending image map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Search Handle
// =============================================================================

/// Handle to a running background search.
pub struct SearchHandle {
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl SearchHandle {
    /// Ask the search to stop at the next topic boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the search to finish (or be cancelled).
    pub async fn wait(self) {
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// =============================================================================
// Image Service
// =============================================================================

/// Topic-based image search with per-topic caching and per-slide assignment.
pub struct ImageService {
    providers: Vec<Arc<dyn ImageProvider>>,
    topic_cache: Mutex<LruCache<String, Vec<ImageAsset>>>,
    pending: PendingImageMap,
    max_images_per_slide: usize,
}

impl ImageService {
    pub fn new(providers: Vec<Arc<dyn ImageProvider>>) -> Self {
        Self {
            providers,
            topic_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(TOPIC_CACHE_CAPACITY).unwrap(),
            )),
            pending: PendingImageMap::new(),
            max_images_per_slide: DEFAULT_MAX_IMAGES_PER_SLIDE,
        }
    }

    pub fn with_max_images_per_slide(mut self, max: usize) -> Self {
        self.max_images_per_slide = max.max(1);
        self
    }

    /// Pending candidates for a slide. Idempotent.
    pub fn pending_for(&self, slide_id: &str) -> Vec<ImageAsset> {
        self.pending.peek(slide_id)
    }

    /// Atomically take the pending candidates for a slide.
    pub fn take_pending(&self, slide_id: &str) -> Option<Vec<ImageAsset>> {
        self.pending.take(slide_id)
    }

    pub fn pending_map(&self) -> &PendingImageMap {
        &self.pending
    }

    /// Whether every slide in the outline has a pending candidate list.
    pub fn all_slides_covered(&self, outline: &DeckOutline) -> bool {
        outline.slides.iter().all(|s| self.pending.contains(&s.id))
    }

    /// Start the search on a background task.
    pub fn start_background_search(
        self: &Arc<Self>,
        outline: DeckOutline,
        deck_id: String,
        emitter: ThrottledEmitter,
    ) -> SearchHandle {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let service = self.clone();
        let task = tokio::spawn(async move {
            service.run_search(&outline, &deck_id, &emitter, &child).await;
        });
        SearchHandle { task, cancel }
    }

    /// Run the full search inline: resolve topics, then assign per slide.
    ///
    /// Cancellation is honored at topic boundaries; whatever was assigned
    /// before the cancel stays in the pending map.
    pub async fn run_search(
        &self,
        outline: &DeckOutline,
        deck_id: &str,
        emitter: &ThrottledEmitter,
        cancel: &CancellationToken,
    ) {
        let topics = derive_topics(outline);
        info!(deck_id, topics = topics.len(), "image search starting");

        let mut resolved: HashMap<String, Vec<ImageAsset>> = HashMap::new();
        for topic in &topics {
            if cancel.is_cancelled() {
                debug!(deck_id, "image search cancelled");
                return;
            }

            let images = self.images_for_topic(&topic.name).await;
            if images.is_empty() {
                continue;
            }

            emitter
                .deliver(GenerationEvent::now(EventPayload::TopicImagesFound {
                    topic: topic.name.clone(),
                    images_count: images.len(),
                    slides_using_topic: topic.slide_ids.clone(),
                }))
                .await;
            resolved.insert(topic.name.clone(), images);
        }

        for (index, slide) in outline.slides.iter().enumerate() {
            if cancel.is_cancelled() {
                return;
            }

            let slide_topics = topics_for_slide(&topics, &slide.id);
            let mut assigned: Vec<ImageAsset> = Vec::new();
            let mut topics_used: Vec<String> = Vec::new();
            for topic in slide_topics {
                if let Some(images) = resolved.get(&topic.name) {
                    topics_used.push(topic.name.clone());
                    for image in images {
                        if assigned.len() >= self.max_images_per_slide {
                            break;
                        }
                        if !assigned.iter().any(|a| a.url == image.url) {
                            assigned.push(image.clone());
                        }
                    }
                }
            }

            if assigned.is_empty() {
                continue;
            }

            // Deliver before inserting: anyone polling the pending map for
            // coverage then sees the announcement already enqueued.
            emitter
                .deliver(GenerationEvent::now(EventPayload::SlideImagesFound {
                    slide_id: slide.id.clone(),
                    slide_index: index,
                    slide_title: slide.title.clone(),
                    images_count: assigned.len(),
                    images: assigned.clone(),
                    topics_used,
                }))
                .await;
            self.pending.insert(&slide.id, assigned);
        }

        info!(deck_id, pending = self.pending.len(), "image search complete");
    }

    /// Resolve a topic through the cache, then the providers in order.
    async fn images_for_topic(&self, topic: &str) -> Vec<ImageAsset> {
        if let Some(cached) = self
            .topic_cache
            .lock()
            .expect("topic cache poisoned")
            .get(topic)
            .cloned()
        {
            return cached;
        }

        let mut images = Vec::new();
        for provider in &self.providers {
            match provider.search(topic, self.max_images_per_slide).await {
                Ok(results) => images.extend(results),
                Err(err) => warn!(topic, error = %err, "image provider failed"),
            }
            if images.len() >= self.max_images_per_slide {
                break;
            }
        }

        if !images.is_empty() {
            self.topic_cache
                .lock()
                .expect("topic cache poisoned")
                .put(topic.to_string(), images.clone());
        }
        images
    }
}

// =============================================================================
// Tests
// =============================================================================
