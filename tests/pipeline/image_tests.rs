//! Image search and application through the full pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use deck_composer::{
    ai::{AiClient, AiRequest, OfflineAiClient, TargetSchema},
    error::AiError,
    event::EventPayload,
    persist::DeckStore,
    registry::ComponentType,
};

use super::test_utils::{
    deck_complete, drain, fast_options, generous_config, harness, outline, position_of,
};

/// Offline client that puts an empty-src Image component on slide s2.
struct ImageSlideClient {
    inner: OfflineAiClient,
}

#[async_trait]
impl AiClient for ImageSlideClient {
    async fn generate(&self, request: AiRequest) -> Result<Value, AiError> {
        let prompt = request.user_content();
        if request.target_schema == TargetSchema::SlideMinimal && prompt.contains("Slide id: s2") {
            return Ok(serde_json::json!({
                "id": "s2",
                "title": "B",
                "components": [
                    {"id": "bg", "type": "Background", "position": {"x": 0.0, "y": 0.0},
                     "width": 1920.0, "height": 1080.0, "props": {}},
                    {"id": "img", "type": "Image", "position": {"x": 980.0, "y": 120.0},
                     "width": 820.0, "height": 640.0, "props": {"src": ""}}
                ]
            }));
        }
        self.inner.generate(request).await
    }
}

#[tokio::test]
async fn test_pending_image_applied_to_persisted_slide() {
    let h = harness(
        Arc::new(ImageSlideClient {
            inner: OfflineAiClient::new(),
        }),
        generous_config(),
        true,
    );

    // Synchronous images: search runs to completion before slides start.
    let (_, stream) = h
        .composer
        .compose_deck(outline(2), Some("deck-1".into()), fast_options());
    let events = drain(stream).await;
    assert!(deck_complete(&events).unwrap().0);

    // The search reported candidates for s2.
    let (event_images, topics_used) = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::SlideImagesFound {
                slide_id,
                images,
                topics_used,
                ..
            } if slide_id == "s2" => Some((images.clone(), topics_used.clone())),
            _ => None,
        })
        .expect("no slide_images_found for s2");
    assert!(!event_images.is_empty());
    assert!(!topics_used.is_empty());

    // The persisted Image component carries the first candidate, in order.
    let deck = h.store.get_deck("deck-1").await.unwrap().unwrap();
    let slide = deck.slides.iter().find(|s| s.id == "s2").unwrap();
    let image = slide
        .components
        .iter()
        .find(|c| c.component_type == ComponentType::Image)
        .expect("persisted slide lost its Image component");
    assert_eq!(image.prop_str("src"), Some(event_images[0].url.as_str()));
    assert_eq!(image.prop_str("alt"), Some(event_images[0].alt.as_str()));
}

#[tokio::test]
async fn test_prefetch_finds_images_before_slides_start() {
    let h = harness(Arc::new(OfflineAiClient::new()), generous_config(), true);

    let mut options = fast_options();
    options.async_images = true;
    options.prefetch_images = true;

    let (_, stream) = h
        .composer
        .compose_deck(outline(2), Some("deck-1".into()), options);
    let events = drain(stream).await;
    assert!(deck_complete(&events).unwrap().0);

    // With prefetch, every slide's candidates are announced before any
    // slide generation begins.
    let first_slide_at = position_of(&events, "slide_started").unwrap();
    let image_positions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.type_name() == "slide_images_found")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(image_positions.len(), 2);
    assert!(image_positions.iter().all(|p| *p < first_slide_at));
}

#[tokio::test]
async fn test_topic_events_emitted() {
    let h = harness(Arc::new(OfflineAiClient::new()), generous_config(), true);

    let mut custom = outline(2);
    custom.slides[0].title = "Mountain Expedition".into();
    custom.slides[1].title = "Budget Overview".into();

    let (_, stream) = h
        .composer
        .compose_deck(custom, Some("deck-1".into()), fast_options());
    let events = drain(stream).await;

    let topics: Vec<String> = events
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::TopicImagesFound { topic, .. } => Some(topic.clone()),
            _ => None,
        })
        .collect();
    assert!(topics.iter().any(|t| t.contains("mountain") || t.contains("expedition")));
}

#[tokio::test]
async fn test_no_providers_no_image_events() {
    let h = harness(Arc::new(OfflineAiClient::new()), generous_config(), false);
    let (_, stream) = h
        .composer
        .compose_deck(outline(2), Some("deck-1".into()), fast_options());
    let events = drain(stream).await;

    assert!(position_of(&events, "topic_images_found").is_none());
    assert!(position_of(&events, "slide_images_found").is_none());
    assert!(deck_complete(&events).unwrap().0);
}
