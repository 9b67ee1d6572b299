//! Pause/resume protocol tests: durable snapshots, resume eligibility, and
//! no regeneration of completed slides.

use std::sync::Arc;

use tokio_stream::StreamExt;

use deck_composer::{deck::SlideStatus, event::EventPayload, persist::DeckStore};

use super::test_utils::{
    deck_complete, drain, fast_options, generous_config, harness, outline,
    slide_generated_indices, slide_started_indices, type_names, GateClient,
};

#[tokio::test]
async fn test_pause_after_first_slide_then_resume() {
    // Slides 2 and 3 are gated so the run reliably parks after slide 1.
    let gate = Arc::new(GateClient::new(["s2", "s3"]));
    let h = harness(gate.clone(), generous_config(), false);

    let mut options = fast_options();
    options.max_parallel = 1;
    options.generation_id = Some("gen-1".into());

    let (_, mut stream) = h
        .composer
        .compose_deck(outline(3), Some("deck-1".into()), options);

    // Wait for slide 0 to complete.
    loop {
        let event = stream.next().await.expect("stream ended before slide 0");
        if matches!(
            &event.payload,
            EventPayload::SlideGenerated { slide_index: 0, .. }
        ) {
            break;
        }
    }

    // Pause; in-flight gated slides abort at their cancellation point.
    assert!(h.composer.pause("gen-1").await);

    // The stream winds down without a deck_complete.
    let mut tail = Vec::new();
    while let Some(event) = stream.next().await {
        tail.push(event.type_name());
        if tail.last() == Some(&"end") {
            break;
        }
    }
    assert!(!tail.contains(&"deck_complete"));

    // Snapshot is durable and resumable.
    assert!(h.composer.can_resume("gen-1").await);
    let state = h
        .composer
        .pause_manager()
        .load("gen-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.completed_slides(), vec!["s1"]);
    assert_eq!(state.pending_slides(), vec!["s2", "s3"]);

    // Resume with the gate open; only pending slides regenerate.
    gate.open();
    h.store.clear_updates();
    let resumed = h.composer.resume("gen-1").await.unwrap();
    let events = drain(resumed).await;

    let mut started = slide_started_indices(&events);
    started.sort_unstable();
    assert_eq!(started, vec![1, 2]);
    let mut generated = slide_generated_indices(&events);
    generated.sort_unstable();
    assert_eq!(generated, vec![1, 2]);
    assert!(deck_complete(&events).unwrap().0);

    // Theme still precedes the resumed slides.
    let names = type_names(&events);
    let theme_at = names.iter().position(|n| *n == "theme_generated").unwrap();
    let slide_at = names.iter().position(|n| *n == "slide_started").unwrap();
    assert!(theme_at < slide_at);

    // Slide 0 was never rewritten after resume.
    assert!(h.store.updates_for_index(0).is_empty());

    // Final deck has all three slides completed.
    let deck = h.store.get_deck("deck-1").await.unwrap().unwrap();
    assert!(deck
        .slides
        .iter()
        .all(|s| s.status == SlideStatus::Completed));
}

#[tokio::test]
async fn test_resume_requires_paused_snapshot() {
    let h = harness(
        Arc::new(deck_composer::ai::OfflineAiClient::new()),
        generous_config(),
        false,
    );

    // Unknown generation.
    assert!(!h.composer.can_resume("missing").await);
    assert!(h.composer.resume("missing").await.is_err());

    // A completed generation is not resumable.
    let mut options = fast_options();
    options.generation_id = Some("gen-done".into());
    let (_, stream) = h
        .composer
        .compose_deck(outline(1), Some("deck-1".into()), options);
    drain(stream).await;
    assert!(!h.composer.can_resume("gen-done").await);
    assert!(h.composer.resume("gen-done").await.is_err());
}

#[tokio::test]
async fn test_pause_unknown_generation_is_false() {
    let h = harness(
        Arc::new(deck_composer::ai::OfflineAiClient::new()),
        generous_config(),
        false,
    );
    assert!(!h.composer.pause("nope").await);
}

#[tokio::test]
async fn test_resumed_run_preserves_theme() {
    let gate = Arc::new(GateClient::new(["s2"]));
    let h = harness(gate.clone(), generous_config(), false);

    let mut options = fast_options();
    options.max_parallel = 1;
    options.generation_id = Some("gen-t".into());

    let (_, mut stream) = h
        .composer
        .compose_deck(outline(2), Some("deck-t".into()), options);

    let mut first_theme = None;
    loop {
        let event = stream.next().await.expect("stream ended early");
        if let EventPayload::ThemeGenerated { palette, .. } = &event.payload {
            first_theme = Some(palette.clone());
        }
        if matches!(
            &event.payload,
            EventPayload::SlideGenerated { slide_index: 0, .. }
        ) {
            break;
        }
    }
    assert!(h.composer.pause("gen-t").await);
    while let Some(event) = stream.next().await {
        if event.type_name() == "end" {
            break;
        }
    }

    gate.open();
    let resumed = h.composer.resume("gen-t").await.unwrap();
    let events = drain(resumed).await;

    let resumed_theme = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::ThemeGenerated { palette, .. } => Some(palette.clone()),
            _ => None,
        })
        .unwrap();
    // The persisted theme is reused, not regenerated.
    assert_eq!(Some(resumed_theme), first_theme);
}
