//! Deck-level orchestration tests: event ordering, validation, the busy
//! lock, skip semantics, and persistence-before-emission.

use std::sync::Arc;

use tokio_stream::StreamExt;

use deck_composer::{
    ai::OfflineAiClient,
    deck::SlideStatus,
    error::{AiError, DECK_GENERATION_IN_PROGRESS},
    event::EventPayload,
    outline::DeckOutline,
    persist::DeckStore,
};

use super::test_utils::{
    deck_complete, drain, fast_options, generous_config, harness, outline, position_of,
    slide_generated_indices, slide_started_indices, type_names, GateClient, ScriptedAiClient,
};

#[tokio::test]
async fn test_happy_path_two_slides() {
    let h = harness(Arc::new(OfflineAiClient::new()), generous_config(), false);

    let (deck_id, stream) = h
        .composer
        .compose_deck(outline(2), Some("deck-1".into()), fast_options());
    assert_eq!(deck_id, "deck-1");

    let events = drain(stream).await;
    let names = type_names(&events);

    // Deck-level frame.
    assert_eq!(names[0], "started");
    assert_eq!(names[1], "outline_structure");
    assert_eq!(names.last(), Some(&"end"));
    assert_eq!(names[names.len() - 2], "deck_complete");
    assert!(!names.contains(&"error"));

    // Outline structure payload.
    match &events[1].payload {
        EventPayload::OutlineStructure {
            title,
            slide_count,
            slide_titles,
        } => {
            assert_eq!(title, "T");
            assert_eq!(*slide_count, 2);
            assert_eq!(slide_titles, &["A", "B"]);
        }
        other => panic!("expected outline_structure, got {other:?}"),
    }

    // Theme strictly precedes any slide start.
    let theme_at = position_of(&events, "theme_generated").unwrap();
    let first_slide_at = position_of(&events, "slide_started").unwrap();
    assert!(theme_at < first_slide_at);

    // Both slides ran a full lifecycle.
    let mut started = slide_started_indices(&events);
    started.sort_unstable();
    assert_eq!(started, vec![0, 1]);
    let mut generated = slide_generated_indices(&events);
    generated.sort_unstable();
    assert_eq!(generated, vec![0, 1]);

    // Per-slide ordering: started < generated for each index.
    for index in [0, 1] {
        let started_at = events
            .iter()
            .position(|e| {
                matches!(&e.payload, EventPayload::SlideStarted { slide_index, .. } if *slide_index == index)
            })
            .unwrap();
        let generated_at = events
            .iter()
            .position(|e| {
                matches!(&e.payload, EventPayload::SlideGenerated { slide_index, .. } if *slide_index == index)
            })
            .unwrap();
        assert!(started_at < generated_at);
    }

    let (success, _) = deck_complete(&events).unwrap();
    assert!(success);

    // Persisted deck reflects the stream.
    let deck = h.store.get_deck("deck-1").await.unwrap().unwrap();
    assert!(deck.slides.iter().all(|s| s.status == SlideStatus::Completed));
    assert_eq!(deck.status.progress, 100);
}

#[tokio::test]
async fn test_single_slide_outline() {
    let h = harness(Arc::new(OfflineAiClient::new()), generous_config(), false);
    let (_, stream) = h.composer.compose_deck(outline(1), None, fast_options());

    let events = drain(stream).await;
    assert_eq!(slide_started_indices(&events), vec![0]);
    assert_eq!(slide_generated_indices(&events), vec![0]);
    assert!(deck_complete(&events).unwrap().0);
}

#[tokio::test]
async fn test_empty_title_is_configuration_invalid() {
    let h = harness(Arc::new(OfflineAiClient::new()), generous_config(), false);
    let mut bad = outline(1);
    bad.title = "".into();

    let (_, stream) = h.composer.compose_deck(bad, None, fast_options());
    let events = drain(stream).await;
    let names = type_names(&events);

    // A single error, then the stream terminator. No lifecycle events.
    assert_eq!(names.iter().filter(|n| **n == "error").count(), 1);
    assert!(!names.contains(&"slide_started"));
    assert!(!names.contains(&"deck_complete"));
    match &events[0].payload {
        EventPayload::Error { error, .. } => assert_eq!(error, "configuration_invalid"),
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_deck_rejected() {
    let gate = Arc::new(GateClient::new(["s1", "s2"]));
    let h = harness(gate.clone(), generous_config(), false);

    // First orchestration holds the lock, blocked inside slide generation.
    let (_, mut first) = h
        .composer
        .compose_deck(outline(2), Some("deck-x".into()), fast_options());
    // Read until the first slide has started so the lock is surely held.
    loop {
        let event = first.next().await.expect("stream ended early");
        if event.type_name() == "slide_started" {
            break;
        }
    }

    // Second orchestration on the same deck is rejected.
    let (_, second) = h
        .composer
        .compose_deck(outline(2), Some("deck-x".into()), fast_options());
    let events = drain(second).await;
    let names = type_names(&events);
    assert!(!names.contains(&"slide_started"));
    let error = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::Error { message, .. } => message.clone(),
            _ => None,
        })
        .unwrap();
    assert_eq!(error, DECK_GENERATION_IN_PROGRESS);

    // Unblock and let the first run finish; the lock releases.
    gate.open();
    while let Some(event) = first.next().await {
        if event.type_name() == "end" {
            break;
        }
    }

    let (_, third) = h
        .composer
        .compose_deck(outline(2), Some("deck-x".into()), fast_options());
    let events = drain(third).await;
    assert!(deck_complete(&events).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_skippable_invalid_response() {
    let client = Arc::new(ScriptedAiClient::new());
    // Slide s2 returns garbage on every attempt.
    client.fail_slide("s2", AiError::InvalidResponse("garbage".into()), None);
    let h = harness(client, generous_config(), false);

    let mut options = fast_options();
    options.max_retries = 2;
    let (_, stream) = h
        .composer
        .compose_deck(outline(2), Some("deck-1".into()), options);
    let events = drain(stream).await;

    let skipped: Vec<(usize, String)> = events
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::SlideSkipped {
                slide_index,
                reason,
            } => Some((*slide_index, reason.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![(1, "ai_invalid_response".to_string())]);

    // Slide 0 still generated; the deck completes with errors.
    assert_eq!(slide_generated_indices(&events), vec![0]);
    let (success, message) = deck_complete(&events).unwrap();
    assert!(!success);
    assert!(message.contains("with_errors"));

    let deck = h.store.get_deck("deck-1").await.unwrap().unwrap();
    assert_eq!(deck.slides[1].status, SlideStatus::Skipped);
    assert_eq!(deck.status.message, message);
}

#[tokio::test]
async fn test_persistence_precedes_emission() {
    let h = harness(Arc::new(OfflineAiClient::new()), generous_config(), false);
    let (_, mut stream) = h
        .composer
        .compose_deck(outline(3), Some("deck-1".into()), fast_options());

    // At the moment each slide_generated event is observed, the store must
    // already hold the completed write for that index.
    while let Some(event) = stream.next().await {
        if let EventPayload::SlideGenerated { slide_index, .. } = &event.payload {
            let statuses = h.store.updates_for_index(*slide_index);
            assert!(
                statuses.contains(&SlideStatus::Completed),
                "slide {slide_index} emitted before its write committed"
            );
        }
        if event.type_name() == "end" {
            break;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_theme_fallback_keeps_deck_alive() {
    let client = Arc::new(ScriptedAiClient::new());
    // Theme fails more times than the retrier allows; the deterministic
    // fallback takes over.
    client.fail_theme(10);
    let h = harness(client, generous_config(), false);

    let (_, stream) = h
        .composer
        .compose_deck(outline(1), Some("deck-1".into()), fast_options());
    let events = drain(stream).await;

    assert!(position_of(&events, "theme_generated").is_some());
    assert!(deck_complete(&events).unwrap().0);

    let deck = h.store.get_deck("deck-1").await.unwrap().unwrap();
    assert!(deck.theme_fallback);
    assert_eq!(deck.theme.as_ref().unwrap().palette_name, "Neutral Dark");
}

#[tokio::test]
async fn test_slide_titles_from_outline() {
    let h = harness(Arc::new(OfflineAiClient::new()), generous_config(), false);
    let outline = DeckOutline::new(
        "o1",
        "Named",
        vec![deck_composer::outline::SlideOutline::new(
            "intro",
            "Welcome Aboard",
            "greetings",
        )],
    );
    let (_, stream) = h.composer.compose_deck(outline, None, fast_options());
    let events = drain(stream).await;

    let title = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::SlideStarted { slide_title, .. } => Some(slide_title.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(title, "Welcome Aboard");
}
