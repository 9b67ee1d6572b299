//! Rate limiting and retry behavior through the full pipeline.

use std::sync::Arc;
use std::time::Duration;

use deck_composer::{
    ai::OfflineAiClient,
    config::ComposerConfig,
    error::AiError,
};

use super::test_utils::{
    deck_complete, drain, fast_options, harness, outline, slide_generated_indices,
    ScriptedAiClient,
};

#[tokio::test(start_paused = true)]
async fn test_rate_limited_retry_takes_backoff_time() {
    // Scenario: C=1, W=1s; the first AI call is rejected with a rate limit,
    // the retry succeeds. The rate-limit backoff base is 10s, so the whole
    // run takes at least that long.
    let client = Arc::new(ScriptedAiClient::new());
    client.fail_slide("s1", AiError::RateLimited("429".into()), Some(1));

    let config = ComposerConfig {
        rate_capacity: 1,
        rate_window_secs: 1,
        ..ComposerConfig::default()
    };
    let h = harness(client, config, false);

    let mut options = fast_options();
    options.max_retries = 2;

    let start = tokio::time::Instant::now();
    let (_, stream) = h
        .composer
        .compose_deck(outline(1), Some("deck-1".into()), options);
    let events = drain(stream).await;

    assert_eq!(slide_generated_indices(&events), vec![0]);
    assert!(deck_complete(&events).unwrap().0);
    assert!(
        start.elapsed() >= Duration::from_secs(10),
        "elapsed {:?} is under the rate-limit backoff base",
        start.elapsed()
    );
}

#[tokio::test(start_paused = true)]
async fn test_tight_bucket_paces_slides() {
    // One token per 2 seconds; three slides need at least two refill waits
    // beyond the initial token (theme consumes one too).
    let config = ComposerConfig {
        rate_capacity: 1,
        rate_window_secs: 2,
        ..ComposerConfig::default()
    };
    let h = harness(Arc::new(OfflineAiClient::new()), config, false);

    let start = tokio::time::Instant::now();
    let (_, stream) = h
        .composer
        .compose_deck(outline(3), Some("deck-1".into()), fast_options());
    let events = drain(stream).await;

    assert!(deck_complete(&events).unwrap().0);
    // Theme + 3 slides = 4 tokens; 3 of them wait ~2s each.
    assert!(
        start.elapsed() >= Duration::from_secs(6),
        "elapsed {:?}",
        start.elapsed()
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_timeouts_surface_as_slide_error() {
    // Every attempt times out; the error is retryable but not skippable,
    // so the slide fails and the deck completes with errors.
    let client = Arc::new(ScriptedAiClient::new());
    client.fail_slide("s1", AiError::Timeout { seconds: 30 }, None);
    let h = harness(client, super::test_utils::generous_config(), false);

    let mut options = fast_options();
    options.max_retries = 1;
    let (_, stream) = h
        .composer
        .compose_deck(outline(1), Some("deck-1".into()), options);
    let events = drain(stream).await;

    let names = super::test_utils::type_names(&events);
    assert!(names.contains(&"slide_error"));
    assert!(!names.contains(&"slide_generated"));
    let (success, message) = deck_complete(&events).unwrap();
    assert!(!success);
    assert!(message.contains("with_errors"));
}

#[tokio::test]
async fn test_max_parallel_one_still_completes_all_slides() {
    // slide_started fires before the slot is acquired, so starts may
    // overlap even at max_parallel=1; the AI/persist phase is what the
    // gate serializes. The observable contract is that every slide still
    // reaches exactly one terminal event.
    let h = harness(
        Arc::new(OfflineAiClient::new()),
        super::test_utils::generous_config(),
        false,
    );

    let mut options = fast_options();
    options.max_parallel = 1;
    let (_, stream) = h
        .composer
        .compose_deck(outline(3), Some("deck-1".into()), options);
    let events = drain(stream).await;

    let mut generated = slide_generated_indices(&events);
    generated.sort_unstable();
    assert_eq!(generated, vec![0, 1, 2]);
    assert!(deck_complete(&events).unwrap().0);
}
