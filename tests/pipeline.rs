//! Integration tests for the deck composition pipeline.
//!
//! These tests drive the full composer through its public surface and
//! verify:
//! - Event ordering (theme before any slide, per-slide lifecycle order)
//! - Persistence-before-emission for generated slides
//! - Concurrent-deck rejection via the per-deck lock
//! - Rate-limited retries with backoff
//! - Pause/resume with durable snapshots
//! - Background image search and slide assignment

mod pipeline {
    pub mod test_utils;

    pub mod image_tests;
    pub mod limits_tests;
    pub mod orchestrator_tests;
    pub mod pause_resume_tests;
}
