//! Persistence boundaries.
//!
//! The relational store behind deck records and the durable store behind
//! generation snapshots are external collaborators; the pipeline only sees
//! the [`DeckStore`] and [`SnapshotStore`] traits. In-memory
//! implementations back the CLI and tests; the snapshot store also ships a
//! file-backed implementation for real resume-across-restart behavior.

mod snapshot;

pub use snapshot::{
    FileSnapshotStore, InMemorySnapshotStore, SnapshotRecord, SnapshotStore, SNAPSHOT_VERSION,
};

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::deck::{Deck, Slide};
use crate::error::StoreError;

// =============================================================================
// Deck Store
// =============================================================================

/// Upsert/update/load boundary for deck records.
///
/// `update_slide` must commit before the caller emits `slide_generated`:
/// that ordering is what makes the event stream trustworthy for clients
/// that reconnect and re-read the deck.
#[async_trait]
pub trait DeckStore: Send + Sync {
    /// Upsert the full deck record by uuid.
    async fn save_deck(&self, deck: &Deck) -> Result<(), StoreError>;

    /// Atomically overwrite `slides[index]`.
    ///
    /// Idempotent: an identical payload is a no-op and `updated_at` never
    /// moves backwards.
    async fn update_slide(&self, deck_id: &str, index: usize, slide: &Slide)
        -> Result<(), StoreError>;

    /// Load a deck, `None` if absent.
    async fn get_deck(&self, deck_id: &str) -> Result<Option<Deck>, StoreError>;
}

// =============================================================================
// In-Memory Deck Store
// =============================================================================

/// HashMap-backed deck store.
#[derive(Default)]
pub struct InMemoryDeckStore {
    decks: RwLock<HashMap<String, Deck>>,
}

impl InMemoryDeckStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.decks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.decks.read().await.is_empty()
    }
}

#[async_trait]
impl DeckStore for InMemoryDeckStore {
    async fn save_deck(&self, deck: &Deck) -> Result<(), StoreError> {
        let mut decks = self.decks.write().await;
        let mut record = deck.clone();
        if let Some(existing) = decks.get(&deck.uuid) {
            // updated_at is monotone even if the caller's clock lagged.
            record.updated_at = record.updated_at.max(existing.updated_at).max(Utc::now());
        }
        decks.insert(deck.uuid.clone(), record);
        Ok(())
    }

    async fn update_slide(
        &self,
        deck_id: &str,
        index: usize,
        slide: &Slide,
    ) -> Result<(), StoreError> {
        let mut decks = self.decks.write().await;
        let deck = decks.get_mut(deck_id).ok_or_else(|| StoreError::DeckNotFound {
            deck_id: deck_id.to_string(),
        })?;

        let slot = deck
            .slides
            .get_mut(index)
            .ok_or_else(|| StoreError::SlideIndexOutOfRange {
                deck_id: deck_id.to_string(),
                index,
            })?;

        if slot == slide {
            // Identical payload: no-op, updated_at untouched.
            return Ok(());
        }

        *slot = slide.clone();
        deck.updated_at = deck.updated_at.max(Utc::now());
        Ok(())
    }

    async fn get_deck(&self, deck_id: &str) -> Result<Option<Deck>, StoreError> {
        Ok(self.decks.read().await.get(deck_id).cloned())
    }
}

// =============================================================================
// Tests
// =============================================================================
