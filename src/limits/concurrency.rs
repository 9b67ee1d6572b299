//! Deck locks and slide parallelism gates.
//!
//! Two concerns live here:
//!
//! - **Per-deck exclusive lock**: at most one orchestration runs per deck
//!   across the process. Acquisition is atomic; a second attempt gets `None`.
//! - **Slide slot gate**: a slide generation task must hold one permit from
//!   each of three dimensions (global, per-user, per-deck) before calling
//!   the AI. Permits are acquired in a fixed order to avoid deadlock and
//!   released together when the slot guard drops.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default global cap on concurrently generating slides.
pub const DEFAULT_GLOBAL_MAX_CONCURRENT_SLIDES: usize = 16;

/// Default per-user cap on concurrently generating slides.
pub const DEFAULT_PER_USER_MAX_SLIDES: usize = 8;

/// Bucket shared by requests with no user id.
const ANONYMOUS_USER: &str = "anonymous";

// =============================================================================
// Guards
// =============================================================================

/// Exclusive ownership of a deck for the duration of one orchestration.
///
/// Dropping the guard releases the lock and retires the deck's slot
/// semaphore.
pub struct DeckLockGuard {
    manager: Arc<ConcurrencyManager>,
    deck_id: String,
}

impl DeckLockGuard {
    pub fn deck_id(&self) -> &str {
        &self.deck_id
    }
}

impl Drop for DeckLockGuard {
    fn drop(&mut self) {
        self.manager.release_deck_lock(&self.deck_id);
    }
}

/// A slide's right to run: one permit per dimension, released on drop.
pub struct SlideSlot {
    _global: OwnedSemaphorePermit,
    _user: OwnedSemaphorePermit,
    _deck: OwnedSemaphorePermit,
}

/// Counts for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyStats {
    /// Decks currently holding their exclusive lock.
    pub active_decks: usize,
    /// Free permits in the global slide gate.
    pub global_available: usize,
    /// User buckets that have been touched.
    pub users_tracked: usize,
}

// =============================================================================
// Concurrency Manager
// =============================================================================

/// Process-wide concurrency policy: deck exclusivity plus the
/// three-dimension slide gate.
pub struct ConcurrencyManager {
    busy_decks: Mutex<HashSet<String>>,
    global_slots: Arc<Semaphore>,
    global_max: usize,
    per_user_max: usize,
    user_slots: Mutex<HashMap<String, Arc<Semaphore>>>,
    deck_slots: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ConcurrencyManager {
    pub fn new(global_max_concurrent_slides: usize, per_user_max_slides: usize) -> Arc<Self> {
        let global_max = global_max_concurrent_slides.max(1);
        Arc::new(Self {
            busy_decks: Mutex::new(HashSet::new()),
            global_slots: Arc::new(Semaphore::new(global_max)),
            global_max,
            per_user_max: per_user_max_slides.max(1),
            user_slots: Mutex::new(HashMap::new()),
            deck_slots: Mutex::new(HashMap::new()),
        })
    }

    /// Atomically claim a deck for one orchestration.
    ///
    /// Installs the deck's slide-slot semaphore with `max_parallel` permits.
    /// Returns `None` if the deck is already busy.
    pub fn acquire_deck_lock(
        self: &Arc<Self>,
        deck_id: &str,
        max_parallel: usize,
    ) -> Option<DeckLockGuard> {
        {
            let mut busy = self.busy_decks.lock().expect("deck lock set poisoned");
            if !busy.insert(deck_id.to_string()) {
                return None;
            }
        }
        self.deck_slots
            .lock()
            .expect("deck slots poisoned")
            .insert(
                deck_id.to_string(),
                Arc::new(Semaphore::new(max_parallel.max(1))),
            );
        Some(DeckLockGuard {
            manager: self.clone(),
            deck_id: deck_id.to_string(),
        })
    }

    /// Release a deck lock. Called by the guard; idempotent.
    fn release_deck_lock(&self, deck_id: &str) {
        self.busy_decks
            .lock()
            .expect("deck lock set poisoned")
            .remove(deck_id);
        self.deck_slots
            .lock()
            .expect("deck slots poisoned")
            .remove(deck_id);
    }

    /// Whether an orchestration currently owns the deck.
    pub fn is_deck_busy(&self, deck_id: &str) -> bool {
        self.busy_decks
            .lock()
            .expect("deck lock set poisoned")
            .contains(deck_id)
    }

    /// Acquire one slide slot, waiting on all three dimensions.
    ///
    /// Order is fixed (global, then user, then deck) so concurrent callers
    /// cannot deadlock on crossed acquisition orders.
    pub async fn acquire_slide_slot(
        &self,
        deck_id: &str,
        user_id: Option<&str>,
    ) -> Option<SlideSlot> {
        let user_sem = self.user_semaphore(user_id);
        let deck_sem = {
            let slots = self.deck_slots.lock().expect("deck slots poisoned");
            slots.get(deck_id)?.clone()
        };

        let global = self.global_slots.clone().acquire_owned().await.ok()?;
        let user = user_sem.acquire_owned().await.ok()?;
        let deck = deck_sem.acquire_owned().await.ok()?;

        Some(SlideSlot {
            _global: global,
            _user: user,
            _deck: deck,
        })
    }

    fn user_semaphore(&self, user_id: Option<&str>) -> Arc<Semaphore> {
        let key = user_id.unwrap_or(ANONYMOUS_USER);
        let mut slots = self.user_slots.lock().expect("user slots poisoned");
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_user_max)))
            .clone()
    }

    /// Snapshot counts for monitoring.
    pub fn stats(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            active_decks: self.busy_decks.lock().expect("deck lock set poisoned").len(),
            global_available: self.global_slots.available_permits(),
            users_tracked: self.user_slots.lock().expect("user slots poisoned").len(),
        }
    }

    pub fn global_max(&self) -> usize {
        self.global_max
    }
}

impl Default for ConcurrencyManager {
    fn default() -> Self {
        Self {
            busy_decks: Mutex::new(HashSet::new()),
            global_slots: Arc::new(Semaphore::new(DEFAULT_GLOBAL_MAX_CONCURRENT_SLIDES)),
            global_max: DEFAULT_GLOBAL_MAX_CONCURRENT_SLIDES,
            per_user_max: DEFAULT_PER_USER_MAX_SLIDES,
            user_slots: Mutex::new(HashMap::new()),
            deck_slots: Mutex::new(HashMap::new()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
