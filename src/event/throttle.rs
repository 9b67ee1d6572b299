//! Progress-event throttling.
//!
//! High-frequency progress updates are coalesced to a minimum interval so
//! the consumer is never flooded: a single "latest" slot replaces queued
//! progress events, and a timer flushes the slot when the window closes.
//! Priority events (everything that does not carry a `progress` field)
//! always pass straight through.
//!
//! The emitter also fans every delivered event into the [`EventBus`], and
//! tracks whether the downstream consumer is still attached: once the
//! channel closes, deliveries keep flowing to the bus but `deliver` reports
//! the disconnect so the orchestrator can apply its disconnect policy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::debug;

use super::{EventBus, GenerationEvent};

/// Default minimum interval between progress emissions.
pub const DEFAULT_MIN_EMIT_INTERVAL: Duration = Duration::from_millis(100);

struct ThrottleState {
    last_emit: Instant,
    /// Latest suppressed progress event; replaced, never queued.
    pending: Option<GenerationEvent>,
    timer_armed: bool,
    /// Set once the consumer channel has closed.
    detached: bool,
}

struct Inner {
    min_interval: Duration,
    tx: mpsc::Sender<GenerationEvent>,
    bus: Arc<EventBus>,
    state: Mutex<ThrottleState>,
}

/// Throttling event emitter feeding a consumer channel and the event bus.
#[derive(Clone)]
pub struct ThrottledEmitter {
    inner: Arc<Inner>,
}

impl ThrottledEmitter {
    pub fn new(
        tx: mpsc::Sender<GenerationEvent>,
        bus: Arc<EventBus>,
        min_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                min_interval,
                tx,
                bus,
                state: Mutex::new(ThrottleState {
                    // Start one window in the past so the first progress
                    // event is never delayed.
                    last_emit: Instant::now()
                        .checked_sub(min_interval)
                        .unwrap_or_else(Instant::now),
                    pending: None,
                    timer_armed: false,
                    detached: false,
                }),
            }),
        }
    }

    /// Emit an event, throttling progress updates.
    ///
    /// Returns `true` while the consumer is still attached. Once it
    /// disconnects, events keep flowing to the bus and `false` is returned.
    pub async fn deliver(&self, event: GenerationEvent) -> bool {
        if event.payload.is_priority() {
            let mut state = self.inner.state.lock().await;
            state.last_emit = Instant::now();
            // A suppressed progress update is stale once a priority event
            // supersedes it.
            state.pending = None;
            drop(state);
            return self.send(event).await;
        }

        let mut state = self.inner.state.lock().await;
        let now = Instant::now();
        if now.duration_since(state.last_emit) >= self.inner.min_interval {
            state.last_emit = now;
            state.pending = None;
            drop(state);
            return self.send(event).await;
        }

        // Inside the window: stash as latest and arm the flush timer once.
        let remaining = self.inner.min_interval - now.duration_since(state.last_emit);
        state.pending = Some(event);
        if !state.timer_armed {
            state.timer_armed = true;
            let emitter = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(remaining).await;
                emitter.flush_pending().await;
            });
        }
        !state.detached
    }

    /// Emit any pending progress event immediately. Called at window close
    /// and when the stream is finishing.
    pub async fn flush_pending(&self) {
        let event = {
            let mut state = self.inner.state.lock().await;
            state.timer_armed = false;
            match state.pending.take() {
                Some(event) => {
                    state.last_emit = Instant::now();
                    event
                }
                None => return,
            }
        };
        self.send(event).await;
    }

    /// Whether the consumer has disconnected.
    pub async fn is_detached(&self) -> bool {
        self.inner.state.lock().await.detached
    }

    async fn send(&self, event: GenerationEvent) -> bool {
        self.inner.bus.emit(&event).await;
        if self.inner.tx.send(event).await.is_err() {
            let mut state = self.inner.state.lock().await;
            if !state.detached {
                debug!("event consumer disconnected");
                state.detached = true;
            }
            return false;
        }
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
