//! Pause/resume protocol and generation-state snapshots.
//!
//! Every orchestration registers here under its generation id. The manager
//! owns the durable [`GenerationState`]: phase transitions and per-slide
//! results are written through it so a snapshot exists at every suspension
//! point. `pause` cancels the in-flight run via its [`CancellationToken`]
//! and flips the state to paused; `resume` reconstructs contexts for
//! pending slides only.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GenerationOptions;
use crate::deck::SlideStatus;
use crate::error::StoreError;
use crate::outline::DeckOutline;
use crate::persist::{SnapshotRecord, SnapshotStore};

// =============================================================================
// Generation State
// =============================================================================

/// Coarse run state of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initializing,
    Theme,
    Media,
    SlidesInProgress,
    Paused,
    Finalizing,
    Complete,
    Failed,
}

impl RunState {
    /// Whether a generation in this state may be paused.
    pub fn can_pause(self) -> bool {
        matches!(
            self,
            RunState::Theme | RunState::Media | RunState::SlidesInProgress
        )
    }
}

/// Per-slide progress inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideGenState {
    pub status: SlideStatus,
    pub attempts: u32,
}

/// Durable snapshot payload for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    pub generation_id: String,
    pub deck_id: String,
    pub outline: DeckOutline,
    pub options: GenerationOptions,
    pub current_phase: String,
    /// Keyed by slide id.
    pub slide_states: HashMap<String, SlideGenState>,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub run_state: RunState,
    pub updated_at: DateTime<Utc>,
}

impl GenerationState {
    pub fn new(
        generation_id: impl Into<String>,
        deck_id: impl Into<String>,
        outline: DeckOutline,
        options: GenerationOptions,
    ) -> Self {
        let slide_states = outline
            .slides
            .iter()
            .map(|s| {
                (
                    s.id.clone(),
                    SlideGenState {
                        status: SlideStatus::Pending,
                        attempts: 0,
                    },
                )
            })
            .collect();
        // Theme, media, and finalization count as steps alongside the slides.
        let total_steps = outline.slides.len() + 3;
        Self {
            generation_id: generation_id.into(),
            deck_id: deck_id.into(),
            outline,
            options,
            current_phase: "initializing".into(),
            slide_states,
            completed_steps: 0,
            total_steps,
            run_state: RunState::Initializing,
            updated_at: Utc::now(),
        }
    }

    /// Slide ids whose status is completed, in outline order.
    pub fn completed_slides(&self) -> Vec<String> {
        self.outline
            .slides
            .iter()
            .filter(|s| {
                self.slide_states
                    .get(&s.id)
                    .is_some_and(|state| state.status == SlideStatus::Completed)
            })
            .map(|s| s.id.clone())
            .collect()
    }

    /// Slide ids not yet completed, in outline order.
    pub fn pending_slides(&self) -> Vec<String> {
        self.outline
            .slides
            .iter()
            .filter(|s| {
                self.slide_states
                    .get(&s.id)
                    .map_or(true, |state| state.status != SlideStatus::Completed)
            })
            .map(|s| s.id.clone())
            .collect()
    }
}

/// Inputs needed to continue a paused generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeContext {
    pub outline: DeckOutline,
    pub deck_id: String,
    pub options: GenerationOptions,
    pub completed_slides: Vec<String>,
    pub pending_slides: Vec<String>,
}

// =============================================================================
// Pause/Resume Manager
// =============================================================================

struct ActiveGeneration {
    state: GenerationState,
    cancel: CancellationToken,
}

/// Tracks active generations and gates pause/resume.
pub struct PauseResumeManager {
    store: Arc<dyn SnapshotStore>,
    active: Mutex<HashMap<String, ActiveGeneration>>,
}

impl PauseResumeManager {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Begin tracking a generation and write its first snapshot.
    pub async fn register(
        &self,
        state: GenerationState,
        cancel: CancellationToken,
    ) -> Result<(), StoreError> {
        let generation_id = state.generation_id.clone();
        self.persist(&state).await?;
        self.active
            .lock()
            .await
            .insert(generation_id, ActiveGeneration { state, cancel });
        Ok(())
    }

    /// Mutate the tracked state and persist the new snapshot.
    pub async fn update<F>(&self, generation_id: &str, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut GenerationState),
    {
        let state = {
            let mut active = self.active.lock().await;
            let Some(generation) = active.get_mut(generation_id) else {
                return Ok(());
            };
            mutate(&mut generation.state);
            generation.state.updated_at = Utc::now();
            generation.state.clone()
        };
        self.persist(&state).await
    }

    /// Pause an active generation: cancel in-flight slide tasks, snapshot,
    /// transition to paused. Returns false when the generation is unknown
    /// or not in a pausable phase.
    pub async fn pause(&self, generation_id: &str) -> bool {
        let (state, cancel) = {
            let mut active = self.active.lock().await;
            let Some(generation) = active.get_mut(generation_id) else {
                return false;
            };
            if !generation.state.run_state.can_pause() {
                return false;
            }
            generation.state.run_state = RunState::Paused;
            generation.state.current_phase = "paused".into();
            generation.state.updated_at = Utc::now();
            (generation.state.clone(), generation.cancel.clone())
        };

        cancel.cancel();
        if let Err(err) = self.persist(&state).await {
            warn!(generation_id, error = %err, "failed to persist pause snapshot");
            return false;
        }
        info!(generation_id, "generation paused");
        true
    }

    /// Whether a resume is possible: a snapshot exists and it is paused.
    pub async fn can_resume(&self, generation_id: &str) -> bool {
        match self.load(generation_id).await {
            Ok(Some(state)) => state.run_state == RunState::Paused,
            _ => false,
        }
    }

    /// Reconstruct the inputs for resuming a paused generation.
    pub async fn resume_context(
        &self,
        generation_id: &str,
    ) -> Result<Option<ResumeContext>, StoreError> {
        let Some(state) = self.load(generation_id).await? else {
            return Ok(None);
        };
        if state.run_state != RunState::Paused {
            return Ok(None);
        }
        Ok(Some(ResumeContext {
            completed_slides: state.completed_slides(),
            pending_slides: state.pending_slides(),
            outline: state.outline,
            deck_id: state.deck_id,
            options: state.options,
        }))
    }

    /// Transition a paused generation back into progress.
    pub async fn mark_resumed(&self, generation_id: &str) -> Result<(), StoreError> {
        let Some(mut state) = self.load(generation_id).await? else {
            return Ok(());
        };
        state.run_state = RunState::SlidesInProgress;
        state.current_phase = "slides_in_progress".into();
        state.updated_at = Utc::now();
        self.persist(&state).await?;
        info!(generation_id, "generation resumed");
        Ok(())
    }

    /// Stop tracking a finished generation. The final snapshot stays in the
    /// store for status queries.
    pub async fn finish(&self, generation_id: &str) {
        self.active.lock().await.remove(generation_id);
    }

    /// The cancellation handle of an active generation.
    pub async fn cancel_handle(&self, generation_id: &str) -> Option<CancellationToken> {
        self.active
            .lock()
            .await
            .get(generation_id)
            .map(|g| g.cancel.clone())
    }

    /// Latest known state: the active copy if tracked, else the snapshot.
    pub async fn load(&self, generation_id: &str) -> Result<Option<GenerationState>, StoreError> {
        if let Some(generation) = self.active.lock().await.get(generation_id) {
            return Ok(Some(generation.state.clone()));
        }
        let Some(record) = self.store.load(generation_id).await? else {
            return Ok(None);
        };
        let state: GenerationState =
            serde_json::from_value(record.payload).map_err(|e| StoreError::SnapshotCorrupt {
                generation_id: generation_id.to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(state))
    }

    async fn persist(&self, state: &GenerationState) -> Result<(), StoreError> {
        let payload =
            serde_json::to_value(state).map_err(|e| StoreError::Save(e.to_string()))?;
        self.store
            .save(&SnapshotRecord::new(state.generation_id.clone(), payload))
            .await
    }
}

// =============================================================================
// Tests
// =============================================================================
