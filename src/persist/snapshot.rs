//! Durable generation-state snapshots.
//!
//! Snapshots are versioned records: `{version, generation_id, payload,
//! written_at}` with the generation state carried opaquely in `payload`.
//! Loading validates the version and structure; missing fields are never
//! guessed, they fail with a `configuration_invalid` error.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;

/// Current snapshot record version.
pub const SNAPSHOT_VERSION: u32 = 1;

// =============================================================================
// Snapshot Record
// =============================================================================

/// One durable snapshot of a generation's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub version: u32,
    pub generation_id: String,
    pub payload: Value,
    pub written_at: DateTime<Utc>,
}

impl SnapshotRecord {
    pub fn new(generation_id: impl Into<String>, payload: Value) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            generation_id: generation_id.into(),
            payload,
            written_at: Utc::now(),
        }
    }

    fn validate(self) -> Result<Self, StoreError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(StoreError::SnapshotVersion {
                expected: SNAPSHOT_VERSION,
                actual: self.version,
            });
        }
        Ok(self)
    }
}

// =============================================================================
// Snapshot Store
// =============================================================================

/// Durable store for snapshots, keyed by generation id.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, record: &SnapshotRecord) -> Result<(), StoreError>;

    /// Load and validate a snapshot; `None` if absent.
    async fn load(&self, generation_id: &str) -> Result<Option<SnapshotRecord>, StoreError>;

    /// Remove a snapshot. No-op if absent.
    async fn delete(&self, generation_id: &str) -> Result<(), StoreError>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Map-backed snapshot store for tests and single-process runs.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    records: RwLock<HashMap<String, SnapshotRecord>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, record: &SnapshotRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.generation_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, generation_id: &str) -> Result<Option<SnapshotRecord>, StoreError> {
        match self.records.read().await.get(generation_id).cloned() {
            Some(record) => Ok(Some(record.validate()?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, generation_id: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(generation_id);
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// One JSON file per generation under a base directory.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, generation_id: &str) -> PathBuf {
        // Generation ids are uuids; sanitize anyway so a hostile id cannot
        // escape the directory.
        let safe: String = generation_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, record: &SnapshotRecord) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Save(e.to_string()))?;

        let path = self.path_for(&record.generation_id);
        let json =
            serde_json::to_vec_pretty(record).map_err(|e| StoreError::Save(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written snapshot.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Save(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Save(e.to_string()))?;

        debug!(generation_id = %record.generation_id, path = %path.display(), "snapshot written");
        Ok(())
    }

    async fn load(&self, generation_id: &str) -> Result<Option<SnapshotRecord>, StoreError> {
        let path = self.path_for(generation_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Load(e.to_string())),
        };

        let record: SnapshotRecord =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::SnapshotCorrupt {
                generation_id: generation_id.to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(record.validate()?))
    }

    async fn delete(&self, generation_id: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(generation_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Save(e.to_string())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
