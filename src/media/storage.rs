//! Media storage boundary.
//!
//! The object store is an external collaborator; the processor only needs
//! "bytes in, durable URL out". The in-memory implementation backs the CLI
//! and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::MediaError;

/// Upload boundary for processed media.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Upload bytes, returning a durable URL.
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<String, MediaError>;
}

/// In-memory storage handing out stable fake URLs.
pub struct InMemoryMediaStorage {
    base_url: String,
    objects: RwLock<HashMap<String, (String, Bytes)>>,
}

impl InMemoryMediaStorage {
    pub fn new() -> Self {
        Self {
            base_url: "https://media.store.invalid".into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Stored object by key (the URL path segment), for assertions.
    pub async fn get(&self, key: &str) -> Option<(String, Bytes)> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for InMemoryMediaStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaStorage for InMemoryMediaStorage {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<String, MediaError> {
        let key = format!("{}-{}", Uuid::new_v4(), sanitize(filename));
        self.objects
            .write()
            .await
            .insert(key.clone(), (content_type.to_string(), data));
        Ok(format!("{}/{}", self.base_url, key))
    }
}

fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_returns_unique_urls() {
        let storage = InMemoryMediaStorage::new();
        let a = storage
            .upload(Bytes::from_static(b"a"), "photo.jpg", "image/jpeg")
            .await
            .unwrap();
        let b = storage
            .upload(Bytes::from_static(b"b"), "photo.jpg", "image/jpeg")
            .await
            .unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("https://"));
        assert_eq!(storage.len().await, 2);
    }

    #[tokio::test]
    async fn test_filename_sanitized() {
        let storage = InMemoryMediaStorage::new();
        let url = storage
            .upload(Bytes::from_static(b"x"), "my photo (1).jpg", "image/jpeg")
            .await
            .unwrap();
        assert!(!url.contains(' '));
        assert!(!url.contains('('));
    }
}
