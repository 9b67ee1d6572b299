//! Image provider boundary.
//!
//! Real search backends (stock photo APIs, internal libraries) live outside
//! the crate; the service fans a topic query out to whatever providers it
//! was constructed with. Provider failures are contained: the service logs
//! them and keeps whatever the other providers returned.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

// =============================================================================
// Image Asset
// =============================================================================

/// One candidate image for a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub url: String,
    pub alt: String,
    /// Provider that produced this asset.
    pub source: String,
    /// Topic the asset was found under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl ImageAsset {
    /// Whether the URL parses as an absolute http(s) URL.
    pub fn has_valid_url(&self) -> bool {
        Url::parse(&self.url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// A provider search failure. Contained by the service, never surfaced to
/// the deck pipeline.
#[derive(Debug, Clone, Error)]
#[error("image provider '{provider}' failed: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

/// Topic-to-images search boundary.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provider name recorded on each returned asset.
    fn name(&self) -> &str;

    /// Search images for a topic, best-effort, up to `limit` results.
    async fn search(&self, topic: &str, limit: usize) -> Result<Vec<ImageAsset>, ProviderError>;
}

// =============================================================================
// Placeholder Provider
// =============================================================================

/// Deterministic provider used by the CLI and tests: fabricates stable
/// placeholder URLs per topic, no network involved.
#[derive(Debug, Clone)]
pub struct PlaceholderImageProvider {
    base_url: String,
}

impl PlaceholderImageProvider {
    pub fn new() -> Self {
        Self {
            base_url: "https://placeholder.images.invalid".into(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for PlaceholderImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageProvider for PlaceholderImageProvider {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn search(&self, topic: &str, limit: usize) -> Result<Vec<ImageAsset>, ProviderError> {
        let slug: String = topic
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        Ok((0..limit)
            .map(|n| ImageAsset {
                url: format!("{}/{}/{}.jpg", self.base_url, slug, n),
                alt: format!("{topic} photo {}", n + 1),
                source: self.name().to_string(),
                topic: Some(topic.to_string()),
            })
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
