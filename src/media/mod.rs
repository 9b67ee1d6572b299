//! Uploaded-media processing.
//!
//! Turns inline `data:` URLs from the outline into durable URLs before
//! slide generation begins: parse, validate MIME and size, optionally
//! resize and re-encode oversized images, upload, and rewrite the item's
//! preview URL. Items run in bounded concurrent batches; a failing item
//! keeps its original payload with an error marker instead of sinking the
//! batch.

mod data_url;
mod storage;

pub use data_url::DataUrl;
pub use storage::{InMemoryMediaStorage, MediaStorage};

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::{debug, info, warn};

use crate::error::MediaError;
use crate::outline::MediaItem;

/// MIME types accepted for upload.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Default per-item size cap: 10 MiB.
pub const DEFAULT_MAX_MEDIA_BYTES: usize = 10 * 1024 * 1024;

/// Longest image edge kept without re-encoding.
pub const DEFAULT_MAX_EDGE: u32 = 2048;

/// Default JPEG quality for re-encoded images.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Items processed concurrently per batch.
pub const MEDIA_BATCH_SIZE: usize = 5;

// =============================================================================
// Config
// =============================================================================

/// Tunables for media processing.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub max_bytes: usize,
    pub max_edge: u32,
    pub jpeg_quality: u8,
    pub batch_size: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_MEDIA_BYTES,
            max_edge: DEFAULT_MAX_EDGE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            batch_size: MEDIA_BATCH_SIZE,
        }
    }
}

// =============================================================================
// Media Processor
// =============================================================================

/// Decodes, validates, optionally re-encodes, and uploads outline media.
pub struct MediaProcessor {
    storage: Arc<dyn MediaStorage>,
    config: MediaConfig,
}

impl MediaProcessor {
    pub fn new(storage: Arc<dyn MediaStorage>) -> Self {
        Self {
            storage,
            config: MediaConfig::default(),
        }
    }

    pub fn with_config(storage: Arc<dyn MediaStorage>, config: MediaConfig) -> Self {
        Self { storage, config }
    }

    /// Process all items in bounded concurrent batches.
    ///
    /// Items that need no work (non-images, already-durable URLs) pass
    /// through untouched. Failed items come back with `error` set and the
    /// original payload intact.
    pub async fn process(&self, items: Vec<MediaItem>) -> Vec<MediaItem> {
        if items.is_empty() {
            return items;
        }
        info!(count = items.len(), "processing uploaded media");

        let mut processed = Vec::with_capacity(items.len());
        for batch in items.chunks(self.config.batch_size.max(1)) {
            let results = join_all(batch.iter().map(|item| self.process_single(item.clone()))).await;
            processed.extend(results);
        }
        processed
    }

    async fn process_single(&self, mut item: MediaItem) -> MediaItem {
        if !item.needs_upload() {
            debug!(filename = %item.filename, "media item needs no processing");
            return item;
        }
        let data_url = item.preview_url.clone().unwrap_or_default();

        match self.upload_data_url(&data_url, &item.filename).await {
            Ok(url) => {
                item.preview_url = Some(url);
                item.error = None;
                item
            }
            Err(err) => {
                warn!(filename = %item.filename, error = %err, "media item failed");
                item.error = Some(err.to_string());
                item
            }
        }
    }

    async fn upload_data_url(&self, url: &str, filename: &str) -> Result<String, MediaError> {
        let parsed = DataUrl::parse(url)?;

        if !ALLOWED_MIME_TYPES.contains(&parsed.mime.as_str()) {
            return Err(MediaError::UnsupportedMime { mime: parsed.mime });
        }
        if parsed.data.len() > self.config.max_bytes {
            return Err(MediaError::TooLarge {
                size: parsed.data.len(),
                max: self.config.max_bytes,
            });
        }

        let (data, content_type) = self.maybe_reencode(parsed)?;
        self.storage.upload(data, filename, &content_type).await
    }

    /// Resize and re-encode JPEG/PNG images whose longest edge exceeds the
    /// cap. Formats the decoder does not handle (gif, webp) upload as-is.
    fn maybe_reencode(&self, parsed: DataUrl) -> Result<(Bytes, String), MediaError> {
        if parsed.mime != "image/jpeg" && parsed.mime != "image/png" {
            return Ok((parsed.data, parsed.mime));
        }

        let decoded = image::load_from_memory(&parsed.data)
            .map_err(|e| MediaError::Decode(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        if width.max(height) <= self.config.max_edge {
            return Ok((parsed.data, parsed.mime));
        }

        debug!(width, height, max_edge = self.config.max_edge, "re-encoding oversized image");
        let resized = decoded.resize(
            self.config.max_edge,
            self.config.max_edge,
            FilterType::Triangle,
        );

        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), self.config.jpeg_quality);
        resized
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| MediaError::Decode(e.to_string()))?;

        Ok((Bytes::from(buffer), "image/jpeg".into()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_data_url(width: u32, height: u32) -> String {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        DataUrl {
            mime: "image/png".into(),
            data: Bytes::from(buffer),
        }
        .to_url()
    }

    fn image_item(id: &str, preview_url: &str) -> MediaItem {
        let mut item = MediaItem::new(id, format!("{id}.png"), "image");
        item.preview_url = Some(preview_url.to_string());
        item
    }

    fn processor() -> (MediaProcessor, Arc<InMemoryMediaStorage>) {
        let storage = Arc::new(InMemoryMediaStorage::new());
        (MediaProcessor::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_data_url_uploaded_and_rewritten() {
        let (processor, storage) = processor();
        let items = vec![image_item("m1", &png_data_url(64, 64))];

        let processed = processor.process(items).await;
        assert_eq!(processed.len(), 1);
        let url = processed[0].preview_url.as_deref().unwrap();
        assert!(url.starts_with("https://"));
        assert!(processed[0].error.is_none());
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_already_durable_url_passes_through() {
        let (processor, storage) = processor();
        let items = vec![image_item("m1", "https://cdn.example.com/a.png")];

        let processed = processor.process(items).await;
        assert_eq!(
            processed[0].preview_url.as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_non_image_passes_through() {
        let (processor, storage) = processor();
        let mut item = MediaItem::new("m1", "report.pdf", "pdf");
        item.preview_url = Some("data:application/pdf;base64,AAAA".into());

        let processed = processor.process(vec![item.clone()]).await;
        assert_eq!(processed[0], item);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_disallowed_mime_marks_error() {
        let (processor, _storage) = processor();
        let items = vec![image_item("m1", "data:image/tiff;base64,AAAA")];

        let processed = processor.process(items).await;
        let error = processed[0].error.as_deref().unwrap();
        assert!(error.contains("image/tiff"));
        // Original payload retained.
        assert!(processed[0].preview_url.as_deref().unwrap().starts_with("data:"));
    }

    #[tokio::test]
    async fn test_size_cap_enforced() {
        let storage = Arc::new(InMemoryMediaStorage::new());
        let processor = MediaProcessor::with_config(
            storage,
            MediaConfig {
                max_bytes: 100,
                ..MediaConfig::default()
            },
        );
        let items = vec![image_item("m1", &png_data_url(64, 64))];

        let processed = processor.process(items).await;
        assert!(processed[0].error.as_deref().unwrap().contains("too large"));
    }

    #[tokio::test]
    async fn test_oversized_image_reencoded_as_jpeg() {
        let storage = Arc::new(InMemoryMediaStorage::new());
        let processor = MediaProcessor::with_config(
            storage.clone(),
            MediaConfig {
                max_edge: 32,
                ..MediaConfig::default()
            },
        );
        let items = vec![image_item("m1", &png_data_url(100, 50))];

        let processed = processor.process(items).await;
        assert!(processed[0].error.is_none());

        let url = processed[0].preview_url.as_deref().unwrap();
        let key = url.rsplit('/').next().unwrap();
        let (content_type, data) = storage.get(key).await.unwrap();
        assert_eq!(content_type, "image/jpeg");
        // JPEG magic bytes.
        assert_eq!(&data[..2], &[0xFF, 0xD8]);

        let reencoded = image::load_from_memory(&data).unwrap();
        assert!(reencoded.width() <= 32 && reencoded.height() <= 32);
    }

    #[tokio::test]
    async fn test_batch_mixes_success_and_failure() {
        let (processor, _storage) = processor();
        let items = vec![
            image_item("ok", &png_data_url(16, 16)),
            image_item("bad", "data:image/png;base64,not-valid-base64!!!"),
        ];

        let processed = processor.process(items).await;
        assert!(processed[0].error.is_none());
        assert!(processed[1].error.is_some());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (processor, _storage) = processor();
        assert!(processor.process(Vec::new()).await.is_empty());
    }
}
