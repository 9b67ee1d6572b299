//! Data-URL codec.
//!
//! Uploaded media arrives from clients as `data:<mime>;base64,<payload>`
//! URLs. This module parses and re-assembles them; validation against the
//! allow-list and size caps happens in the processor.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

use crate::error::MediaError;

/// A decoded data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime: String,
    pub data: Bytes,
}

impl DataUrl {
    /// Parse a `data:` URL with base64 payload.
    pub fn parse(url: &str) -> Result<Self, MediaError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| MediaError::InvalidDataUrl("missing 'data:' prefix".into()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| MediaError::InvalidDataUrl("missing ',' separator".into()))?;

        let mime = match header.strip_suffix(";base64") {
            Some(mime) => mime,
            None => {
                return Err(MediaError::InvalidDataUrl(
                    "only base64 payloads are supported".into(),
                ))
            }
        };
        if mime.is_empty() {
            return Err(MediaError::InvalidDataUrl("empty MIME type".into()));
        }

        let data = BASE64
            .decode(payload.trim())
            .map_err(|e| MediaError::InvalidDataUrl(format!("base64 decode: {e}")))?;

        Ok(Self {
            mime: mime.to_string(),
            data: Bytes::from(data),
        })
    }

    /// Re-assemble into a `data:` URL.
    pub fn to_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.data))
    }
}

// =============================================================================
// Tests
// =============================================================================
