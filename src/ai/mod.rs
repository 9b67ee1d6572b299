//! AI client boundary.
//!
//! Provider SDKs live outside this crate; the pipeline only knows the
//! [`AiClient`] trait: messages in, a structured JSON value matching the
//! requested target schema out, or a typed [`AiError`]. The orchestration
//! layer wraps every call in the retrier and the rate limiter, so
//! implementations should fail fast and let the caller pace them.

mod offline;

pub use offline::OfflineAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AiError;

// =============================================================================
// Messages and Requests
// =============================================================================

/// Message role in a chat-shaped request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiRole {
    System,
    User,
    Assistant,
}

/// One message of a chat-shaped request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: AiRole,
    pub content: String,
}

impl AiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: AiRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: AiRole::User,
            content: content.into(),
        }
    }
}

/// The structure the response must parse into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSchema {
    /// Minimal slide: `{id, title, components: [...]}`.
    SlideMinimal,
    /// Full theme: palette, fonts, visual style, manifesto.
    ThemeSpec,
}

impl TargetSchema {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetSchema::SlideMinimal => "slide_minimal",
            TargetSchema::ThemeSpec => "theme_spec",
        }
    }
}

/// Default token cap for structured generations.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A structured-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct AiRequest {
    pub messages: Vec<AiMessage>,
    pub target_schema: TargetSchema,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl AiRequest {
    pub fn new(messages: Vec<AiMessage>, target_schema: TargetSchema) -> Self {
        Self {
            messages,
            target_schema,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The concatenated user-role content, for clients that key off it.
    pub fn user_content(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == AiRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Client Trait
// =============================================================================

/// Synchronous "generate structured response" boundary.
///
/// Implementations must return a value that parses into the requested
/// [`TargetSchema`], or classify the failure as one of the [`AiError`]
/// variants so the retrier can decide what to do.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn generate(&self, request: AiRequest) -> Result<Value, AiError>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = AiRequest::new(
            vec![AiMessage::system("sys"), AiMessage::user("make a slide")],
            TargetSchema::SlideMinimal,
        )
        .with_max_tokens(2000)
        .with_temperature(0.2);

        assert_eq!(request.max_tokens, 2000);
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.target_schema.as_str(), "slide_minimal");
    }

    #[test]
    fn test_user_content_joins_user_messages() {
        let request = AiRequest::new(
            vec![
                AiMessage::system("ignored"),
                AiMessage::user("first"),
                AiMessage::user("second"),
            ],
            TargetSchema::ThemeSpec,
        );
        assert_eq!(request.user_content(), "first\nsecond");
    }
}
