use thiserror::Error;

// =============================================================================
// Error Kinds
// =============================================================================

/// Flat classification of every failure the pipeline can produce.
///
/// Components raise domain-specific errors ([`AiError`], [`MediaError`], ...)
/// and each of those maps onto exactly one kind. Retry, skip, and abort
/// decisions are made from the kind alone, never from the concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AiTimeout,
    AiRateLimit,
    AiOverloaded,
    AiInvalidResponse,
    ValidationComponent,
    ValidationSchema,
    MediaFormat,
    MediaSize,
    MediaUpload,
    RagContext,
    RagKb,
    PersistenceSave,
    PersistenceLoad,
    OrchestrationSlide,
    OrchestrationDeck,
    ConfigurationMissing,
    ConfigurationInvalid,
}

/// Backoff profile applied between retries of a retryable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackoffKind {
    /// Provider reports overload (base 10s, cap 120s).
    Overloaded,
    /// Provider rate limit hit (base 10s, cap 60s).
    RateLimit,
    /// Call timed out (base 2s, cap 30s).
    Timeout,
    /// Any other transient failure (base 1s, cap 10s).
    Other,
}

impl BackoffKind {
    /// Base delay in seconds for the first retry.
    pub fn base_secs(self) -> f64 {
        match self {
            BackoffKind::Overloaded => 10.0,
            BackoffKind::RateLimit => 10.0,
            BackoffKind::Timeout => 2.0,
            BackoffKind::Other => 1.0,
        }
    }

    /// Maximum delay in seconds regardless of attempt count.
    pub fn cap_secs(self) -> f64 {
        match self {
            BackoffKind::Overloaded => 120.0,
            BackoffKind::RateLimit => 60.0,
            BackoffKind::Timeout => 30.0,
            BackoffKind::Other => 10.0,
        }
    }
}

/// What the caller should do with a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Retry with the given backoff profile, up to the configured attempts.
    Retryable(BackoffKind),
    /// Do not retry; the slide may be skipped if policy allows.
    Skippable,
    /// Abort immediately and surface the error.
    Fatal,
}

impl ErrorKind {
    /// Map a kind to its retry/skip/abort disposition.
    pub fn disposition(self) -> Disposition {
        match self {
            ErrorKind::AiTimeout => Disposition::Retryable(BackoffKind::Timeout),
            ErrorKind::AiRateLimit => Disposition::Retryable(BackoffKind::RateLimit),
            ErrorKind::AiOverloaded => Disposition::Retryable(BackoffKind::Overloaded),
            ErrorKind::AiInvalidResponse => Disposition::Skippable,
            ErrorKind::ValidationComponent | ErrorKind::ValidationSchema => Disposition::Skippable,
            ErrorKind::MediaFormat | ErrorKind::MediaSize => Disposition::Skippable,
            ErrorKind::MediaUpload => Disposition::Retryable(BackoffKind::Other),
            ErrorKind::RagContext | ErrorKind::RagKb => Disposition::Skippable,
            ErrorKind::PersistenceSave | ErrorKind::PersistenceLoad => {
                Disposition::Retryable(BackoffKind::Other)
            }
            ErrorKind::OrchestrationSlide
            | ErrorKind::OrchestrationDeck
            | ErrorKind::ConfigurationMissing
            | ErrorKind::ConfigurationInvalid => Disposition::Fatal,
        }
    }

    /// Stable snake_case name used in emitted error events.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::AiTimeout => "ai_timeout",
            ErrorKind::AiRateLimit => "ai_rate_limit",
            ErrorKind::AiOverloaded => "ai_overloaded",
            ErrorKind::AiInvalidResponse => "ai_invalid_response",
            ErrorKind::ValidationComponent => "validation_component",
            ErrorKind::ValidationSchema => "validation_schema",
            ErrorKind::MediaFormat => "media_format",
            ErrorKind::MediaSize => "media_size",
            ErrorKind::MediaUpload => "media_upload",
            ErrorKind::RagContext => "rag_context",
            ErrorKind::RagKb => "rag_kb",
            ErrorKind::PersistenceSave => "persistence_save",
            ErrorKind::PersistenceLoad => "persistence_load",
            ErrorKind::OrchestrationSlide => "orchestration_slide",
            ErrorKind::OrchestrationDeck => "orchestration_deck",
            ErrorKind::ConfigurationMissing => "configuration_missing",
            ErrorKind::ConfigurationInvalid => "configuration_invalid",
        }
    }
}

// =============================================================================
// AI Errors
// =============================================================================

/// Errors from the structured-generation AI boundary.
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// The call exceeded its deadline.
    #[error("AI call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The provider rejected the call due to rate limiting.
    #[error("AI provider rate limit: {0}")]
    RateLimited(String),

    /// The provider is overloaded and asked us to back off.
    #[error("AI provider overloaded: {0}")]
    Overloaded(String),

    /// The response could not be parsed into the requested structure.
    #[error("unparseable AI response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::Timeout { .. } => ErrorKind::AiTimeout,
            AiError::RateLimited(_) => ErrorKind::AiRateLimit,
            AiError::Overloaded(_) => ErrorKind::AiOverloaded,
            AiError::InvalidResponse(_) => ErrorKind::AiInvalidResponse,
        }
    }
}

// =============================================================================
// Media Errors
// =============================================================================

/// Errors from media decoding, validation, and upload.
#[derive(Debug, Clone, Error)]
pub enum MediaError {
    /// MIME type is not on the allow-list.
    #[error("unsupported media type: {mime}")]
    UnsupportedMime { mime: String },

    /// The data URL prefix could not be parsed.
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// Payload exceeds the configured size cap.
    #[error("media too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    /// Image bytes could not be decoded.
    #[error("media decode failed: {0}")]
    Decode(String),

    /// Upload to the storage backend failed.
    #[error("media upload failed: {0}")]
    Upload(String),
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::UnsupportedMime { .. }
            | MediaError::InvalidDataUrl(_)
            | MediaError::Decode(_) => ErrorKind::MediaFormat,
            MediaError::TooLarge { .. } => ErrorKind::MediaSize,
            MediaError::Upload(_) => ErrorKind::MediaUpload,
        }
    }
}

// =============================================================================
// RAG Errors
// =============================================================================

/// Errors from the design-context retrieval service.
#[derive(Debug, Clone, Error)]
pub enum RagError {
    /// Context assembly failed for a slide.
    #[error("RAG context failed: {0}")]
    Context(String),

    /// The knowledge base itself is unreadable.
    #[error("knowledge base error: {0}")]
    KnowledgeBase(String),
}

impl RagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::Context(_) => ErrorKind::RagContext,
            RagError::KnowledgeBase(_) => ErrorKind::RagKb,
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors from component validation against the registry.
#[derive(Debug, Clone, Error)]
pub enum ValidateError {
    /// Component type is not present in the registry (strict mode only).
    #[error("unknown component type: {component_type}")]
    UnknownType { component_type: String },

    /// A prop failed schema validation and could not be recovered.
    #[error("invalid prop '{field}' on {component_type}: {message}")]
    Schema {
        component_type: String,
        field: String,
        message: String,
    },
}

impl ValidateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidateError::UnknownType { .. } => ErrorKind::ValidationComponent,
            ValidateError::Schema { .. } => ErrorKind::ValidationSchema,
        }
    }
}

// =============================================================================
// Persistence Errors
// =============================================================================

/// Errors from deck and snapshot stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A write failed.
    #[error("persistence write failed: {0}")]
    Save(String),

    /// A read failed.
    #[error("persistence read failed: {0}")]
    Load(String),

    /// The deck does not exist.
    #[error("deck not found: {deck_id}")]
    DeckNotFound { deck_id: String },

    /// Slide index is outside the deck.
    #[error("slide index {index} out of range for deck {deck_id}")]
    SlideIndexOutOfRange { deck_id: String, index: usize },

    /// Snapshot record carries an unsupported version.
    #[error("snapshot version mismatch: expected {expected}, got {actual}")]
    SnapshotVersion { expected: u32, actual: u32 },

    /// Snapshot record is structurally invalid; fields are never guessed.
    #[error("corrupt snapshot for {generation_id}: {message}")]
    SnapshotCorrupt {
        generation_id: String,
        message: String,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Save(_) => ErrorKind::PersistenceSave,
            StoreError::Load(_)
            | StoreError::DeckNotFound { .. }
            | StoreError::SlideIndexOutOfRange { .. } => ErrorKind::PersistenceLoad,
            StoreError::SnapshotVersion { .. } | StoreError::SnapshotCorrupt { .. } => {
                ErrorKind::ConfigurationInvalid
            }
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors from option and outline validation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing configuration: {0}")]
    Missing(String),

    /// A setting or the outline is present but invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Missing(_) => ErrorKind::ConfigurationMissing,
            ConfigError::Invalid(_) => ErrorKind::ConfigurationInvalid,
        }
    }
}

// =============================================================================
// Top-Level Composition Error
// =============================================================================

/// Message used when a second orchestration is attempted on a busy deck.
pub const DECK_GENERATION_IN_PROGRESS: &str = "DECK_GENERATION_IN_PROGRESS";

/// Any failure surfaced by the composition pipeline.
///
/// Domain errors convert in via `#[from]`; the orchestrator adds its own
/// deck- and slide-scoped variants.
#[derive(Debug, Clone, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A slide failed in a way not covered by a domain error.
    #[error("slide {index} failed: {message}")]
    Slide { index: usize, message: String },

    /// A deck-level orchestration failure.
    #[error("deck orchestration failed: {0}")]
    Deck(String),

    /// Another orchestration already holds this deck's lock.
    #[error("DECK_GENERATION_IN_PROGRESS")]
    DeckBusy { deck_id: String },

    /// The generation was cancelled or paused before completion.
    #[error("generation cancelled")]
    Cancelled,
}

impl ComposeError {
    /// The flat classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComposeError::Ai(e) => e.kind(),
            ComposeError::Media(e) => e.kind(),
            ComposeError::Rag(e) => e.kind(),
            ComposeError::Validate(e) => e.kind(),
            ComposeError::Store(e) => e.kind(),
            ComposeError::Config(e) => e.kind(),
            ComposeError::Slide { .. } => ErrorKind::OrchestrationSlide,
            ComposeError::Deck(_) | ComposeError::DeckBusy { .. } => ErrorKind::OrchestrationDeck,
            ComposeError::Cancelled => ErrorKind::OrchestrationSlide,
        }
    }

    /// Shorthand for `self.kind().disposition()`.
    pub fn disposition(&self) -> Disposition {
        // Cancellation must never be retried, whatever the kind says.
        if matches!(self, ComposeError::Cancelled) {
            return Disposition::Fatal;
        }
        self.kind().disposition()
    }
}

// =============================================================================
// Tests
// =============================================================================
