//! Configuration for the composition engine.
//!
//! Two layers:
//!
//! - [`GenerationOptions`]: per-request knobs carried through one deck
//!   composition (parallelism, timeouts, retries, image behavior). These
//!   are persisted into snapshots so a resumed run uses the same options.
//! - [`ComposerConfig`]: process-wide resources (rate limiter, global and
//!   per-user concurrency caps).
//!
//! The CLI exposes everything with `DECK_`-prefixed environment fallbacks.
//!
//! # Environment Variables
//!
//! - `DECK_MAX_PARALLEL` - Concurrent slides per deck (default: 4)
//! - `DECK_TIMEOUT_SECONDS` - Per-slide AI timeout (default: 60)
//! - `DECK_MAX_RETRIES` - Retries for retryable errors (default: 2)
//! - `DECK_DELAY_BETWEEN_SLIDES` - Gap between slide starts (default: 0.5)
//! - `DECK_RATE_CAPACITY` - Token bucket capacity (default: 10)
//! - `DECK_RATE_WINDOW` - Token bucket window seconds (default: 60)
//! - `DECK_GLOBAL_MAX_SLIDES` - Global concurrent slide cap (default: 16)
//! - `DECK_PER_USER_MAX_SLIDES` - Per-user concurrent slide cap (default: 8)
//! - `DECK_SNAPSHOT_DIR` - Directory for generation snapshots

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::limits::{
    DEFAULT_GLOBAL_MAX_CONCURRENT_SLIDES, DEFAULT_PER_USER_MAX_SLIDES, DEFAULT_RATE_CAPACITY,
    DEFAULT_RATE_WINDOW_SECS,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default concurrent slide generations per deck.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Default per-slide AI call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Minimum accepted per-slide timeout.
pub const MIN_TIMEOUT_SECONDS: u64 = 10;

/// Default retries for retryable errors.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default minimum gap between two slide starts, in seconds.
pub const DEFAULT_DELAY_BETWEEN_SLIDES: f64 = 0.5;

/// Default progress-throttle window in seconds.
pub const DEFAULT_MIN_EMIT_INTERVAL_SECS: f64 = 0.1;

// =============================================================================
// Generation Options
// =============================================================================

/// What to do when the event consumer disconnects mid-generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Cancel in-flight slides, persist a resumable snapshot, release the
    /// deck lock.
    #[default]
    Cancel,
    /// Keep generating in the background to a final persisted state.
    Detach,
}

/// Per-request generation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    /// Upper bound on concurrent slide generations for this deck.
    pub max_parallel: usize,

    /// Per-slide AI call timeout in seconds.
    pub timeout_seconds: u64,

    /// Retries for retryable errors.
    pub max_retries: u32,

    /// Minimum gap between starts of two slides, in seconds.
    pub delay_between_slides: f64,

    /// Run image search concurrently with slide generation.
    pub async_images: bool,

    /// With `async_images`, wait for all slides to have candidates before
    /// starting slide generation.
    pub prefetch_images: bool,

    /// Honored by omission: the post-generation visual pass is out of the
    /// engine's scope, so `true` simply never schedules it.
    pub enable_visual_analysis: bool,

    /// Fail validation on unknown component types instead of dropping them.
    pub strict_mode: bool,

    /// Progress-throttle window in seconds.
    pub min_emit_interval: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Identity for pause/resume; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<String>,

    #[serde(default)]
    pub on_disconnect: DisconnectPolicy,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            delay_between_slides: DEFAULT_DELAY_BETWEEN_SLIDES,
            async_images: true,
            prefetch_images: false,
            enable_visual_analysis: false,
            strict_mode: false,
            min_emit_interval: DEFAULT_MIN_EMIT_INTERVAL_SECS,
            user_id: None,
            generation_id: None,
            on_disconnect: DisconnectPolicy::default(),
        }
    }
}

impl GenerationOptions {
    /// Validate option ranges before starting a composition.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel < 1 {
            return Err(ConfigError::Invalid("max_parallel must be at least 1".into()));
        }
        if self.timeout_seconds < MIN_TIMEOUT_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "timeout_seconds must be at least {MIN_TIMEOUT_SECONDS}"
            )));
        }
        if !self.delay_between_slides.is_finite() || self.delay_between_slides < 0.0 {
            return Err(ConfigError::Invalid(
                "delay_between_slides must be non-negative".into(),
            ));
        }
        if !self.min_emit_interval.is_finite() || self.min_emit_interval < 0.0 {
            return Err(ConfigError::Invalid(
                "min_emit_interval must be non-negative".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn slide_start_delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_between_slides)
    }

    pub fn emit_interval(&self) -> Duration {
        Duration::from_secs_f64(self.min_emit_interval)
    }
}

// =============================================================================
// Composer Config
// =============================================================================

/// Process-wide resource configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Token bucket capacity for AI calls.
    pub rate_capacity: u32,

    /// Token bucket window in seconds.
    pub rate_window_secs: u64,

    /// Global cap on concurrently generating slides.
    pub global_max_concurrent_slides: usize,

    /// Per-user cap on concurrently generating slides.
    pub per_user_max_slides: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            rate_capacity: DEFAULT_RATE_CAPACITY,
            rate_window_secs: DEFAULT_RATE_WINDOW_SECS,
            global_max_concurrent_slides: DEFAULT_GLOBAL_MAX_CONCURRENT_SLIDES,
            per_user_max_slides: DEFAULT_PER_USER_MAX_SLIDES,
        }
    }
}

impl ComposerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_capacity == 0 {
            return Err(ConfigError::Invalid("rate_capacity must be positive".into()));
        }
        if self.rate_window_secs == 0 {
            return Err(ConfigError::Invalid("rate_window must be positive".into()));
        }
        if self.global_max_concurrent_slides == 0 || self.per_user_max_slides == 0 {
            return Err(ConfigError::Invalid(
                "concurrency caps must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }
}

// =============================================================================
// CLI
// =============================================================================

/// Deck Composer - a staged concurrent engine for AI-generated decks.
#[derive(Parser, Debug)]
#[command(name = "deck-composer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose a deck from an outline file, streaming events as NDJSON.
    Compose(ComposeArgs),
    /// Validate an outline file and the configuration without generating.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Path to the outline JSON file.
    pub outline: PathBuf,

    /// Deck id; a fresh uuid is used when omitted.
    #[arg(long, env = "DECK_ID")]
    pub deck_id: Option<String>,

    /// Concurrent slide generations for this deck.
    #[arg(long, default_value_t = DEFAULT_MAX_PARALLEL, env = "DECK_MAX_PARALLEL")]
    pub max_parallel: usize,

    /// Per-slide AI call timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS, env = "DECK_TIMEOUT_SECONDS")]
    pub timeout_seconds: u64,

    /// Retries for retryable errors.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, env = "DECK_MAX_RETRIES")]
    pub max_retries: u32,

    /// Minimum gap between slide starts, in seconds.
    #[arg(long, default_value_t = DEFAULT_DELAY_BETWEEN_SLIDES, env = "DECK_DELAY_BETWEEN_SLIDES")]
    pub delay_between_slides: f64,

    /// Search and apply images before slide generation instead of
    /// concurrently with it.
    #[arg(long)]
    pub sync_images: bool,

    /// With async images, wait until all slides have candidates before
    /// starting slide generation.
    #[arg(long)]
    pub prefetch_images: bool,

    /// Fail on unknown component types instead of dropping them.
    #[arg(long)]
    pub strict: bool,

    /// Token bucket capacity for AI calls.
    #[arg(long, default_value_t = DEFAULT_RATE_CAPACITY, env = "DECK_RATE_CAPACITY")]
    pub rate_capacity: u32,

    /// Token bucket window in seconds.
    #[arg(long, default_value_t = DEFAULT_RATE_WINDOW_SECS, env = "DECK_RATE_WINDOW")]
    pub rate_window: u64,

    /// Global cap on concurrently generating slides.
    #[arg(long, default_value_t = DEFAULT_GLOBAL_MAX_CONCURRENT_SLIDES, env = "DECK_GLOBAL_MAX_SLIDES")]
    pub global_max_slides: usize,

    /// Per-user cap on concurrently generating slides.
    #[arg(long, default_value_t = DEFAULT_PER_USER_MAX_SLIDES, env = "DECK_PER_USER_MAX_SLIDES")]
    pub per_user_max_slides: usize,

    /// Directory for generation snapshots; in-memory when omitted.
    #[arg(long, env = "DECK_SNAPSHOT_DIR")]
    pub snapshot_dir: Option<PathBuf>,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ComposeArgs {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            max_parallel: self.max_parallel,
            timeout_seconds: self.timeout_seconds,
            max_retries: self.max_retries,
            delay_between_slides: self.delay_between_slides,
            async_images: !self.sync_images,
            prefetch_images: self.prefetch_images,
            strict_mode: self.strict,
            ..GenerationOptions::default()
        }
    }

    pub fn composer_config(&self) -> ComposerConfig {
        ComposerConfig {
            rate_capacity: self.rate_capacity,
            rate_window_secs: self.rate_window,
            global_max_concurrent_slides: self.global_max_slides,
            per_user_max_slides: self.per_user_max_slides,
        }
    }
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the outline JSON file.
    pub outline: PathBuf,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
