//! Bounded retry with kind-specific backoff.
//!
//! The retrier owns nothing about what "retryable" means: every
//! [`ComposeError`] classifies itself (see [`crate::error::ErrorKind`]), and
//! this module only decides how long to wait between attempts.
//!
//! Backoff: `delay_n = min(cap_kind, base_kind * 2^n)` plus a uniform jitter
//! in `[0, 0.2 * delay_n]`. Fatal errors are re-raised immediately.
//! Skippable errors are retried like transient ones and re-raised after the
//! attempts are exhausted; the caller converts them into a skip.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{BackoffKind, ComposeError, Disposition};

/// Default retry count for retryable errors.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Deterministic portion of the backoff delay for the n-th retry (0-based).
pub fn backoff_delay(kind: BackoffKind, attempt: u32) -> Duration {
    // 2^attempt with saturation; attempts are small so the f64 path is exact.
    let factor = 2.0_f64.powi(attempt.min(16) as i32);
    let secs = (kind.base_secs() * factor).min(kind.cap_secs());
    Duration::from_secs_f64(secs)
}

/// Executes operations with bounded retries and kind-specific backoff.
#[derive(Debug, Clone, Copy)]
pub struct Retrier {
    max_retries: u32,
    jitter: bool,
}

impl Retrier {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            jitter: true,
        }
    }

    /// Disable jitter. Only useful for deterministic tests.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `op` up to `max_retries + 1` times.
    ///
    /// The closure receives the 0-based attempt number. Fatal errors abort
    /// immediately; everything else backs off and retries until attempts run
    /// out, then the last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ComposeError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ComposeError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let backoff_kind = match err.disposition() {
                        Disposition::Fatal => {
                            debug!(op = label, error = %err, "fatal, not retrying");
                            return Err(err);
                        }
                        Disposition::Retryable(kind) => kind,
                        // Skippable errors still get their retries; the
                        // caller turns the exhausted error into a skip.
                        Disposition::Skippable => BackoffKind::Other,
                    };

                    if attempt >= self.max_retries {
                        warn!(
                            op = label,
                            attempts = attempt + 1,
                            error = %err,
                            "retries exhausted"
                        );
                        return Err(err);
                    }

                    let delay = self.delay_for(backoff_kind, attempt);
                    debug!(
                        op = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn delay_for(&self, kind: BackoffKind, attempt: u32) -> Duration {
        let base = backoff_delay(kind, attempt);
        if !self.jitter {
            return base;
        }
        let jitter = rand::rng().random_range(0.0..=0.2) * base.as_secs_f64();
        base + Duration::from_secs_f64(jitter)
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

// =============================================================================
// Tests
// =============================================================================
