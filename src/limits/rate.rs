//! Token-bucket rate limiter for AI provider calls.
//!
//! The bucket regenerates at `capacity / window` tokens per second up to
//! `capacity`. [`RateLimiter::acquire`] blocks cooperatively: the refill
//! arithmetic runs under a critical section, the wait itself does not hold
//! it, and the caller loops until a token is actually consumed.
//!
//! Guarantee: over any window of `window` seconds, at most `capacity`
//! tokens are consumed.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Default bucket capacity.
pub const DEFAULT_RATE_CAPACITY: u32 = 10;

/// Default bucket window in seconds.
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

struct BucketState {
    tokens: f64,
    refreshed_at: Instant,
}

/// Cooperative token bucket.
///
/// # Example
///
/// ```
/// use deck_composer::limits::RateLimiter;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let limiter = RateLimiter::new(2, Duration::from_secs(1));
///     limiter.acquire().await; // immediate, bucket starts full
///     limiter.acquire().await;
/// }
/// ```
pub struct RateLimiter {
    state: Mutex<BucketState>,
    capacity: u32,
    /// Tokens regenerated per second.
    rate: f64,
}

impl RateLimiter {
    /// Create a bucket that starts full.
    ///
    /// `capacity` of zero is treated as one; a zero window as one second.
    pub fn new(capacity: u32, window: Duration) -> Self {
        let capacity = capacity.max(1);
        let window_secs = window.as_secs_f64().max(f64::EPSILON);
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                refreshed_at: Instant::now(),
            }),
            capacity,
            rate: capacity as f64 / window_secs,
        }
    }

    /// Consume one token, waiting cooperatively until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("rate limiter poisoned");
                let now = Instant::now();
                let elapsed = now.duration_since(state.refreshed_at).as_secs_f64();

                // Refill in whole tokens so the refresh timestamp only moves
                // when tokens were actually added.
                let new_tokens = (elapsed * self.rate).floor();
                if new_tokens >= 1.0 {
                    state.tokens = (state.tokens + new_tokens).min(self.capacity as f64);
                    state.refreshed_at = now;
                }

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }

                Duration::from_secs_f64((1.0 - state.tokens) / self.rate)
            };

            // The wait happens outside the critical section; loop back and
            // re-check because another task may have taken the refilled token.
            tokio::time::sleep(wait).await;
        }
    }

    /// Consume one token only if immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().expect("rate limiter poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(state.refreshed_at).as_secs_f64();
        let new_tokens = (elapsed * self.rate).floor();
        if new_tokens >= 1.0 {
            state.tokens = (state.tokens + new_tokens).min(self.capacity as f64);
            state.refreshed_at = now;
        }
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Currently available whole tokens (monitoring only).
    pub fn available(&self) -> u32 {
        let state = self.state.lock().expect("rate limiter poisoned");
        state.tokens as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(
            DEFAULT_RATE_CAPACITY,
            Duration::from_secs(DEFAULT_RATE_WINDOW_SECS),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
