//! Concurrency and resource limits.
//!
//! Everything that bounds how fast and how wide the pipeline runs:
//!
//! - [`RateLimiter`]: token bucket gating AI provider calls
//! - [`ConcurrencyManager`]: per-deck exclusive locks and the
//!   global/user/deck slide-slot gate
//! - [`Retrier`]: bounded retries with kind-specific exponential backoff

mod concurrency;
mod rate;
mod retry;

pub use concurrency::{
    ConcurrencyManager, ConcurrencyStats, DeckLockGuard, SlideSlot,
    DEFAULT_GLOBAL_MAX_CONCURRENT_SLIDES, DEFAULT_PER_USER_MAX_SLIDES,
};
pub use rate::{RateLimiter, DEFAULT_RATE_CAPACITY, DEFAULT_RATE_WINDOW_SECS};
pub use retry::{backoff_delay, Retrier, DEFAULT_MAX_RETRIES};
