//! Request throttling and lookup caching.
//!
//! This module provides:
//! - [`RateLimiter`]: per-minute spacing and per-day quota for outbound requests
//! - [`ResultCache`]: TTL memoization of idempotent lookups

mod cache;
mod rate_limiter;

pub use cache::{ResultCache, DEFAULT_CACHE_TTL};
pub use rate_limiter::{
    Grant, RateLimitConfig, RateLimiter, DEFAULT_REQUESTS_PER_DAY, DEFAULT_REQUESTS_PER_MINUTE,
};
