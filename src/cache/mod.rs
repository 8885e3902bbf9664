//! Cache store subsystem.
//!
//! # Data Flow
//! ```text
//! RateService
//!     → keys.rs (rates:current, rates:historical:{days})
//!     → CacheStore (remote.rs: Redis | memory.rs: in-process)
//! ```
//!
//! # Design Decisions
//! - The cache is an optimization, never a consistency boundary
//! - Adapters report failures as `CacheError`; the service logs them and
//!   treats reads as misses and writes as no-ops
//! - Payloads are JSON strings; typed (de)serialization happens in the service

pub mod keys;
pub mod memory;
pub mod remote;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use keys::CacheTtls;
pub use memory::MemoryCache;
pub use remote::RedisCache;

/// Errors raised by cache adapters.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend refused or failed the command.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// The operation did not complete in time.
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Minimal key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logs and health reports.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key` for `ttl`. Returns whether the value was stored.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool>;

    async fn ping(&self) -> CacheResult<bool>;
}

/// A cache whose every operation fails, for degradation tests.
#[cfg(test)]
pub struct UnavailableCache;

#[cfg(test)]
#[async_trait]
impl CacheStore for UnavailableCache {
    fn backend(&self) -> &'static str {
        "unavailable"
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn set_with_expiry(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<bool> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn ping(&self) -> CacheResult<bool> {
        Err(CacheError::Backend("connection refused".into()))
    }
}
