//! Cache keys and TTLs.

use std::time::Duration;

use crate::config::CacheConfig;

pub const CURRENT_KEY: &str = "rates:current";
pub const HISTORICAL_PREFIX: &str = "rates:historical";

/// Key holding the latest point.
pub fn current() -> &'static str {
    CURRENT_KEY
}

/// Key holding the newest-first window of `days` business days.
pub fn historical(days: u32) -> String {
    format!("{}:{}", HISTORICAL_PREFIX, days)
}

/// Expiry applied to each entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub current: Duration,
    pub historical: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            current: Duration::from_secs(300),
            historical: Duration::from_secs(3600),
        }
    }
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            current: Duration::from_secs(config.current_ttl_secs),
            historical: Duration::from_secs(config.historical_ttl_secs),
        }
    }
}
