//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every dependency of `RateService` from configuration
//! - Inject them into the service
//!
//! # Design Decisions
//! - Fail fast on configuration mistakes (bad URLs, unusable TLS backend)
//! - A store that cannot be opened is logged and skipped; it is never read
//!   on the request path

use std::sync::Arc;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore, CacheTtls, MemoryCache, RedisCache};
use crate::config::ServiceConfig;
use crate::rates::calendar::{Clock, SystemClock};
use crate::rates::{RateError, RateService};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::store::{RateStore, SqliteRateStore};
use crate::upstream::BanxicoClient;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create upstream client: {0}")]
    Upstream(#[from] RateError),

    #[error("failed to create cache: {0}")]
    Cache(#[from] CacheError),
}

/// Wire the rate service from configuration, using the system clock.
pub async fn build_service(config: &ServiceConfig) -> Result<RateService, StartupError> {
    build_service_with_clock(config, Arc::new(SystemClock)).await
}

pub async fn build_service_with_clock(
    config: &ServiceConfig,
    clock: Arc<dyn Clock>,
) -> Result<RateService, StartupError> {
    let source = Arc::new(BanxicoClient::new(config.upstream.clone(), clock.clone())?);

    let cache: Arc<dyn CacheStore> = if config.cache.enabled {
        tracing::info!(url = %config.cache.url, "Using Redis cache");
        Arc::new(RedisCache::new(&config.cache.url, config.cache.operation_timeout())?)
    } else {
        tracing::info!("Redis disabled, using in-process cache");
        Arc::new(MemoryCache::new())
    };

    let breaker = Arc::new(CircuitBreaker::from_config(
        config.upstream.source_name.clone(),
        &config.circuit_breaker,
    ));

    let mut service = RateService::new(source, cache, breaker, clock)
        .with_ttls(CacheTtls::from(&config.cache))
        .with_config(config.rates.clone());

    if config.database.enabled {
        match SqliteRateStore::connect(&config.database).await {
            Ok(store) => {
                let store: Arc<dyn RateStore> = Arc::new(store);
                service = service.with_store(store);
            }
            Err(e) => {
                tracing::error!(url = %config.database.url, error = %e, "Rate store unavailable, continuing without it");
            }
        }
    }

    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builds_with_defaults_without_network() {
        let service = build_service(&ServiceConfig::default()).await.unwrap();
        assert_eq!(service.cache().backend(), "redis");
        assert!(service.store().is_none());
        assert_eq!(service.breaker().name(), "banxico");
    }

    #[tokio::test]
    async fn test_memory_cache_and_store() {
        let mut config = ServiceConfig::default();
        config.cache.enabled = false;
        config.database.enabled = true;
        config.database.url = "sqlite::memory:".into();
        config.database.max_connections = 1;

        let service = build_service(&config).await.unwrap();
        assert_eq!(service.cache().backend(), "memory");
        assert!(service.store().is_some());
    }

    #[tokio::test]
    async fn test_invalid_redis_url_is_fatal() {
        let mut config = ServiceConfig::default();
        config.cache.url = "nonsense".into();
        assert!(matches!(build_service(&config).await, Err(StartupError::Cache(_))));
    }
}
