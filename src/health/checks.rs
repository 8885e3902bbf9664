//! Dependency probes.
//!
//! # Responsibilities
//! - Time a single round trip to each dependency
//! - Turn the outcome into a serializable `DependencyStatus`

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::cache::CacheStore;
use crate::store::RateStore;
use crate::upstream::SeriesSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => f.write_str("healthy"),
            HealthStatus::Unhealthy => f.write_str("unhealthy"),
        }
    }
}

/// Outcome of probing one dependency.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyStatus {
    pub name: String,
    pub status: HealthStatus,
    pub response_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl DependencyStatus {
    fn from_probe(name: impl Into<String>, start: Instant, outcome: Result<(), String>) -> Self {
        let name = name.into();
        let response_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        let (status, error) = match outcome {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => {
                tracing::warn!(dependency = %name, error = %e, "Health check failed");
                (HealthStatus::Unhealthy, Some(e))
            }
        };

        Self {
            name,
            status,
            response_time_ms,
            error,
            checked_at: Utc::now(),
        }
    }
}

/// Fetch the latest point directly from the provider.
pub async fn check_upstream(source: &dyn SeriesSource) -> DependencyStatus {
    let start = Instant::now();
    let outcome = match source.fetch_series(None).await {
        Ok(series) if series.is_empty() => Err("provider returned no data".to_string()),
        Ok(_) => Ok(()),
        Err(e) => Err(e.to_string()),
    };
    DependencyStatus::from_probe(format!("upstream:{}", source.name()), start, outcome)
}

pub async fn check_cache(cache: &dyn CacheStore) -> DependencyStatus {
    let start = Instant::now();
    let outcome = match cache.ping().await {
        Ok(true) => Ok(()),
        Ok(false) => Err("unexpected PING reply".to_string()),
        Err(e) => Err(e.to_string()),
    };
    DependencyStatus::from_probe(format!("cache:{}", cache.backend()), start, outcome)
}

pub async fn check_store(store: &dyn RateStore) -> DependencyStatus {
    let start = Instant::now();
    let outcome = match store.ping().await {
        Ok(true) => Ok(()),
        Ok(false) => Err("unexpected probe result".to_string()),
        Err(e) => Err(e.to_string()),
    };
    DependencyStatus::from_probe("store", start, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, UnavailableCache};
    use crate::rates::error::RateError;
    use crate::rates::types::NormalizedSeries;
    use crate::upstream::client::MockSeriesSource;

    #[tokio::test]
    async fn test_cache_checks() {
        let healthy = check_cache(&MemoryCache::new()).await;
        assert_eq!(healthy.status, HealthStatus::Healthy);
        assert_eq!(healthy.name, "cache:memory");
        assert!(healthy.error.is_none());

        let broken = check_cache(&UnavailableCache).await;
        assert_eq!(broken.status, HealthStatus::Unhealthy);
        assert!(broken.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_upstream_check_treats_empty_series_as_unhealthy() {
        let source = MockSeriesSource::with_series(NormalizedSeries::default());
        let status = check_upstream(&source).await;
        assert_eq!(status.status, HealthStatus::Unhealthy);
        assert_eq!(status.name, "upstream:mock");
    }

    #[tokio::test]
    async fn test_upstream_check_reports_error() {
        let source = MockSeriesSource::with_responses(vec![Err(RateError::UpstreamStatus {
            status: 401,
            body: "bad token".into(),
        })]);
        let status = check_upstream(&source).await;
        assert_eq!(status.status, HealthStatus::Unhealthy);
        assert!(status.error.unwrap().contains("401"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Healthy).unwrap(), r#""healthy""#);
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
    }
}
