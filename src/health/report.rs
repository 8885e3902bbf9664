//! Aggregated service health.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::health::checks::{check_cache, check_store, check_upstream, DependencyStatus, HealthStatus};
use crate::rates::RateService;
use crate::resilience::circuit_breaker::BreakerSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub circuit_breaker: BreakerSnapshot,
    pub dependencies: Vec<DependencyStatus>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

/// Probe every dependency of `service` concurrently.
pub async fn full_health_check(service: &RateService, uptime: Duration) -> HealthReport {
    let (upstream, cache, store) = tokio::join!(
        check_upstream(service.source().as_ref()),
        check_cache(service.cache().as_ref()),
        async {
            match service.store() {
                Some(store) => Some(check_store(store.as_ref()).await),
                None => None,
            }
        }
    );

    let mut dependencies = vec![upstream, cache];
    dependencies.extend(store);

    let status = if dependencies.iter().all(|d| d.status.is_healthy()) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    tracing::debug!(status = %status, dependencies = dependencies.len(), "Health check complete");

    HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime.as_secs(),
        circuit_breaker: service.breaker().snapshot(),
        dependencies,
        checked_at: Utc::now(),
    }
}
