//! Cache-aside rate service.
//!
//! # Data Flow
//! ```text
//! get_current / get_historical
//!     → cache lookup (hit returns immediately)
//!     → CircuitBreaker::call(SeriesSource::fetch_series)
//!     → filter / sort / truncate
//!     → cache write-through (failures logged, never surfaced)
//!     → store mirror (optional, best-effort)
//! get_average
//!     → get_historical → arithmetic mean
//! ```
//!
//! # Design Decisions
//! - Every collaborator is injected, so tests substitute fakes per instance
//! - The service holds no state of its own between calls
//! - Cache payloads are the JSON form of `ExchangeRatePoint`

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{keys, CacheStore, CacheTtls};
use crate::config::RatesConfig;
use crate::observability::metrics;
use crate::rates::calendar::{is_business_day, Clock};
use crate::rates::error::{RateError, RateResult};
use crate::rates::types::{DateRange, ExchangeRatePoint};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::store::RateStore;
use crate::upstream::SeriesSource;

pub struct RateService {
    source: Arc<dyn SeriesSource>,
    cache: Arc<dyn CacheStore>,
    breaker: Arc<CircuitBreaker>,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn RateStore>>,
    ttls: CacheTtls,
    config: RatesConfig,
}

impl RateService {
    pub fn new(
        source: Arc<dyn SeriesSource>,
        cache: Arc<dyn CacheStore>,
        breaker: Arc<CircuitBreaker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache,
            breaker,
            clock,
            store: None,
            ttls: CacheTtls::default(),
            config: RatesConfig::default(),
        }
    }

    /// Mirror fetched points into `store`.
    pub fn with_store(mut self, store: Arc<dyn RateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn with_config(mut self, config: RatesConfig) -> Self {
        self.config = config;
        self
    }

    /// Latest published rate.
    ///
    /// `Ok(None)` when the provider answered without points. Upstream and
    /// breaker failures propagate.
    pub async fn get_current(&self) -> RateResult<Option<ExchangeRatePoint>> {
        let key = keys::current();
        if let Some(point) = self.cache_get::<ExchangeRatePoint>(key).await {
            tracing::debug!(key, date = %point.date, "Current rate served from cache");
            return Ok(Some(point));
        }

        let series = self.breaker.call(|| self.source.fetch_series(None)).await?;

        let Some(point) = series.latest().cloned() else {
            tracing::warn!(source = self.source.name(), "Provider returned no current rate");
            return Ok(None);
        };

        self.cache_set(key, &point, self.ttls.current).await;
        self.mirror(std::slice::from_ref(&point)).await;

        tracing::info!(date = %point.date, rate = point.rate, "Current rate fetched");
        Ok(Some(point))
    }

    /// Up to `days` business-day points, newest first.
    ///
    /// An open circuit or a provider response without a series yields an
    /// empty vector; other upstream failures propagate.
    pub async fn get_historical(&self, days: u32) -> RateResult<Vec<ExchangeRatePoint>> {
        self.check_days(days)?;

        let key = keys::historical(days);
        if let Some(points) = self.cache_get::<Vec<ExchangeRatePoint>>(&key).await {
            tracing::debug!(key = %key, count = points.len(), "Historical rates served from cache");
            return Ok(points);
        }

        let range = DateRange::ending_at(
            self.clock.today(),
            i64::from(days) + self.config.range_padding_days,
        );

        let fetched = self
            .breaker
            .call(|| self.source.fetch_series(Some(range)))
            .await
            .map_err(RateError::from);

        let series = match fetched {
            Ok(series) => series,
            Err(RateError::CircuitOpen) => {
                tracing::warn!(days, "Circuit open, returning no historical rates");
                return Ok(Vec::new());
            }
            Err(RateError::UpstreamBadShape(reason)) => {
                tracing::warn!(days, reason = %reason, "Provider returned no series");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let points = business_days_newest_first(series.points, days);
        if !points.is_empty() {
            self.cache_set(&key, &points, self.ttls.historical).await;
            self.mirror(&points).await;
        }

        tracing::info!(
            days,
            start = %range.start,
            end = %range.end,
            count = points.len(),
            "Historical rates fetched"
        );
        Ok(points)
    }

    /// Mean rate over `get_historical(days)`. `Ok(None)` when there is no data.
    pub async fn get_average(&self, days: u32) -> RateResult<Option<f64>> {
        let points = self.get_historical(days).await?;
        Ok(mean_rate(&points))
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn source(&self) -> &Arc<dyn SeriesSource> {
        &self.source
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn store(&self) -> Option<&Arc<dyn RateStore>> {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &RatesConfig {
        &self.config
    }

    fn check_days(&self, days: u32) -> RateResult<()> {
        if days == 0 || days > self.config.max_days {
            return Err(RateError::InvalidDays {
                days,
                max: self.config.max_days,
            });
        }
        Ok(())
    }

    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    metrics::record_cache_operation("get", "hit");
                    Some(value)
                }
                Err(e) => {
                    metrics::record_cache_operation("get", "error");
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                metrics::record_cache_operation("get", "miss");
                None
            }
            Err(e) => {
                metrics::record_cache_operation("get", "error");
                tracing::warn!(key, backend = self.cache.backend(), error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn cache_set<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        match self.cache.set_with_expiry(key, &payload, ttl).await {
            Ok(_) => metrics::record_cache_operation("set", "ok"),
            Err(e) => {
                metrics::record_cache_operation("set", "error");
                tracing::warn!(key, backend = self.cache.backend(), error = %e, "Cache write failed");
            }
        }
    }

    async fn mirror(&self, points: &[ExchangeRatePoint]) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save_rates(points).await {
            tracing::warn!(count = points.len(), error = %e, "Failed to persist rates");
        }
    }
}

/// Weekday points only, one per date, newest first, at most `days` long.
pub fn business_days_newest_first(mut points: Vec<ExchangeRatePoint>, days: u32) -> Vec<ExchangeRatePoint> {
    points.retain(|p| is_business_day(p.date));
    points.sort_by(|a, b| b.date.cmp(&a.date));
    points.dedup_by_key(|p| p.date);
    points.truncate(days as usize);
    points
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean_rate(points: &[ExchangeRatePoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let sum: f64 = points.iter().map(|p| p.rate).sum();
    Some(sum / points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, UnavailableCache};
    use crate::rates::calendar::FixedClock;
    use crate::rates::types::NormalizedSeries;
    use crate::store::SqliteRateStore;
    use crate::upstream::client::MockSeriesSource;
    use chrono::NaiveDate;

    // Friday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 18).unwrap()
    }

    fn point(d: u32, rate: f64) -> ExchangeRatePoint {
        ExchangeRatePoint::new(NaiveDate::from_ymd_opt(2025, 7, d).unwrap(), rate, "banxico").unwrap()
    }

    fn series(points: Vec<ExchangeRatePoint>) -> NormalizedSeries {
        NormalizedSeries {
            series_id: "SF43718".into(),
            title: "Tipo de cambio".into(),
            points,
        }
    }

    fn service_with(source: Arc<MockSeriesSource>, cache: Arc<dyn CacheStore>, threshold: u32) -> RateService {
        RateService::new(
            source,
            cache,
            Arc::new(CircuitBreaker::new("banxico", threshold, Duration::from_secs(60))),
            Arc::new(FixedClock(today())),
        )
    }

    #[tokio::test]
    async fn test_current_is_cached_after_first_fetch() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![point(18, 18.72)])));
        let cache = Arc::new(MemoryCache::new());
        let service = service_with(source.clone(), cache.clone(), 5);

        let first = service.get_current().await.unwrap().unwrap();
        assert_eq!(first, point(18, 18.72));
        assert_eq!(source.calls(), 1);
        assert_eq!(source.requested_ranges(), vec![None]);

        let cached = cache.get(keys::current()).await.unwrap().unwrap();
        assert_eq!(cached, r#"{"date":"2025-07-18","rate":18.72,"source":"banxico"}"#);

        let second = service.get_current().await.unwrap().unwrap();
        assert_eq!(second, first);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_cached_rate_is_refetched() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![point(18, 18.72)])));
        let cache = Arc::new(MemoryCache::new());
        cache
            .set_with_expiry(
                keys::current(),
                r#"{"date":"2025-07-18","rate":-3.0,"source":"x"}"#,
                Duration::from_secs(300),
            )
            .await
            .unwrap();
        let service = service_with(source.clone(), cache.clone(), 5);

        assert_eq!(service.get_current().await.unwrap(), Some(point(18, 18.72)));
        assert_eq!(source.calls(), 1);

        let rewritten = cache.get(keys::current()).await.unwrap().unwrap();
        assert_eq!(rewritten, r#"{"date":"2025-07-18","rate":18.72,"source":"banxico"}"#);
    }

    #[tokio::test]
    async fn test_current_takes_newest_point() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![
            point(16, 18.50),
            point(18, 18.72),
            point(17, 18.60),
        ])));
        let service = service_with(source, Arc::new(MemoryCache::new()), 5);

        assert_eq!(service.get_current().await.unwrap().unwrap().date, today());
    }

    #[tokio::test]
    async fn test_current_survives_unavailable_cache() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![point(18, 18.72)])));
        let service = service_with(source.clone(), Arc::new(UnavailableCache), 5);

        assert_eq!(service.get_current().await.unwrap(), Some(point(18, 18.72)));
        assert_eq!(service.get_current().await.unwrap(), Some(point(18, 18.72)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_current_empty_series_is_none() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![])));
        let service = service_with(source, Arc::new(MemoryCache::new()), 5);

        assert_eq!(service.get_current().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_current_propagates_upstream_errors() {
        let source = Arc::new(MockSeriesSource::with_responses(vec![Err(RateError::UpstreamStatus {
            status: 500,
            body: "boom".into(),
        })]));
        let service = service_with(source, Arc::new(MemoryCache::new()), 5);

        let err = service.get_current().await.unwrap_err();
        assert!(matches!(err, RateError::UpstreamStatus { status: 500, .. }));
        assert_eq!(service.breaker().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_current_fails_fast_when_circuit_open() {
        let source = Arc::new(MockSeriesSource::with_responses(vec![Err(RateError::UpstreamUnavailable(
            "refused".into(),
        ))]));
        let service = service_with(source.clone(), Arc::new(MemoryCache::new()), 1);

        assert!(service.get_current().await.is_err());
        assert_eq!(service.get_current().await.unwrap_err(), RateError::CircuitOpen);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_historical_drops_weekends_and_sorts_descending() {
        // 12th and 13th are Saturday and Sunday.
        let source = Arc::new(MockSeriesSource::with_series(series(vec![
            point(11, 18.40),
            point(12, 18.41),
            point(13, 18.42),
            point(14, 18.50),
            point(16, 18.60),
            point(15, 18.55),
        ])));
        let service = service_with(source, Arc::new(MemoryCache::new()), 5);

        let points = service.get_historical(10).await.unwrap();
        let days: Vec<u32> = points.iter().map(|p| chrono::Datelike::day(&p.date)).collect();
        assert_eq!(days, vec![16, 15, 14, 11]);
    }

    #[tokio::test]
    async fn test_historical_truncates_and_requests_padded_range() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![
            point(14, 18.50),
            point(15, 18.55),
            point(16, 18.60),
            point(17, 18.65),
            point(18, 18.70),
        ])));
        let service = service_with(source.clone(), Arc::new(MemoryCache::new()), 5);

        let points = service.get_historical(2).await.unwrap();
        assert_eq!(points, vec![point(18, 18.70), point(17, 18.65)]);

        let expected = DateRange::new(NaiveDate::from_ymd_opt(2025, 7, 6).unwrap(), today());
        assert_eq!(source.requested_ranges(), vec![Some(expected)]);
    }

    #[tokio::test]
    async fn test_historical_is_cached_per_window() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![point(17, 18.65), point(18, 18.70)])));
        let cache = Arc::new(MemoryCache::new());
        let service = service_with(source.clone(), cache.clone(), 5);

        let first = service.get_historical(5).await.unwrap();
        let second = service.get_historical(5).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
        assert!(cache.get("rates:historical:5").await.unwrap().is_some());

        service.get_historical(3).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_historical_rejects_out_of_range_days() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![])));
        let service = service_with(source.clone(), Arc::new(MemoryCache::new()), 5);

        assert_eq!(
            service.get_historical(0).await.unwrap_err(),
            RateError::InvalidDays { days: 0, max: 90 }
        );
        assert_eq!(
            service.get_historical(91).await.unwrap_err(),
            RateError::InvalidDays { days: 91, max: 90 }
        );
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_historical_is_empty_when_circuit_open() {
        let source = Arc::new(MockSeriesSource::with_responses(vec![Err(RateError::UpstreamTimeout(
            Duration::from_secs(10),
        ))]));
        let service = service_with(source.clone(), Arc::new(MemoryCache::new()), 1);

        assert!(matches!(
            service.get_historical(10).await,
            Err(RateError::UpstreamTimeout(_))
        ));
        assert!(service.get_historical(10).await.unwrap().is_empty());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_historical_is_empty_without_series() {
        let source = Arc::new(MockSeriesSource::with_responses(vec![Err(RateError::UpstreamBadShape(
            "no series".into(),
        ))]));
        let service = service_with(source, Arc::new(MemoryCache::new()), 5);

        assert!(service.get_historical(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_average() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![point(17, 18.0), point(18, 19.0)])));
        let service = service_with(source, Arc::new(MemoryCache::new()), 5);

        assert_eq!(service.get_average(15).await.unwrap(), Some(18.5));
    }

    #[tokio::test]
    async fn test_average_of_nothing_is_none() {
        let source = Arc::new(MockSeriesSource::with_series(series(vec![point(19, 18.0)])));
        let service = service_with(source, Arc::new(MemoryCache::new()), 5);

        assert_eq!(service.get_average(15).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetched_rates_are_mirrored_to_store() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = Arc::new(SqliteRateStore::from_pool(pool).await.unwrap());

        let source = Arc::new(MockSeriesSource::with_series(series(vec![point(17, 18.65), point(18, 18.70)])));
        let service = service_with(source, Arc::new(MemoryCache::new()), 5).with_store(store.clone());

        service.get_historical(5).await.unwrap();
        assert_eq!(store.all_rates().await.unwrap(), vec![point(18, 18.70), point(17, 18.65)]);
    }

    #[test]
    fn test_dedup_keeps_one_point_per_date() {
        let points = business_days_newest_first(vec![point(18, 18.7), point(18, 18.7), point(17, 18.6)], 10);
        assert_eq!(points.len(), 2);
    }
}
