//! Upstream rate provider client.
//!
//! # Responsibilities
//! - Build latest-point and date-range requests for the configured series
//! - Enforce the request timeout and send the provider token
//! - Map transport and HTTP failures onto `RateError`
//! - Normalize the payload before returning it

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::sync::Arc;
use std::time::Instant;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::rates::calendar::Clock;
use crate::rates::error::{RateError, RateResult};
use crate::rates::types::{DateRange, NormalizedSeries};
use crate::upstream::types::SeriesResponse;

/// A provider of a daily rate series.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Provider name, used in logs and health reports.
    fn name(&self) -> &str;

    /// Latest available point when `range` is `None`, otherwise every point
    /// published within the inclusive range.
    async fn fetch_series(&self, range: Option<DateRange>) -> RateResult<NormalizedSeries>;
}

/// HTTP client for the Banxico SIE series API.
#[derive(Clone)]
pub struct BanxicoClient {
    http: reqwest::Client,
    config: UpstreamConfig,
    clock: Arc<dyn Clock>,
}

impl BanxicoClient {
    /// Create a client. Fails only if the TLS backend cannot be initialized.
    pub fn new(config: UpstreamConfig, clock: Arc<dyn Clock>) -> RateResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RateError::UpstreamUnavailable(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(
            base_url = %config.base_url,
            series_id = %config.series_id,
            timeout_secs = config.timeout_secs,
            "Upstream client initialized"
        );

        Ok(Self {
            http,
            config,
            clock,
        })
    }

    fn series_url(&self) -> String {
        format!(
            "{}/{}/datos",
            self.config.base_url.trim_end_matches('/'),
            self.config.series_id
        )
    }

    pub fn latest_url(&self) -> String {
        format!("{}/oportuno", self.series_url())
    }

    pub fn range_url(&self, range: DateRange) -> String {
        let fmt = self.config.range_date_format.as_str();
        format!(
            "{}/{}/{}",
            self.series_url(),
            range.start.format(fmt),
            range.end.format(fmt)
        )
    }

    async fn request(&self, url: &str, endpoint: &'static str) -> RateResult<SeriesResponse> {
        let start = Instant::now();
        let result = self.send(url).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(RateError::UpstreamTimeout(_)) => "timeout",
            Err(RateError::UpstreamUnavailable(_)) => "unavailable",
            Err(RateError::UpstreamBadShape(_)) => "bad_shape",
            Err(_) => "error",
        };
        metrics::record_upstream_request(endpoint, outcome, start);

        if let Err(e) = &result {
            tracing::error!(url = %url, endpoint, error = %e, "Upstream request failed");
        }
        result
    }

    async fn send(&self, url: &str) -> RateResult<SeriesResponse> {
        let mut request = self
            .http
            .get(url)
            .query(&[("mediaType", "json")])
            .header(ACCEPT, "application/json");
        if !self.config.token.is_empty() {
            request = request.header(self.config.token_header.as_str(), self.config.token.as_str());
        }

        let response = request.send().await.map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RateError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| RateError::UpstreamBadShape(format!("unexpected body: {}", e)))
    }

    fn normalize(&self, payload: &SeriesResponse, endpoint: &'static str) -> RateResult<NormalizedSeries> {
        let result = payload.normalize(&self.config.source_name);
        match &result {
            Ok(series) => tracing::debug!(
                endpoint,
                raw_points = payload.raw_point_count(),
                points = series.points.len(),
                "Upstream series normalized"
            ),
            Err(e) => tracing::error!(endpoint, error = %e, "Upstream payload rejected"),
        }
        result
    }

    fn map_transport_error(&self, err: reqwest::Error) -> RateError {
        if err.is_timeout() {
            RateError::UpstreamTimeout(self.config.timeout())
        } else {
            RateError::UpstreamUnavailable(err.to_string())
        }
    }
}

#[async_trait]
impl SeriesSource for BanxicoClient {
    fn name(&self) -> &str {
        &self.config.source_name
    }

    async fn fetch_series(&self, range: Option<DateRange>) -> RateResult<NormalizedSeries> {
        if let Some(range) = range {
            let payload = self.request(&self.range_url(range), "range").await?;
            return self.normalize(&payload, "range");
        }

        // A response without any series carries zero points, same as an
        // empty one, and takes the fallback below.
        let payload = self.request(&self.latest_url(), "latest").await?;
        if payload.has_series() {
            let latest = self.normalize(&payload, "latest")?;
            if !latest.is_empty() {
                return Ok(latest);
            }
        }

        // The latest-point endpoint occasionally answers with no data; widen
        // to a short trailing range once.
        let fallback = DateRange::ending_at(self.clock.today(), self.config.latest_fallback_days);
        tracing::warn!(
            start = %fallback.start,
            end = %fallback.end,
            "Latest endpoint returned no data, retrying with trailing range"
        );

        let payload = self.request(&self.range_url(fallback), "latest_fallback").await?;
        let series = self.normalize(&payload, "latest_fallback")?;
        if series.is_empty() {
            return Err(RateError::UpstreamBadShape(
                "no data points for latest value or trailing range".into(),
            ));
        }
        Ok(series)
    }
}

/// In-memory series source for tests.
#[cfg(test)]
pub struct MockSeriesSource {
    responses: std::sync::Mutex<std::collections::VecDeque<RateResult<NormalizedSeries>>>,
    ranges: std::sync::Mutex<Vec<Option<DateRange>>>,
    fallback: Option<NormalizedSeries>,
}

#[cfg(test)]
impl MockSeriesSource {
    /// Answers every call with `series`.
    pub fn with_series(series: NormalizedSeries) -> Self {
        Self {
            responses: Default::default(),
            ranges: Default::default(),
            fallback: Some(series),
        }
    }

    /// Answers calls from a queue, then fails with `UpstreamUnavailable`.
    pub fn with_responses(responses: Vec<RateResult<NormalizedSeries>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            ranges: Default::default(),
            fallback: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.ranges.lock().unwrap().len()
    }

    pub fn requested_ranges(&self) -> Vec<Option<DateRange>> {
        self.ranges.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl SeriesSource for MockSeriesSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_series(&self, range: Option<DateRange>) -> RateResult<NormalizedSeries> {
        self.ranges.lock().unwrap().push(range);
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| RateError::UpstreamUnavailable("mock exhausted".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::calendar::FixedClock;
    use chrono::NaiveDate;

    fn client(config: UpstreamConfig) -> BanxicoClient {
        let today = NaiveDate::from_ymd_opt(2025, 7, 18).unwrap();
        BanxicoClient::new(config, Arc::new(FixedClock(today))).unwrap()
    }

    #[test]
    fn test_latest_url() {
        let c = client(UpstreamConfig {
            base_url: "https://example.test/v1/".into(),
            ..Default::default()
        });
        assert_eq!(c.latest_url(), "https://example.test/v1/SF43718/datos/oportuno");
    }

    #[test]
    fn test_range_url_uses_configured_format() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 18).unwrap(),
        );

        let c = client(UpstreamConfig {
            base_url: "https://example.test/v1".into(),
            ..Default::default()
        });
        assert_eq!(
            c.range_url(range),
            "https://example.test/v1/SF43718/datos/01-07-2025/18-07-2025"
        );

        let iso = client(UpstreamConfig {
            base_url: "https://example.test/v1".into(),
            range_date_format: "%Y-%m-%d".into(),
            ..Default::default()
        });
        assert_eq!(
            iso.range_url(range),
            "https://example.test/v1/SF43718/datos/2025-07-01/2025-07-18"
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unavailable() {
        let c = client(UpstreamConfig {
            base_url: "http://127.0.0.1:1/v1".into(),
            timeout_secs: 2,
            ..Default::default()
        });
        let err = c.fetch_series(None).await.unwrap_err();
        assert!(matches!(err, RateError::UpstreamUnavailable(_)), "got {:?}", err);
    }
}
