//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rates_http_requests_total` (counter): requests by route, status
//! - `rates_http_request_duration_seconds` (histogram): latency by route
//! - `rates_cache_operations_total` (counter): cache ops by op, outcome
//! - `rates_upstream_requests_total` (counter): provider calls by endpoint, outcome
//! - `rates_upstream_request_duration_seconds` (histogram): provider latency
//! - `rates_circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `rates_circuit_breaker_rejections_total` (counter): fail-fast rejections

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "rates_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("rates_http_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// `op` is "get"/"set"/"ping"; `outcome` is "hit"/"miss"/"ok"/"error".
pub fn record_cache_operation(op: &'static str, outcome: &'static str) {
    ::metrics::counter!("rates_cache_operations_total", "op" => op, "outcome" => outcome)
        .increment(1);
}

pub fn record_upstream_request(endpoint: &'static str, outcome: &'static str, start: Instant) {
    ::metrics::counter!(
        "rates_upstream_requests_total",
        "endpoint" => endpoint,
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!("rates_upstream_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    ::metrics::gauge!("rates_circuit_breaker_state", "breaker" => breaker.to_string()).set(value);
}

pub fn record_breaker_rejection(breaker: &str) {
    ::metrics::counter!("rates_circuit_breaker_rejections_total", "breaker" => breaker.to_string())
        .increment(1);
}
