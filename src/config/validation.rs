//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and that addresses
//! and URLs parse. Every problem is reported, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// Hard ceiling on the `days` window.
pub const MAX_DAYS_LIMIT: u32 = 90;

/// Ceiling on the calendar days added to any provider range.
pub const MAX_PADDING_DAYS: i64 = 365;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Err(e) = url::Url::parse(&config.upstream.base_url) {
        errors.push(ValidationError::new(
            "upstream.base_url",
            format!("invalid URL: {}", e),
        ));
    }
    if config.upstream.series_id.trim().is_empty() {
        errors.push(ValidationError::new("upstream.series_id", "must not be empty"));
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be > 0"));
    }
    if !(1..=MAX_PADDING_DAYS).contains(&config.upstream.latest_fallback_days) {
        errors.push(ValidationError::new(
            "upstream.latest_fallback_days",
            format!("must be within 1..={}", MAX_PADDING_DAYS),
        ));
    }

    if config.cache.enabled {
        if let Err(e) = url::Url::parse(&config.cache.url) {
            errors.push(ValidationError::new("cache.url", format!("invalid URL: {}", e)));
        }
    }
    if config.cache.operation_timeout_ms == 0 {
        errors.push(ValidationError::new("cache.operation_timeout_ms", "must be > 0"));
    }
    if config.cache.current_ttl_secs == 0 || config.cache.historical_ttl_secs == 0 {
        errors.push(ValidationError::new("cache", "TTLs must be > 0"));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("circuit_breaker.failure_threshold", "must be >= 1"));
    }
    if config.circuit_breaker.open_timeout_secs == 0 {
        errors.push(ValidationError::new("circuit_breaker.open_timeout_secs", "must be > 0"));
    }

    let rates = &config.rates;
    if rates.max_days == 0 || rates.max_days > MAX_DAYS_LIMIT {
        errors.push(ValidationError::new(
            "rates.max_days",
            format!("must be within 1..={}", MAX_DAYS_LIMIT),
        ));
    }
    for (field, value) in [
        ("rates.default_historical_days", rates.default_historical_days),
        ("rates.default_average_days", rates.default_average_days),
    ] {
        if value == 0 || value > rates.max_days {
            errors.push(ValidationError::new(
                field,
                format!("must be within 1..={}", rates.max_days),
            ));
        }
    }
    if !(0..=MAX_PADDING_DAYS).contains(&rates.range_padding_days) {
        errors.push(ValidationError::new(
            "rates.range_padding_days",
            format!("must be within 0..={}", MAX_PADDING_DAYS),
        ));
    }

    if config.database.enabled && config.database.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be >= 1"));
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new("http.request_timeout_secs", "must be > 0"));
    }
    if !config.http.api_prefix.starts_with('/') {
        errors.push(ValidationError::new("http.api_prefix", "must start with '/'"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
