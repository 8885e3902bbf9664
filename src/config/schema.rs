//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the rates service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream rate provider settings.
    pub upstream: UpstreamConfig,

    /// Remote cache settings.
    pub cache: CacheConfig,

    /// Circuit breaker guarding upstream calls.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Query windows for historical and average views.
    pub rates: RatesConfig,

    /// Optional durable store mirroring fetched rates.
    pub database: DatabaseConfig,

    /// HTTP boundary settings.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the series API, without trailing slash.
    pub base_url: String,

    /// Series identifier (USD/MXN FIX is "SF43718").
    pub series_id: String,

    /// Provider authentication token.
    pub token: String,

    /// Header used to carry the token.
    pub token_header: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// chrono format for dates in range URLs.
    pub range_date_format: String,

    /// Width of the range used when the latest-point endpoint comes back empty.
    pub latest_fallback_days: i64,

    /// Source identifier stamped on every normalized point.
    pub source_name: String,

    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.banxico.org.mx/SieAPIRest/service/v1".to_string(),
            series_id: "SF43718".to_string(),
            token: String::new(),
            token_header: "Bmx-Token".to_string(),
            timeout_secs: 10,
            range_date_format: "%d-%m-%Y".to_string(),
            latest_fallback_days: 5,
            source_name: "banxico".to_string(),
            user_agent: "RatesService/1.0".to_string(),
        }
    }
}

/// Remote cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use Redis. When false an in-process cache is used instead.
    pub enabled: bool,

    /// Redis connection URL.
    pub url: String,

    /// Upper bound for a single cache round trip, in milliseconds.
    pub operation_timeout_ms: u64,

    /// TTL of `rates:current` in seconds.
    pub current_ttl_secs: u64,

    /// TTL of `rates:historical:{days}` in seconds.
    pub historical_ttl_secs: u64,
}

impl CacheConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "redis://localhost:6379/0".to_string(),
            operation_timeout_ms: 500,
            current_ttl_secs: 300,
            historical_ttl_secs: 3600,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before a probe is allowed.
    pub open_timeout_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout_secs: 30,
        }
    }
}

/// Query window configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RatesConfig {
    /// Business days returned by `historical` when none are requested.
    pub default_historical_days: u32,

    /// Business days averaged by `average` when none are requested.
    pub default_average_days: u32,

    /// Largest accepted `days` value.
    pub max_days: u32,

    /// Extra calendar days fetched to cover weekends and holidays.
    pub range_padding_days: i64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            default_historical_days: 10,
            default_average_days: 15,
            max_days: 90,
            range_padding_days: 10,
        }
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Mirror fetched rates into the store.
    pub enabled: bool,

    /// sqlx connection URL.
    pub url: String,

    /// Pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "sqlite://rates.db".to_string(),
            max_connections: 5,
        }
    }
}

/// HTTP boundary configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Prefix for versioned routes.
    pub api_prefix: String,

    /// Allowed CORS origins ("*" allows any).
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            api_prefix: "/api/v1".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
