//! Structured logging.
//!
//! Installs a `tracing` subscriber filtered by `RUST_LOG` (falling back to the
//! configured level) with either a human-readable or a JSON formatter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter: `RUST_LOG` wins, otherwise `<level>` for this crate and
/// the HTTP tracing layer.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "rates_service={level},rates_cli={level},tower_http={level}",
            level = config.log_level
        )
        .into()
    })
}

/// Initialize the global subscriber. Safe to call once per process.
pub fn init(config: &ObservabilityConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = if config.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}
