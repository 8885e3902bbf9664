//! Rate pipeline error types.

use std::time::Duration;
use thiserror::Error;

use crate::resilience::circuit_breaker::{BreakerError, FailureClass};

/// Errors surfaced by the upstream client and the rate service.
///
/// Cache and store failures are deliberately absent: they are logged and
/// degraded at the point they occur.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    /// Provider did not answer within the request timeout.
    #[error("upstream timed out after {} seconds", .0.as_secs())]
    UpstreamTimeout(Duration),

    /// Provider answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// Provider answered 2xx but the payload has no usable series.
    #[error("upstream response has an unexpected shape: {0}")]
    UpstreamBadShape(String),

    /// Connection refused, DNS failure, TLS error and similar.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Circuit breaker rejected the call without contacting the provider.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// A date or value in an otherwise valid payload could not be parsed.
    #[error("normalization failed: {0}")]
    Normalization(String),

    /// Requested window is outside the accepted range.
    #[error("days must be between 1 and {max}, got {days}")]
    InvalidDays { days: u32, max: u32 },
}

impl RateError {
    /// Non-2xx and bad-shape responses: the provider's "error" class.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            RateError::UpstreamStatus { .. } | RateError::UpstreamBadShape(_)
        )
    }
}

impl FailureClass for RateError {
    fn counts_as_failure(&self) -> bool {
        match self {
            RateError::UpstreamTimeout(_)
            | RateError::UpstreamStatus { .. }
            | RateError::UpstreamBadShape(_)
            | RateError::UpstreamUnavailable(_)
            | RateError::Normalization(_) => true,
            RateError::CircuitOpen | RateError::InvalidDays { .. } => false,
        }
    }
}

impl From<BreakerError<RateError>> for RateError {
    fn from(err: BreakerError<RateError>) -> Self {
        match err {
            BreakerError::Open => RateError::CircuitOpen,
            BreakerError::Inner(e) => e,
        }
    }
}

/// Result type for rate operations.
pub type RateResult<T> = Result<T, RateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RateError::UpstreamTimeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "upstream timed out after 10 seconds");

        let err = RateError::UpstreamStatus {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "upstream returned HTTP 500: boom");
    }

    #[test]
    fn test_failure_classes() {
        assert!(RateError::UpstreamUnavailable("refused".into()).counts_as_failure());
        assert!(RateError::UpstreamBadShape("no series".into()).counts_as_failure());
        assert!(!RateError::CircuitOpen.counts_as_failure());
        assert!(!RateError::InvalidDays { days: 0, max: 90 }.counts_as_failure());

        assert!(RateError::UpstreamBadShape("x".into()).is_upstream_error());
        assert!(!RateError::UpstreamTimeout(Duration::from_secs(1)).is_upstream_error());
    }

    #[test]
    fn test_breaker_error_conversion() {
        let open: RateError = BreakerError::<RateError>::Open.into();
        assert_eq!(open, RateError::CircuitOpen);

        let inner: RateError = BreakerError::Inner(RateError::Normalization("x".into())).into();
        assert_eq!(inner, RateError::Normalization("x".into()));
    }
}
