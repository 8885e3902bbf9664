//! Error responses.
//!
//! # Responsibilities
//! - Map `RateError` onto HTTP status codes
//! - Render the JSON error envelope with the request's correlation ID
//!
//! # Design Decisions
//! - Provider timeouts result in 504 Gateway Timeout
//! - An open circuit and an unreachable provider are both 503
//! - Anything the provider sent that we could not use is 502

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::rates::RateError;

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub correlation_id: String,
    pub timestamp: f64,
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// An error ready to be returned from a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
    pub correlation_id: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            correlation_id: correlation_id.into(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, correlation_id)
    }

    pub fn validation(details: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "Invalid request parameters", correlation_id)
            .with_details(details)
    }

    pub fn from_rate_error(err: &RateError, correlation_id: impl Into<String>) -> Self {
        let status = status_for(err);
        let message = match err {
            RateError::CircuitOpen | RateError::UpstreamUnavailable(_) => "External API unavailable",
            RateError::UpstreamTimeout(_) => "External API timed out",
            RateError::UpstreamStatus { .. } | RateError::UpstreamBadShape(_) => "External API error",
            RateError::Normalization(_) => "External API returned invalid data",
            RateError::InvalidDays { .. } => "Invalid request parameters",
        };
        Self::new(status, message, correlation_id).with_details(err.to_string())
    }
}

/// HTTP status for a rate pipeline error.
pub fn status_for(err: &RateError) -> StatusCode {
    match err {
        RateError::CircuitOpen | RateError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RateError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        RateError::UpstreamStatus { .. } | RateError::UpstreamBadShape(_) | RateError::Normalization(_) => {
            StatusCode::BAD_GATEWAY
        }
        RateError::InvalidDays { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.status.as_u16(),
                message: self.message,
                correlation_id: self.correlation_id,
                timestamp,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Round to 4 decimal places for display.
pub fn round_rate(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
