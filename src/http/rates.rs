use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;

use crate::http::request::{DaysQuery, RequestId};
use crate::http::response::{round_rate, ApiError};
use crate::http::server::AppState;
use crate::rates::{ExchangeRatePoint, RateError};

fn upstream_failure(err: RateError, request_id: &RequestId) -> ApiError {
    tracing::error!(request_id = %request_id.0, error = %err, "Rate request failed");
    ApiError::from_rate_error(&err, request_id.0.clone())
}

fn days_param(query: Result<Query<DaysQuery>, QueryRejection>, default: u32, request_id: &RequestId) -> Result<u32, ApiError> {
    match query {
        Ok(Query(q)) => Ok(q.days.unwrap_or(default)),
        Err(rejection) => Err(ApiError::validation(rejection.body_text(), request_id.0.clone())),
    }
}

pub async fn current_rate(
    State(state): State<AppState>,
    request_id: RequestId,
) -> Result<Json<ExchangeRatePoint>, ApiError> {
    match state.service.get_current().await {
        Ok(Some(point)) => Ok(Json(point)),
        Ok(None) => Err(ApiError::not_found("No current rate available", request_id.0)),
        Err(e) => Err(upstream_failure(e, &request_id)),
    }
}

pub async fn historical_rates(
    State(state): State<AppState>,
    request_id: RequestId,
    query: Result<Query<DaysQuery>, QueryRejection>,
) -> Result<Json<Vec<ExchangeRatePoint>>, ApiError> {
    let days = days_param(query, state.config.rates.default_historical_days, &request_id)?;

    match state.service.get_historical(days).await {
        Ok(points) if points.is_empty() => Err(ApiError::not_found("No historical rates available", request_id.0)),
        Ok(points) => Ok(Json(points)),
        Err(e @ RateError::InvalidDays { .. }) => Err(ApiError::validation(e.to_string(), request_id.0)),
        Err(e) => Err(upstream_failure(e, &request_id)),
    }
}

pub async fn average_rate(
    State(state): State<AppState>,
    request_id: RequestId,
    query: Result<Query<DaysQuery>, QueryRejection>,
) -> Result<Json<f64>, ApiError> {
    let days = days_param(query, state.config.rates.default_average_days, &request_id)?;

    match state.service.get_average(days).await {
        Ok(Some(average)) => Ok(Json(round_rate(average))),
        Ok(None) => Err(ApiError::not_found("No data to calculate average", request_id.0)),
        Err(e @ RateError::InvalidDays { .. }) => Err(ApiError::validation(e.to_string(), request_id.0)),
        Err(e) => Err(upstream_failure(e, &request_id)),
    }
}
