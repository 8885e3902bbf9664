//! Exchange rate domain types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::rates::error::{RateError, RateResult};

/// One published rate for a calendar date.
///
/// Decoding goes through [`ExchangeRatePoint::new`], so a cached or stored
/// payload with a non-positive rate fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PointRepr")]
pub struct ExchangeRatePoint {
    /// Wall-clock date the rate applies to.
    pub date: NaiveDate,
    /// Pesos per dollar. Always > 0.
    pub rate: f64,
    /// Provider identifier, e.g. "banxico".
    pub source: String,
}

impl ExchangeRatePoint {
    /// Build a point, rejecting non-positive or non-finite rates.
    pub fn new(date: NaiveDate, rate: f64, source: impl Into<String>) -> RateResult<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(RateError::Normalization(format!(
                "rate for {} must be positive, got {}",
                date, rate
            )));
        }
        Ok(Self {
            date,
            rate,
            source: source.into(),
        })
    }
}

#[derive(Deserialize)]
struct PointRepr {
    date: NaiveDate,
    rate: f64,
    source: String,
}

impl TryFrom<PointRepr> for ExchangeRatePoint {
    type Error = RateError;

    fn try_from(repr: PointRepr) -> RateResult<Self> {
        Self::new(repr.date, repr.rate, repr.source)
    }
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `[end - days, end]`.
    pub fn ending_at(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }
}

/// A provider series after normalization, in provider order.
///
/// This is the only shape that leaves the upstream client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSeries {
    pub series_id: String,
    pub title: String,
    pub points: Vec<ExchangeRatePoint>,
}

impl NormalizedSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recent point by date.
    pub fn latest(&self) -> Option<&ExchangeRatePoint> {
        self.points.iter().max_by_key(|p| p.date)
    }
}
