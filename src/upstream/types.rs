//! Provider wire types and normalization.
//!
//! Raw shapes live only here; everything downstream sees `NormalizedSeries`.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::rates::error::{RateError, RateResult};
use crate::rates::types::{ExchangeRatePoint, NormalizedSeries};

/// Value the provider publishes for dates without a rate.
pub const NO_DATA_SENTINEL: &str = "N/E";

/// Date format of `fecha`.
pub const RAW_DATE_FORMAT: &str = "%d/%m/%Y";

/// Top-level provider response.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesResponse {
    pub bmx: SeriesContainer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesContainer {
    #[serde(default)]
    pub series: Vec<RawSeries>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSeries {
    #[serde(rename = "idSerie", default)]
    pub id_serie: String,
    #[serde(default)]
    pub titulo: String,
    /// Absent when the requested range has no publications.
    #[serde(default)]
    pub datos: Vec<RawPoint>,
}

/// One raw observation: `fecha` is "DD/MM/YYYY", `dato` a decimal or "N/E".
#[derive(Debug, Clone, Deserialize)]
pub struct RawPoint {
    pub fecha: String,
    pub dato: String,
}

impl RawPoint {
    /// `Ok(None)` for the no-data sentinel.
    pub fn normalize(&self, source: &str) -> RateResult<Option<ExchangeRatePoint>> {
        let value = self.dato.trim();
        if value == NO_DATA_SENTINEL {
            return Ok(None);
        }

        let date = parse_raw_date(&self.fecha)?;
        let rate: f64 = value.parse().map_err(|_| {
            RateError::Normalization(format!("value '{}' for {} is not numeric", self.dato, self.fecha))
        })?;

        ExchangeRatePoint::new(date, rate, source).map(Some)
    }
}

/// Parse "DD/MM/YYYY".
pub fn parse_raw_date(raw: &str) -> RateResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), RAW_DATE_FORMAT)
        .map_err(|e| RateError::Normalization(format!("invalid date '{}': {}", raw, e)))
}

impl SeriesResponse {
    /// Normalize the first series. A response without any series is a bad
    /// shape; a series without points normalizes to an empty series.
    pub fn normalize(&self, source: &str) -> RateResult<NormalizedSeries> {
        let raw = self
            .bmx
            .series
            .first()
            .ok_or_else(|| RateError::UpstreamBadShape("response contains no series".into()))?;

        let mut points = Vec::with_capacity(raw.datos.len());
        for point in &raw.datos {
            if let Some(p) = point.normalize(source)? {
                points.push(p);
            }
        }

        Ok(NormalizedSeries {
            series_id: raw.id_serie.clone(),
            title: raw.titulo.clone(),
            points,
        })
    }

    pub fn has_series(&self) -> bool {
        !self.bmx.series.is_empty()
    }

    /// Number of raw observations, sentinels included.
    pub fn raw_point_count(&self) -> usize {
        self.bmx.series.first().map(|s| s.datos.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SeriesResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalizes_points_and_drops_sentinel() {
        let response = parse(
            r#"{"bmx":{"series":[{"idSerie":"SF43718","titulo":"Tipo de cambio",
                "datos":[{"fecha":"16/07/2025","dato":"18.2450"},
                         {"fecha":"17/07/2025","dato":"N/E"},
                         {"fecha":"18/07/2025","dato":"18.7200"}]}]}}"#,
        );

        let series = response.normalize("banxico").unwrap();
        assert_eq!(series.series_id, "SF43718");
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].date, NaiveDate::from_ymd_opt(2025, 7, 16).unwrap());
        assert_eq!(series.points[1].rate, 18.72);
        assert_eq!(series.points[1].source, "banxico");
        assert_eq!(response.raw_point_count(), 3);
    }

    #[test]
    fn test_missing_series_is_bad_shape() {
        let response = parse(r#"{"bmx":{"series":[]}}"#);
        assert!(!response.has_series());
        assert!(matches!(
            response.normalize("banxico"),
            Err(RateError::UpstreamBadShape(_))
        ));
    }

    #[test]
    fn test_missing_datos_is_empty_series() {
        let response = parse(r#"{"bmx":{"series":[{"idSerie":"SF43718","titulo":"t"}]}}"#);
        assert!(response.normalize("banxico").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_values_fail_instead_of_skipping() {
        let bad_date = parse(
            r#"{"bmx":{"series":[{"idSerie":"S","titulo":"t","datos":[{"fecha":"2025-07-18","dato":"18.1"}]}]}}"#,
        );
        assert!(matches!(bad_date.normalize("banxico"), Err(RateError::Normalization(_))));

        let bad_value = parse(
            r#"{"bmx":{"series":[{"idSerie":"S","titulo":"t","datos":[{"fecha":"18/07/2025","dato":"abc"}]}]}}"#,
        );
        assert!(matches!(bad_value.normalize("banxico"), Err(RateError::Normalization(_))));

        let zero = parse(
            r#"{"bmx":{"series":[{"idSerie":"S","titulo":"t","datos":[{"fecha":"18/07/2025","dato":"0"}]}]}}"#,
        );
        assert!(matches!(zero.normalize("banxico"), Err(RateError::Normalization(_))));
    }

    #[test]
    fn test_comma_values_are_not_numeric() {
        for dato in ["18,72", "1,2,3", "1,234.5"] {
            let point = RawPoint {
                fecha: "18/07/2025".into(),
                dato: dato.into(),
            };
            assert!(
                matches!(point.normalize("banxico"), Err(RateError::Normalization(_))),
                "{} should not normalize",
                dato
            );
        }
    }
}
