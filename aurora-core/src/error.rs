//! Structured error types for data operations.
//!
//! Every fetcher, validator and engineer in this crate reports failures through
//! [`DataError`]. The variants are grouped the same way callers react to them:
//!
//! - upstream failures (`UpstreamUnavailable`, `CircuitOpen`, `MalformedResponse`)
//!   are propagated and never retried again by this crate
//! - static input failures (`NotFound`, `SchemaError`) are fatal and surface immediately
//! - "valid response, nothing usable" failures (`EmptyResult`, `EmptyUpstream`,
//!   `NoCompleteDay`, `JoinProducedEmpty`, ...) let the caller decide whether
//!   to fall back to stale data

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("upstream unavailable: {url}: {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("hard stop: circuit breaker open (retry in {remaining_secs}s)")]
    CircuitOpen { remaining_secs: u64 },

    #[error("malformed response from {provider}: {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("archive file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("archive is missing required columns: {}", .missing.join(", "))]
    SchemaError { missing: Vec<String> },

    #[error("no geomagnetic data found for date: {date}")]
    NoDataForDate { date: NaiveDate },

    #[error("geomagnetic record for {date} has missing sub-indices")]
    IncompleteDay { date: NaiveDate },

    #[error("{provider} returned no usable rows")]
    EmptyResult { provider: &'static str },

    #[error("nowcast feed contained no parsable rows")]
    EmptyUpstream,

    #[error("no complete geomagnetic day available in nowcast window")]
    NoCompleteDay,

    #[error("plasma/magnetic inner join produced no rows")]
    JoinProducedEmpty,

    #[error("not enough history: {required} rows needed, {available} available")]
    InsufficientHistory { required: usize, available: usize },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("table error: {0}")]
    Table(String),
}

impl DataError {
    /// True for failures caused by the remote side rather than by our inputs.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            DataError::UpstreamUnavailable { .. }
                | DataError::CircuitOpen { .. }
                | DataError::MalformedResponse { .. }
                | DataError::EmptyUpstream
        )
    }
}

impl From<polars::prelude::PolarsError> for DataError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        DataError::Table(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_missing_columns() {
        let err = DataError::SchemaError {
            missing: vec!["Ap".into(), "Kp3".into()],
        };
        assert_eq!(
            err.to_string(),
            "archive is missing required columns: Ap, Kp3"
        );
    }

    #[test]
    fn upstream_classification() {
        assert!(DataError::EmptyUpstream.is_upstream());
        assert!(DataError::CircuitOpen { remaining_secs: 5 }.is_upstream());
        assert!(!DataError::NoCompleteDay.is_upstream());
        assert!(!DataError::NotFound {
            path: PathBuf::from("kp.csv")
        }
        .is_upstream());
    }
}
