//! Daily Kp aggregates and their lags.
//!
//! Unlike the solar engineer, rows with undefined lags are kept: the first
//! rows of the output carry `None` lags.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::window::shift;
use crate::domain::GeomagneticRecord;

pub const MAX_LAG: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeomagneticFeatureRow {
    pub record: GeomagneticRecord,
    pub kp_mean: f32,
    pub kp_max: f32,
    /// `[lag_1, lag_2, lag_3]`
    pub kp_mean_lag: [Option<f32>; MAX_LAG],
    pub kp_max_lag: [Option<f32>; MAX_LAG],
}

impl GeomagneticFeatureRow {
    pub fn date(&self) -> NaiveDate {
        self.record.date
    }

    pub fn has_all_lags(&self) -> bool {
        self.kp_mean_lag.iter().chain(&self.kp_max_lag).all(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeomagneticFeatures {
    pub rows: Vec<GeomagneticFeatureRow>,
    /// Rows with at least one undefined lag.
    pub incomplete_lag_rows: usize,
}

impl GeomagneticFeatures {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Stable-sort by date, then add `kp_mean`, `kp_max` and lags 1..=3 of both.
pub fn engineer_geomagnetic(records: &[GeomagneticRecord]) -> GeomagneticFeatures {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.date);

    let kp_mean: Vec<f32> = sorted.iter().map(GeomagneticRecord::kp_mean).collect();
    let kp_max: Vec<f32> = sorted.iter().map(GeomagneticRecord::kp_max).collect();
    let mean_lags: Vec<_> = (1..=MAX_LAG).map(|k| shift(&kp_mean, k)).collect();
    let max_lags: Vec<_> = (1..=MAX_LAG).map(|k| shift(&kp_max, k)).collect();

    let rows: Vec<GeomagneticFeatureRow> = sorted
        .into_iter()
        .enumerate()
        .map(|(i, record)| GeomagneticFeatureRow {
            record,
            kp_mean: kp_mean[i],
            kp_max: kp_max[i],
            kp_mean_lag: std::array::from_fn(|k| mean_lags[k][i]),
            kp_max_lag: std::array::from_fn(|k| max_lags[k][i]),
        })
        .collect();

    let incomplete_lag_rows = rows.iter().filter(|r| !r.has_all_lags()).count();
    if incomplete_lag_rows > 0 {
        warn!(
            rows = incomplete_lag_rows,
            total = rows.len(),
            "geomagnetic rows with undefined lags"
        );
    }

    GeomagneticFeatures {
        rows,
        incomplete_lag_rows,
    }
}
