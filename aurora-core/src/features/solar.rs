//! Lagged, rolling and interaction features over a solar-wind series.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::window::{rolling_max, rolling_mean, rolling_min, shift, warm_up};
use crate::domain::{Series, SolarWindRecord};
use crate::error::DataError;

/// Lags 1..=MAX_LAG are produced for `vsw`, `bz` and `pressure`.
pub const MAX_LAG: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarFeatureConfig {
    /// Window for the `bz`/`vsw` means and the `pressure` max.
    pub short_window: usize,
    /// Window for the `bz` minimum.
    pub bz_min_window: usize,
}

impl Default for SolarFeatureConfig {
    fn default() -> Self {
        Self {
            short_window: 3,
            bz_min_window: 7,
        }
    }
}

impl SolarFeatureConfig {
    pub fn validate(&self) -> Result<(), DataError> {
        if self.short_window == 0 || self.bz_min_window == 0 {
            return Err(DataError::InvalidConfig(format!(
                "solar feature windows must be positive (short {}, bz min {})",
                self.short_window, self.bz_min_window
            )));
        }
        Ok(())
    }

    /// Rows at the head of the series that cannot have every feature defined.
    pub fn warm_up(&self) -> usize {
        warm_up(MAX_LAG, &[self.short_window, self.bz_min_window])
    }

    pub fn bz_mean_column(&self) -> String {
        format!("bz_{}d_mean", self.short_window)
    }

    pub fn bz_min_column(&self) -> String {
        format!("bz_{}d_min", self.bz_min_window)
    }

    pub fn vsw_mean_column(&self) -> String {
        format!("vsw_{}d_mean", self.short_window)
    }

    pub fn pressure_max_column(&self) -> String {
        format!("pressure_{}d_max", self.short_window)
    }
}

/// Base record plus every derived feature. Every value is defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarFeatureRow {
    /// Dense zero-based position in the engineered table.
    pub index: usize,
    pub date: NaiveDateTime,
    pub vsw: f32,
    pub density: f32,
    pub bz: f32,
    pub pressure: f32,
    /// `[lag1, lag2, lag3]`
    pub vsw_lag: [f32; MAX_LAG],
    pub bz_lag: [f32; MAX_LAG],
    pub pressure_lag: [f32; MAX_LAG],
    pub bz_mean: f32,
    pub bz_min: f32,
    pub vsw_mean: f32,
    pub pressure_max: f32,
    pub vbz: f32,
    pub vbz_neg: f32,
}

/// Row accounting for one engineering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineeringReport {
    pub input_rows: usize,
    pub dropped: usize,
    pub retained: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarFeatures {
    pub config: SolarFeatureConfig,
    pub rows: Vec<SolarFeatureRow>,
    pub report: EngineeringReport,
}

impl SolarFeatures {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Engineer solar features; rows with any undefined feature are dropped.
///
/// Dropping is reported, not an error: an input shorter than the warm-up
/// yields an empty table.
pub fn engineer_solar(
    series: &Series<SolarWindRecord>,
    config: &SolarFeatureConfig,
) -> Result<SolarFeatures, DataError> {
    config.validate()?;

    let rows = series.rows();
    let vsw: Vec<f32> = rows.iter().map(|r| r.vsw).collect();
    let bz: Vec<f32> = rows.iter().map(|r| r.bz).collect();
    let pressure: Vec<f32> = rows.iter().map(|r| r.pressure).collect();

    let lags = |col: &[f32]| -> Vec<Vec<Option<f32>>> {
        (1..=MAX_LAG).map(|k| shift(col, k)).collect()
    };
    let vsw_lags = lags(&vsw);
    let bz_lags = lags(&bz);
    let pressure_lags = lags(&pressure);

    let bz_mean = rolling_mean(&bz, config.short_window);
    let bz_min = rolling_min(&bz, config.bz_min_window);
    let vsw_mean = rolling_mean(&vsw, config.short_window);
    let pressure_max = rolling_max(&pressure, config.short_window);

    let mut out = Vec::with_capacity(rows.len().saturating_sub(config.warm_up()));
    for (i, rec) in rows.iter().enumerate() {
        let (Some(vsw_lag), Some(bz_lag), Some(pressure_lag)) = (
            at_lags(&vsw_lags, i),
            at_lags(&bz_lags, i),
            at_lags(&pressure_lags, i),
        ) else {
            continue;
        };
        let (Some(bz_mean), Some(bz_min), Some(vsw_mean), Some(pressure_max)) =
            (bz_mean[i], bz_min[i], vsw_mean[i], pressure_max[i])
        else {
            continue;
        };

        let v = rec.vsw as f64;
        out.push(SolarFeatureRow {
            index: out.len(),
            date: rec.date,
            vsw: rec.vsw,
            density: rec.density,
            bz: rec.bz,
            pressure: rec.pressure,
            vsw_lag,
            bz_lag,
            pressure_lag,
            bz_mean,
            bz_min,
            vsw_mean,
            pressure_max,
            vbz: (v * rec.bz as f64) as f32,
            vbz_neg: (v * (rec.bz as f64).min(0.0)) as f32,
        });
    }

    let report = EngineeringReport {
        input_rows: rows.len(),
        dropped: rows.len() - out.len(),
        retained: out.len(),
    };
    info!(
        dropped = report.dropped,
        retained = report.retained,
        "solar feature engineering"
    );

    Ok(SolarFeatures {
        config: *config,
        rows: out,
        report,
    })
}

fn at_lags(lags: &[Vec<Option<f32>>], i: usize) -> Option<[f32; MAX_LAG]> {
    let mut out = [0.0; MAX_LAG];
    for (slot, col) in out.iter_mut().zip(lags) {
        *slot = col[i]?;
    }
    Some(out)
}
