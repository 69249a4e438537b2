//! Fetch → validate → engineer sequencing.
//!
//! Two entry points:
//! - `run_daily()`: recent weather, the Kp nowcast and the 7-day solar-wind
//!   feeds, as of one run date. Used by the scheduled job.
//! - `run_backfill()`: weather plus the historical Kp archive over a closed
//!   date range. No solar wind: the live feeds only reach back a week.
//!
//! A run either produces every table it promises or fails; there are no
//! partial outputs.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use aurora_core::data::{aggregate_daily, kp_archive};
use aurora_core::domain::{Series, WeatherRecord};
use aurora_core::features::{
    engineer_geomagnetic, engineer_solar, GeomagneticFeatures, SolarFeatures,
};
use aurora_core::table::FeatureTable;
use aurora_core::validate::{validate_geomagnetic, validate_solar_wind, validate_weather};
use aurora_core::DataError;

use crate::config::{ConfigError, PipelineConfig, SolarCadence};
use crate::sources::Sources;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("backfill needs an archive file ([archive] kp_path)")]
    MissingArchive,
}

impl RunError {
    /// True when the failure came from a remote provider rather than local input.
    pub fn is_upstream(&self) -> bool {
        matches!(self, RunError::Data(e) if e.is_upstream())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Daily,
    Backfill,
}

/// Every table produced by one run, handed by value to export.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub kind: RunKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub weather: Series<WeatherRecord>,
    /// Absent for backfills.
    pub solar: Option<SolarFeatures>,
    pub geomagnetic: GeomagneticFeatures,
}

impl PipelineOutput {
    /// Tables in export order.
    pub fn tables(&self) -> Vec<&dyn FeatureTable> {
        let mut tables: Vec<&dyn FeatureTable> = vec![&self.weather];
        if let Some(solar) = &self.solar {
            tables.push(solar);
        }
        tables.push(&self.geomagnetic);
        tables
    }
}

pub fn run_daily(
    config: &PipelineConfig,
    sources: &Sources,
    run_date: NaiveDate,
) -> Result<PipelineOutput, RunError> {
    let location = config.location()?;
    let start = run_date
        .checked_sub_days(Days::new(u64::from(config.weather.lookback_days)))
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "weather.lookback_days {} reaches before the calendar",
                config.weather.lookback_days
            ))
        })?;

    let weather = sources.weather.fetch(&location, start, run_date)?;
    validate_weather(&weather, start, run_date)?;

    let nowcast = sources.nowcast.fetch(run_date)?;
    validate_geomagnetic(&nowcast)?;
    let geomagnetic = engineer_geomagnetic(nowcast.rows());

    let mut solar_wind = sources.solar_wind.fetch(run_date)?;
    if config.solar.cadence == SolarCadence::Daily {
        solar_wind = aggregate_daily(&solar_wind);
    }
    validate_solar_wind(&solar_wind)?;

    let feature_config = config.solar.features();
    let solar = engineer_solar(&solar_wind, &feature_config)?;
    if solar.is_empty() {
        return Err(DataError::InsufficientHistory {
            required: feature_config.warm_up() + 1,
            available: solar_wind.len(),
        }
        .into());
    }

    info!(
        run_date = %run_date,
        weather = weather.len(),
        solar = solar.len(),
        geomagnetic = geomagnetic.len(),
        "daily run complete"
    );

    Ok(PipelineOutput {
        kind: RunKind::Daily,
        start,
        end: run_date,
        weather,
        solar: Some(solar),
        geomagnetic,
    })
}

pub fn run_backfill(
    config: &PipelineConfig,
    sources: &Sources,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PipelineOutput, RunError> {
    if start > end {
        return Err(DataError::InvalidDateRange { start, end }.into());
    }
    let archive = sources.kp_archive.as_deref().ok_or(RunError::MissingArchive)?;
    let location = config.location()?;

    let weather = sources.weather.fetch(&location, start, end)?;
    validate_weather(&weather, start, end)?;

    let kp = kp_archive::load_range(archive, start, end)?;
    validate_geomagnetic(&kp)?;
    let geomagnetic = engineer_geomagnetic(kp.rows());

    info!(
        start = %start,
        end = %end,
        weather = weather.len(),
        geomagnetic = geomagnetic.len(),
        "backfill complete"
    );

    Ok(PipelineOutput {
        kind: RunKind::Backfill,
        start,
        end,
        weather,
        solar: None,
        geomagnetic,
    })
}
