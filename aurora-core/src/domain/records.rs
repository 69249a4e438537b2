//! Base records produced by the source fetchers.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::series::Observation;
use crate::error::DataError;

/// Number of 3-hour sub-periods in a geomagnetic day.
pub const SUB_PERIODS: usize = 8;

/// Proton mass factor for dynamic pressure in nPa (density in cm^-3, speed in km/s).
pub const PRESSURE_FACTOR: f64 = 1.6726e-6;

/// Daily ground weather at the observing location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    /// Mean cloud cover, percent.
    pub cloud_cover_mean: f32,
    /// Daily precipitation, mm.
    pub precipitation_sum: f32,
    /// Sunshine duration, seconds.
    pub sunshine_duration: f32,
}

impl Observation for WeatherRecord {
    type Key = NaiveDate;

    fn key(&self) -> NaiveDate {
        self.date
    }
}

/// One day of planetary geomagnetic indices with every sub-index measured.
///
/// Construct from raw input through [`PartialGeomagneticDay::into_complete`];
/// a value of this type never carries the `-1` "not yet measured" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeomagneticRecord {
    pub date: NaiveDate,
    /// Kp for each 3-hour period (`kp1..kp8`).
    pub kp: [f32; SUB_PERIODS],
    /// ap for each 3-hour period (`ap1..ap8`).
    pub ap_3h: [f32; SUB_PERIODS],
    /// Daily Ap.
    pub ap: f32,
}

impl GeomagneticRecord {
    pub fn kp_mean(&self) -> f32 {
        let sum: f64 = self.kp.iter().map(|&v| v as f64).sum();
        (sum / SUB_PERIODS as f64) as f32
    }

    pub fn kp_max(&self) -> f32 {
        self.kp.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// All 17 sub-indices in column order (`kp1..kp8`, `ap1..ap8`, `ap`).
    pub fn indices(&self) -> impl Iterator<Item = f32> + '_ {
        self.kp
            .iter()
            .chain(self.ap_3h.iter())
            .copied()
            .chain(std::iter::once(self.ap))
    }
}

impl Observation for GeomagneticRecord {
    type Key = NaiveDate;

    fn key(&self) -> NaiveDate {
        self.date
    }
}

/// Geomagnetic day as read from a feed or archive, before completeness filtering.
///
/// Sentinels are already resolved: a sub-index that was negative or unparsable
/// in the source is `None` here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialGeomagneticDay {
    pub date: NaiveDate,
    pub kp: [Option<f32>; SUB_PERIODS],
    pub ap_3h: [Option<f32>; SUB_PERIODS],
    pub ap: Option<f32>,
}

impl PartialGeomagneticDay {
    /// A day is complete iff all 17 sub-indices are present.
    pub fn is_complete(&self) -> bool {
        self.kp.iter().all(Option::is_some)
            && self.ap_3h.iter().all(Option::is_some)
            && self.ap.is_some()
    }

    pub fn into_complete(self) -> Option<GeomagneticRecord> {
        let mut kp = [0.0_f32; SUB_PERIODS];
        let mut ap_3h = [0.0_f32; SUB_PERIODS];
        for i in 0..SUB_PERIODS {
            kp[i] = self.kp[i]?;
            ap_3h[i] = self.ap_3h[i]?;
        }
        Some(GeomagneticRecord {
            date: self.date,
            kp,
            ap_3h,
            ap: self.ap?,
        })
    }
}

impl Observation for PartialGeomagneticDay {
    type Key = NaiveDate;

    fn key(&self) -> NaiveDate {
        self.date
    }
}

/// Convert a raw sub-index to its optional form.
///
/// Negative values (the `-1` sentinel) and non-finite values mean "not measured".
pub fn sub_index(raw: f64) -> Option<f32> {
    if raw.is_finite() && raw >= 0.0 {
        Some(raw as f32)
    } else {
        None
    }
}

/// Interplanetary solar wind at L1, one row per feed timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarWindRecord {
    pub date: NaiveDateTime,
    /// Bulk speed, km/s.
    pub vsw: f32,
    /// Proton density, cm^-3.
    pub density: f32,
    /// IMF Bz (GSM), nT.
    pub bz: f32,
    /// Dynamic pressure, nPa. Derived, never fetched.
    pub pressure: f32,
}

impl SolarWindRecord {
    pub fn new(date: NaiveDateTime, vsw: f32, density: f32, bz: f32) -> Self {
        Self {
            date,
            vsw,
            density,
            bz,
            pressure: dynamic_pressure(density, vsw),
        }
    }
}

impl Observation for SolarWindRecord {
    type Key = NaiveDateTime;

    fn key(&self) -> NaiveDateTime {
        self.date
    }
}

/// `1.6726e-6 * density * vsw^2`, evaluated in f64 and rounded once to f32.
pub fn dynamic_pressure(density: f32, vsw: f32) -> f32 {
    let v = vsw as f64;
    (PRESSURE_FACTOR * density as f64 * v * v) as f32
}

/// Observing site for ground weather.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DataError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(DataError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}
