//! Schema and temporal checks applied to fetched series before feature engineering.
//!
//! Each validator returns the first problem it finds as
//! [`DataError::Validation`]; a series that passes is safe to feed to the
//! engineers unchanged.

use std::fmt::Display;

use chrono::NaiveDate;

use crate::domain::{
    dynamic_pressure, GeomagneticRecord, Observation, Series, SolarWindRecord, WeatherRecord,
};
use crate::error::DataError;

/// Highest value the Kp scale can take.
pub const KP_MAX: f32 = 9.0;

/// Relative tolerance for the pressure identity (f32 rounding of inputs and output).
const PRESSURE_REL_TOL: f64 = 1e-4;

/// Stable-sort rows by key and drop duplicate keys, keeping the first occurrence.
///
/// Returns the canonical rows and the number of duplicates removed.
pub fn canonicalize<T: Observation>(mut rows: Vec<T>) -> (Vec<T>, usize) {
    rows.sort_by_key(|r| r.key());
    let before = rows.len();
    rows.dedup_by_key(|r| r.key());
    let removed = before - rows.len();
    (rows, removed)
}

/// Fail on the first key that is not greater than its predecessor.
pub fn require_strictly_increasing<K: Ord + Display>(
    keys: impl IntoIterator<Item = K>,
) -> Result<(), DataError> {
    let mut prev: Option<K> = None;
    for (index, key) in keys.into_iter().enumerate() {
        if let Some(p) = &prev {
            if key <= *p {
                return Err(DataError::Validation(format!(
                    "key {key} at row {index} does not follow {p}"
                )));
            }
        }
        prev = Some(key);
    }
    Ok(())
}

fn require_finite(what: &str, key: impl Display, value: f32) -> Result<(), DataError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DataError::Validation(format!(
            "{what} at {key} is not finite ({value})"
        )))
    }
}

/// Weather rows lie in `[start, end]` and every measurement is finite and in range.
pub fn validate_weather(
    series: &Series<WeatherRecord>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), DataError> {
    for rec in series {
        if rec.date < start || rec.date > end {
            return Err(DataError::Validation(format!(
                "weather row {} outside requested range {start}..={end}",
                rec.date
            )));
        }
        require_finite("cloud_cover_mean", rec.date, rec.cloud_cover_mean)?;
        require_finite("precipitation_sum", rec.date, rec.precipitation_sum)?;
        require_finite("sunshine_duration", rec.date, rec.sunshine_duration)?;

        if !(0.0..=100.0).contains(&rec.cloud_cover_mean) {
            return Err(DataError::Validation(format!(
                "cloud_cover_mean {} at {} outside [0, 100]",
                rec.cloud_cover_mean, rec.date
            )));
        }
        if rec.precipitation_sum < 0.0 {
            return Err(DataError::Validation(format!(
                "negative precipitation_sum at {}",
                rec.date
            )));
        }
        if rec.sunshine_duration < 0.0 {
            return Err(DataError::Validation(format!(
                "negative sunshine_duration at {}",
                rec.date
            )));
        }
    }
    Ok(())
}

/// Solar-wind rows are ordered, physical, and carry a consistent dynamic pressure.
pub fn validate_solar_wind(series: &Series<SolarWindRecord>) -> Result<(), DataError> {
    require_strictly_increasing(series.keys())?;
    for rec in series {
        require_finite("vsw", rec.date, rec.vsw)?;
        require_finite("density", rec.date, rec.density)?;
        require_finite("bz", rec.date, rec.bz)?;
        require_finite("pressure", rec.date, rec.pressure)?;

        if rec.density < 0.0 {
            return Err(DataError::Validation(format!(
                "negative density at {}",
                rec.date
            )));
        }
        if rec.vsw <= 0.0 {
            return Err(DataError::Validation(format!(
                "non-positive vsw {} at {}",
                rec.vsw, rec.date
            )));
        }

        let expected = dynamic_pressure(rec.density, rec.vsw) as f64;
        let diff = (rec.pressure as f64 - expected).abs();
        if diff > PRESSURE_REL_TOL * expected.abs().max(1e-6) {
            return Err(DataError::Validation(format!(
                "pressure {} at {} does not match density/vsw (expected {expected})",
                rec.pressure, rec.date
            )));
        }
    }
    Ok(())
}

/// Geomagnetic rows are ordered and non-negative, with every Kp at most `KP_MAX`.
pub fn validate_geomagnetic(series: &Series<GeomagneticRecord>) -> Result<(), DataError> {
    require_strictly_increasing(series.keys())?;
    for rec in series {
        for value in rec.indices() {
            require_finite("geomagnetic index", rec.date, value)?;
            if value < 0.0 {
                return Err(DataError::Validation(format!(
                    "negative geomagnetic index at {}",
                    rec.date
                )));
            }
        }
        if let Some(kp) = rec.kp.iter().find(|&&kp| kp > KP_MAX) {
            return Err(DataError::Validation(format!(
                "Kp {kp} at {} exceeds {KP_MAX}",
                rec.date
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn weather(d: u32, cloud: f32) -> WeatherRecord {
        WeatherRecord {
            date: day(d),
            cloud_cover_mean: cloud,
            precipitation_sum: 0.4,
            sunshine_duration: 3600.0,
        }
    }

    fn geo(d: u32, kp: f32) -> GeomagneticRecord {
        GeomagneticRecord {
            date: day(d),
            kp: [kp; 8],
            ap_3h: [4.0; 8],
            ap: 4.0,
        }
    }

    #[test]
    fn canonicalize_counts_duplicates() {
        let rows = vec![weather(3, 10.0), weather(1, 20.0), weather(3, 99.0)];
        let (rows, removed) = canonicalize(rows);
        assert_eq!(removed, 1);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cloud_cover_mean, 10.0);
    }

    #[test]
    fn strictly_increasing() {
        assert!(require_strictly_increasing([1, 2, 3]).is_ok());
        assert!(require_strictly_increasing(Vec::<i32>::new()).is_ok());
        assert!(require_strictly_increasing([1, 1]).is_err());
        assert!(require_strictly_increasing([2, 1]).is_err());
    }

    #[test]
    fn weather_bounds() {
        let ok = Series::new(vec![weather(1, 0.0), weather(2, 100.0)]).unwrap();
        assert!(validate_weather(&ok, day(1), day(2)).is_ok());

        let cloudy = Series::new(vec![weather(1, 101.0)]).unwrap();
        assert!(validate_weather(&cloudy, day(1), day(2)).is_err());

        let outside = Series::new(vec![weather(5, 50.0)]).unwrap();
        assert!(validate_weather(&outside, day(1), day(2)).is_err());

        let mut wet = weather(1, 50.0);
        wet.precipitation_sum = -0.1;
        assert!(validate_weather(&Series::new(vec![wet]).unwrap(), day(1), day(1)).is_err());
    }

    #[test]
    fn solar_wind_pressure_identity() {
        let good = Series::new(vec![
            SolarWindRecord::new(ts(1, 0), 420.0, 4.2, -1.5),
            SolarWindRecord::new(ts(1, 1), 510.0, 7.9, 3.0),
        ])
        .unwrap();
        assert!(validate_solar_wind(&good).is_ok());

        let mut tampered = SolarWindRecord::new(ts(1, 0), 420.0, 4.2, -1.5);
        tampered.pressure *= 2.0;
        assert!(validate_solar_wind(&Series::new(vec![tampered]).unwrap()).is_err());
    }

    #[test]
    fn solar_wind_physical_bounds() {
        let still = SolarWindRecord::new(ts(1, 0), 0.0, 4.2, -1.5);
        assert!(validate_solar_wind(&Series::new(vec![still]).unwrap()).is_err());

        let mut negative = SolarWindRecord::new(ts(1, 0), 400.0, 1.0, 0.0);
        negative.density = -1.0;
        assert!(validate_solar_wind(&Series::new(vec![negative]).unwrap()).is_err());
    }

    #[test]
    fn geomagnetic_range() {
        let ok = Series::new(vec![geo(1, 0.0), geo(2, 9.0)]).unwrap();
        assert!(validate_geomagnetic(&ok).is_ok());
        assert!(validate_geomagnetic(&Series::new(vec![geo(1, 9.333)]).unwrap()).is_err());
        assert!(validate_geomagnetic(&Series::new(vec![geo(1, -1.0)]).unwrap()).is_err());
    }
}
