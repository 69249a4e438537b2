//! Historical Kp/ap archive (finalised data, CSV).
//!
//! Expected columns: `YYYY, MM, DD, Kp1..Kp8, ap1..ap8, Ap`. Extra columns are
//! ignored. Numbers are coerced to `f32`; anything that does not coerce is
//! treated as missing.

use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{sub_index, GeomagneticRecord, PartialGeomagneticDay, Series, SUB_PERIODS};
use crate::error::DataError;

pub const REQUIRED_COLUMNS: [&str; 20] = [
    "YYYY", "MM", "DD", "Kp1", "Kp2", "Kp3", "Kp4", "Kp5", "Kp6", "Kp7", "Kp8", "ap1", "ap2",
    "ap3", "ap4", "ap5", "ap6", "ap7", "ap8", "Ap",
];

/// The Geomagnetic Record for `day`.
///
/// When several rows match, the first in file order wins. A matching row with
/// a missing or negative sub-index is an [`DataError::IncompleteDay`].
pub fn load_day(path: &Path, day: NaiveDate) -> Result<GeomagneticRecord, DataError> {
    let rows = read_archive(path)?;
    let row = rows
        .into_iter()
        .find(|r| r.date == day)
        .ok_or(DataError::NoDataForDate { date: day })?;
    row.into_complete()
        .ok_or(DataError::IncompleteDay { date: day })
}

/// Every complete day in `[start, end]`, ascending.
pub fn load_range(
    path: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Series<GeomagneticRecord>, DataError> {
    if start > end {
        return Err(DataError::InvalidDateRange { start, end });
    }

    let in_range: Vec<PartialGeomagneticDay> = read_archive(path)?
        .into_iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect();

    // Dedupe before the completeness filter so a later complete duplicate
    // never replaces an earlier incomplete row.
    let (days, duplicates) = crate::validate::canonicalize(in_range);
    if duplicates > 0 {
        debug!(duplicates, "archive has repeated days, keeping first");
    }

    let total = days.len();
    let complete: Vec<GeomagneticRecord> = days
        .into_iter()
        .filter_map(PartialGeomagneticDay::into_complete)
        .collect();
    if complete.len() < total {
        warn!(
            skipped = total - complete.len(),
            "archive days with missing sub-indices skipped"
        );
    }

    if complete.is_empty() {
        return Err(DataError::EmptyResult {
            provider: "kp archive",
        });
    }

    info!(start = %start, end = %end, days = complete.len(), "loaded kp archive range");
    Series::new(complete)
}

/// Read every row with a valid calendar date, in file order.
fn read_archive(path: &Path) -> Result<Vec<PartialGeomagneticDay>, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound {
            path: path.to_path_buf(),
        });
    }

    // Whole-file inference: quiet stretches of whole-number Kp would
    // otherwise type an index column as integer.
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .finish()?
        .collect()?;

    let schema = df.schema();
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !schema.contains(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(DataError::SchemaError { missing });
    }

    let years = int_column(&df, "YYYY")?;
    let months = int_column(&df, "MM")?;
    let days = int_column(&df, "DD")?;

    let mut kp_cols = Vec::with_capacity(SUB_PERIODS);
    let mut ap_cols = Vec::with_capacity(SUB_PERIODS);
    for i in 1..=SUB_PERIODS {
        kp_cols.push(float_column(&df, &format!("Kp{i}"))?);
        ap_cols.push(float_column(&df, &format!("ap{i}"))?);
    }
    let daily_ap = float_column(&df, "Ap")?;

    let mut rows = Vec::with_capacity(df.height());
    let mut invalid_dates = 0usize;
    for i in 0..df.height() {
        let Some(date) = calendar_date(years[i], months[i], days[i]) else {
            invalid_dates += 1;
            continue;
        };

        let mut kp = [None; SUB_PERIODS];
        let mut ap_3h = [None; SUB_PERIODS];
        for p in 0..SUB_PERIODS {
            kp[p] = kp_cols[p][i].and_then(sub_index);
            ap_3h[p] = ap_cols[p][i].and_then(sub_index);
        }

        rows.push(PartialGeomagneticDay {
            date,
            kp,
            ap_3h,
            ap: daily_ap[i].and_then(sub_index),
        });
    }

    if invalid_dates > 0 {
        debug!(invalid_dates, path = %path.display(), "skipped archive rows with invalid dates");
    }
    Ok(rows)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let col = df.column(name)?.cast(&DataType::Float64)?;
    Ok(col.f64()?.into_iter().collect())
}

fn int_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, DataError> {
    let col = df.column(name)?.cast(&DataType::Int64)?;
    Ok(col.i64()?.into_iter().collect())
}

fn calendar_date(year: Option<i64>, month: Option<i64>, day: Option<i64>) -> Option<NaiveDate> {
    let year = i32::try_from(year?).ok()?;
    let month = u32::try_from(month?).ok()?;
    let day = u32::try_from(day?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_date_rejects_impossible_days() {
        assert!(calendar_date(Some(2024), Some(2), Some(29)).is_some());
        assert!(calendar_date(Some(2023), Some(2), Some(29)).is_none());
        assert!(calendar_date(Some(2024), Some(13), Some(1)).is_none());
        assert!(calendar_date(Some(2024), Some(-1), Some(1)).is_none());
        assert!(calendar_date(None, Some(1), Some(1)).is_none());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_day(Path::new("/definitely/not/here.csv"), NaiveDate::MIN).unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }
}
