//! Real-time solar wind at L1 from NOAA SWPC.
//!
//! Two 7-day feeds, plasma and magnetic field, each a JSON array whose first
//! row is the header and whose cells are strings, numbers or `null`. They are
//! inner-joined on `time_tag`, forward-filled, cleaned of remaining gaps, and
//! turned into [`SolarWindRecord`]s with derived dynamic pressure.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{Series, SolarWindRecord};
use crate::error::DataError;
use crate::features::window::forward_fill;
use crate::http::{HttpClient, HttpRequest};

pub const SWPC_PLASMA_URL: &str =
    "https://services.swpc.noaa.gov/products/solar-wind/plasma-7-day.json";
pub const SWPC_MAG_URL: &str = "https://services.swpc.noaa.gov/products/solar-wind/mag-7-day.json";

const PROVIDER: &str = "swpc";

/// Header-indexed table of one SWPC feed.
struct FeedTable {
    header: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl FeedTable {
    fn parse(body: &str, feed: &str) -> Result<Self, DataError> {
        let mut rows: Vec<Vec<Value>> =
            serde_json::from_str(body).map_err(|e| DataError::MalformedResponse {
                provider: PROVIDER,
                reason: format!("{feed} feed: {e}"),
            })?;
        if rows.is_empty() {
            return Err(DataError::MalformedResponse {
                provider: PROVIDER,
                reason: format!("{feed} feed has no header row"),
            });
        }
        let header = rows
            .remove(0)
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        Ok(Self { header, rows })
    }

    fn column(&self, name: &str, feed: &str) -> Result<usize, DataError> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DataError::MalformedResponse {
                provider: PROVIDER,
                reason: format!("{feed} feed is missing column `{name}`"),
            })
    }
}

fn cell_f64(row: &[Value], idx: usize) -> Option<f64> {
    let value = match row.get(idx)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn cell_time(row: &[Value], idx: usize) -> Option<NaiveDateTime> {
    let s = row.get(idx)?.as_str()?.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Joined feed in column form, one entry per surviving `time_tag`.
#[derive(Debug, Default)]
struct Joined {
    time: Vec<NaiveDateTime>,
    density: Vec<Option<f64>>,
    speed: Vec<Option<f64>>,
    temperature: Vec<Option<f64>>,
    bz: Vec<Option<f64>>,
}

/// Join, fill and clean both feeds into a solar-wind series.
///
/// Rows dated after `run_date` are discarded. `ffill_limit` caps how many
/// consecutive gaps a value may be carried over (`None` fills every gap).
pub fn assemble(
    plasma_body: &str,
    mag_body: &str,
    run_date: NaiveDate,
    ffill_limit: Option<usize>,
) -> Result<Series<SolarWindRecord>, DataError> {
    let plasma = FeedTable::parse(plasma_body, "plasma")?;
    let mag = FeedTable::parse(mag_body, "mag")?;

    let p_time = plasma.column("time_tag", "plasma")?;
    let p_density = plasma.column("density", "plasma")?;
    let p_speed = plasma.column("speed", "plasma")?;
    let p_temp = plasma.column("temperature", "plasma")?;
    let m_time = mag.column("time_tag", "mag")?;
    let m_bz = mag.column("bz_gsm", "mag")?;

    let mut bz_by_time: HashMap<NaiveDateTime, Option<f64>> = HashMap::new();
    for row in &mag.rows {
        if let Some(t) = cell_time(row, m_time) {
            bz_by_time.entry(t).or_insert_with(|| cell_f64(row, m_bz));
        }
    }

    let mut joined = Joined::default();
    let mut seen = HashSet::new();
    for row in &plasma.rows {
        let Some(t) = cell_time(row, p_time) else {
            continue;
        };
        if !seen.insert(t) {
            continue;
        }
        let Some(bz) = bz_by_time.get(&t) else {
            continue;
        };
        joined.time.push(t);
        joined.density.push(cell_f64(row, p_density));
        joined.speed.push(cell_f64(row, p_speed));
        joined.temperature.push(cell_f64(row, p_temp));
        joined.bz.push(*bz);
    }

    if joined.time.is_empty() {
        return Err(DataError::JoinProducedEmpty);
    }
    let joined_rows = joined.time.len();

    let mut joined = sort_by_time(joined);
    forward_fill(&mut joined.density, ffill_limit);
    forward_fill(&mut joined.speed, ffill_limit);
    forward_fill(&mut joined.temperature, ffill_limit);
    forward_fill(&mut joined.bz, ffill_limit);

    let mut rows = Vec::with_capacity(joined_rows);
    let mut future = 0usize;
    for i in 0..joined.time.len() {
        // temperature only gates the row; it is not carried forward
        let (Some(density), Some(speed), Some(_), Some(bz)) = (
            joined.density[i],
            joined.speed[i],
            joined.temperature[i],
            joined.bz[i],
        ) else {
            continue;
        };
        let t = joined.time[i];
        if t.date() > run_date {
            future += 1;
            continue;
        }
        rows.push(SolarWindRecord::new(t, speed as f32, density as f32, bz as f32));
    }

    debug!(
        joined = joined_rows,
        kept = rows.len(),
        after_run_date = future,
        "assembled solar wind feeds"
    );

    if rows.is_empty() {
        return Err(DataError::EmptyResult { provider: PROVIDER });
    }
    Series::new(rows)
}

fn sort_by_time(joined: Joined) -> Joined {
    let mut order: Vec<usize> = (0..joined.time.len()).collect();
    order.sort_by_key(|&i| joined.time[i]);
    let pick = |col: &[Option<f64>]| order.iter().map(|&i| col[i]).collect::<Vec<_>>();
    Joined {
        time: order.iter().map(|&i| joined.time[i]).collect(),
        density: pick(&joined.density),
        speed: pick(&joined.speed),
        temperature: pick(&joined.temperature),
        bz: pick(&joined.bz),
    }
}

/// One row per UTC day, keyed at midnight.
///
/// `vsw`, `density` and `bz` are arithmetic means of the day's rows;
/// `pressure` is re-derived from the daily means rather than averaged.
pub fn aggregate_daily(series: &Series<SolarWindRecord>) -> Series<SolarWindRecord> {
    let mut out: Vec<SolarWindRecord> = Vec::new();
    let mut current: Option<(NaiveDate, f64, f64, f64, usize)> = None;

    let flush = |acc: (NaiveDate, f64, f64, f64, usize), out: &mut Vec<SolarWindRecord>| {
        let (day, vsw, density, bz, n) = acc;
        let n = n as f64;
        out.push(SolarWindRecord::new(
            day.and_time(NaiveTime::MIN),
            (vsw / n) as f32,
            (density / n) as f32,
            (bz / n) as f32,
        ));
    };

    for rec in series {
        let day = rec.date.date();
        match current.as_mut() {
            Some(acc) if acc.0 == day => {
                acc.1 += rec.vsw as f64;
                acc.2 += rec.density as f64;
                acc.3 += rec.bz as f64;
                acc.4 += 1;
            }
            _ => {
                if let Some(acc) = current.take() {
                    flush(acc, &mut out);
                }
                current = Some((day, rec.vsw as f64, rec.density as f64, rec.bz as f64, 1));
            }
        }
    }
    if let Some(acc) = current {
        flush(acc, &mut out);
    }

    Series::canonical(out)
}

pub struct SolarWindFetcher {
    client: HttpClient,
    plasma_url: String,
    mag_url: String,
    ffill_limit: Option<usize>,
}

impl SolarWindFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            plasma_url: SWPC_PLASMA_URL.to_string(),
            mag_url: SWPC_MAG_URL.to_string(),
            ffill_limit: None,
        }
    }

    pub fn with_urls(mut self, plasma_url: impl Into<String>, mag_url: impl Into<String>) -> Self {
        self.plasma_url = plasma_url.into();
        self.mag_url = mag_url.into();
        self
    }

    pub fn with_ffill_limit(mut self, limit: Option<usize>) -> Self {
        self.ffill_limit = limit;
        self
    }

    /// Both feeds joined and cleaned, with nothing dated after `run_date`.
    pub fn fetch(&self, run_date: NaiveDate) -> Result<Series<SolarWindRecord>, DataError> {
        let plasma = self.client.get_text(&HttpRequest::get(&self.plasma_url))?;
        let mag = self.client.get_text(&HttpRequest::get(&self.mag_url))?;
        let series = assemble(&plasma, &mag, run_date, self.ffill_limit)?;
        info!(run_date = %run_date, rows = series.len(), "fetched solar wind");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLASMA: &str = r#"[
        ["time_tag","density","speed","temperature"],
        ["2024-05-10 00:01:00.000","5.0","400.0","100000"],
        ["2024-05-10 00:00:00.000","4.0","420.0","90000"],
        ["2024-05-10 00:02:00.000",null,"410.0","95000"],
        ["2024-05-10 00:03:00.000","6.0","430.0","97000"]
    ]"#;

    const MAG: &str = r#"[
        ["time_tag","bx_gsm","by_gsm","bz_gsm","lon_gsm","lat_gsm","bt"],
        ["2024-05-10 00:00:00.000","1.0","2.0","-3.0","10","5","4.0"],
        ["2024-05-10 00:01:00.000","1.0","2.0","-1.0","10","5","4.0"],
        ["2024-05-10 00:02:00.000","1.0","2.0","2.0","10","5","4.0"]
    ]"#;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn inner_join_sorts_and_fills() {
        let s = assemble(PLASMA, MAG, run_date(), None).unwrap();
        // 00:03 has no magnetic row
        assert_eq!(s.len(), 3);
        let rows = s.rows();
        assert_eq!(rows[0].vsw, 420.0);
        assert_eq!(rows[0].bz, -3.0);
        // 00:02 density forward-filled from 00:01
        assert_eq!(rows[2].density, 5.0);
        assert_eq!(rows[2].bz, 2.0);
    }

    #[test]
    fn leading_gap_drops_row() {
        let plasma = r#"[["time_tag","density","speed","temperature"],
            ["2024-05-10 00:00:00.000",null,"420.0","1"],
            ["2024-05-10 00:01:00.000","5.0","400.0","1"]]"#;
        let s = assemble(plasma, MAG, run_date(), None).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.rows()[0].vsw, 400.0);
    }

    #[test]
    fn disjoint_feeds_are_join_produced_empty() {
        let plasma = r#"[["time_tag","density","speed","temperature"],
            ["2024-05-11 00:00:00.000","5.0","420.0","1"]]"#;
        assert!(matches!(
            assemble(plasma, MAG, run_date(), None),
            Err(DataError::JoinProducedEmpty)
        ));
    }

    #[test]
    fn rows_after_run_date_are_discarded() {
        let earlier = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert!(matches!(
            assemble(PLASMA, MAG, earlier, None),
            Err(DataError::EmptyResult { .. })
        ));
    }

    #[test]
    fn missing_column_is_malformed() {
        let plasma = r#"[["time_tag","density","temperature"]]"#;
        assert!(matches!(
            assemble(plasma, MAG, run_date(), None),
            Err(DataError::MalformedResponse { .. })
        ));
        assert!(assemble("[]", MAG, run_date(), None).is_err());
    }

    #[test]
    fn daily_aggregate_rederives_pressure() {
        let s = assemble(PLASMA, MAG, run_date(), None).unwrap();
        let daily = aggregate_daily(&s);
        assert_eq!(daily.len(), 1);
        let row = daily.rows()[0];
        assert_eq!(row.date, run_date().and_time(NaiveTime::MIN));
        assert!((row.vsw - 410.0).abs() < 1e-3);
        assert!((row.density - 14.0 / 3.0).abs() < 1e-4);
        assert_eq!(row.pressure, crate::domain::dynamic_pressure(row.density, row.vsw));
    }
}
