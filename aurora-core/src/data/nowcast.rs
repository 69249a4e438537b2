//! Near-real-time Kp/ap nowcast from GFZ Potsdam.
//!
//! Whitespace-delimited text, `#` comment lines, 28 fixed columns:
//!
//! ```text
//! YYYY MM DD days days_m BSR dB Kp1..Kp8 ap1..ap8 Ap SN F10.7obs F10.7adj D
//! ```
//!
//! Sub-indices not yet measured carry `-1`. Only complete days leave this
//! module.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{sub_index, GeomagneticRecord, PartialGeomagneticDay, Series, SUB_PERIODS};
use crate::error::DataError;
use crate::http::{HttpClient, HttpRequest};
use crate::validate;

pub const GFZ_NOWCAST_URL: &str = "https://kp.gfz.de/app/files/Kp_ap_Ap_SN_F107_nowcast.txt";

pub const NOWCAST_COLUMNS: usize = 28;

/// Smallest trailing window that still supports 3-day lags.
pub const MIN_WINDOW_DAYS: usize = 7;

const KP_FIRST: usize = 7;
const AP_FIRST: usize = KP_FIRST + SUB_PERIODS;
const DAILY_AP: usize = AP_FIRST + SUB_PERIODS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NowcastOptions {
    /// Trailing days taken from the feed before completeness filtering.
    pub window_days: usize,
    /// Drop rows dated on or after the `as_of` day before windowing.
    pub require_past_only: bool,
}

impl Default for NowcastOptions {
    fn default() -> Self {
        Self {
            window_days: MIN_WINDOW_DAYS,
            require_past_only: true,
        }
    }
}

impl NowcastOptions {
    pub fn validate(&self) -> Result<(), DataError> {
        if self.window_days < MIN_WINDOW_DAYS {
            return Err(DataError::InvalidConfig(format!(
                "nowcast window must be at least {MIN_WINDOW_DAYS} days, got {}",
                self.window_days
            )));
        }
        Ok(())
    }
}

pub struct NowcastLoader {
    client: HttpClient,
    url: String,
    options: NowcastOptions,
}

impl NowcastLoader {
    pub fn new(client: HttpClient, options: NowcastOptions) -> Result<Self, DataError> {
        options.validate()?;
        Ok(Self {
            client,
            url: GFZ_NOWCAST_URL.to_string(),
            options,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Complete days from the trailing window, ascending by date.
    ///
    /// `as_of` is "today" for the `require_past_only` cut.
    pub fn fetch(&self, as_of: NaiveDate) -> Result<Series<GeomagneticRecord>, DataError> {
        let body = self.client.get_text(&HttpRequest::get(&self.url))?;
        let days = parse_nowcast(&body);
        if days.is_empty() {
            return Err(DataError::EmptyUpstream);
        }
        let series = select_window(days, as_of, &self.options)?;
        info!(
            as_of = %as_of,
            window = self.options.window_days,
            complete = series.len(),
            "fetched kp nowcast"
        );
        Ok(series)
    }
}

/// Parse every well-formed data line, in feed order.
///
/// Comment lines, lines with fewer than 28 fields, lines whose date fields do
/// not form a calendar date, and lines with unparsable indices are skipped.
pub fn parse_nowcast(text: &str) -> Vec<PartialGeomagneticDay> {
    let mut days = Vec::new();
    let mut skipped = 0usize;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_line(trimmed) {
            Some(day) => days.push(day),
            None => {
                skipped += 1;
                debug!(line = trimmed, "skipping unparsable nowcast line");
            }
        }
    }

    if skipped > 0 {
        debug!(skipped, parsed = days.len(), "nowcast lines skipped");
    }
    days
}

fn parse_line(line: &str) -> Option<PartialGeomagneticDay> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < NOWCAST_COLUMNS {
        return None;
    }

    let year: i32 = fields[0].parse().ok()?;
    let month: u32 = fields[1].parse().ok()?;
    let day: u32 = fields[2].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let value = |i: usize| -> Option<Option<f32>> { fields[i].parse::<f64>().ok().map(sub_index) };

    let mut kp = [None; SUB_PERIODS];
    let mut ap_3h = [None; SUB_PERIODS];
    for p in 0..SUB_PERIODS {
        kp[p] = value(KP_FIRST + p)?;
        ap_3h[p] = value(AP_FIRST + p)?;
    }

    Some(PartialGeomagneticDay {
        date,
        kp,
        ap_3h,
        ap: value(DAILY_AP)?,
    })
}

/// Window the parsed feed and keep complete days.
///
/// Order of operations: sort by date (first occurrence wins on repeats),
/// optionally drop `date >= as_of`, keep the last `window_days` rows, then
/// drop incomplete days. The result may therefore be shorter than the window.
pub fn select_window(
    days: Vec<PartialGeomagneticDay>,
    as_of: NaiveDate,
    options: &NowcastOptions,
) -> Result<Series<GeomagneticRecord>, DataError> {
    options.validate()?;

    let (mut days, _) = validate::canonicalize(days);
    if options.require_past_only {
        days.retain(|d| d.date < as_of);
    }
    let skip = days.len().saturating_sub(options.window_days);
    let window = &days[skip..];

    let complete: Vec<GeomagneticRecord> = window
        .iter()
        .filter_map(|d| d.into_complete())
        .collect();

    let incomplete = window.len() - complete.len();
    if incomplete > 0 {
        debug!(incomplete, "nowcast days with sentinel values dropped");
    }

    if complete.is_empty() {
        return Err(DataError::NoCompleteDay);
    }
    Series::new(complete)
}
