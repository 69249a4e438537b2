//! Daily ground weather from the Open-Meteo historical archive.
//!
//! The archive answers with a `daily` block of parallel arrays: `time` as unix
//! epoch seconds and one array per requested variable, `null` where the
//! provider has no value. Any row with a missing measurement is dropped; the
//! fetcher never interpolates.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{Location, Series, WeatherRecord};
use crate::error::DataError;
use crate::http::{HttpClient, HttpRequest};

pub const OPEN_METEO_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Requested daily variables, in column order.
pub const DAILY_VARIABLES: [&str; 3] = [
    "cloud_cover_mean",
    "precipitation_sum",
    "sunshine_duration",
];

const PROVIDER: &str = "open-meteo";

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<i64>,
    cloud_cover_mean: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    sunshine_duration: Vec<Option<f64>>,
}

pub struct WeatherFetcher {
    client: HttpClient,
    base_url: String,
}

impl WeatherFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: OPEN_METEO_ARCHIVE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The archive request for a location and closed date range.
    pub fn request(&self, location: &Location, start: NaiveDate, end: NaiveDate) -> HttpRequest {
        HttpRequest::get(&self.base_url)
            .query("latitude", location.latitude)
            .query("longitude", location.longitude)
            .query("start_date", start.format("%Y-%m-%d"))
            .query("end_date", end.format("%Y-%m-%d"))
            .query("daily", DAILY_VARIABLES.join(","))
            .query("timeformat", "unixtime")
            .query("timezone", "GMT")
    }

    /// Daily weather for `[start, end]` at `location`.
    ///
    /// The result may cover a strict subset of the range when the provider
    /// has gaps, but it is never empty.
    pub fn fetch(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series<WeatherRecord>, DataError> {
        if start > end {
            return Err(DataError::InvalidDateRange { start, end });
        }
        // Re-check bounds: `Location` fields are public.
        let location = Location::new(location.latitude, location.longitude)?;

        let request = self.request(&location, start, end);
        let body = self.client.get_text(&request)?;
        let series = parse_archive_response(&body, start, end)?;

        info!(
            start = %start,
            end = %end,
            rows = series.len(),
            "fetched weather"
        );
        Ok(series)
    }
}

/// Decode an archive payload into weather rows within `[start, end]`.
pub fn parse_archive_response(
    body: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Series<WeatherRecord>, DataError> {
    let resp: ArchiveResponse =
        serde_json::from_str(body).map_err(|e| DataError::MalformedResponse {
            provider: PROVIDER,
            reason: e.to_string(),
        })?;

    let daily = resp.daily.ok_or_else(|| DataError::MalformedResponse {
        provider: PROVIDER,
        reason: "response has no `daily` block".into(),
    })?;

    let n = daily.time.len();
    if daily.cloud_cover_mean.len() != n
        || daily.precipitation_sum.len() != n
        || daily.sunshine_duration.len() != n
    {
        return Err(DataError::MalformedResponse {
            provider: PROVIDER,
            reason: format!(
                "daily arrays differ in length (time {n}, cloud {}, precipitation {}, sunshine {})",
                daily.cloud_cover_mean.len(),
                daily.precipitation_sum.len(),
                daily.sunshine_duration.len()
            ),
        });
    }

    let mut rows = Vec::with_capacity(n);
    let mut incomplete = 0usize;
    for i in 0..n {
        let ts = daily.time[i];
        let date = DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DataError::MalformedResponse {
                provider: PROVIDER,
                reason: format!("invalid timestamp: {ts}"),
            })?;

        if date < start || date > end {
            continue;
        }

        match (
            daily.cloud_cover_mean[i],
            daily.precipitation_sum[i],
            daily.sunshine_duration[i],
        ) {
            (Some(cloud), Some(precip), Some(sun)) => rows.push(WeatherRecord {
                date,
                cloud_cover_mean: cloud as f32,
                precipitation_sum: precip as f32,
                sunshine_duration: sun as f32,
            }),
            _ => incomplete += 1,
        }
    }

    if incomplete > 0 {
        debug!(incomplete, "dropped weather rows with missing measurements");
    }

    let series = Series::canonical(rows);
    if series.is_empty() {
        return Err(DataError::EmptyResult { provider: PROVIDER });
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    // 2024-01-01T00:00:00Z and the two following days.
    const BODY: &str = r#"{
        "latitude": 67.84,
        "longitude": 20.21,
        "daily": {
            "time": [1704067200, 1704153600, 1704240000],
            "cloud_cover_mean": [80.5, null, 12.0],
            "precipitation_sum": [1.2, 0.0, 0.0],
            "sunshine_duration": [0.0, 3600.0, 7200.5]
        }
    }"#;

    #[test]
    fn drops_rows_with_missing_values() {
        let series = parse_archive_response(BODY, day(1), day(3)).unwrap();
        let dates: Vec<_> = series.keys().collect();
        assert_eq!(dates, vec![day(1), day(3)]);
        assert_eq!(series.rows()[0].cloud_cover_mean, 80.5);
        assert_eq!(series.rows()[1].sunshine_duration, 7200.5);
    }

    #[test]
    fn discards_rows_outside_range() {
        let series = parse_archive_response(BODY, day(3), day(3)).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn unequal_arrays_are_malformed() {
        let body = r#"{"daily": {"time": [1704067200], "cloud_cover_mean": [], "precipitation_sum": [1.0], "sunshine_duration": [1.0]}}"#;
        assert!(matches!(
            parse_archive_response(body, day(1), day(1)),
            Err(DataError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn missing_daily_block_is_malformed() {
        assert!(matches!(
            parse_archive_response(r#"{"error": true}"#, day(1), day(1)),
            Err(DataError::MalformedResponse { .. })
        ));
        assert!(parse_archive_response("<html>", day(1), day(1)).is_err());
    }

    #[test]
    fn all_missing_is_empty_result() {
        let body = r#"{"daily": {"time": [1704067200], "cloud_cover_mean": [null], "precipitation_sum": [1.0], "sunshine_duration": [1.0]}}"#;
        assert!(matches!(
            parse_archive_response(body, day(1), day(1)),
            Err(DataError::EmptyResult { .. })
        ));
    }

    #[test]
    fn request_carries_every_parameter() {
        let client = HttpClient::new(std::sync::Arc::new(crate::http::ScriptedTransport::new()));
        let fetcher = WeatherFetcher::new(client);
        let loc = Location::new(67.85, 20.22).unwrap();
        let url = fetcher.request(&loc, day(1), day(7)).to_string();
        assert!(url.starts_with(OPEN_METEO_ARCHIVE_URL));
        assert!(url.contains("start_date=2024-01-01"));
        assert!(url.contains("end_date=2024-01-07"));
        assert!(url.contains("daily=cloud_cover_mean,precipitation_sum,sunshine_duration"));
        assert!(url.contains("timezone=GMT"));
    }

    #[test]
    fn inverted_range_is_rejected_before_any_request() {
        let transport = std::sync::Arc::new(crate::http::ScriptedTransport::new());
        let fetcher = WeatherFetcher::new(HttpClient::new(transport.clone()));
        let loc = Location::new(67.85, 20.22).unwrap();
        assert!(matches!(
            fetcher.fetch(&loc, day(5), day(1)),
            Err(DataError::InvalidDateRange { .. })
        ));
        assert_eq!(transport.calls(OPEN_METEO_ARCHIVE_URL), 0);
    }
}
