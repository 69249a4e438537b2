//! Aurora Core: data acquisition and feature engineering for aurora forecasting.
//!
//! This crate contains the pipeline core:
//! - Domain records and the ordered `Series` container
//! - HTTP layer with response cache, retry policy and circuit breaker
//! - Source fetchers: Open-Meteo weather, GFZ Kp nowcast, Kp archive, SWPC solar wind
//! - Validators for schema and temporal completeness
//! - Solar and geomagnetic feature engineers
//! - Tabular hand-off as `polars::DataFrame`

pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod http;
pub mod table;
pub mod validate;

pub use error::DataError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed between stages is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::WeatherRecord>();
        require_sync::<domain::WeatherRecord>();
        require_send::<domain::GeomagneticRecord>();
        require_sync::<domain::GeomagneticRecord>();
        require_send::<domain::SolarWindRecord>();
        require_sync::<domain::SolarWindRecord>();
        require_send::<domain::Series<domain::SolarWindRecord>>();
        require_sync::<domain::Series<domain::SolarWindRecord>>();

        require_send::<features::SolarFeatures>();
        require_sync::<features::SolarFeatures>();
        require_send::<features::GeomagneticFeatures>();
        require_sync::<features::GeomagneticFeatures>();

        require_send::<http::HttpClient>();
        require_sync::<http::HttpClient>();
        require_send::<http::DiskCache>();
        require_sync::<http::DiskCache>();
        require_send::<http::CircuitBreaker>();
        require_sync::<http::CircuitBreaker>();

        require_send::<data::WeatherFetcher>();
        require_sync::<data::WeatherFetcher>();
        require_send::<data::NowcastLoader>();
        require_sync::<data::NowcastLoader>();
        require_send::<data::SolarWindFetcher>();
        require_sync::<data::SolarWindFetcher>();

        require_send::<DataError>();
        require_sync::<DataError>();
    }
}
