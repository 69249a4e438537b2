//! Source fetchers: weather, historical Kp archive, Kp nowcast, solar wind.

pub mod kp_archive;
pub mod nowcast;
pub mod solar_wind;
pub mod weather;

pub use nowcast::{NowcastLoader, NowcastOptions};
pub use solar_wind::{aggregate_daily, SolarWindFetcher};
pub use weather::WeatherFetcher;
