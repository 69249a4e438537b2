//! Domain types for the aurora feature pipeline

pub mod records;
pub mod series;

pub use records::{
    dynamic_pressure, sub_index, GeomagneticRecord, Location, PartialGeomagneticDay,
    SolarWindRecord, WeatherRecord, PRESSURE_FACTOR, SUB_PERIODS,
};
pub use series::{Observation, Series};
