//! Feature engineering over validated series.

pub mod geomagnetic;
pub mod solar;
pub mod window;

pub use geomagnetic::{engineer_geomagnetic, GeomagneticFeatureRow, GeomagneticFeatures};
pub use solar::{
    engineer_solar, EngineeringReport, SolarFeatureConfig, SolarFeatureRow, SolarFeatures,
};
