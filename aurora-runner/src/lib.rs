//! Aurora Runner: configuration, pipeline orchestration and export.
//!
//! This crate builds on `aurora-core` to provide:
//! - TOML pipeline configuration with defaults for every field
//! - Live or injected source wiring over one shared HTTP stack
//! - Daily and backfill runs (fetch → validate → engineer)
//! - CSV/Parquet export with a hashed JSON manifest

pub mod config;
pub mod export;
pub mod pipeline;
pub mod sources;

pub use config::{
    ArchiveConfig, ConfigError, HttpConfig, LocationConfig, OutputConfig, OutputFormat,
    PipelineConfig, SolarCadence, SolarConfig, WeatherConfig,
};
pub use export::{export, read_manifest, verify, Manifest, TableEntry, SCHEMA_VERSION};
pub use pipeline::{run_backfill, run_daily, PipelineOutput, RunError, RunKind};
pub use sources::Sources;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<ConfigError>();
        assert_sync::<ConfigError>();
    }

    #[test]
    fn pipeline_types_are_send_sync() {
        assert_send::<Sources>();
        assert_sync::<Sources>();
        assert_send::<PipelineOutput>();
        assert_sync::<PipelineOutput>();
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }

    #[test]
    fn manifest_is_send_sync() {
        assert_send::<Manifest>();
        assert_sync::<Manifest>();
    }
}
