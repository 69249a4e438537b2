//! Pipeline configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration for Abisko with an on-disk HTTP cache under `.cache`.
//!
//! ```toml
//! [location]
//! latitude = 68.35
//! longitude = 18.82
//!
//! [http]
//! cache_dir = ".cache"
//! max_retries = 5
//! backoff_factor_secs = 0.2
//!
//! [nowcast]
//! window_days = 7
//! require_past_only = true
//!
//! [solar]
//! cadence = "native"
//!
//! [output]
//! dir = "output"
//! format = "csv"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use aurora_core::data::nowcast::MIN_WINDOW_DAYS;
use aurora_core::data::NowcastOptions;
use aurora_core::domain::Location;
use aurora_core::features::SolarFeatureConfig;
use aurora_core::http::RetryPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub location: LocationConfig,
    pub http: HttpConfig,
    pub weather: WeatherConfig,
    pub nowcast: NowcastOptions,
    pub archive: ArchiveConfig,
    pub solar: SolarConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        // Abisko Scientific Research Station
        Self {
            latitude: 68.35,
            longitude: 18.82,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// On-disk response cache. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Cache entry lifetime. `None` keeps entries forever.
    pub expire_after_secs: Option<u64>,
    pub max_retries: u32,
    pub backoff_factor_secs: f64,
    pub max_backoff_secs: f64,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cache_dir: Some(PathBuf::from(".cache")),
            expire_after_secs: None,
            max_retries: 5,
            backoff_factor_secs: 0.2,
            max_backoff_secs: 120.0,
            timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_factor: Duration::from_secs_f64(self.backoff_factor_secs),
            max_backoff: Duration::from_secs_f64(self.max_backoff_secs),
        }
    }

    pub fn expire_after(&self) -> Option<Duration> {
        self.expire_after_secs.map(Duration::from_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Days of weather before the run date included in a daily run.
    pub lookback_days: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self { lookback_days: 7 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Historical Kp CSV. Required for backfill.
    pub kp_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarCadence {
    /// Feed resolution (1-minute SWPC rows).
    #[default]
    Native,
    /// One averaged row per UTC day.
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarConfig {
    pub cadence: SolarCadence,
    pub short_window: usize,
    pub bz_min_window: usize,
    /// Longest run of gaps a value is carried over. `None` fills every gap.
    pub ffill_limit: Option<usize>,
}

impl Default for SolarConfig {
    fn default() -> Self {
        let features = SolarFeatureConfig::default();
        Self {
            cadence: SolarCadence::Native,
            short_window: features.short_window,
            bz_min_window: features.bz_min_window,
            ffill_limit: None,
        }
    }
}

impl SolarConfig {
    pub fn features(&self) -> SolarFeatureConfig {
        SolarFeatureConfig {
            short_window: self.short_window,
            bz_min_window: self.bz_min_window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            format: OutputFormat::Csv,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Location::new(self.location.latitude, self.location.longitude)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.nowcast.window_days < MIN_WINDOW_DAYS {
            return Err(ConfigError::Invalid(format!(
                "nowcast.window_days must be at least {MIN_WINDOW_DAYS}, got {}",
                self.nowcast.window_days
            )));
        }
        if self.solar.short_window == 0 || self.solar.bz_min_window == 0 {
            return Err(ConfigError::Invalid(
                "solar windows must be positive".into(),
            ));
        }
        if self.solar.ffill_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "solar.ffill_limit must be positive when set".into(),
            ));
        }

        let http = &self.http;
        let finite_non_negative = |v: f64| v.is_finite() && v >= 0.0;
        if !finite_non_negative(http.backoff_factor_secs)
            || !finite_non_negative(http.max_backoff_secs)
        {
            return Err(ConfigError::Invalid(
                "http backoff values must be finite and non-negative".into(),
            ));
        }
        if http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn location(&self) -> Result<Location, ConfigError> {
        Location::new(self.location.latitude, self.location.longitude)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
