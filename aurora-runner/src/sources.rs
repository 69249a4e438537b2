//! Source fetchers wired to a shared HTTP stack.
//!
//! Weather goes through the response cache. The nowcast and solar-wind feeds
//! are rolling "latest" documents at fixed URLs, so caching them would pin a
//! stale copy forever; they share the retry policy and circuit breaker only.

use std::path::PathBuf;
use std::sync::Arc;

use aurora_core::data::{NowcastLoader, SolarWindFetcher, WeatherFetcher};
use aurora_core::http::{
    CircuitBreaker, DiskCache, HttpClient, HttpTransport, ReqwestTransport, ResponseCache,
};
use aurora_core::DataError;
use tracing::debug;

use crate::config::PipelineConfig;

pub struct Sources {
    pub weather: WeatherFetcher,
    pub nowcast: NowcastLoader,
    pub solar_wind: SolarWindFetcher,
    pub kp_archive: Option<PathBuf>,
}

impl Sources {
    /// Live sources: reqwest transport plus the configured disk cache.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, DataError> {
        let transport = Arc::new(ReqwestTransport::new(config.http.timeout())?);
        let cache: Option<Arc<dyn ResponseCache>> = match &config.http.cache_dir {
            Some(dir) => Some(Arc::new(
                DiskCache::open(dir)?.with_expiry(config.http.expire_after()),
            )),
            None => None,
        };
        Self::with_transport(config, transport, cache)
    }

    /// Sources over an injected transport and cache.
    pub fn with_transport(
        config: &PipelineConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Option<Arc<dyn ResponseCache>>,
    ) -> Result<Self, DataError> {
        let breaker = Arc::new(CircuitBreaker::default());
        let feeds = HttpClient::new(transport)
            .with_retry(config.http.retry_policy())
            .with_breaker(breaker);

        let weather_client = match cache {
            Some(cache) => feeds.clone().with_cache(cache),
            None => feeds.clone(),
        };
        debug!(cached = weather_client.is_cached(), "building sources");

        Ok(Self {
            weather: WeatherFetcher::new(weather_client),
            nowcast: NowcastLoader::new(feeds.clone(), config.nowcast)?,
            solar_wind: SolarWindFetcher::new(feeds).with_ffill_limit(config.solar.ffill_limit),
            kp_archive: config.archive.kp_path.clone(),
        })
    }
}
