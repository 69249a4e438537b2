//! Caching, retrying HTTP client shared by every remote fetcher.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::cache::{CachedResponse, ResponseCache};
use super::circuit_breaker::CircuitBreaker;
use super::retry::RetryPolicy;
use super::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::error::DataError;

/// Transport + optional response cache + retry policy + circuit breaker.
///
/// Cloning is cheap and clones share the cache and the breaker, so one trip
/// stops every fetcher built from the same client.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
    cache: Option<Arc<dyn ResponseCache>>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            cache: None,
            retry: RetryPolicy::default(),
            breaker: Arc::new(CircuitBreaker::default()),
        }
    }

    /// Live client over `reqwest` with default retry policy and no cache.
    pub fn live(timeout: Duration) -> Result<Self, DataError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new(timeout)?)))
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// GET `request` and return the response body.
    ///
    /// Served from the cache when an entry exists. Otherwise the request is
    /// attempted up to `max_retries + 1` times; only 2xx bodies are cached.
    pub fn get_text(&self, request: &HttpRequest) -> Result<String, DataError> {
        let signature = request.signature();

        if let Some(cache) = &self.cache {
            match cache.get(&signature) {
                Ok(Some(hit)) => {
                    debug!(url = %request, "cache hit");
                    return Ok(hit.body);
                }
                Ok(None) => debug!(url = %request, "cache miss"),
                Err(e) => warn!(url = %request, error = %e, "cache read failed, fetching"),
            }
        }

        let body = self.fetch_with_retry(request)?;

        if let Some(cache) = &self.cache {
            let entry = CachedResponse::new(request.to_string(), 200, body.clone());
            if let Err(e) = cache.put(&signature, &entry) {
                warn!(url = %request, error = %e, "cache write failed");
            }
        }

        Ok(body)
    }

    fn open_error(&self) -> DataError {
        DataError::CircuitOpen {
            remaining_secs: self.breaker.remaining_cooldown().as_secs(),
        }
    }

    fn fetch_with_retry(&self, request: &HttpRequest) -> Result<String, DataError> {
        if !self.breaker.is_allowed() {
            return Err(self.open_error());
        }

        let attempts = self.retry.max_retries + 1;
        let mut last_reason = String::from("no attempt made");

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay(attempt);
                warn!(
                    url = %request,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    reason = %last_reason,
                    "retrying"
                );
                std::thread::sleep(delay);
                if !self.breaker.is_allowed() {
                    return Err(self.open_error());
                }
            }

            debug!(url = %request, attempt, "GET");
            match self.transport.get(request) {
                Ok(resp) if resp.is_success() => {
                    self.breaker.record_success();
                    return Ok(resp.body);
                }
                Ok(resp) if resp.status == 403 => {
                    warn!(url = %request, "HTTP 403, tripping circuit breaker");
                    self.breaker.trip();
                    return Err(self.open_error());
                }
                Ok(resp) if RetryPolicy::is_retryable_status(resp.status) => {
                    last_reason = format!("HTTP {}", resp.status);
                }
                Ok(resp) => {
                    self.breaker.record_failure();
                    return Err(DataError::UpstreamUnavailable {
                        url: request.to_string(),
                        reason: format!("HTTP {}", resp.status),
                    });
                }
                Err(e) if e.is_retryable() => {
                    last_reason = e.to_string();
                }
                Err(e) => {
                    self.breaker.record_failure();
                    return Err(DataError::UpstreamUnavailable {
                        url: request.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.breaker.record_failure();
        Err(DataError::UpstreamUnavailable {
            url: request.to_string(),
            reason: format!("{last_reason} (gave up after {attempts} attempts)"),
        })
    }
}
