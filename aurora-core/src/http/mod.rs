//! HTTP layer: transport seam, response cache, retry policy, circuit breaker.

pub mod cache;
pub mod circuit_breaker;
pub mod client;
pub mod fake;
pub mod retry;
pub mod transport;

pub use cache::{CacheStats, CachedResponse, DiskCache, MemoryCache, ResponseCache};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use client::HttpClient;
pub use fake::ScriptedTransport;
pub use retry::RetryPolicy;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
