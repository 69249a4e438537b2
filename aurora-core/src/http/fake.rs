//! Scripted in-process transport for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

type Outcome = Result<HttpResponse, TransportError>;

#[derive(Default)]
struct Route {
    script: VecDeque<Outcome>,
    calls: usize,
}

/// Replays scripted outcomes per URL (query string ignored).
///
/// Each call pops the next outcome; the last one repeats forever. A URL with
/// no script answers with a connection error.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `url` with `response`.
    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.script(url, vec![Ok(response)]);
    }

    pub fn script(&self, url: &str, outcomes: Vec<Outcome>) {
        let mut routes = self.routes.lock().unwrap_or_else(|p| p.into_inner());
        let route = routes.entry(url.to_string()).or_default();
        route.script = outcomes.into();
    }

    /// Number of requests made to `url` so far.
    pub fn calls(&self, url: &str) -> usize {
        let routes = self.routes.lock().unwrap_or_else(|p| p.into_inner());
        routes.get(url).map_or(0, |r| r.calls)
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut routes = self.routes.lock().unwrap_or_else(|p| p.into_inner());
        let route = routes.entry(request.url().to_string()).or_default();
        route.calls += 1;
        let outcome = if route.script.len() > 1 {
            route.script.pop_front()
        } else {
            route.script.front().cloned()
        };
        outcome.unwrap_or_else(|| {
            Err(TransportError::Connect(format!(
                "no scripted response for {}",
                request.url()
            )))
        })
    }
}
