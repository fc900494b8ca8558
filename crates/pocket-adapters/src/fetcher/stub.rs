//! Canned-response fetcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use pocket_core::application::error::{ApplicationError, ApplicationResult};
use pocket_core::application::ports::Fetcher;
use pocket_core::domain::{FetchRequest, FetchResponse};

#[derive(Debug, Clone)]
enum Route {
    Respond(FetchResponse),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Entry {
    route: Route,
    delay: Option<Duration>,
}

/// Answers by exact URL and records every request it sees.
/// Unknown URLs answer 404.
#[derive(Debug, Clone, Default)]
pub struct StubFetcher {
    routes: Arc<Mutex<HashMap<String, Entry>>>,
    seen: Arc<Mutex<Vec<FetchRequest>>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(self, url: &str, route: Route, delay: Option<Duration>) -> Self {
        self.routes
            .lock()
            .insert(url.to_string(), Entry { route, delay });
        self
    }

    pub fn respond(self, url: &str, status: u16, body: &str) -> Self {
        self.insert(url, Route::Respond(FetchResponse::new(status, body)), None)
    }

    pub fn json(self, url: &str, value: Value) -> Self {
        self.insert(url, Route::Respond(FetchResponse::ok(value.to_string())), None)
    }

    pub fn html(self, url: &str, html: &str) -> Self {
        self.respond(url, 200, html)
    }

    /// Answer `url` after `delay`.
    pub fn slow(self, url: &str, delay: Duration, status: u16, body: &str) -> Self {
        self.insert(
            url,
            Route::Respond(FetchResponse::new(status, body)),
            Some(delay),
        )
    }

    /// Fail `url` at the transport level.
    pub fn fail(self, url: &str, reason: &str) -> Self {
        self.insert(url, Route::Fail(reason.to_string()), None)
    }

    /// Replace the answer for `url` on an existing stub.
    pub fn set_json(&self, url: &str, value: Value) {
        self.routes.lock().insert(
            url.to_string(),
            Entry {
                route: Route::Respond(FetchResponse::ok(value.to_string())),
                delay: None,
            },
        );
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.seen.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.seen.lock().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &FetchRequest) -> ApplicationResult<FetchResponse> {
        self.seen.lock().push(request.clone());
        let entry = self.routes.lock().get(&request.url).cloned();
        let Some(entry) = entry else {
            return Ok(FetchResponse::new(404, ""));
        };
        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        match entry.route {
            Route::Respond(response) => Ok(response),
            Route::Fail(reason) => Err(ApplicationError::Transport {
                url: request.url.clone(),
                reason,
            }),
        }
    }
}
