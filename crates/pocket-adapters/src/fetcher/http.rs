//! Network fetcher using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, redirect, Client, Method};
use tracing::{debug, instrument, warn};
use url::Url;

use pocket_core::application::error::{ApplicationError, ApplicationResult};
use pocket_core::application::ports::Fetcher;
use pocket_core::domain::{
    CachePolicy, FetchRequest, FetchResponse, HttpMethod, RedirectPolicy, RequestBody,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches over HTTP(S). Relative sources resolve against the base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    following: Client,
    manual: Client,
    base: Option<Url>,
}

fn transport(url: &str, reason: impl ToString) -> ApplicationError {
    ApplicationError::Transport {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

impl HttpFetcher {
    pub fn new() -> ApplicationResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> ApplicationResult<Self> {
        let build = |policy: redirect::Policy| {
            Client::builder()
                .timeout(timeout)
                .redirect(policy)
                .user_agent(concat!("pocket/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| transport("<client>", e))
        };
        Ok(Self {
            following: build(redirect::Policy::limited(10))?,
            manual: build(redirect::Policy::none())?,
            base: None,
        })
    }

    /// Resolve relative sources against `base`.
    pub fn with_base_url(mut self, base: &str) -> ApplicationResult<Self> {
        self.base = Some(Url::parse(base).map_err(|e| transport(base, e))?);
        Ok(self)
    }

    fn resolve(&self, source: &str) -> ApplicationResult<Url> {
        match Url::parse(source) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base
                .as_ref()
                .ok_or_else(|| transport(source, "relative source without a base URL"))?
                .join(source)
                .map_err(|e| transport(source, e)),
            Err(e) => Err(transport(source, e)),
        }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn cache_control(policy: CachePolicy) -> Option<&'static str> {
    match policy {
        CachePolicy::NoCache | CachePolicy::Reload => Some("no-cache"),
        CachePolicy::ForceCache | CachePolicy::OnlyIfCached => Some("max-stale"),
        CachePolicy::Default => None,
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(url = %request.url, method = %request.method))]
    async fn fetch(&self, request: &FetchRequest) -> ApplicationResult<FetchResponse> {
        let url = self.resolve(&request.url)?;
        let client = match request.redirect {
            RedirectPolicy::Follow => &self.following,
            RedirectPolicy::Manual | RedirectPolicy::Error => &self.manual,
        };

        let mut builder = client.request(method(request.method), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(value) = cache_control(request.cache) {
            builder = builder.header(header::CACHE_CONTROL, value);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(json.clone()),
            RequestBody::Form(pairs) => builder.form(pairs),
        };

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "request failed");
            transport(url.as_str(), e)
        })?;

        let status = response.status();
        if status.is_redirection() && request.redirect == RedirectPolicy::Error {
            return Err(transport(url.as_str(), format!("redirect refused ({status})")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport(url.as_str(), e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(FetchResponse::new(status.as_u16(), body))
    }
}
