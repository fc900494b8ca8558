//! Fetch descriptors.
//!
//! A [`RequestRecord`] is the resolved configuration of one fetch, kept per
//! data ref so a stale entry can be refetched without the caller supplying
//! its parameters again. Records are written twice per fetch: once before the
//! preflight hook runs ([`FlightStage::Pre`]) and once with the merged result
//! ([`FlightStage::Final`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::value_objects::{CachePolicy, EntryKind, HttpMethod, RedirectPolicy};

/// Caller- or hook-supplied overrides. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CachePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_form_data: Option<bool>,
}

impl FetchSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn form_data(mut self, is_form_data: bool) -> Self {
        self.is_form_data = Some(is_form_data);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Layer `over` on top of `self`; set fields in `over` win.
    pub fn merge(self, over: FetchSettings) -> Self {
        Self {
            source: over.source.or(self.source),
            method: over.method.or(self.method),
            cache: over.cache.or(self.cache),
            redirect: over.redirect.or(self.redirect),
            headers: over.headers.or(self.headers),
            data: over.data.or(self.data),
            is_form_data: over.is_form_data.or(self.is_form_data),
        }
    }
}

/// Which side of the preflight hook a record was written on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStage {
    Pre,
    Final,
}

/// Resolved configuration of one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub data_ref: String,
    #[serde(rename = "dataSrc")]
    pub source: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub method: HttpMethod,
    pub cache: CachePolicy,
    pub redirect: RedirectPolicy,
    pub headers: BTreeMap<String, String>,
    pub data: Option<Map<String, Value>>,
    pub is_form_data: bool,
    pub stage: FlightStage,
    pub recorded_at: DateTime<Utc>,
}

impl RequestRecord {
    /// Defaults layered under `settings`. The source falls back to the key.
    pub fn resolve(
        data_ref: &str,
        source: Option<&str>,
        kind: EntryKind,
        settings: FetchSettings,
        stage: FlightStage,
        now: DateTime<Utc>,
    ) -> Self {
        let source = settings
            .source
            .or_else(|| source.filter(|s| !s.is_empty()).map(str::to_string))
            .unwrap_or_else(|| data_ref.to_string());

        Self {
            data_ref: data_ref.to_string(),
            source,
            kind,
            method: settings.method.unwrap_or_default(),
            cache: settings.cache.unwrap_or_default(),
            redirect: settings.redirect.unwrap_or_default(),
            headers: settings.headers.unwrap_or_default(),
            data: settings.data,
            is_form_data: settings.is_form_data.unwrap_or(false),
            stage,
            recorded_at: now,
        }
    }

    /// The record as caller settings, for replaying a fetch.
    pub fn as_settings(&self) -> FetchSettings {
        FetchSettings {
            source: Some(self.source.clone()),
            method: Some(self.method),
            cache: Some(self.cache),
            redirect: Some(self.redirect),
            headers: (!self.headers.is_empty()).then(|| self.headers.clone()),
            data: self.data.clone(),
            is_form_data: Some(self.is_form_data),
        }
    }

    fn has_payload(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Build the wire request. A payload promotes GET to POST.
    pub fn to_request(&self) -> FetchRequest {
        let (method, body) = match &self.data {
            Some(data) if self.has_payload() => {
                let method = match self.method {
                    HttpMethod::Get => HttpMethod::Post,
                    other => other,
                };
                let body = if self.is_form_data {
                    RequestBody::Form(
                        data.iter()
                            .map(|(k, v)| (k.clone(), crate::domain::display_value(v)))
                            .collect(),
                    )
                } else {
                    RequestBody::Json(Value::Object(data.clone()).to_string())
                };
                (method, body)
            }
            _ => (self.method, RequestBody::Empty),
        };

        FetchRequest {
            url: self.source.clone(),
            method,
            cache: self.cache,
            redirect: self.redirect,
            headers: self.headers.clone(),
            body,
        }
    }
}

/// Request body on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Json(String),
    Form(Vec<(String, String)>),
}

/// What the fetcher port is asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: HttpMethod,
    pub cache: CachePolicy,
    pub redirect: RedirectPolicy,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

/// What the fetcher port returns when the transport succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
