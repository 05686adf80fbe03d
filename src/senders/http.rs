//! HTTP sender backed by the blocking reqwest client.

use crate::config::WorkbenchConfig;
use crate::dispatcher::{SendError, Sender};
use crate::models::{HttpRequest, HttpResponse, KeyValue};
use log::debug;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Sends HTTP requests over the network.
///
/// Response headers are returned sorted by name, keeping the first value of
/// repeated headers.
#[derive(Debug, Clone)]
pub struct NativeHttpSender {
    client: reqwest::blocking::Client,
}

impl NativeHttpSender {
    /// Builds a sender whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, SendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::new("build HTTP client").with_source(e))?;
        Ok(Self { client })
    }

    /// Builds a sender using the configured HTTP timeout.
    pub fn from_config(config: &WorkbenchConfig) -> Result<Self, SendError> {
        Self::new(config.http_timeout())
    }
}

fn parse_url(raw: &str) -> Result<Url, SendError> {
    let url = Url::parse(raw)
        .map_err(|e| SendError::new(format!("invalid URL {:?}", raw)).with_source(e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SendError::new(format!("unsupported protocol: {}", other))),
    }
}

fn parse_method(raw: &str) -> Result<reqwest::Method, SendError> {
    if raw.trim().is_empty() {
        return Ok(reqwest::Method::GET);
    }
    reqwest::Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| SendError::new(format!("invalid HTTP method {:?}", raw)).with_source(e))
}

fn request_error(err: reqwest::Error) -> SendError {
    let message = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_builder() {
        "request build error"
    } else {
        "network error"
    };
    SendError::new(message).with_source(err)
}

impl Sender<HttpRequest, HttpResponse> for NativeHttpSender {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SendError> {
        let url = parse_url(&request.url)?;
        let method = parse_method(&request.method)?;
        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url);
        for header in &request.headers {
            builder = builder.header(header.key.as_str(), header.value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().map_err(request_error)?;
        let code = response.status().as_u16();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .or_insert_with(|| value.to_string());
            }
        }

        let body = response.text().map_err(request_error)?;

        Ok(HttpResponse {
            code,
            body,
            headers: headers
                .into_iter()
                .map(|(key, value)| KeyValue { key, value })
                .collect(),
        })
    }
}
