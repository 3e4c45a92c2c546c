//! HTTP backend: forwards every request to a remote service.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ApiError, ApiRequest, ApiResult, Backend, BackendMode};

pub struct RemoteBackend {
    client: Client,
    base_url: String,
    default_headers: BTreeMap<String, String>,
}

impl RemoteBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        default_headers: BTreeMap<String, String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("expense-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.strip_suffix('/').unwrap_or(base_url).to_string(),
            default_headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base plus path, with exactly one slash between them
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// JSON content type, then configured defaults, then per-call headers
    fn headers_for(&self, request: &ApiRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let layers = self
            .default_headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .chain(
                request
                    .headers
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            );
        for (name, value) in layers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Skipping invalid header '{}'", name),
            }
        }
        headers
    }
}

/// Decode a response body: JSON when the server says so (null if it lies),
/// otherwise the raw text as a JSON string
async fn read_body(response: Response) -> ApiResult<Value> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("application/json"))
        .unwrap_or(false);

    let text = response.text().await.map_err(ApiError::network)?;
    if is_json {
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    } else {
        Ok(Value::String(text))
    }
}

/// Message for a failed response: the body's `message` if it has one
fn failure_message(status: u16, body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed: {}", status))
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let url = self.url_for(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(self.headers_for(&request));
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} unreachable: {}", request.method, url, e);
            ApiError::network(e)
        })?;

        let status = response.status();
        let body = read_body(response).await?;
        if status.is_success() {
            Ok(body)
        } else {
            let status = status.as_u16();
            debug!("{} {} failed with {}", request.method, url, status);
            Err(ApiError::new(status, failure_message(status, &body)).with_body(body))
        }
    }

    fn mode(&self) -> BackendMode {
        BackendMode::Remote
    }
}
