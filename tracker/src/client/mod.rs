//! # Dispatch Client
//!
//! One request contract (`get`, `post`, `put`, `delete`, `health`) over two
//! interchangeable backends:
//!
//! - [`remote::RemoteBackend`] forwards every call over HTTP
//! - [`local::LocalBackend`] routes every call into the in-process
//!   [`LocalRepository`](crate::backend::domain::LocalRepository)
//!
//! The backend is chosen once, when the client is built from configuration.
//! Callers only ever see decoded JSON or an [`ApiError`], whichever backend
//! answered.

pub mod local;
pub mod remote;


use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared::{
    Category, CreateCategoryRequest, CreateExpenseRequest, DeleteResponse, Expense,
    ExpenseListQuery, HealthResponse, ReportSummary, UpdateCategoryRequest, UpdateExpenseRequest,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::domain::LocalRepository;
use crate::backend::storage::KeyValueStore;
use crate::config::AppConfig;

use self::local::LocalBackend;
use self::remote::RemoteBackend;

/// Uniform failure shape of every client call.
///
/// `status` is the HTTP status for remote failures, the mapped status for
/// local failures, and `0` when the remote could not be reached at all.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub body: Option<Value>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn network(detail: impl fmt::Display) -> Self {
        Self::new(0, format!("Network error: {}", detail))
    }

    pub fn is_network(&self) -> bool {
        self.status == 0
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A single call on the request surface
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, optionally carrying a query string
    pub path: String,
    pub body: Option<Value>,
    /// Per-call headers; they win over configured defaults. Ignored locally.
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Local,
    Remote,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Local => write!(f, "local"),
            BackendMode::Remote => write!(f, "remote"),
        }
    }
}

/// Something that can answer a request on the request surface
#[async_trait]
pub trait Backend: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value>;

    fn mode(&self) -> BackendMode;
}

#[derive(Clone)]
pub struct DispatchClient {
    backend: Arc<dyn Backend>,
    health_path: String,
}

impl DispatchClient {
    pub fn new(backend: Arc<dyn Backend>, health_path: impl Into<String>) -> Self {
        Self {
            backend,
            health_path: health_path.into(),
        }
    }

    /// Pick the backend from configuration: remote when an API base is set,
    /// otherwise a local repository over `local_store`.
    pub async fn from_config(
        config: &AppConfig,
        local_store: Arc<dyn KeyValueStore>,
    ) -> anyhow::Result<Self> {
        let backend: Arc<dyn Backend> = match config.api_base.as_deref() {
            Some(base) => {
                info!("Using remote backend at {}", base);
                Arc::new(RemoteBackend::new(
                    base,
                    config.request_timeout(),
                    config.default_headers.clone(),
                )?)
            }
            None => {
                info!("No API base configured, using local backend");
                let repository = LocalRepository::new(local_store);
                repository.init().await;
                Arc::new(LocalBackend::new(repository, config.healthcheck_path.clone()))
            }
        };

        Ok(Self::new(backend, config.healthcheck_path.clone()))
    }

    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    pub async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        debug!("{} {} via {} backend", request.method, request.path, self.mode());
        self.backend.send(request).await
    }

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::GET, path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::POST, path).with_body(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::PUT, path).with_body(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }

    pub async fn health(&self) -> ApiResult<Value> {
        self.get(&self.health_path).await
    }

    // Typed helpers over the generic contract

    pub async fn health_status(&self) -> ApiResult<HealthResponse> {
        decode(self.health().await?)
    }

    pub async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        decode(self.get("/categories").await?)
    }

    pub async fn create_category(&self, request: &CreateCategoryRequest) -> ApiResult<Category> {
        decode(self.post("/categories", encode(request)?).await?)
    }

    pub async fn update_category(
        &self,
        id: &str,
        request: &UpdateCategoryRequest,
    ) -> ApiResult<Category> {
        decode(self.put(&item_path("/categories", id), encode(request)?).await?)
    }

    pub async fn delete_category(&self, id: &str) -> ApiResult<DeleteResponse> {
        decode(self.delete(&item_path("/categories", id)).await?)
    }

    pub async fn list_expenses(&self, query: &ExpenseListQuery) -> ApiResult<Vec<Expense>> {
        let path = with_query(
            "/expenses",
            &[
                ("from", query.from.as_deref()),
                ("to", query.to.as_deref()),
                ("categoryId", query.category_id.as_deref()),
            ],
        );
        decode(self.get(&path).await?)
    }

    pub async fn create_expense(&self, request: &CreateExpenseRequest) -> ApiResult<Expense> {
        decode(self.post("/expenses", encode(request)?).await?)
    }

    pub async fn update_expense(
        &self,
        id: &str,
        request: &UpdateExpenseRequest,
    ) -> ApiResult<Expense> {
        decode(self.put(&item_path("/expenses", id), encode(request)?).await?)
    }

    pub async fn delete_expense(&self, id: &str) -> ApiResult<DeleteResponse> {
        decode(self.delete(&item_path("/expenses", id)).await?)
    }

    pub async fn reports_summary(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> ApiResult<ReportSummary> {
        let path = with_query("/reports/summary", &[("from", from), ("to", to)]);
        decode(self.get(&path).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| {
        ApiError::new(500, format!("Unexpected response shape: {}", e)).with_body(value)
    })
}

fn encode<T: Serialize>(request: &T) -> ApiResult<Value> {
    serde_json::to_value(request)
        .map_err(|e| ApiError::new(400, format!("Could not encode request: {}", e)))
}

fn item_path(collection: &str, id: &str) -> String {
    match dummy_url(collection) {
        Some(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.push(id);
            }
            url.path().to_string()
        }
        None => format!("{}/{}", collection, id),
    }
}

/// Append the non-empty `params` to `path` as a percent-encoded query string
fn with_query(path: &str, params: &[(&str, Option<&str>)]) -> String {
    let present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (*key, v)))
        .collect();
    if present.is_empty() {
        return path.to_string();
    }

    let Some(mut url) = dummy_url(path) else {
        return path.to_string();
    };
    url.query_pairs_mut().extend_pairs(present);
    match url.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    }
}

/// Paths are resolved against a throwaway base so `Url` handles the encoding
pub(crate) fn dummy_url(path: &str) -> Option<reqwest::Url> {
    reqwest::Url::parse("http://local.invalid")
        .ok()?
        .join(path)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Canned(Value);

    #[async_trait]
    impl Backend for Canned {
        async fn send(&self, _request: ApiRequest) -> ApiResult<Value> {
            Ok(self.0.clone())
        }

        fn mode(&self) -> BackendMode {
            BackendMode::Local
        }
    }

    #[test]
    fn test_query_building() {
        assert_eq!(with_query("/expenses", &[("from", None), ("to", Some(""))]), "/expenses");
        assert_eq!(
            with_query(
                "/expenses",
                &[("from", Some("2024-01-01")), ("categoryId", Some("a b&c"))]
            ),
            "/expenses?from=2024-01-01&categoryId=a+b%26c"
        );
    }

    #[test]
    fn test_item_path_encodes_id() {
        assert_eq!(item_path("/expenses", "exp_1"), "/expenses/exp_1");
        assert_eq!(item_path("/categories", "a/b"), "/categories/a%2Fb");
    }

    #[test]
    fn test_network_error_shape() {
        let err = ApiError::network("connection refused");
        assert_eq!(err.status, 0);
        assert_eq!(err.message, "Network error: connection refused");
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_typed_decode_failure_is_500() {
        let client = DispatchClient::new(Arc::new(Canned(json!({"unexpected": true}))), "/health");

        let err = client.list_categories().await.unwrap_err();

        assert_eq!(err.status, 500);
        assert_eq!(err.body, Some(json!({"unexpected": true})));
    }
}
