//! In-process backend: routes the request surface into a [`LocalRepository`].
//!
//! Every failure is normalized at this boundary so callers get the same
//! [`ApiError`] shape a remote server would produce:
//!
//! - unmatched method and path: 404, `No local route for <METHOD> <path>`
//! - body that does not fit the route: 400
//! - repository errors: their own status, or 400 when they have none

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use shared::{ExpenseListQuery, ReportSummaryQuery};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{dummy_url, ApiError, ApiRequest, ApiResult, Backend, BackendMode};
use crate::backend::domain::{LocalRepository, RepoError};

pub struct LocalBackend {
    repository: LocalRepository,
    health_path: String,
}

/// A resolved local route
#[derive(Debug, Clone, PartialEq)]
enum Route {
    Health,
    ReportSummary,
    ListCategories,
    CreateCategory,
    UpdateCategory(String),
    DeleteCategory(String),
    ListExpenses,
    CreateExpense,
    UpdateExpense(String),
    DeleteExpense(String),
}

impl LocalBackend {
    pub fn new(repository: LocalRepository, health_path: impl Into<String>) -> Self {
        Self {
            repository,
            health_path: normalize_path(&health_path.into()),
        }
    }

    fn resolve(&self, method: &Method, path: &str) -> Option<Route> {
        if *method == Method::GET && path == self.health_path {
            return Some(Route::Health);
        }

        let segments: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(percent_decode)
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match (method.as_str(), segments.as_slice()) {
            ("GET", ["reports", "summary"]) => Route::ReportSummary,
            ("GET", ["categories"]) => Route::ListCategories,
            ("POST", ["categories"]) => Route::CreateCategory,
            ("PUT", ["categories", id]) => Route::UpdateCategory(id.to_string()),
            ("DELETE", ["categories", id]) => Route::DeleteCategory(id.to_string()),
            ("GET", ["expenses"]) => Route::ListExpenses,
            ("POST", ["expenses"]) => Route::CreateExpense,
            ("PUT", ["expenses", id]) => Route::UpdateExpense(id.to_string()),
            ("DELETE", ["expenses", id]) => Route::DeleteExpense(id.to_string()),
            _ => return None,
        };
        Some(route)
    }

    async fn dispatch(
        &self,
        route: Route,
        query: &HashMap<String, String>,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let repo = &self.repository;
        match route {
            Route::Health => to_json(repo.health()),
            Route::ReportSummary => {
                let query = ReportSummaryQuery {
                    from: query.get("from").cloned(),
                    to: query.get("to").cloned(),
                };
                to_json(repo.reports_summary(&query).await.map_err(repo_error)?)
            }
            Route::ListCategories => to_json(repo.list_categories().await),
            Route::CreateCategory => {
                let request = from_body(body)?;
                to_json(repo.create_category(request).await.map_err(repo_error)?)
            }
            Route::UpdateCategory(id) => {
                let request = from_body(body)?;
                to_json(repo.update_category(&id, request).await.map_err(repo_error)?)
            }
            Route::DeleteCategory(id) => {
                to_json(repo.delete_category(&id).await.map_err(repo_error)?)
            }
            Route::ListExpenses => {
                let query = ExpenseListQuery {
                    from: query.get("from").cloned(),
                    to: query.get("to").cloned(),
                    category_id: query.get("categoryId").cloned(),
                };
                to_json(repo.list_expenses(&query).await.map_err(repo_error)?)
            }
            Route::CreateExpense => {
                let request = from_body(body)?;
                to_json(repo.create_expense(request).await.map_err(repo_error)?)
            }
            Route::UpdateExpense(id) => {
                let request = from_body(body)?;
                to_json(repo.update_expense(&id, request).await.map_err(repo_error)?)
            }
            Route::DeleteExpense(id) => {
                to_json(repo.delete_expense(&id).await.map_err(repo_error)?)
            }
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let (path, query) = split_path(&request.path);

        let Some(route) = self.resolve(&request.method, &path) else {
            warn!("No local route for {} {}", request.method, path);
            return Err(failure(404, format!("No local route for {} {}", request.method, path)));
        };
        debug!("Local route {:?}", route);

        self.dispatch(route, &query, request.body).await
    }

    fn mode(&self) -> BackendMode {
        BackendMode::Local
    }
}

/// Error with a `{message}` body, the same shape the REST server answers with
fn failure(status: u16, message: impl Into<String>) -> ApiError {
    let message = message.into();
    let body = json!({ "message": message });
    ApiError::new(status, message).with_body(body)
}

fn repo_error(err: RepoError) -> ApiError {
    failure(err.status().unwrap_or(400), err.to_string())
}

fn from_body<T: DeserializeOwned>(body: Option<Value>) -> ApiResult<T> {
    serde_json::from_value(body.unwrap_or_else(|| json!({})))
        .map_err(|e| failure(400, format!("Invalid request body: {}", e)))
}

fn to_json<T: Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| failure(500, format!("Could not encode response: {}", e)))
}

/// Leading slash ensured, trailing slash dropped
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Split `path?query` into the normalized path and its non-empty, decoded
/// query parameters. A repeated key keeps its last value.
fn split_path(raw: &str) -> (String, HashMap<String, String>) {
    let (path, query) = match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    };

    let mut params = HashMap::new();
    if let Some(query) = query {
        if let Some(url) = dummy_url(&format!("/?{}", query)) {
            for (key, value) in url.query_pairs() {
                if !value.is_empty() {
                    params.insert(key.into_owned(), value.into_owned());
                }
            }
        }
    }

    (normalize_path(path), params)
}

/// Decode `%XX` escapes in one path segment; malformed escapes are kept as-is
fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}
