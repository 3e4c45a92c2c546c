//! # REST API Interface Layer
//!
//! HTTP endpoints over the local repository. Every error leaves this layer as
//! a JSON `{"message": ...}` body:
//!
//! | Repository error | Status |
//! |---|---|
//! | Validation | 400 |
//! | NotFound | 404 |
//! | StorageUnavailable | 503 |
//!
//! A request body that is not valid JSON for the route is a 400 as well.

pub mod category_apis;
pub mod expense_apis;
pub mod health_apis;
pub mod report_apis;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::ErrorBody;
use tracing::{error, warn};

use crate::backend::domain::RepoError;

/// Status a repository error is answered with
pub fn status_for(err: &RepoError) -> StatusCode {
    match err {
        RepoError::Validation(_) => StatusCode::BAD_REQUEST,
        RepoError::NotFound(_) => StatusCode::NOT_FOUND,
        RepoError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn error_response(err: RepoError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected ({}): {}", status.as_u16(), err);
    }
    (
        status,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
        .into_response()
}

pub fn rejection_response(rejection: JsonRejection) -> Response {
    warn!("Malformed request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: format!("Invalid request body: {}", rejection.body_text()),
        }),
    )
        .into_response()
}
