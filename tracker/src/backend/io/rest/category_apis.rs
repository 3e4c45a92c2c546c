//! # REST API for Categories

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use shared::{CreateCategoryRequest, UpdateCategoryRequest};
use tracing::info;

use super::{error_response, rejection_response};
use crate::backend::AppState;

/// Create a router for category related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", put(update_category).delete(delete_category))
}

pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/categories");
    Json(state.repository.list_categories().await)
}

pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /api/categories - request: {:?}", request);

    match state.repository.create_category(request).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("PUT /api/categories/{} - request: {:?}", id, request);

    match state.repository.update_category(&id, request).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Delete a category; its expenses move to `misc`
pub async fn delete_category(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!("DELETE /api/categories/{}", id);

    match state.repository.delete_category(&id).await {
        Ok(deleted) => (StatusCode::OK, Json(deleted)).into_response(),
        Err(e) => error_response(e),
    }
}
