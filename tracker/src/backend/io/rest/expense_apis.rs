//! # REST API for Expenses
//!
//! List, create, update and delete expenses. Listing accepts the optional
//! `from`, `to` and `categoryId` query bounds.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use shared::{CreateExpenseRequest, ExpenseListQuery, UpdateExpenseRequest};
use tracing::info;

use super::{error_response, rejection_response};
use crate::backend::AppState;

/// Create a router for expense related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/:id", put(update_expense).delete(delete_expense))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ExpenseListQuery>,
) -> Response {
    info!("GET /api/expenses - query: {:?}", query);

    match state.repository.list_expenses(&query).await {
        Ok(expenses) => (StatusCode::OK, Json(expenses)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_expense(
    State(state): State<AppState>,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /api/expenses - request: {:?}", request);

    match state.repository.create_expense(request).await {
        Ok(expense) => (StatusCode::CREATED, Json(expense)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateExpenseRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("PUT /api/expenses/{} - request: {:?}", id, request);

    match state.repository.update_expense(&id, request).await {
        Ok(expense) => (StatusCode::OK, Json(expense)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_expense(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!("DELETE /api/expenses/{}", id);

    match state.repository.delete_expense(&id).await {
        Ok(deleted) => (StatusCode::OK, Json(deleted)).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::io::rest::test_support::{send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_list_expense() {
        let app = test_app().await;

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/expenses",
            Some(json!({"title": "Coffee", "amount": "3.5", "categoryId": "food", "date": "2024-01-05"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["amount"], 3.5);
        assert_eq!(created["categoryId"], "food");

        let (status, listed) =
            send(&app, Method::GET, "/api/expenses?categoryId=food&from=2024-01-01", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([created]));

        let (_, listed) = send(&app, Method::GET, "/api/expenses?to=2023-12-31", None).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_update_and_delete_expense() {
        let app = test_app().await;
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/expenses",
            Some(json!({"title": "Bus", "amount": 2, "categoryId": "transport"})),
        )
        .await;
        let uri = format!("/api/expenses/{}", created["id"].as_str().unwrap());

        let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({"amount": 2.75}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["amount"], 2.75);
        assert_eq!(updated["title"], "Bus");

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"deleted": true}));

        let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"title": "Tram"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Expense not found");
    }

    #[tokio::test]
    async fn test_expense_validation_errors() {
        let app = test_app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/expenses",
            Some(json!({"title": "Refund", "amount": -1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Amount must be >= 0");

        let (status, body) = send(&app, Method::POST, "/api/expenses", Some(json!([1, 2]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));
    }
}
