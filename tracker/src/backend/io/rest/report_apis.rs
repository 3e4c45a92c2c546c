//! # REST API for Reports

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use shared::ReportSummaryQuery;
use tracing::info;

use super::error_response;
use crate::backend::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/summary", get(get_summary))
}

/// Monthly and per-category totals over `[from, to]`
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<ReportSummaryQuery>,
) -> Response {
    info!("GET /api/reports/summary - query: {:?}", query);

    match state.repository.reports_summary(&query).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::io::rest::test_support::{send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_summary_over_range() {
        let app = test_app().await;
        for (title, amount, category, date) in [
            ("Coffee", 3.5, "food", "2024-01-05"),
            ("Rent", 800.0, "rent", "2024-02-01"),
            ("Lunch", 9.0, "food", "2024-03-10"),
        ] {
            send(
                &app,
                Method::POST,
                "/api/expenses",
                Some(json!({"title": title, "amount": amount, "categoryId": category, "date": date})),
            )
            .await;
        }

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/reports/summary?from=2024-01-01&to=2024-02-29",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "monthly": [
                    {"month": "2024-01", "total": 3.5},
                    {"month": "2024-02", "total": 800.0}
                ],
                "byCategory": {"food": 3.5, "rent": 800.0}
            })
        );
    }
}
