//! # Backend Module
//!
//! Contains all non-UI logic for the expense tracker.
//!
//! - **Storage**: the key-value medium records are persisted in
//! - **Domain**: the local repository, validation rules and report aggregation
//! - **IO**: the REST surface that exposes the repository over HTTP
//!
//! ## Architecture
//!
//! ```text
//! Client (dispatch, local or remote)
//!     ↓
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (LocalRepository, reports)
//!     ↓
//! Storage Layer (KeyValueStore)
//! ```
//!
//! The same `LocalRepository` sits behind both the REST server and the
//! in-process local backend, so both answer with identical entities.

pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::domain::LocalRepository;
use crate::backend::storage::KeyValueStore;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub repository: LocalRepository,
}

/// Build the application state over `store`, seeding it if needed
pub async fn initialize_backend(store: Arc<dyn KeyValueStore>) -> Result<AppState> {
    info!("Setting up local repository over {}", store.describe());
    let repository = LocalRepository::new(store);
    repository.init().await;

    Ok(AppState { repository })
}

/// Create the Axum router with all routes configured under `/api`
pub fn create_router(app_state: AppState) -> Router {
    // CORS setup so a browser frontend served elsewhere can call the API
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("http://localhost:8080"))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/categories", io::rest::category_apis::router())
        .nest("/expenses", io::rest::expense_apis::router())
        .nest("/reports", io::rest::report_apis::router())
        .merge(io::rest::health_apis::router());

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
