//! Offline-first expense tracking.
//!
//! Callers talk to a [`DispatchClient`], which answers either from a remote
//! service or from the in-process [`LocalRepository`](backend::domain::LocalRepository)
//! with the same request surface and the same error shape.

pub mod backend;
pub mod client;
pub mod config;
pub mod logging;
pub mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use client::{ApiError, DispatchClient};
pub use config::AppConfig;

use backend::storage::KeyValueStore;

/// Serve the REST API over `store` until the process is stopped
pub async fn run_server(addr: SocketAddr, store: Arc<dyn KeyValueStore>) -> Result<()> {
    let app_state = backend::initialize_backend(store).await?;
    let router = backend::create_router(app_state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting REST API server at http://{}/api", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("REST API server error")
}

/// Resolves on ctrl-c. Without a signal handler the server runs until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            warn!("Could not listen for ctrl-c ({}), graceful shutdown disabled", e);
            std::future::pending::<()>().await;
        }
    }
}
