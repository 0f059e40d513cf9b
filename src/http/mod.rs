//! Axum HTTP service.
//!
//! ## URL layout
//!
//! ```text
//! GET  /                   → welcome message
//! GET  /health             → readiness + artifact fingerprints
//! POST /predict_cluster/   → { "cluster_id": n }
//! *                        → 404
//! ```
//!
//! `run` drives the axum event loop; the shared [`CancellationToken`] is
//! wired to axum's graceful shutdown.

mod api;

pub use api::{ApiError, WELCOME_MESSAGE};

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::state::ModelState;

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone; all fields are reference-counted.
#[derive(Clone)]
pub struct ApiState {
    /// Service name used in log fields and the health body.
    pub service: Arc<str>,
    pub models: Arc<ModelState>,
}

impl ApiState {
    pub fn new(service: &str, models: Arc<ModelState>) -> Self {
        Self { service: Arc::from(service), models }
    }
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/",                 get(api::root))
        .route("/health",           get(api::health))
        .route("/predict_cluster/", post(api::predict_cluster))
        .route("/predict_cluster",  post(api::predict_cluster))
        .fallback(api::not_found)
        .with_state(state)
}

/// Bind `bind_addr` and serve until `shutdown` is cancelled.
pub async fn run(
    bind_addr: &str,
    state: ApiState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let service = state.service.clone();
    let router = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::Server(format!("no local address: {e}")))?;
    info!(%service, %local_addr, "http service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("axum server error: {e}")))?;

    info!(%service, "http service shut down");
    Ok(())
}
