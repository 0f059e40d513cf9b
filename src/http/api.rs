//! Axum handlers and the error → status mapping.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use super::ApiState;
use crate::error::PipelineError;
use crate::pipeline;
use crate::record::{PredictionRequest, PredictionResponse};

pub const WELCOME_MESSAGE: &str = "Selamat datang di K-Means Clustering API!";

// ── Errors ────────────────────────────────────────────────────────────────────

/// Every failure a handler can return. Rendered as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body missing, not JSON, or not matching the request schema.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(PipelineError::ServiceUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Pipeline(PipelineError::Preprocessing(_) | PipelineError::Prediction(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), json_error(&self)).into_response()
    }
}

fn json_error(detail: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "detail": detail.to_string() }))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /
pub(super) async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

/// GET /health: 200 once both artifacts are loaded, 503 before.
pub(super) async fn health(State(state): State<ApiState>) -> Response {
    match state.models.info() {
        Some(info) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "service": &*state.service, "models": info })),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "loading", "service": &*state.service })),
        )
            .into_response(),
    }
}

/// POST /predict_cluster/
///
/// Schema problems are rejected here, before the pipeline sees the request.
pub(super) async fn predict_cluster(
    State(state): State<ApiState>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        warn!(service = %state.service, "rejected prediction body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    match pipeline::predict_cluster(&state.models, &request) {
        Ok(response) => {
            debug!(service = %state.service, cluster_id = response.cluster_id, "prediction served");
            Ok(Json(response))
        }
        Err(e) => {
            warn!(service = %state.service, "prediction failed: {e}");
            Err(e.into())
        }
    }
}

/// Fallback for unknown routes.
pub(super) async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, json_error("Not Found"))
}
