//! Application-wide error types.

use std::path::PathBuf;

use thiserror::Error;

/// Process-level failures. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("server error: {0}")]
    Server(String),
}

/// Failures while loading a fitted artifact from disk.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} not found at {}", path.display())]
    NotFound { kind: &'static str, path: PathBuf },

    #[error("failed to load {kind} from {}: {reason}", path.display())]
    Load {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },
}

/// Per-request failures raised by the prediction pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("model or preprocessor is not loaded yet; try again later")]
    ServiceUnavailable,

    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("prediction failed: {0}")]
    Prediction(String),
}
