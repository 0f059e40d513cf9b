//! K-Means clustering inference service.
//!
//! Loads one fitted preprocessor and one fitted K-Means model at startup and
//! serves `POST /predict_cluster/` over HTTP. See [`http`] for the routes and
//! [`pipeline`] for the request → cluster id path.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod pipeline;
pub mod record;
pub mod state;

pub use error::{AppError, ArtifactError, PipelineError};
pub use record::{PredictionRequest, PredictionResponse};
pub use state::ModelState;
