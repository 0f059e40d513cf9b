//! Fitted artifacts: the preprocessor and the clusterer.
//!
//! The inference pipeline only sees the two capability traits below, so
//! handlers and tests can run against in-memory fakes. The concrete
//! implementations are deserialized from JSON files produced by the
//! training side.
//!
//! ```text
//! FeatureRecord ──transform──▶ Vec<f64> ──predict──▶ cluster id
//!               Preprocessor             Clusterer
//! ```

pub mod kmeans;
pub mod preprocessor;

use std::{fs, io, path::Path};

use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::error::{ArtifactError, PipelineError};
use crate::record::FeatureRecord;

pub use kmeans::KMeansModel;
pub use preprocessor::ColumnTransformer;

// ── Capabilities ──────────────────────────────────────────────────────────────

/// Turns a named single-row record into a numeric feature vector.
pub trait Preprocessor: Send + Sync {
    fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>, PipelineError>;

    /// Length of every vector returned by [`Preprocessor::transform`].
    fn output_width(&self) -> usize;
}

/// Maps a feature vector to a cluster id.
pub trait Clusterer: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<usize, PipelineError>;

    /// Feature-vector length the clusterer was fitted on.
    fn n_features(&self) -> usize;

    fn n_clusters(&self) -> usize;
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Metadata about one artifact file, reported by the health route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub path: String,
    /// Hex SHA-256 of the file bytes.
    pub sha256: String,
}

/// Implemented by artifact types that need checks beyond deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Read, deserialize and validate one artifact.
///
/// A missing file is [`ArtifactError::NotFound`]; every other failure is
/// [`ArtifactError::Load`].
pub fn load_artifact<T>(kind: &'static str, path: &Path) -> Result<(T, ArtifactInfo), ArtifactError>
where
    T: DeserializeOwned + Validate,
{
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ArtifactError::NotFound {
            kind,
            path: path.to_path_buf(),
        },
        _ => load_error(kind, path, e),
    })?;

    let artifact: T = serde_json::from_slice(&bytes).map_err(|e| load_error(kind, path, e))?;
    artifact.validate().map_err(|e| load_error(kind, path, e))?;

    let info = ArtifactInfo {
        path: path.display().to_string(),
        sha256: hex::encode(Sha256::digest(&bytes)),
    };
    Ok((artifact, info))
}

fn load_error(kind: &'static str, path: &Path, reason: impl std::fmt::Display) -> ArtifactError {
    ArtifactError::Load {
        kind,
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
