//! Process-wide model state: loaded once at startup, read-only afterwards.
//!
//! Handlers receive an `Arc<ModelState>`. The loaded models sit behind a
//! [`OnceLock`], so reads after initialization take no lock and a request
//! that arrives before loading completes simply sees "not ready".

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::info;

use crate::artifacts::{
    self, ArtifactInfo, Clusterer, ColumnTransformer, KMeansModel, Preprocessor,
};
use crate::config::ModelsConfig;
use crate::error::{ArtifactError, PipelineError};
use crate::record;

/// The loaded capability pair.
#[derive(Clone)]
pub struct Models {
    pub preprocessor: Arc<dyn Preprocessor>,
    pub clusterer: Arc<dyn Clusterer>,
}

/// Artifact metadata exposed by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelsInfo {
    pub n_clusters: usize,
    pub n_features: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kmeans: Option<ArtifactInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<ArtifactInfo>,
}

struct Loaded {
    models: Models,
    info: ModelsInfo,
}

pub struct ModelState {
    config: ModelsConfig,
    loaded: OnceLock<Loaded>,
}

impl ModelState {
    /// Un-initialized state; call [`ModelState::initialize`] before serving.
    pub fn new(config: ModelsConfig) -> Self {
        Self { config, loaded: OnceLock::new() }
    }

    /// Already-ready state built from in-memory capabilities.
    pub fn with_models(preprocessor: Arc<dyn Preprocessor>, clusterer: Arc<dyn Clusterer>) -> Self {
        let state = Self::new(ModelsConfig::default());
        let info = ModelsInfo {
            n_clusters: clusterer.n_clusters(),
            n_features: clusterer.n_features(),
            kmeans: None,
            preprocessor: None,
        };
        let _ = state.loaded.set(Loaded {
            models: Models { preprocessor, clusterer },
            info,
        });
        state
    }

    /// Load both artifacts from the configured locations.
    ///
    /// Fails with [`ArtifactError::NotFound`] or [`ArtifactError::Load`];
    /// the caller must treat either as fatal. Calling this on an already
    /// ready state is a no-op.
    pub fn initialize(&self) -> Result<(), ArtifactError> {
        if self.is_ready() {
            return Ok(());
        }

        let kmeans_path = self.config.kmeans_path();
        info!(path = %kmeans_path.display(), "loading kmeans model");
        let (kmeans, kmeans_info) = artifacts::load_artifact::<KMeansModel>("kmeans model", &kmeans_path)?;
        info!(
            sha256 = %kmeans_info.sha256,
            n_clusters = kmeans.n_clusters(),
            n_features = kmeans.n_features(),
            "kmeans model loaded"
        );

        let prep_path = self.config.preprocessor_path();
        info!(path = %prep_path.display(), "loading preprocessor");
        let (prep, prep_info) =
            artifacts::load_artifact::<ColumnTransformer>("preprocessor", &prep_path)?;
        info!(
            sha256 = %prep_info.sha256,
            output_width = prep.output_width(),
            "preprocessor loaded"
        );

        let mismatch = |reason: String| ArtifactError::Load {
            kind: "preprocessor",
            path: prep_path.clone(),
            reason,
        };
        for (col, kind) in prep.input_columns() {
            match record::column_kind(col) {
                None => {
                    return Err(mismatch(format!(
                        "expects column '{col}' which requests do not provide"
                    )));
                }
                Some(supplied) if supplied != kind => {
                    return Err(mismatch(format!(
                        "step binds column '{col}' as {kind:?} but requests supply it as {supplied:?}"
                    )));
                }
                Some(_) => {}
            }
        }
        if prep.output_width() != kmeans.n_features() {
            return Err(mismatch(format!(
                "produces {} features but the kmeans model expects {}",
                prep.output_width(),
                kmeans.n_features()
            )));
        }

        let info = ModelsInfo {
            n_clusters: kmeans.n_clusters(),
            n_features: kmeans.n_features(),
            kmeans: Some(kmeans_info),
            preprocessor: Some(prep_info),
        };
        let _ = self.loaded.set(Loaded {
            models: Models {
                preprocessor: Arc::new(prep),
                clusterer: Arc::new(kmeans),
            },
            info,
        });
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.get().is_some()
    }

    pub fn models(&self) -> Result<&Models, PipelineError> {
        self.loaded
            .get()
            .map(|l| &l.models)
            .ok_or(PipelineError::ServiceUnavailable)
    }

    pub fn info(&self) -> Option<&ModelsInfo> {
        self.loaded.get().map(|l| &l.info)
    }
}
