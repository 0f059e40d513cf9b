//! Fitted K-Means clusterer: nearest-centroid assignment under squared
//! Euclidean distance.

use serde::Deserialize;

use super::{Clusterer, Validate};
use crate::error::PipelineError;

/// Deserialized form of `kmeans_model.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KMeansModel {
    /// `k` rows of `d` coordinates each.
    centroids: Vec<Vec<f64>>,
    /// Optional cross-check written by the training side.
    #[serde(default)]
    n_features: Option<usize>,
}

impl KMeansModel {
    pub fn new(centroids: Vec<Vec<f64>>) -> Result<Self, String> {
        let model = Self { centroids, n_features: None };
        model.validate()?;
        Ok(model)
    }
}

impl Validate for KMeansModel {
    fn validate(&self) -> Result<(), String> {
        let Some(first) = self.centroids.first() else {
            return Err("model has no centroids".into());
        };
        let d = first.len();
        if d == 0 {
            return Err("centroids have zero dimensions".into());
        }
        for (i, c) in self.centroids.iter().enumerate() {
            if c.len() != d {
                return Err(format!("centroid {i} has {} dimensions, expected {d}", c.len()));
            }
            if let Some(j) = c.iter().position(|x| !x.is_finite()) {
                return Err(format!("centroid {i} has a non-finite coordinate at {j}"));
            }
        }
        if let Some(n) = self.n_features {
            if n != d {
                return Err(format!("n_features is {n} but centroids have {d} dimensions"));
            }
        }
        Ok(())
    }
}

impl Clusterer for KMeansModel {
    fn predict(&self, features: &[f64]) -> Result<usize, PipelineError> {
        let d = self.n_features();
        if features.len() != d {
            return Err(PipelineError::Prediction(format!(
                "expected {d} features, got {}",
                features.len()
            )));
        }
        if features.iter().any(|x| !x.is_finite()) {
            return Err(PipelineError::Prediction("feature vector contains non-finite values".into()));
        }

        // `min_by` keeps the first of equal minima, so ties go to the lowest id.
        let (idx, dist) = self
            .centroids
            .iter()
            .enumerate()
            .map(|(idx, centroid)| {
                let dist: f64 = centroid
                    .iter()
                    .zip(features)
                    .map(|(c, x)| (c - x).powi(2))
                    .sum();
                (idx, dist)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| PipelineError::Prediction("model has no centroids".into()))?;

        // An overflowed minimum means every distance is inf and the order is meaningless.
        if !dist.is_finite() {
            return Err(PipelineError::Prediction(
                "distance overflow: feature values are too large to assign a cluster".into(),
            ));
        }
        Ok(idx)
    }

    fn n_features(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    fn n_clusters(&self) -> usize {
        self.centroids.len()
    }
}
