//! Request → cluster id.
//!
//! Stateless and synchronous: shape the request into a named record, run the
//! preprocessor, run the clusterer, return the single label.

use tracing::debug;

use crate::error::PipelineError;
use crate::record::{FeatureRecord, PredictionRequest, PredictionResponse};
use crate::state::ModelState;

pub fn predict_cluster(
    state: &ModelState,
    request: &PredictionRequest,
) -> Result<PredictionResponse, PipelineError> {
    let models = state.models()?;

    let record = FeatureRecord::from(request);
    let features = models.preprocessor.transform(&record)?;
    let cluster_id = models.clusterer.predict(&features)?;

    debug!(cluster_id, width = features.len(), "cluster predicted");
    Ok(PredictionResponse { cluster_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::artifacts::{Clusterer, Preprocessor};
    use crate::config::ModelsConfig;
    use crate::record::{COL_GAGAL_BAYAR_SEBELUMNYA, COL_USIA, ColumnValue};

    /// Emits `[usia, flag == "yes"]` and counts calls.
    #[derive(Default)]
    struct FakePreprocessor {
        calls: AtomicUsize,
    }

    impl Preprocessor for FakePreprocessor {
        fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let usia = match record.get(COL_USIA) {
                Some(ColumnValue::Number(n)) => *n,
                _ => return Err(PipelineError::Preprocessing("usia".into())),
            };
            let flag = match record.get(COL_GAGAL_BAYAR_SEBELUMNYA) {
                Some(ColumnValue::Text(s)) if s == "yes" => 1.0,
                Some(ColumnValue::Text(s)) if s == "no" => 0.0,
                _ => {
                    return Err(PipelineError::Preprocessing(
                        "unknown gagal_bayar_sebelumnya".into(),
                    ));
                }
            };
            Ok(vec![usia, flag])
        }

        fn output_width(&self) -> usize {
            2
        }
    }

    /// Cluster 1 for anyone 50 or older, 0 otherwise.
    struct AgeClusterer;

    impl Clusterer for AgeClusterer {
        fn predict(&self, features: &[f64]) -> Result<usize, PipelineError> {
            match features {
                [age, _] => Ok(usize::from(*age >= 50.0)),
                _ => Err(PipelineError::Prediction("width".into())),
            }
        }

        fn n_features(&self) -> usize {
            2
        }

        fn n_clusters(&self) -> usize {
            2
        }
    }

    fn request(usia: f64, flag: &str) -> PredictionRequest {
        PredictionRequest {
            usia,
            tingkat_variasi_pekerjaan: 1.1,
            suku_bunga_euribor_3bln: 4.857,
            indeks_kepercayaan_konsumen: -36.4,
            gagal_bayar_sebelumnya: flag.into(),
        }
    }

    #[test]
    fn runs_preprocessor_then_clusterer() {
        let prep = Arc::new(FakePreprocessor::default());
        let state = ModelState::with_models(prep.clone(), Arc::new(AgeClusterer));
        assert_eq!(predict_cluster(&state, &request(35.0, "no")).unwrap().cluster_id, 0);
        assert_eq!(predict_cluster(&state, &request(61.0, "yes")).unwrap().cluster_id, 1);
        assert_eq!(prep.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn not_ready_is_unavailable_and_skips_artifacts() {
        let state = ModelState::new(ModelsConfig::default());
        assert_eq!(
            predict_cluster(&state, &request(35.0, "no")).unwrap_err(),
            PipelineError::ServiceUnavailable
        );
    }

    #[test]
    fn preprocessing_failure_propagates() {
        let state =
            ModelState::with_models(Arc::new(FakePreprocessor::default()), Arc::new(AgeClusterer));
        assert!(matches!(
            predict_cluster(&state, &request(35.0, "maybe")),
            Err(PipelineError::Preprocessing(_))
        ));
    }

    #[test]
    fn prediction_failure_propagates() {
        struct Broken;
        impl Clusterer for Broken {
            fn predict(&self, _: &[f64]) -> Result<usize, PipelineError> {
                Err(PipelineError::Prediction("expected 7 features, got 2".into()))
            }
            fn n_features(&self) -> usize {
                7
            }
            fn n_clusters(&self) -> usize {
                3
            }
        }
        let state = ModelState::with_models(Arc::new(FakePreprocessor::default()), Arc::new(Broken));
        assert!(matches!(
            predict_cluster(&state, &request(35.0, "no")),
            Err(PipelineError::Prediction(_))
        ));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let state =
            ModelState::with_models(Arc::new(FakePreprocessor::default()), Arc::new(AgeClusterer));
        let req = request(52.0, "no");
        let first = predict_cluster(&state, &req).unwrap();
        for _ in 0..10 {
            assert_eq!(predict_cluster(&state, &req).unwrap(), first);
        }
    }
}
