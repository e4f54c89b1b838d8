use std::time::Duration;

use mobiprice_core::{
    validate_features, Classifier, FeatureVector, PhoneRecord, PriceError, PriceRange,
    PriceResult, N_CLASSES, N_FEATURES,
};
use mobiprice_metrics::{ConfusionMatrix, ModelMetrics};
use mobiprice_preprocessing::MinMaxScaler;
use serde::{Deserialize, Serialize};

use crate::model::{Algorithm, TrainedModel};

/// Importance of one feature in a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Result of a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class: usize,
    pub price_range: PriceRange,
    /// Per-class confidence, sums to 1.
    pub confidence: [f64; N_CLASSES],
}

/// Everything one training run produced. Read-only once built; a new run
/// produces a new bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModelBundle {
    pub(crate) model: TrainedModel,
    /// Ranges fitted on the training split, reused for every prediction.
    pub(crate) scaler: MinMaxScaler,
    pub(crate) predictions: Vec<usize>,
    pub(crate) actual_values: Vec<usize>,
    /// Dataset positions of the test rows, aligned with `predictions`.
    pub(crate) test_indices: Vec<usize>,
    pub(crate) metrics: ModelMetrics,
    pub(crate) feature_importance: Vec<FeatureImportance>,
    pub(crate) cross_validation_scores: Vec<f64>,
    pub(crate) training_time: Duration,
}

impl TrainedModelBundle {
    pub fn algorithm(&self) -> Algorithm {
        self.model.algorithm()
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    pub fn accuracy(&self) -> f64 {
        self.metrics.accuracy
    }

    pub fn predictions(&self) -> &[usize] {
        &self.predictions
    }

    pub fn actual_values(&self) -> &[usize] {
        &self.actual_values
    }

    pub fn test_indices(&self) -> &[usize] {
        &self.test_indices
    }

    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    pub fn confusion_matrix(&self) -> &ConfusionMatrix {
        &self.metrics.confusion_matrix
    }

    /// Sorted by descending importance.
    pub fn feature_importance(&self) -> &[FeatureImportance] {
        &self.feature_importance
    }

    pub fn cross_validation_scores(&self) -> &[f64] {
        &self.cross_validation_scores
    }

    pub fn training_time(&self) -> Duration {
        self.training_time
    }

    /// Check state read from outside the trainer: the model arena, scaler
    /// ranges for every feature, and aligned evaluation arrays.
    pub fn check_structure(&self) -> PriceResult<()> {
        self.model.check_structure()?;
        match (&self.scaler.min, &self.scaler.max) {
            (Some(min), Some(max)) if min.len() == N_FEATURES && max.len() == N_FEATURES => {}
            (None, _) | (_, None) => return Err(PriceError::ModelNotTrained),
            _ => {
                return Err(PriceError::InvalidInput(format!(
                    "scaler ranges do not cover {N_FEATURES} features"
                )))
            }
        }
        let n_test = self.test_indices.len();
        if self.predictions.len() != n_test || self.actual_values.len() != n_test {
            return Err(PriceError::InvalidInput(format!(
                "{} predictions and {} actual values for {n_test} test rows",
                self.predictions.len(),
                self.actual_values.len()
            )));
        }
        Ok(())
    }

    /// Scale raw features with the training ranges and classify them.
    ///
    /// Non-finite values and flags other than 0/1 are `InvalidInput`.
    pub fn predict_features(&self, features: &FeatureVector) -> PriceResult<Prediction> {
        validate_features(features)?;
        let scaled = self.scaler.transform_row(features)?;
        let class = self.model.predict(&scaled)?;
        let proba = self.model.predict_proba(&scaled)?;
        let confidence: [f64; N_CLASSES] =
            proba.as_slice().try_into().map_err(|_| PriceError::DimensionMismatch {
                expected: N_CLASSES,
                got: proba.len(),
            })?;
        Ok(Prediction {
            class,
            price_range: PriceRange::from_index(class)?,
            confidence,
        })
    }

    /// Classify a record; its `price_range` field is ignored.
    pub fn predict(&self, record: &PhoneRecord) -> PriceResult<Prediction> {
        self.predict_features(&record.features())
    }
}

/// Classify one raw record with a trained bundle.
pub fn predict(bundle: &TrainedModelBundle, record: &PhoneRecord) -> PriceResult<Prediction> {
    bundle.predict(record)
}
