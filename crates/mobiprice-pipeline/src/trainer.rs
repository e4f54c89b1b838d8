use std::time::Instant;

use mobiprice_core::{
    CancellationToken, Classifier, PhoneRecord, PriceError, PriceResult, FEATURE_NAMES,
};
use mobiprice_metrics::{accuracy, evaluate};
use mobiprice_preprocessing::{
    gather, k_fold_indices, seeded_rng, train_test_split_indices, MinMaxScaler,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::bundle::{FeatureImportance, TrainedModelBundle};
use crate::config::TrainingConfig;
use crate::job::ProgressTracker;
use crate::model::{Algorithm, TrainedModel};

/// Share of the progress bar spent before model fitting starts.
const PREPARE_SHARE: f64 = 0.05;
/// Share reserved for prediction and evaluation at the end.
const EVALUATE_SHARE: f64 = 0.05;

/// Runs split → normalize → fit → predict → evaluate and packages the result.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    pub config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Trainer { config }
    }

    pub fn train(
        &self,
        algorithm: Algorithm,
        dataset: &[PhoneRecord],
    ) -> PriceResult<TrainedModelBundle> {
        self.train_with(algorithm, dataset, &CancellationToken::new(), &ProgressTracker::new())
    }

    /// Train by selector name (`decisionTree`, `randomForest`, `svm`).
    pub fn train_by_name(
        &self,
        algorithm: &str,
        dataset: &[PhoneRecord],
    ) -> PriceResult<TrainedModelBundle> {
        let algorithm: Algorithm = algorithm.parse()?;
        self.train(algorithm, dataset)
    }

    pub fn train_with(
        &self,
        algorithm: Algorithm,
        dataset: &[PhoneRecord],
        cancel: &CancellationToken,
        progress: &ProgressTracker,
    ) -> PriceResult<TrainedModelBundle> {
        let start = Instant::now();
        self.config.validate()?;
        validate_dataset(dataset)?;

        let mut rng = seeded_rng(self.config.seed);
        let (train_idx, test_idx) =
            train_test_split_indices(dataset.len(), self.config.test_fraction, &mut rng)?;
        if train_idx.is_empty() || test_idx.is_empty() {
            return Err(PriceError::InvalidInput(format!(
                "{} records cannot be split {:.0}/{:.0}",
                dataset.len(),
                (1.0 - self.config.test_fraction) * 100.0,
                self.config.test_fraction * 100.0
            )));
        }
        info!(%algorithm, train = train_idx.len(), test = test_idx.len(), "starting training run");

        let rows: Vec<Vec<f64>> = dataset.iter().map(|r| r.features().to_vec()).collect();
        let labels: Vec<usize> = dataset.iter().map(PhoneRecord::label).collect();
        let train_x = gather(&rows, &train_idx);
        let train_y = gather(&labels, &train_idx);
        let test_x = gather(&rows, &test_idx);
        let test_y = gather(&labels, &test_idx);
        progress.set(PREPARE_SHARE);

        let n_folds = self.effective_folds(train_x.len());
        let fit_units = (n_folds + 1) as f64;
        let unit = (1.0 - PREPARE_SHARE - EVALUATE_SHARE) / fit_units;

        let mut cross_validation_scores = Vec::with_capacity(n_folds);
        if n_folds > 0 {
            let folds = k_fold_indices(train_x.len(), n_folds, &mut rng)?;
            for (k, fold) in folds.iter().enumerate() {
                cancel.check()?;
                let fit_x = gather(&train_x, &fold.train);
                let fit_y = gather(&train_y, &fold.train);
                let eval_x = gather(&train_x, &fold.test);
                let eval_y = gather(&train_y, &fold.test);
                let base = PREPARE_SHARE + unit * k as f64;
                let score = self.score_fold(
                    algorithm,
                    (fit_x.as_slice(), fit_y.as_slice()),
                    (eval_x.as_slice(), eval_y.as_slice()),
                    rng.gen(),
                    cancel,
                    &mut |f| progress.set(base + unit * f),
                )?;
                debug!(fold = k, score, "cross-validation fold scored");
                cross_validation_scores.push(score);
            }
        }

        let mut scaler = MinMaxScaler::new();
        let train_scaled = scaler.fit_transform(&train_x)?;
        let test_scaled = scaler.transform(&test_x)?;

        let mut model = TrainedModel::new(algorithm, &self.config, Some(rng.gen()));
        let base = PREPARE_SHARE + unit * n_folds as f64;
        model.fit_with_progress(&train_scaled, &train_y, cancel, &mut |f| {
            progress.set(base + unit * f)
        })?;
        progress.set(1.0 - EVALUATE_SHARE);

        let predictions = model.predict_batch(&test_scaled)?;
        let metrics = evaluate(&test_y, &predictions)?;
        let feature_importance = rank_features(&model.feature_importances()?);
        let training_time = start.elapsed();

        info!(
            %algorithm,
            accuracy = metrics.accuracy,
            elapsed_ms = training_time.as_millis() as u64,
            "training run finished"
        );
        progress.set(1.0);

        Ok(TrainedModelBundle {
            model,
            scaler,
            predictions,
            actual_values: test_y,
            test_indices: test_idx,
            metrics,
            feature_importance,
            cross_validation_scores,
            training_time,
        })
    }

    /// Configured fold count, or 0 when cross-validation is off or the
    /// training split is too small to fill the folds.
    fn effective_folds(&self, n_train: usize) -> usize {
        let k = self.config.cv_folds;
        if k == 0 {
            return 0;
        }
        if n_train < k {
            warn!(n_train, folds = k, "training split too small, skipping cross-validation");
            return 0;
        }
        k
    }

    /// Fit a fresh scaler and model on one fold and score it on the held-out rows.
    fn score_fold(
        &self,
        algorithm: Algorithm,
        (fit_x, fit_y): (&[Vec<f64>], &[usize]),
        (eval_x, eval_y): (&[Vec<f64>], &[usize]),
        seed: u64,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(f64),
    ) -> PriceResult<f64> {
        let mut scaler = MinMaxScaler::new();
        let fit_scaled = scaler.fit_transform(fit_x)?;
        let eval_scaled = scaler.transform(eval_x)?;

        let mut model = TrainedModel::new(algorithm, &self.config, Some(seed));
        model.fit_with_progress(&fit_scaled, fit_y, cancel, progress)?;
        let predicted = model.predict_batch(&eval_scaled)?;
        Ok(accuracy(eval_y, &predicted))
    }
}

fn validate_dataset(dataset: &[PhoneRecord]) -> PriceResult<()> {
    if dataset.is_empty() {
        return Err(PriceError::InvalidInput("dataset is empty".into()));
    }
    for (i, record) in dataset.iter().enumerate() {
        record.validate().map_err(|e| match e {
            PriceError::InvalidInput(msg) => PriceError::InvalidInput(format!("record {i}: {msg}")),
            other => other,
        })?;
    }
    Ok(())
}

/// Pair scores with feature names, highest first; equal scores keep feature order.
fn rank_features(scores: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = FEATURE_NAMES
        .iter()
        .zip(scores)
        .map(|(&feature, &importance)| FeatureImportance {
            feature: feature.to_string(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}
