use std::fmt;
use std::str::FromStr;

use mobiprice_core::{CancellationToken, Classifier, PriceError, PriceResult};
use mobiprice_svm::LinearSVC;
use mobiprice_tree::{DecisionTreeClassifier, RandomForestClassifier};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;

/// Algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Algorithm {
    DecisionTree,
    RandomForest,
    Svm,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] =
        [Algorithm::DecisionTree, Algorithm::RandomForest, Algorithm::Svm];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::DecisionTree => "decisionTree",
            Algorithm::RandomForest => "randomForest",
            Algorithm::Svm => "svm",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| PriceError::InvalidAlgorithm(s.to_string()))
    }
}

/// Model state held by a bundle, one variant per algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state", rename_all = "camelCase")]
pub enum TrainedModel {
    DecisionTree(DecisionTreeClassifier),
    RandomForest(RandomForestClassifier),
    Svm(LinearSVC),
}

impl TrainedModel {
    /// Unfitted model of the requested kind. `seed` drives forest bootstrapping.
    pub fn new(algorithm: Algorithm, config: &TrainingConfig, seed: Option<u64>) -> Self {
        match algorithm {
            Algorithm::DecisionTree => TrainedModel::DecisionTree(DecisionTreeClassifier::new(
                config.tree.max_depth,
                config.tree.min_samples_split,
            )),
            Algorithm::RandomForest => TrainedModel::RandomForest(
                RandomForestClassifier::new(
                    config.forest.n_trees,
                    config.forest.max_depth,
                    config.forest.min_samples_split,
                )
                .with_sample_ratio(config.forest.sample_ratio)
                .with_seed(seed),
            ),
            Algorithm::Svm => TrainedModel::Svm(LinearSVC::new(
                config.svm.epochs,
                config.svm.learning_rate,
                config.svm.lambda,
            )),
        }
    }

    /// Reject model state that could not have come from fitting, such as a
    /// tampered bundle file.
    pub fn check_structure(&self) -> PriceResult<()> {
        match self {
            TrainedModel::DecisionTree(m) => m.check_structure(),
            TrainedModel::RandomForest(m) => m.check_structure(),
            TrainedModel::Svm(m) => m.check_structure(),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            TrainedModel::DecisionTree(_) => Algorithm::DecisionTree,
            TrainedModel::RandomForest(_) => Algorithm::RandomForest,
            TrainedModel::Svm(_) => Algorithm::Svm,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::Svm(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::Svm(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn fit_with_progress(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(f64),
    ) -> PriceResult<()> {
        self.inner_mut().fit_with_progress(x, y, cancel, progress)
    }

    fn predict(&self, x: &[f64]) -> PriceResult<usize> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: &[f64]) -> PriceResult<Vec<f64>> {
        self.inner().predict_proba(x)
    }

    fn predict_batch(&self, x: &[Vec<f64>]) -> PriceResult<Vec<usize>> {
        self.inner().predict_batch(x)
    }

    fn feature_importances(&self) -> PriceResult<Vec<f64>> {
        self.inner().feature_importances()
    }
}
