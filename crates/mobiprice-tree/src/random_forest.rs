use mobiprice_core::classifier::{argmax_count, validate_training_set};
use mobiprice_core::{CancellationToken, Classifier, PriceError, PriceResult, N_CLASSES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision_tree::DecisionTreeClassifier;

/// Random forest: bagged decision trees with majority voting.
///
/// Each tree is fit on `floor(sample_ratio * n)` rows drawn uniformly with
/// replacement; prediction is a majority vote with ties going to the lowest
/// class index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub sample_ratio: f64,
    pub seed: Option<u64>,
    pub n_classes: usize,
    trees: Vec<DecisionTreeClassifier>,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize, max_depth: usize, min_samples_split: usize) -> Self {
        RandomForestClassifier {
            n_estimators,
            max_depth,
            min_samples_split,
            sample_ratio: 0.8,
            seed: None,
            n_classes: N_CLASSES,
            trees: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sample_ratio(mut self, sample_ratio: f64) -> Self {
        self.sample_ratio = sample_ratio;
        self
    }

    /// Assemble a forest from already fitted trees.
    pub fn from_trees(trees: Vec<DecisionTreeClassifier>) -> PriceResult<Self> {
        let first = trees
            .first()
            .ok_or_else(|| PriceError::InvalidInput("a forest needs at least one tree".into()))?;
        if trees.iter().any(|t| !t.is_fitted()) {
            return Err(PriceError::ModelNotTrained);
        }
        let mut forest =
            RandomForestClassifier::new(trees.len(), first.max_depth, first.min_samples_split);
        forest.n_classes = trees.iter().map(|t| t.n_classes).max().unwrap_or(N_CLASSES);
        forest.trees = trees;
        Ok(forest)
    }

    pub fn trees(&self) -> &[DecisionTreeClassifier] {
        &self.trees
    }

    /// Check every tree's arena and that the trees agree on feature width
    /// and class count.
    pub fn check_structure(&self) -> PriceResult<()> {
        let first = self.trees.first().ok_or(PriceError::ModelNotTrained)?;
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check_structure().map_err(|e| match e {
                PriceError::InvalidInput(msg) => {
                    PriceError::InvalidInput(format!("tree {i}: {msg}"))
                }
                other => other,
            })?;
            if tree.n_features() != first.n_features() || tree.n_classes != self.n_classes {
                return Err(PriceError::InvalidInput(format!(
                    "tree {i} does not match the forest's {} features and {} classes",
                    first.n_features(),
                    self.n_classes
                )));
            }
        }
        Ok(())
    }

    /// Per-class vote counts for one row.
    pub fn votes(&self, x: &[f64]) -> PriceResult<Vec<usize>> {
        if self.trees.is_empty() {
            return Err(PriceError::ModelNotTrained);
        }
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            let cls = tree.predict(x)?;
            if cls < self.n_classes {
                votes[cls] += 1;
            }
        }
        Ok(votes)
    }
}

impl Classifier for RandomForestClassifier {
    fn fit_with_progress(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(f64),
    ) -> PriceResult<()> {
        validate_training_set(x, y, self.n_classes)?;
        if self.n_estimators == 0 {
            return Err(PriceError::InvalidInput("n_estimators must be positive".into()));
        }
        if !(self.sample_ratio > 0.0 && self.sample_ratio <= 1.0) {
            return Err(PriceError::InvalidInput(format!(
                "sample_ratio must lie in (0, 1], got {}",
                self.sample_ratio
            )));
        }

        let n = x.len();
        let sample_size = ((n as f64 * self.sample_ratio).floor() as usize).max(1);
        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        self.trees.clear();
        let mut trees = Vec::with_capacity(self.n_estimators);

        for t in 0..self.n_estimators {
            cancel.check()?;

            // Bootstrap sample
            let mut x_sub = Vec::with_capacity(sample_size);
            let mut y_sub = Vec::with_capacity(sample_size);
            for _ in 0..sample_size {
                let j = rng.gen_range(0..n);
                x_sub.push(x[j].clone());
                y_sub.push(y[j]);
            }

            let mut tree = DecisionTreeClassifier::new(self.max_depth, self.min_samples_split)
                .with_n_classes(self.n_classes);
            tree.fit_with_cancel(&x_sub, &y_sub, cancel)?;
            debug!(tree = t, leaves = tree.n_leaves(), depth = tree.depth(), "fitted forest tree");
            trees.push(tree);
            progress((t + 1) as f64 / self.n_estimators as f64);
        }

        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> PriceResult<usize> {
        Ok(argmax_count(&self.votes(x)?))
    }

    /// Fraction of trees voting for each class.
    fn predict_proba(&self, x: &[f64]) -> PriceResult<Vec<f64>> {
        let votes = self.votes(x)?;
        let total = self.trees.len() as f64;
        Ok(votes.iter().map(|&v| v as f64 / total).collect())
    }

    fn predict_batch(&self, x: &[Vec<f64>]) -> PriceResult<Vec<usize>> {
        x.par_iter().map(|row| self.predict(row)).collect()
    }

    /// Mean of the trees' importances, renormalized so that trees which
    /// never split do not drag the sum below 1.
    fn feature_importances(&self) -> PriceResult<Vec<f64>> {
        let first = self.trees.first().ok_or(PriceError::ModelNotTrained)?;
        let mut total = first.feature_importances()?;
        for tree in &self.trees[1..] {
            for (acc, v) in total.iter_mut().zip(tree.feature_importances()?) {
                *acc += v;
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for v in &mut total {
                *v /= sum;
            }
        }
        Ok(total)
    }
}
