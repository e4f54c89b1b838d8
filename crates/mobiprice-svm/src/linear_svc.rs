use mobiprice_core::classifier::{argmax, validate_training_set};
use mobiprice_core::{CancellationToken, Classifier, PriceError, PriceResult, N_CLASSES};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Linear Support Vector Classifier, one-vs-rest.
///
/// Each class gets its own hyperplane trained on hinge loss with L2
/// regularization by per-sample subgradient steps:
///
/// - margin violated (`y·(w·x + b) < 1`): `w ← w + η(y·x − 2λw)`, `b ← b + ηy`
/// - otherwise: `w ← w − 2ηλw`
///
/// Training visits samples in input order for a fixed number of epochs, so
/// identical inputs give identical weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSVC {
    pub epochs: usize,
    pub learning_rate: f64,
    pub lambda: f64,
    pub n_classes: usize,
    // Trained parameters, one row per class
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl LinearSVC {
    pub fn new(epochs: usize, learning_rate: f64, lambda: f64) -> Self {
        LinearSVC {
            epochs,
            learning_rate,
            lambda,
            n_classes: N_CLASSES,
            weights: Vec::new(),
            biases: Vec::new(),
        }
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn is_fitted(&self) -> bool {
        !self.weights.is_empty()
    }

    /// Train one hyperplane, reporting the finished share of epochs.
    fn fit_binary(
        &self,
        x: &[Vec<f64>],
        labels: &[f64],
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(f64),
    ) -> PriceResult<(Vec<f64>, f64)> {
        let n_features = x[0].len();
        let mut w = vec![0.0; n_features];
        let mut b = 0.0;
        let eta = self.learning_rate;
        let shrink = 2.0 * self.lambda;

        for epoch in 0..self.epochs {
            cancel.check()?;
            for (xi, &yi) in x.iter().zip(labels) {
                let decision = dot(xi, &w) + b;
                if yi * decision < 1.0 {
                    for (wj, &xj) in w.iter_mut().zip(xi) {
                        *wj += eta * (yi * xj - shrink * *wj);
                    }
                    b += eta * yi;
                } else {
                    for wj in w.iter_mut() {
                        *wj -= eta * shrink * *wj;
                    }
                }
            }
            progress((epoch + 1) as f64 / self.epochs as f64);
        }
        Ok((w, b))
    }

    /// One hyperplane and bias per class, all of the same width.
    pub fn check_structure(&self) -> PriceResult<()> {
        let first = self.weights.first().ok_or(PriceError::ModelNotTrained)?;
        if self.weights.len() != self.n_classes
            || self.biases.len() != self.n_classes
            || first.is_empty()
            || self.weights.iter().any(|w| w.len() != first.len())
        {
            return Err(PriceError::InvalidInput(format!(
                "corrupt linear SVM: {} weight rows and {} biases for {} classes",
                self.weights.len(),
                self.biases.len(),
                self.n_classes
            )));
        }
        Ok(())
    }

    /// Raw score `w_c·x + b_c` for every class.
    pub fn decision_function(&self, x: &[f64]) -> PriceResult<Vec<f64>> {
        let first = self.weights.first().ok_or(PriceError::ModelNotTrained)?;
        if x.len() != first.len() {
            return Err(PriceError::DimensionMismatch {
                expected: first.len(),
                got: x.len(),
            });
        }
        Ok(self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(w, &b)| dot(x, w) + b)
            .collect())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| x * y).sum()
}

/// Softmax with the max subtracted first.
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

impl Classifier for LinearSVC {
    fn fit_with_progress(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(f64),
    ) -> PriceResult<()> {
        validate_training_set(x, y, self.n_classes)?;
        if self.epochs == 0 || !(self.learning_rate > 0.0) {
            return Err(PriceError::InvalidInput(
                "epochs and learning_rate must be positive".into(),
            ));
        }
        if !(self.lambda >= 0.0) {
            return Err(PriceError::InvalidInput(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }

        let n_classes = self.n_classes as f64;
        let mut weights = Vec::with_capacity(self.n_classes);
        let mut biases = Vec::with_capacity(self.n_classes);
        for class in 0..self.n_classes {
            let labels: Vec<f64> = y
                .iter()
                .map(|&label| if label == class { 1.0 } else { -1.0 })
                .collect();
            let done = class as f64;
            let (w, b) =
                self.fit_binary(x, &labels, cancel, &mut |f| progress((done + f) / n_classes))?;
            debug!(class, bias = b, "fitted one-vs-rest hyperplane");
            weights.push(w);
            biases.push(b);
        }

        self.weights = weights;
        self.biases = biases;
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> PriceResult<usize> {
        Ok(argmax(&self.decision_function(x)?))
    }

    fn predict_proba(&self, x: &[f64]) -> PriceResult<Vec<f64>> {
        Ok(softmax(&self.decision_function(x)?))
    }

    /// Mean absolute weight per feature across the class hyperplanes.
    fn feature_importances(&self) -> PriceResult<Vec<f64>> {
        let first = self.weights.first().ok_or(PriceError::ModelNotTrained)?;
        let mut scores = vec![0.0; first.len()];
        for w in &self.weights {
            for (s, &wj) in scores.iter_mut().zip(w) {
                *s += wj.abs();
            }
        }
        let total: f64 = scores.iter().sum();
        if total > 0.0 {
            for s in &mut scores {
                *s /= total;
            }
        }
        Ok(scores)
    }
}
