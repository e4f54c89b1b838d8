use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PriceError, PriceResult};

/// Shared flag polled by long-running fits. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> PriceResult<()> {
        if self.is_cancelled() {
            Err(PriceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Capability shared by every price classifier.
///
/// Rows are min-max scaled feature vectors; labels are class indices.
pub trait Classifier {
    /// Fit on `x`/`y`, polling `cancel` between units of work (trees,
    /// epochs) and reporting the finished share of the work to `progress`
    /// after each one. Reported fractions rise to 1.0 on success.
    fn fit_with_progress(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(f64),
    ) -> PriceResult<()>;

    fn fit_with_cancel(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        cancel: &CancellationToken,
    ) -> PriceResult<()> {
        self.fit_with_progress(x, y, cancel, &mut |_| {})
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> PriceResult<()> {
        self.fit_with_cancel(x, y, &CancellationToken::new())
    }

    /// Predicted class for one row.
    fn predict(&self, x: &[f64]) -> PriceResult<usize>;

    /// Class probabilities for one row; sums to 1.
    fn predict_proba(&self, x: &[f64]) -> PriceResult<Vec<f64>>;

    fn predict_batch(&self, x: &[Vec<f64>]) -> PriceResult<Vec<usize>> {
        x.iter().map(|row| self.predict(row)).collect()
    }

    /// Per-feature importance scores, normalized to sum 1 (all zero if the
    /// model found nothing to separate on).
    fn feature_importances(&self) -> PriceResult<Vec<f64>>;
}

/// Check a training set and return its feature count.
pub fn validate_training_set(x: &[Vec<f64>], y: &[usize], n_classes: usize) -> PriceResult<usize> {
    if x.is_empty() {
        return Err(PriceError::InvalidInput("training set is empty".into()));
    }
    if x.len() != y.len() {
        return Err(PriceError::DimensionMismatch {
            expected: x.len(),
            got: y.len(),
        });
    }
    let n_features = x[0].len();
    if n_features == 0 {
        return Err(PriceError::InvalidInput("rows have no features".into()));
    }
    if let Some(row) = x.iter().find(|row| row.len() != n_features) {
        return Err(PriceError::DimensionMismatch {
            expected: n_features,
            got: row.len(),
        });
    }
    if let Some(&label) = y.iter().find(|&&label| label >= n_classes) {
        return Err(PriceError::InvalidInput(format!(
            "label {label} outside 0..{n_classes}"
        )));
    }
    Ok(n_features)
}

/// Index of the largest value; the lowest index wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Index of the largest count; the lowest index wins ties.
pub fn argmax_count(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate().skip(1) {
        if c > counts[best] {
            best = i;
        }
    }
    best
}
