use mobiprice_core::{PriceError, PriceResult, N_CLASSES};
use serde::{Deserialize, Serialize};

/// Confusion matrix: rows are actual classes, columns predicted classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    cells: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        ConfusionMatrix {
            cells: vec![vec![0usize; n_classes]; n_classes],
        }
    }

    /// Count every `(actual, predicted)` pair.
    pub fn from_labels(
        actual: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> PriceResult<Self> {
        if actual.len() != predicted.len() {
            return Err(PriceError::DimensionMismatch {
                expected: actual.len(),
                got: predicted.len(),
            });
        }
        let mut matrix = ConfusionMatrix::new(n_classes);
        for (&a, &p) in actual.iter().zip(predicted) {
            if a >= n_classes || p >= n_classes {
                return Err(PriceError::InvalidInput(format!(
                    "label pair ({a}, {p}) outside 0..{n_classes}"
                )));
            }
            matrix.cells[a][p] += 1;
        }
        Ok(matrix)
    }

    pub fn n_classes(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.cells[actual][predicted]
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.cells
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }

    /// Sum of the diagonal (correct predictions).
    pub fn trace(&self) -> usize {
        (0..self.n_classes()).map(|c| self.cells[c][c]).sum()
    }

    pub fn true_positives(&self, class: usize) -> usize {
        self.cells[class][class]
    }

    /// Column total minus the diagonal.
    pub fn false_positives(&self, class: usize) -> usize {
        self.cells.iter().map(|row| row[class]).sum::<usize>() - self.cells[class][class]
    }

    /// Row total minus the diagonal.
    pub fn false_negatives(&self, class: usize) -> usize {
        self.cells[class].iter().sum::<usize>() - self.cells[class][class]
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.trace(), self.total())
    }

    pub fn precision(&self, class: usize) -> f64 {
        let tp = self.true_positives(class);
        ratio(tp, tp + self.false_positives(class))
    }

    pub fn recall(&self, class: usize) -> f64 {
        let tp = self.true_positives(class);
        ratio(tp, tp + self.false_negatives(class))
    }
}

/// `num / den`, or 0 when `den` is 0.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// F1 score from precision and recall; 0 when both are 0.
pub fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Per-class precision/recall/F1 plus overall accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub f1_score: Vec<f64>,
    pub confusion_matrix: ConfusionMatrix,
}

impl ModelMetrics {
    pub fn from_confusion_matrix(confusion_matrix: ConfusionMatrix) -> Self {
        let classes = 0..confusion_matrix.n_classes();
        let precision: Vec<f64> = classes.clone().map(|c| confusion_matrix.precision(c)).collect();
        let recall: Vec<f64> = classes.map(|c| confusion_matrix.recall(c)).collect();
        let f1_score = precision
            .iter()
            .zip(&recall)
            .map(|(&p, &r)| f1(p, r))
            .collect();
        ModelMetrics {
            accuracy: confusion_matrix.accuracy(),
            precision,
            recall,
            f1_score,
            confusion_matrix,
        }
    }

    pub fn precision_macro(&self) -> f64 {
        mean(&self.precision)
    }

    pub fn recall_macro(&self) -> f64 {
        mean(&self.recall)
    }

    pub fn f1_macro(&self) -> f64 {
        mean(&self.f1_score)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Score predictions against ground truth over the four price classes.
pub fn evaluate(actual: &[usize], predicted: &[usize]) -> PriceResult<ModelMetrics> {
    if actual.is_empty() {
        return Err(PriceError::InvalidInput("cannot evaluate an empty prediction set".into()));
    }
    let matrix = ConfusionMatrix::from_labels(actual, predicted, N_CLASSES)?;
    Ok(ModelMetrics::from_confusion_matrix(matrix))
}

/// Fraction of positions where `actual` and `predicted` agree.
pub fn accuracy(actual: &[usize], predicted: &[usize]) -> f64 {
    let n = actual.len().min(predicted.len());
    let correct = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    ratio(correct, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_accuracy() {
        let acc = accuracy(&[0, 1, 2, 1, 0], &[0, 1, 2, 0, 0]);
        assert_relative_eq!(acc, 0.8);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_confusion_matrix() {
        let actual = [0, 0, 1, 1, 3, 3, 3, 2];
        let predicted = [0, 1, 0, 1, 3, 3, 2, 2];
        let cm = ConfusionMatrix::from_labels(&actual, &predicted, 4).unwrap();

        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(1, 0), 1);
        assert_eq!(cm.get(3, 2), 1);
        assert_eq!(cm.total(), actual.len());
        assert_eq!(cm.trace(), 5);
        assert_relative_eq!(cm.accuracy(), cm.trace() as f64 / cm.total() as f64);
    }

    #[test]
    fn test_precision_recall() {
        let actual = [1, 1, 0, 0, 1];
        let predicted = [1, 0, 0, 1, 1];
        let m = evaluate(&actual, &predicted).unwrap();
        // TP=2, FP=1, FN=1 → P=2/3, R=2/3
        assert_relative_eq!(m.precision[1], 2.0 / 3.0);
        assert_relative_eq!(m.recall[1], 2.0 / 3.0);
        assert_relative_eq!(m.f1_score[1], 2.0 / 3.0);
        assert_relative_eq!(m.accuracy, 0.6);
    }

    #[test]
    fn test_zero_denominators_fall_back_to_zero() {
        // class 2 never predicted, class 3 never present nor predicted
        let m = evaluate(&[0, 1, 2], &[0, 1, 1]).unwrap();
        assert_eq!(m.precision[2], 0.0);
        assert_eq!(m.recall[2], 0.0);
        assert_eq!(m.f1_score[2], 0.0);
        assert_eq!(m.precision[3], 0.0);
        assert_eq!(m.recall[3], 0.0);
        assert!(m.precision.iter().chain(&m.recall).chain(&m.f1_score).all(|v| v.is_finite()));
        assert_relative_eq!(m.precision[1], 0.5);
        assert_relative_eq!(m.recall[1], 1.0);
    }

    #[test]
    fn test_macro_averages() {
        let m = evaluate(&[0, 1, 2, 3], &[0, 1, 2, 3]).unwrap();
        assert_relative_eq!(m.precision_macro(), 1.0);
        assert_relative_eq!(m.recall_macro(), 1.0);
        assert_relative_eq!(m.f1_macro(), 1.0);
    }

    #[test]
    fn test_evaluate_rejects_bad_input() {
        assert!(matches!(evaluate(&[], &[]), Err(PriceError::InvalidInput(_))));
        assert!(matches!(
            evaluate(&[0, 1], &[0]),
            Err(PriceError::DimensionMismatch { .. })
        ));
        assert!(matches!(evaluate(&[4], &[0]), Err(PriceError::InvalidInput(_))));
    }
}
