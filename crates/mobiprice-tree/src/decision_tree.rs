use mobiprice_core::classifier::{argmax_count, validate_training_set};
use mobiprice_core::{CancellationToken, Classifier, PriceError, PriceResult, N_CLASSES};
use serde::{Deserialize, Serialize};

/// A node in the tree arena. Children are referenced by index into
/// [`DecisionTreeClassifier::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal node: rows with `x[feature_idx] <= threshold` go left.
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Leaf: majority class plus the class counts that reached it.
    Leaf { class: usize, counts: Vec<usize> },
}

/// Best split found for one node.
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    impurity: f64,
}

/// Gini impurity `1 - Σ p_c²` of a label set.
pub fn gini_impurity(labels: &[usize], n_classes: usize) -> f64 {
    let mut counts = vec![0usize; n_classes];
    for &label in labels {
        if label < n_classes {
            counts[label] += 1;
        }
    }
    gini_from_counts(&counts, labels.len())
}

fn gini_from_counts(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Decision Tree Classifier using CART with the Gini criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub n_classes: usize,
    /// Node arena; the root is at index 0 once fitted.
    nodes: Vec<TreeNode>,
    n_features: usize,
    importances: Vec<f64>,
}

impl DecisionTreeClassifier {
    pub fn new(max_depth: usize, min_samples_split: usize) -> Self {
        DecisionTreeClassifier {
            max_depth,
            min_samples_split,
            n_classes: N_CLASSES,
            nodes: Vec::new(),
            n_features: 0,
            importances: Vec::new(),
        }
    }

    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes.max(1);
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Width of the rows the tree was fitted on (0 before fitting).
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path (a lone leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], id: usize) -> usize {
            match nodes.get(id) {
                Some(TreeNode::Split { left, right, .. }) if *left > id && *right > id => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    fn build_tree(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        indices: &[usize],
        depth: usize,
        n_total: usize,
        cancel: &CancellationToken,
    ) -> PriceResult<usize> {
        cancel.check()?;

        let id = self.nodes.len();
        let counts = self.class_counts(y, indices);
        let leaf = TreeNode::Leaf {
            class: argmax_count(&counts),
            counts: counts.clone(),
        };

        // Base cases
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if depth >= self.max_depth || indices.len() < self.min_samples_split || pure {
            self.nodes.push(leaf);
            return Ok(id);
        }

        let best = match self.best_split(x, y, indices, &counts) {
            Some(best) => best,
            None => {
                self.nodes.push(leaf);
                return Ok(id);
            }
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[i][best.feature_idx] <= best.threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            self.nodes.push(leaf);
            return Ok(id);
        }

        let parent_gini = gini_from_counts(&counts, indices.len());
        let weight = indices.len() as f64 / n_total as f64;
        self.importances[best.feature_idx] += weight * (parent_gini - best.impurity);

        // Reserve the slot so the parent precedes its children.
        self.nodes.push(leaf);
        let left = self.build_tree(x, y, &left_idx, depth + 1, n_total, cancel)?;
        let right = self.build_tree(x, y, &right_idx, depth + 1, n_total, cancel)?;
        self.nodes[id] = TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
        };
        Ok(id)
    }

    /// Lowest weighted Gini over every midpoint between adjacent distinct
    /// values of every feature. Earlier features and lower thresholds win ties.
    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[usize],
        indices: &[usize],
        counts: &[usize],
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for feature in 0..self.n_features {
            order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = counts.to_vec();

            for pos in 0..n - 1 {
                let label = y[order[pos]];
                left_counts[label] += 1;
                right_counts[label] -= 1;

                let value = x[order[pos]][feature];
                let next = x[order[pos + 1]][feature];
                if value == next {
                    continue;
                }
                let mut threshold = (value + next) / 2.0;
                if threshold >= next {
                    threshold = value;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * gini_from_counts(&left_counts, n_left)
                    + n_right as f64 * gini_from_counts(&right_counts, n_right))
                    / n as f64;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(SplitCandidate {
                        feature_idx: feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }

    fn class_counts(&self, y: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    /// Check the arena of a tree that did not come from [`fit`](Classifier::fit),
    /// e.g. one read back from disk.
    ///
    /// Children must sit after their parent and inside the arena, split
    /// features must exist, and leaves must hold one count per class.
    pub fn check_structure(&self) -> PriceResult<()> {
        if self.nodes.is_empty() {
            return Err(PriceError::ModelNotTrained);
        }
        if self.importances.len() != self.n_features {
            return Err(corrupt(format!(
                "{} importances for {} features",
                self.importances.len(),
                self.n_features
            )));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature_idx,
                    left,
                    right,
                    ..
                } => {
                    if *feature_idx >= self.n_features {
                        return Err(corrupt(format!(
                            "node {id} splits on feature {feature_idx} of {}",
                            self.n_features
                        )));
                    }
                    for &child in [left, right] {
                        if child <= id || child >= self.nodes.len() {
                            return Err(corrupt(format!("node {id} has child {child}")));
                        }
                    }
                }
                TreeNode::Leaf { class, counts } => {
                    if *class >= self.n_classes || counts.len() != self.n_classes {
                        return Err(corrupt(format!(
                            "leaf {id} has class {class} and {} counts for {} classes",
                            counts.len(),
                            self.n_classes
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk to the leaf for `x`. Every step moves to a higher node index, so a
    /// malformed arena ends in an error rather than a loop or a panic.
    fn leaf_for(&self, x: &[f64]) -> PriceResult<(usize, &[usize])> {
        if self.nodes.is_empty() {
            return Err(PriceError::ModelNotTrained);
        }
        if x.len() != self.n_features {
            return Err(PriceError::DimensionMismatch {
                expected: self.n_features,
                got: x.len(),
            });
        }
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(TreeNode::Leaf { class, counts }) => return Ok((*class, counts)),
                Some(TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature_idx).ok_or_else(|| {
                        corrupt(format!("node {id} splits on feature {feature_idx}"))
                    })?;
                    let next = if *value <= *threshold { *left } else { *right };
                    if next <= id {
                        return Err(corrupt(format!("node {id} has child {next}")));
                    }
                    id = next;
                }
                None => return Err(corrupt(format!("node {id} is missing"))),
            }
        }
    }
}

fn corrupt(detail: String) -> PriceError {
    PriceError::InvalidInput(format!("corrupt decision tree: {detail}"))
}

impl Classifier for DecisionTreeClassifier {
    fn fit_with_progress(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(f64),
    ) -> PriceResult<()> {
        self.n_features = validate_training_set(x, y, self.n_classes)?;
        self.nodes.clear();
        self.importances = vec![0.0; self.n_features];

        let indices: Vec<usize> = (0..x.len()).collect();
        if let Err(e) = self.build_tree(x, y, &indices, 0, x.len(), cancel) {
            self.nodes.clear();
            return Err(e);
        }

        let total: f64 = self.importances.iter().sum();
        if total > 0.0 {
            for v in &mut self.importances {
                *v /= total;
            }
        }
        progress(1.0);
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> PriceResult<usize> {
        self.leaf_for(x).map(|(class, _)| class)
    }

    /// Class fractions of the training rows that reached the same leaf.
    fn predict_proba(&self, x: &[f64]) -> PriceResult<Vec<f64>> {
        let (class, counts) = self.leaf_for(x)?;
        if class >= self.n_classes || counts.len() != self.n_classes {
            return Err(corrupt(format!("leaf class {class} outside 0..{}", self.n_classes)));
        }
        let total: usize = counts.iter().sum();
        if total == 0 {
            let mut proba = vec![0.0; self.n_classes];
            proba[class] = 1.0;
            return Ok(proba);
        }
        Ok(counts.iter().map(|&c| c as f64 / total as f64).collect())
    }

    fn feature_importances(&self) -> PriceResult<Vec<f64>> {
        if !self.is_fitted() {
            return Err(PriceError::ModelNotTrained);
        }
        Ok(self.importances.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rows(values: &[&[f64]]) -> Vec<Vec<f64>> {
        values.iter().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_gini_impurity() {
        assert_relative_eq!(gini_impurity(&[2, 2, 2, 2], 4), 0.0);
        assert_relative_eq!(gini_impurity(&[0, 1, 2, 3, 0, 1, 2, 3], 4), 0.75);
        assert_relative_eq!(gini_impurity(&[0, 0, 1, 1], 4), 0.5);
        assert_relative_eq!(gini_impurity(&[], 4), 0.0);
    }

    #[test]
    fn test_decision_tree_classifier() {
        let x = rows(&[&[0.0], &[1.0], &[2.0], &[3.0], &[4.0], &[5.0], &[6.0], &[7.0]]);
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];

        let mut tree = DecisionTreeClassifier::new(10, 2);
        tree.fit(&x, &y).unwrap();

        // Should get 100% accuracy on training data
        for (row, &label) in x.iter().zip(&y) {
            assert_eq!(tree.predict(row).unwrap(), label);
        }
        assert_eq!(tree.depth(), 1);
        match &tree.nodes()[0] {
            TreeNode::Split { feature_idx, threshold, .. } => {
                assert_eq!(*feature_idx, 0);
                assert_relative_eq!(*threshold, 3.5);
            }
            other => panic!("expected split at root, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_depth_predicts_majority() {
        let x = rows(&[&[0.0, 9.0], &[1.0, 8.0], &[2.0, 7.0], &[3.0, 6.0], &[4.0, 5.0]]);
        let y = vec![3, 1, 3, 2, 3];

        let mut tree = DecisionTreeClassifier::new(0, 2);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.n_leaves(), 1);
        for probe in [[0.0, 0.0], [100.0, -4.0], [2.0, 7.0]] {
            assert_eq!(tree.predict(&probe).unwrap(), 3);
        }
        let proba = tree.predict_proba(&[0.0, 0.0]).unwrap();
        assert_relative_eq!(proba[3], 0.6);
        assert_relative_eq!(proba.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_min_samples_split_stops_growth() {
        let x = rows(&[&[0.0], &[1.0], &[2.0]]);
        let y = vec![0, 1, 1];

        let mut tree = DecisionTreeClassifier::new(10, 4);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&[0.0]).unwrap(), 1);
    }

    #[test]
    fn test_constant_features_fall_back_to_leaf() {
        let x = rows(&[&[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0]]);
        let y = vec![0, 1, 1, 0];

        let mut tree = DecisionTreeClassifier::new(5, 2);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        // tie between 0 and 1 goes to the lower class
        assert_eq!(tree.predict(&[1.0, 1.0]).unwrap(), 0);
        assert_eq!(tree.feature_importances().unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_first_feature_wins_ties() {
        // Both features separate the classes perfectly.
        let x = rows(&[&[0.0, 0.0], &[0.0, 0.0], &[1.0, 1.0], &[1.0, 1.0]]);
        let y = vec![0, 0, 2, 2];

        let mut tree = DecisionTreeClassifier::new(3, 2);
        tree.fit(&x, &y).unwrap();
        match &tree.nodes()[0] {
            TreeNode::Split { feature_idx, .. } => assert_eq!(*feature_idx, 0),
            other => panic!("expected split, got {other:?}"),
        }
        let imp = tree.feature_importances().unwrap();
        assert_relative_eq!(imp[0], 1.0);
        assert_relative_eq!(imp[1], 0.0);
    }

    #[test]
    fn test_importances_follow_informative_feature() {
        let x = rows(&[
            &[5.0, 0.1], &[3.0, 0.2], &[9.0, 0.3], &[1.0, 0.4],
            &[4.0, 0.6], &[8.0, 0.7], &[2.0, 0.8], &[7.0, 0.9],
        ]);
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];

        let mut tree = DecisionTreeClassifier::new(4, 2);
        tree.fit(&x, &y).unwrap();
        let imp = tree.feature_importances().unwrap();
        assert!(imp[1] > imp[0]);
        assert_relative_eq!(imp.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_unfitted_and_bad_rows() {
        let tree = DecisionTreeClassifier::new(3, 2);
        assert_eq!(tree.predict(&[1.0]), Err(PriceError::ModelNotTrained));
        assert!(tree.feature_importances().is_err());

        let mut tree = DecisionTreeClassifier::new(3, 2);
        tree.fit(&rows(&[&[0.0, 1.0], &[1.0, 0.0]]), &[0, 1]).unwrap();
        assert_eq!(
            tree.predict(&[0.0]),
            Err(PriceError::DimensionMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn test_cancelled_fit_leaves_tree_unfitted() {
        let token = CancellationToken::new();
        token.cancel();
        let mut tree = DecisionTreeClassifier::new(3, 2);
        let err = tree
            .fit_with_cancel(&rows(&[&[0.0], &[1.0]]), &[0, 1], &token)
            .unwrap_err();
        assert_eq!(err, PriceError::Cancelled);
        assert!(!tree.is_fitted());
    }

    fn fitted_stairs() -> DecisionTreeClassifier {
        let x = rows(&[
            &[0.0, 5.0],
            &[1.0, 4.0],
            &[2.0, 3.0],
            &[3.0, 2.0],
            &[4.0, 1.0],
            &[5.0, 0.0],
        ]);
        let mut tree = DecisionTreeClassifier::new(5, 2);
        tree.fit(&x, &[0, 0, 1, 1, 3, 3]).unwrap();
        tree
    }

    #[test]
    fn test_fitted_tree_passes_structure_check() {
        let tree = fitted_stairs();
        assert!(tree.check_structure().is_ok());
        assert_eq!(tree.n_features(), 2);
        assert_eq!(
            DecisionTreeClassifier::new(3, 2).check_structure(),
            Err(PriceError::ModelNotTrained)
        );
    }

    #[test]
    fn test_out_of_range_feature_is_an_error() {
        let mut tree = fitted_stairs();
        for node in &mut tree.nodes {
            if let TreeNode::Split { feature_idx, .. } = node {
                *feature_idx = 99;
            }
        }
        assert!(matches!(tree.check_structure(), Err(PriceError::InvalidInput(_))));
        assert!(matches!(tree.predict(&[0.0, 0.0]), Err(PriceError::InvalidInput(_))));
        assert!(matches!(tree.predict_proba(&[0.0, 0.0]), Err(PriceError::InvalidInput(_))));
    }

    #[test]
    fn test_child_cycle_and_bad_leaf_are_errors() {
        let mut cyclic = fitted_stairs();
        if let TreeNode::Split { left, right, .. } = &mut cyclic.nodes[0] {
            *left = 0;
            *right = 0;
        }
        assert!(matches!(cyclic.check_structure(), Err(PriceError::InvalidInput(_))));
        assert!(matches!(cyclic.predict(&[0.0, 0.0]), Err(PriceError::InvalidInput(_))));
        assert_eq!(cyclic.depth(), 0);

        let mut dangling = fitted_stairs();
        if let TreeNode::Split { right, .. } = &mut dangling.nodes[0] {
            *right = 500;
        }
        assert!(dangling.check_structure().is_err());
        assert!(matches!(dangling.predict(&[9.0, 0.0]), Err(PriceError::InvalidInput(_))));

        let mut bad_leaf = fitted_stairs();
        for node in &mut bad_leaf.nodes {
            if let TreeNode::Leaf { class, .. } = node {
                *class = 7;
            }
        }
        assert!(bad_leaf.check_structure().is_err());
        assert!(matches!(bad_leaf.predict_proba(&[0.0, 0.0]), Err(PriceError::InvalidInput(_))));
    }
}
