use mobiprice_core::{PriceError, PriceResult};
use serde::{Deserialize, Serialize};

/// Decision tree hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: 12,
            min_samples_split: 4,
        }
    }
}

/// Random forest hyper-parameters. Trees are shallower than a lone tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Bootstrap sample size as a fraction of the training set.
    pub sample_ratio: f64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 15,
            max_depth: 8,
            min_samples_split: 3,
            sample_ratio: 0.8,
        }
    }
}

/// Linear SVM hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub lambda: f64,
}

impl Default for SvmParams {
    fn default() -> Self {
        SvmParams {
            epochs: 1000,
            learning_rate: 0.01,
            lambda: 0.01,
        }
    }
}

/// Settings for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of the dataset held out for evaluation, in (0, 1).
    pub test_fraction: f64,
    /// Seed for splitting and bootstrapping; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Cross-validation folds over the training split; 0 disables.
    pub cv_folds: usize,
    pub tree: TreeParams,
    pub forest: ForestParams,
    pub svm: SvmParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            test_fraction: 0.2,
            seed: None,
            cv_folds: 5,
            tree: TreeParams::default(),
            forest: ForestParams::default(),
            svm: SvmParams::default(),
        }
    }
}

impl TrainingConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> PriceResult<()> {
        let invalid = |msg: String| Err(PriceError::InvalidInput(msg));

        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return invalid(format!("test_fraction must lie in (0, 1), got {}", self.test_fraction));
        }
        if self.cv_folds == 1 {
            return invalid("cv_folds must be 0 (disabled) or at least 2".into());
        }
        if self.forest.n_trees == 0 {
            return invalid("forest.n_trees must be positive".into());
        }
        if !(self.forest.sample_ratio > 0.0 && self.forest.sample_ratio <= 1.0) {
            return invalid(format!(
                "forest.sample_ratio must lie in (0, 1], got {}",
                self.forest.sample_ratio
            ));
        }
        if self.svm.epochs == 0 || !(self.svm.learning_rate > 0.0) {
            return invalid("svm.epochs and svm.learning_rate must be positive".into());
        }
        if !(self.svm.lambda >= 0.0) {
            return invalid(format!("svm.lambda must be non-negative, got {}", self.svm.lambda));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tree.max_depth, 12);
        assert_eq!(config.forest.n_trees, 15);
        assert_eq!(config.svm.epochs, 1000);
        assert_eq!(config.cv_folds, 5);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{ "seed": 7, "forest": { "n_trees": 3 } }"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.forest.n_trees, 3);
        assert_eq!(config.forest.max_depth, 8);
        assert_eq!(config.test_fraction, 0.2);
    }

    #[test]
    fn test_validate_rejects() {
        let cases: Vec<Box<dyn Fn(&mut TrainingConfig)>> = vec![
            Box::new(|c| c.test_fraction = 0.0),
            Box::new(|c| c.test_fraction = 1.0),
            Box::new(|c| c.cv_folds = 1),
            Box::new(|c| c.forest.n_trees = 0),
            Box::new(|c| c.forest.sample_ratio = 1.5),
            Box::new(|c| c.svm.learning_rate = 0.0),
            Box::new(|c| c.svm.lambda = -1.0),
        ];
        for mutate in cases {
            let mut config = TrainingConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(PriceError::InvalidInput(_))));
        }
    }
}
