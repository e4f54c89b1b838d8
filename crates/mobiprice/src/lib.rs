//! # MobiPrice
//!
//! Classifies mobile phones into four price ranges from 20 hardware features.
//!
//! ## Modules
//!
//! - **core**: Phone records, price ranges, the `Classifier` trait, errors
//! - **preprocessing**: Min-max scaling, seeded train/test split, k-fold indices
//! - **tree**: Gini decision tree and bootstrap random forest
//! - **svm**: Linear SVM, one-vs-rest, hinge-loss gradient descent
//! - **metrics**: Confusion matrix, macro precision/recall/F1, dataset analysis
//! - **datasets**: Synthetic phone generator
//! - **io**: CSV records, JSON bundles and configs
//! - **pipeline**: Training config, trainer, model bundles, background jobs

/// Records, labels, classifier trait and errors.
pub use mobiprice_core as core;

/// Data preprocessing.
pub use mobiprice_preprocessing as preprocessing;

/// Tree-based models.
pub use mobiprice_tree as tree;

/// Support vector machines.
pub use mobiprice_svm as svm;

/// Evaluation metrics and analysis.
pub use mobiprice_metrics as metrics;

/// Synthetic datasets.
pub use mobiprice_datasets as datasets;

/// I/O utilities.
pub use mobiprice_io as io;

/// Training pipeline.
pub use mobiprice_pipeline as pipeline;

/// The types most callers need.
pub mod prelude {
    pub use mobiprice_core::{Classifier, PhoneRecord, PriceError, PriceRange, PriceResult};
    pub use mobiprice_pipeline::{
        predict, Algorithm, Prediction, Trainer, TrainedModelBundle, TrainingConfig, TrainingJob,
    };
}
