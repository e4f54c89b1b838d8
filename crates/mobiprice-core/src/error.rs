use thiserror::Error;

/// Error type shared by every MobiPrice crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PriceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid algorithm: {0:?} (expected one of decisionTree, randomForest, svm)")]
    InvalidAlgorithm(String),

    #[error("Model not trained")]
    ModelNotTrained,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Training cancelled")]
    Cancelled,

    #[error("Training aborted: {0}")]
    TrainingAborted(String),
}

pub type PriceResult<T> = Result<T, PriceError>;
