use mobiprice_core::PriceError;
use thiserror::Error;

/// Failure while reading or writing MobiPrice data.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Price(#[from] PriceError),
}

pub type IoResult<T> = Result<T, IoError>;
