pub mod error;
pub mod record;
pub mod classifier;

pub use error::{PriceError, PriceResult};
pub use record::{
    feature_index, validate_features, FeatureVector, PhoneRecord, PriceRange, FEATURE_NAMES,
    N_CLASSES, N_FEATURES,
};
pub use classifier::{argmax, argmax_count, validate_training_set, CancellationToken, Classifier};
