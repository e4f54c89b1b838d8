use std::fs;
use std::path::Path;

use mobiprice_pipeline::{TrainedModelBundle, TrainingConfig};

use crate::error::IoResult;

/// Save a trained bundle (model, scaler ranges, evaluation) as JSON.
pub fn save_bundle<P: AsRef<Path>>(bundle: &TrainedModelBundle, path: P) -> IoResult<()> {
    let json = serde_json::to_string_pretty(bundle)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a bundle written by [`save_bundle`]. Model state that could not come
/// from training (dangling tree nodes, unknown features, ragged weights) is
/// rejected as `InvalidInput` here rather than failing at prediction time.
pub fn load_bundle<P: AsRef<Path>>(path: P) -> IoResult<TrainedModelBundle> {
    let json = fs::read_to_string(path)?;
    let bundle: TrainedModelBundle = serde_json::from_str(&json)?;
    bundle.check_structure()?;
    Ok(bundle)
}

/// Load a training config; absent keys take their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> IoResult<TrainingConfig> {
    let json = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&json)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &TrainingConfig, path: P) -> IoResult<()> {
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoError;
    use mobiprice_core::PriceError;
    use mobiprice_datasets::make_phones;
    use mobiprice_pipeline::{Algorithm, Trainer};

    #[test]
    fn test_bundle_round_trip_predicts_identically() {
        let phones = make_phones(120, Some(17));
        let mut config = TrainingConfig::default().with_seed(17);
        config.forest.n_trees = 4;
        config.cv_folds = 0;
        let bundle = Trainer::new(config).train(Algorithm::RandomForest, &phones).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        save_bundle(&bundle, &path).unwrap();
        let loaded = load_bundle(&path).unwrap();

        assert_eq!(loaded.algorithm(), Algorithm::RandomForest);
        assert_eq!(loaded.predictions(), bundle.predictions());
        assert_eq!(loaded.scaler(), bundle.scaler());
        for phone in &phones[..20] {
            assert_eq!(loaded.predict(phone).unwrap(), bundle.predict(phone).unwrap());
        }
    }

    fn tree_bundle_json(dir: &Path) -> (std::path::PathBuf, serde_json::Value) {
        let phones = make_phones(150, Some(23));
        let mut config = TrainingConfig::default().with_seed(23);
        config.cv_folds = 0;
        let bundle = Trainer::new(config).train(Algorithm::DecisionTree, &phones).unwrap();

        let path = dir.join("tree.json");
        save_bundle(&bundle, &path).unwrap();
        let json = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        (path, json)
    }

    fn rewrite_splits(json: &mut serde_json::Value, field: &str, value: u64) {
        for node in json["model"]["state"]["nodes"].as_array_mut().unwrap() {
            if let Some(split) = node.get_mut("Split") {
                split[field] = serde_json::json!(value);
            }
        }
    }

    #[test]
    fn test_load_rejects_unknown_split_feature() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut json) = tree_bundle_json(dir.path());
        rewrite_splits(&mut json, "feature_idx", 99);
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(
            load_bundle(&path),
            Err(IoError::Price(PriceError::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_load_rejects_cyclic_tree() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut json) = tree_bundle_json(dir.path());
        rewrite_splits(&mut json, "left", 0);
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(
            load_bundle(&path),
            Err(IoError::Price(PriceError::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = TrainingConfig::default().with_seed(99);
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);

        fs::write(&path, r#"{ "test_fraction": 2.0 }"#).unwrap();
        assert!(matches!(
            load_config(&path),
            Err(IoError::Price(PriceError::InvalidInput(_)))
        ));

        assert!(matches!(load_config(dir.path().join("missing.json")), Err(IoError::Io(_))));
    }
}
