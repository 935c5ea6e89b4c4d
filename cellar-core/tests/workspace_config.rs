//! Loads the repository's own declarative files through the configuration manager.

use cellar_core::{ConfigError, ConfigurationManager};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

fn copy_workspace(dir: &TempDir) {
    let root = repo_root();
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    for file in ["config/config.yaml", "schema.yaml", "params.yaml"] {
        std::fs::copy(root.join(file), dir.path().join(file)).unwrap();
    }
}

#[test]
fn test_repository_files_load() {
    let dir = TempDir::new().unwrap();
    copy_workspace(&dir);
    let manager = ConfigurationManager::from_workspace(dir.path()).unwrap();

    assert_eq!(manager.schema().feature_names().len(), 11);
    assert_eq!(manager.schema().target_column, "quality");
    assert_eq!(manager.params().elastic_net.alpha, 0.2);
    assert_eq!(manager.params().elastic_net.l1_ratio, 0.1);

    let ingestion = manager.data_ingestion_config();
    assert!(ingestion.source_url.starts_with("https://"));
    assert_eq!(
        ingestion.local_data_file,
        dir.path().join("artifacts/data_ingestion/data.zip")
    );

    let validation = manager.data_validation_config();
    let transformation = manager.data_transformation_config();
    assert_eq!(validation.unzip_data_dir, transformation.data_path);
    assert_eq!(transformation.test_size, 0.25);
    assert_eq!(transformation.random_seed, 42);

    let trainer = manager.model_trainer_config();
    let evaluation = manager.model_evaluation_config();
    assert_eq!(trainer.model_path(), evaluation.model_path);
    assert_eq!(
        trainer.train_data_path,
        transformation.root_dir.join("train.csv")
    );
    assert_eq!(
        evaluation.test_data_path,
        transformation.root_dir.join("test.csv")
    );
    assert_eq!(manager.artifacts_root(), dir.path().join("artifacts"));
    assert_eq!(evaluation.target_column, "quality");
    assert!(evaluation.tracking.uri.is_none());

    assert!(manager.pipeline_config().halt_on_invalid_schema);
    assert_eq!(manager.server_config().port, 8080);
}

#[test]
fn test_each_artifact_path_has_one_producer() {
    let dir = TempDir::new().unwrap();
    copy_workspace(&dir);
    let manager = ConfigurationManager::from_workspace(dir.path()).unwrap();

    let produced = [
        manager.data_ingestion_config().local_data_file,
        manager.data_validation_config().status_file,
        manager.data_transformation_config().root_dir.join("train.csv"),
        manager.data_transformation_config().root_dir.join("test.csv"),
        manager.model_trainer_config().model_path(),
        manager.model_evaluation_config().metric_file_name,
    ];
    for (i, a) in produced.iter().enumerate() {
        for b in &produced[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn test_missing_schema_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    copy_workspace(&dir);
    std::fs::remove_file(dir.path().join("schema.yaml")).unwrap();
    let err = ConfigurationManager::from_workspace(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn test_invalid_test_size_rejected() {
    let dir = TempDir::new().unwrap();
    copy_workspace(&dir);
    let path = dir.path().join("config/config.yaml");
    let text = std::fs::read_to_string(&path)
        .unwrap()
        .replace("test_size: 0.25", "test_size: 1.5");
    std::fs::write(&path, text).unwrap();
    let err = ConfigurationManager::from_workspace(dir.path()).unwrap_err();
    assert!(err.to_string().contains("test_size"));
}
