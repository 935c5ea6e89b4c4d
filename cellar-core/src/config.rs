//! Configuration system for Cellar.
//!
//! Uses `figment` for layered configuration: defaults -> `config/config.yaml` ->
//! environment (`CELLAR_<SECTION>__<KEY>`). The schema (`schema.yaml`) and the
//! hyperparameters (`params.yaml`) are separate declarative files.
//!
//! [`ConfigurationManager`] loads everything once and hands out one immutable
//! record per pipeline stage, with relative paths resolved against the
//! workspace root.

use crate::error::ConfigError;
use crate::params::Hyperparameters;
use crate::schema::SchemaDescription;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Workspace-relative location of the main configuration file.
pub const CONFIG_FILE: &str = "config/config.yaml";
/// Workspace-relative location of the schema file.
pub const SCHEMA_FILE: &str = "schema.yaml";
/// Workspace-relative location of the hyperparameter file.
pub const PARAMS_FILE: &str = "params.yaml";

/// Raw contents of `config/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_artifacts_root")]
    pub artifacts_root: PathBuf,
    #[serde(default)]
    pub data_ingestion: IngestionSection,
    #[serde(default)]
    pub data_validation: ValidationSection,
    #[serde(default)]
    pub data_transformation: TransformationSection,
    #[serde(default)]
    pub model_trainer: TrainerSection,
    #[serde(default)]
    pub model_evaluation: EvaluationSection,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts_root: default_artifacts_root(),
            data_ingestion: IngestionSection::default(),
            data_validation: ValidationSection::default(),
            data_transformation: TransformationSection::default(),
            model_trainer: TrainerSection::default(),
            model_evaluation: EvaluationSection::default(),
            tracking: TrackingConfig::default(),
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

fn default_artifacts_root() -> PathBuf {
    PathBuf::from("artifacts")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionSection {
    pub root_dir: PathBuf,
    pub source_url: String,
    pub local_data_file: PathBuf,
    pub unzip_dir: PathBuf,
}

impl Default for IngestionSection {
    fn default() -> Self {
        Self {
            root_dir: "artifacts/data_ingestion".into(),
            source_url:
                "https://github.com/krishnaik06/datasets/raw/refs/heads/main/winequality-data.zip"
                    .into(),
            local_data_file: "artifacts/data_ingestion/data.zip".into(),
            unzip_dir: "artifacts/data_ingestion".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    pub root_dir: PathBuf,
    pub unzip_data_dir: PathBuf,
    pub status_file: PathBuf,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            root_dir: "artifacts/data_validation".into(),
            unzip_data_dir: "artifacts/data_ingestion/winequality-red.csv".into(),
            status_file: "artifacts/data_validation/status.txt".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationSection {
    pub root_dir: PathBuf,
    pub data_path: PathBuf,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

impl Default for TransformationSection {
    fn default() -> Self {
        Self {
            root_dir: "artifacts/data_transformation".into(),
            data_path: "artifacts/data_ingestion/winequality-red.csv".into(),
            test_size: default_test_size(),
            random_seed: default_seed(),
        }
    }
}

fn default_test_size() -> f64 {
    0.25
}

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerSection {
    pub root_dir: PathBuf,
    pub train_data_path: PathBuf,
    pub model_name: String,
}

impl Default for TrainerSection {
    fn default() -> Self {
        Self {
            root_dir: "artifacts/model_trainer".into(),
            train_data_path: "artifacts/data_transformation/train.csv".into(),
            model_name: "model.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSection {
    pub root_dir: PathBuf,
    pub test_data_path: PathBuf,
    pub model_path: PathBuf,
    pub metric_file_name: PathBuf,
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            root_dir: "artifacts/model_evaluation".into(),
            test_data_path: "artifacts/data_transformation/test.csv".into(),
            model_path: "artifacts/model_trainer/model.json".into(),
            metric_file_name: "artifacts/model_evaluation/metrics.json".into(),
        }
    }
}

/// Optional MLflow-compatible experiment tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Tracking server base URI; tracking is disabled when unset.
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "default_experiment_id")]
    pub experiment_id: String,
    #[serde(default = "default_registered_model_name")]
    pub registered_model_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_tracking_timeout")]
    pub timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            uri: None,
            experiment_id: default_experiment_id(),
            registered_model_name: default_registered_model_name(),
            username: None,
            password: None,
            timeout_secs: default_tracking_timeout(),
        }
    }
}

impl TrackingConfig {
    /// The tracking URI, if one is configured and non-blank.
    pub fn endpoint(&self) -> Option<&str> {
        self.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

fn default_experiment_id() -> String {
    "0".to_string()
}

fn default_registered_model_name() -> String {
    "ElasticnetModel".to_string()
}

fn default_tracking_timeout() -> u64 {
    10
}

/// Orchestrator behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Abort the run at Validation when the header does not match the schema.
    #[serde(default = "default_true")]
    pub halt_on_invalid_schema: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            halt_on_invalid_schema: true,
        }
    }
}

/// Inference service bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

/// Load `config.yaml` layered over the built-in defaults and `CELLAR_` env vars.
///
/// The file itself must exist; defaults only fill keys it leaves out.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Yaml::file(path))
        .merge(Env::prefixed("CELLAR_").split("__"))
        .extract()
        .map_err(|e| ConfigError::parse(path, e))?;
    tracing::info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

// ---------------------------------------------------------------------------
// Per-stage configuration records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub root_dir: PathBuf,
    pub source_url: String,
    pub local_data_file: PathBuf,
    pub unzip_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    pub root_dir: PathBuf,
    pub unzip_data_dir: PathBuf,
    pub status_file: PathBuf,
    pub schema: SchemaDescription,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTransformationConfig {
    pub root_dir: PathBuf,
    pub data_path: PathBuf,
    pub test_size: f64,
    pub random_seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelTrainerConfig {
    pub root_dir: PathBuf,
    pub train_data_path: PathBuf,
    pub model_name: String,
    pub params: Hyperparameters,
    pub schema: SchemaDescription,
}

impl ModelTrainerConfig {
    pub fn model_path(&self) -> PathBuf {
        self.root_dir.join(&self.model_name)
    }

    pub fn target_column(&self) -> &str {
        &self.schema.target_column
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvaluationConfig {
    pub root_dir: PathBuf,
    pub test_data_path: PathBuf,
    pub model_path: PathBuf,
    pub metric_file_name: PathBuf,
    pub all_params: Hyperparameters,
    pub target_column: String,
    pub tracking: TrackingSettings,
}

/// Tracking settings with the URI already checked for blankness.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    pub uri: Option<String>,
    pub experiment_id: String,
    pub registered_model_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

/// Resolves every configuration source into per-stage records.
#[derive(Debug, Clone)]
pub struct ConfigurationManager {
    workspace: PathBuf,
    config: AppConfig,
    schema: SchemaDescription,
    params: Hyperparameters,
}

impl ConfigurationManager {
    /// Load `config/config.yaml`, `schema.yaml` and `params.yaml` from a workspace.
    pub fn from_workspace(workspace: &Path) -> Result<Self, ConfigError> {
        let config = load_config(&workspace.join(CONFIG_FILE))?;
        let schema = SchemaDescription::from_yaml_file(&workspace.join(SCHEMA_FILE))?;
        let params = Hyperparameters::from_yaml_file(&workspace.join(PARAMS_FILE))?;
        Self::new(workspace.to_path_buf(), config, schema, params)
    }

    /// Build from already-parsed sources.
    pub fn new(
        workspace: PathBuf,
        config: AppConfig,
        schema: SchemaDescription,
        params: Hyperparameters,
    ) -> Result<Self, ConfigError> {
        schema.check()?;
        params.elastic_net.validate()?;
        let test_size = config.data_transformation.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(ConfigError::invalid(format!(
                "data_transformation.test_size must be within (0, 1), got {test_size}"
            )));
        }
        if config.model_trainer.model_name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "model_trainer.model_name".into(),
            });
        }
        Ok(Self {
            workspace,
            config,
            schema,
            params,
        })
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    /// Resolve a configured path against the workspace root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Directory every stage writes beneath.
    pub fn artifacts_root(&self) -> PathBuf {
        self.resolve(&self.config.artifacts_root)
    }

    pub fn data_ingestion_config(&self) -> DataIngestionConfig {
        let section = &self.config.data_ingestion;
        DataIngestionConfig {
            root_dir: self.resolve(&section.root_dir),
            source_url: section.source_url.clone(),
            local_data_file: self.resolve(&section.local_data_file),
            unzip_dir: self.resolve(&section.unzip_dir),
        }
    }

    pub fn data_validation_config(&self) -> DataValidationConfig {
        let section = &self.config.data_validation;
        DataValidationConfig {
            root_dir: self.resolve(&section.root_dir),
            unzip_data_dir: self.resolve(&section.unzip_data_dir),
            status_file: self.resolve(&section.status_file),
            schema: self.schema.clone(),
        }
    }

    pub fn data_transformation_config(&self) -> DataTransformationConfig {
        let section = &self.config.data_transformation;
        DataTransformationConfig {
            root_dir: self.resolve(&section.root_dir),
            data_path: self.resolve(&section.data_path),
            test_size: section.test_size,
            random_seed: section.random_seed,
        }
    }

    pub fn model_trainer_config(&self) -> ModelTrainerConfig {
        let section = &self.config.model_trainer;
        ModelTrainerConfig {
            root_dir: self.resolve(&section.root_dir),
            train_data_path: self.resolve(&section.train_data_path),
            model_name: section.model_name.clone(),
            params: self.params.clone(),
            schema: self.schema.clone(),
        }
    }

    pub fn model_evaluation_config(&self) -> ModelEvaluationConfig {
        let section = &self.config.model_evaluation;
        let tracking = &self.config.tracking;
        ModelEvaluationConfig {
            root_dir: self.resolve(&section.root_dir),
            test_data_path: self.resolve(&section.test_data_path),
            model_path: self.resolve(&section.model_path),
            metric_file_name: self.resolve(&section.metric_file_name),
            all_params: self.params.clone(),
            target_column: self.schema.target_column.clone(),
            tracking: TrackingSettings {
                uri: tracking.endpoint().map(str::to_string),
                experiment_id: tracking.experiment_id.clone(),
                registered_model_name: tracking.registered_model_name.clone(),
                username: tracking.username.clone(),
                password: tracking.password.clone(),
                timeout_secs: tracking.timeout_secs,
            },
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        self.config.pipeline.clone()
    }

    pub fn server_config(&self) -> ServerConfig {
        self.config.server.clone()
    }

    /// Path the inference service loads the model from.
    pub fn model_path(&self) -> PathBuf {
        self.model_trainer_config().model_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ElasticNetParams;
    use crate::schema::{ColumnSpec, ColumnType};
    use pretty_assertions::assert_eq;

    fn schema() -> SchemaDescription {
        SchemaDescription {
            columns: vec![
                ColumnSpec {
                    name: "alcohol".into(),
                    dtype: ColumnType::Float64,
                },
                ColumnSpec {
                    name: "quality".into(),
                    dtype: ColumnType::Int64,
                },
            ],
            target_column: "quality".into(),
        }
    }

    fn params() -> Hyperparameters {
        Hyperparameters {
            elastic_net: ElasticNetParams::default(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.artifacts_root, PathBuf::from("artifacts"));
        assert_eq!(config.data_transformation.test_size, 0.25);
        assert_eq!(config.model_trainer.model_name, "model.json");
        assert!(config.tracking.uri.is_none());
        assert!(config.pipeline.halt_on_invalid_schema);
    }

    #[test]
    fn test_relative_paths_resolve_against_workspace() {
        let manager = ConfigurationManager::new(
            PathBuf::from("/srv/cellar"),
            AppConfig::default(),
            schema(),
            params(),
        )
        .unwrap();

        let ingestion = manager.data_ingestion_config();
        assert_eq!(
            ingestion.local_data_file,
            PathBuf::from("/srv/cellar/artifacts/data_ingestion/data.zip")
        );
        assert_eq!(
            manager.model_trainer_config().model_path(),
            PathBuf::from("/srv/cellar/artifacts/model_trainer/model.json")
        );
        assert_eq!(manager.model_path(), manager.model_trainer_config().model_path());
        assert_eq!(manager.model_evaluation_config().target_column, "quality");
    }

    #[test]
    fn test_absolute_paths_kept() {
        let mut config = AppConfig::default();
        config.data_validation.status_file = PathBuf::from("/tmp/status.txt");
        let manager =
            ConfigurationManager::new(PathBuf::from("/ws"), config, schema(), params()).unwrap();
        assert_eq!(
            manager.data_validation_config().status_file,
            PathBuf::from("/tmp/status.txt")
        );
    }

    #[test]
    fn test_invalid_test_size_rejected() {
        let mut config = AppConfig::default();
        config.data_transformation.test_size = 1.0;
        let err = ConfigurationManager::new(PathBuf::from("."), config, schema(), params())
            .unwrap_err();
        assert!(err.to_string().contains("test_size"));
    }

    #[test]
    fn test_blank_tracking_uri_disables_tracking() {
        let mut config = AppConfig::default();
        config.tracking.uri = Some("   ".into());
        let manager =
            ConfigurationManager::new(PathBuf::from("."), config, schema(), params()).unwrap();
        assert!(manager.model_evaluation_config().tracking.uri.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_config_merges_yaml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
artifacts_root: out
data_transformation:
  root_dir: out/data_transformation
  data_path: out/data_ingestion/wine.csv
  test_size: 0.2
server:
  port: 9000
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.artifacts_root, PathBuf::from("out"));
        assert_eq!(config.data_transformation.test_size, 0.2);
        assert_eq!(config.data_transformation.random_seed, 42);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model_trainer.model_name, "model.json");
    }

    #[test]
    fn test_load_config_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  port: not-a-port\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
