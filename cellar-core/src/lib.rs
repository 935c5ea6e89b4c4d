//! # cellar-core
//!
//! Shared foundation for the Cellar pipeline: configuration loading and the
//! per-stage configuration records, the dataset schema description, model
//! hyperparameters, and atomic artifact persistence.

pub mod config;
pub mod error;
pub mod params;
pub mod persistence;
pub mod schema;

pub use config::{
    AppConfig, ConfigurationManager, DataIngestionConfig, DataTransformationConfig,
    DataValidationConfig, ModelEvaluationConfig, ModelTrainerConfig, PipelineConfig,
    ServerConfig, TrackingSettings, load_config,
};
pub use error::ConfigError;
pub use params::{ElasticNetParams, Hyperparameters};
pub use schema::{ColumnSpec, ColumnType, SchemaDescription};
