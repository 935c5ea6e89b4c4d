//! # cellar-ml
//!
//! The training side of Cellar. Each stage of the pipeline reads the
//! artifacts of the one before it and writes its own:
//!
//! - [`stages::IngestionStage`] downloads and unpacks the dataset archive.
//! - [`stages::ValidationStage`] checks the CSV header against the schema.
//! - [`stages::TransformationStage`] writes a seeded train/test split.
//! - [`stages::TrainerStage`] fits an ElasticNet model.
//! - [`stages::EvaluationStage`] scores it and reports to a tracker.
//!
//! [`pipeline::TrainingPipeline`] runs them in order.

pub mod dataset;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod stages;
pub mod tracking;

pub use dataset::{CsvTable, NumericFrame};
pub use error::{MlError, PipelineError};
pub use metrics::RegressionMetrics;
pub use model::{ElasticNetEstimator, TrainedModel};
pub use pipeline::{PipelineRun, PipelineState, StageRecord, StageSet, TrainingPipeline};
pub use stages::{PipelineStage, Stage, StageOutput, ValidationReport};
pub use tracking::{ExperimentTracker, MlflowTracker, TrackedRun};
