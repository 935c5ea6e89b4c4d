//! Error types for the cellar-ml crate.

use crate::pipeline::PipelineState;
use crate::stages::PipelineStage;
use cellar_core::ConfigError;
use thiserror::Error;

/// Error raised by a single stage or by the model and metric helpers.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Task error: {0}")]
    Task(String),
}

impl MlError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn tracking(msg: impl Into<String>) -> Self {
        Self::Tracking(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: PipelineStage,
        #[source]
        source: MlError,
    },
}

impl PipelineError {
    /// The stage that aborted the run.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::StageFailed { stage, .. } => *stage,
        }
    }

    /// Terminal state of the run this error ended.
    pub fn state(&self) -> PipelineState {
        PipelineState::Aborted(self.stage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failed_names_the_stage() {
        let err = PipelineError::StageFailed {
            stage: PipelineStage::Validation,
            source: MlError::not_found("dataset file not found: wine.csv"),
        };
        assert_eq!(err.stage(), PipelineStage::Validation);
        assert_eq!(err.state(), PipelineState::Aborted(PipelineStage::Validation));
        let text = err.to_string();
        assert!(text.contains("Data Validation"));
        assert!(text.contains("wine.csv"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: MlError = ConfigError::invalid("bad").into();
        assert!(matches!(err, MlError::Config(_)));
    }
}
