//! Error type for the inference service.

use axum::http::StatusCode;
use cellar_ml::{MlError, PipelineError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("model not found; run the training pipeline first")]
    ModelNotFound,

    #[error("invalid input: {}", .problems.join("; "))]
    InvalidInput { problems: Vec<String> },

    #[error("a training run is already in progress")]
    TrainingInProgress,

    #[error("training failed: {0}")]
    Training(#[from] PipelineError),

    #[error("{0}")]
    Ml(#[from] MlError),

    #[error("template error: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::ModelNotFound => StatusCode::SERVICE_UNAVAILABLE,
            ServeError::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServeError::TrainingInProgress => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short heading shown on the error page.
    pub fn title(&self) -> &'static str {
        match self {
            ServeError::ModelNotFound => "Model not found",
            ServeError::InvalidInput { .. } => "Invalid input",
            ServeError::TrainingInProgress => "Training in progress",
            ServeError::Training(_) => "Training failed",
            _ => "Internal error",
        }
    }

    /// Individual problems to list, if any.
    pub fn details(&self) -> Vec<String> {
        match self {
            ServeError::InvalidInput { problems } => problems.clone(),
            ServeError::Training(PipelineError::StageFailed { stage, source }) => {
                vec![format!("stage: {stage}"), format!("cause: {source}")]
            }
            _ => Vec::new(),
        }
    }
}
