//! The five pipeline stages and the contract the orchestrator drives them by.

pub mod evaluation;
pub mod ingestion;
pub mod trainer;
pub mod transformation;
pub mod validation;

use crate::error::MlError;
use crate::metrics::RegressionMetrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use evaluation::EvaluationStage;
pub use ingestion::IngestionStage;
pub use trainer::TrainerStage;
pub use transformation::{SplitSummary, TransformationStage, train_test_split};
pub use validation::{ValidationReport, ValidationStage};

/// Position in the linear pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Evaluation,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 5] = [
        PipelineStage::Ingestion,
        PipelineStage::Validation,
        PipelineStage::Transformation,
        PipelineStage::Training,
        PipelineStage::Evaluation,
    ];

    /// The stage that follows this one, or `None` after evaluation.
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Ingestion => Some(PipelineStage::Validation),
            PipelineStage::Validation => Some(PipelineStage::Transformation),
            PipelineStage::Transformation => Some(PipelineStage::Training),
            PipelineStage::Training => Some(PipelineStage::Evaluation),
            PipelineStage::Evaluation => None,
        }
    }

    /// Short identifier used on the command line.
    pub fn key(self) -> &'static str {
        match self {
            PipelineStage::Ingestion => "ingestion",
            PipelineStage::Validation => "validation",
            PipelineStage::Transformation => "transformation",
            PipelineStage::Training => "training",
            PipelineStage::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Ingestion => "Data Ingestion",
            PipelineStage::Validation => "Data Validation",
            PipelineStage::Transformation => "Data Transformation",
            PipelineStage::Training => "Model Trainer",
            PipelineStage::Evaluation => "Model Evaluation",
        };
        f.write_str(name)
    }
}

impl FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PipelineStage::ALL
            .into_iter()
            .find(|stage| stage.key() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = PipelineStage::ALL.iter().map(|s| s.key()).collect();
                format!("unknown stage '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// What a stage produced, for the run report and for gating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutput {
    Ingested {
        archive: PathBuf,
        extracted: Vec<PathBuf>,
        downloaded: bool,
    },
    Validated(ValidationReport),
    Transformed(SplitSummary),
    Trained {
        model_path: PathBuf,
        train_rows: usize,
        n_features: usize,
    },
    Evaluated {
        metrics_path: PathBuf,
        metrics: RegressionMetrics,
        tracked: bool,
    },
}

impl StageOutput {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self {
            StageOutput::Ingested {
                extracted,
                downloaded,
                ..
            } => format!(
                "{} file(s) extracted{}",
                extracted.len(),
                if *downloaded { ", archive downloaded" } else { "" }
            ),
            StageOutput::Validated(report) => format!("validation status: {}", report.status),
            StageOutput::Transformed(split) => {
                format!("{} train rows, {} test rows", split.train_rows, split.test_rows)
            }
            StageOutput::Trained {
                train_rows,
                n_features,
                ..
            } => format!("fitted on {train_rows} rows x {n_features} features"),
            StageOutput::Evaluated { metrics, .. } => format!(
                "rmse={:.4} mae={:.4} r2={:.4}",
                metrics.rmse, metrics.mae, metrics.r2
            ),
        }
    }
}

/// Run a stage's file and numeric work on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(stage: PipelineStage, work: F) -> Result<T, MlError>
where
    F: FnOnce() -> Result<T, MlError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| MlError::Task(format!("{stage} task join error: {e}")))?
}

/// A unit of pipeline work, injected into the orchestrator.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> PipelineStage;

    async fn run(&self) -> Result<StageOutput, MlError>;
}
