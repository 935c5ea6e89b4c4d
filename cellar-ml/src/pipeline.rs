//! Training pipeline orchestrator.
//!
//! Drives the five stages in a fixed order:
//!
//! ```text
//! Ingestion -> Validation -> Transformation -> Training -> Evaluation -> Done
//!      \___________\______________\______________\___________\-> Aborted
//! ```
//!
//! A stage error aborts the run at that stage. There is no rollback and no
//! resumption; a new run always starts from ingestion. A failed schema check
//! aborts at validation when `halt_on_invalid_schema` is set.

use crate::error::{MlError, PipelineError};
use crate::stages::{
    EvaluationStage, IngestionStage, PipelineStage, Stage, StageOutput, TrainerStage,
    TransformationStage, ValidationStage,
};
use cellar_core::{ConfigurationManager, PipelineConfig, persistence};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    Running(PipelineStage),
    Done,
    Aborted(PipelineStage),
}

/// Record of one executed stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: PipelineStage,
    pub duration_ms: u64,
    pub summary: String,
    pub output: StageOutput,
}

/// Report of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: PipelineState,
    pub stages: Vec<StageRecord>,
}

impl PipelineRun {
    pub fn output(&self, stage: PipelineStage) -> Option<&StageOutput> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.output)
    }
}

/// One implementation per pipeline stage.
#[derive(Clone)]
pub struct StageSet {
    ingestion: Arc<dyn Stage>,
    validation: Arc<dyn Stage>,
    transformation: Arc<dyn Stage>,
    training: Arc<dyn Stage>,
    evaluation: Arc<dyn Stage>,
}

impl StageSet {
    /// The production stages, configured from the workspace.
    pub fn from_config(manager: &ConfigurationManager) -> Result<Self, MlError> {
        Ok(Self {
            ingestion: Arc::new(IngestionStage::new(manager.data_ingestion_config())),
            validation: Arc::new(ValidationStage::new(manager.data_validation_config())),
            transformation: Arc::new(TransformationStage::new(
                manager.data_transformation_config(),
            )),
            training: Arc::new(TrainerStage::new(manager.model_trainer_config())),
            evaluation: Arc::new(EvaluationStage::new(manager.model_evaluation_config())?),
        })
    }

    /// Build from explicit implementations. Each must report the matching kind.
    pub fn new(
        ingestion: Arc<dyn Stage>,
        validation: Arc<dyn Stage>,
        transformation: Arc<dyn Stage>,
        training: Arc<dyn Stage>,
        evaluation: Arc<dyn Stage>,
    ) -> Result<Self, MlError> {
        let set = Self {
            ingestion,
            validation,
            transformation,
            training,
            evaluation,
        };
        for stage in PipelineStage::ALL {
            let actual = set.get(stage).kind();
            if actual != stage {
                return Err(MlError::invalid_input(format!(
                    "stage slot '{stage}' holds a '{actual}' implementation"
                )));
            }
        }
        Ok(set)
    }

    /// Swap in a different implementation for the stage it reports.
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        match stage.kind() {
            PipelineStage::Ingestion => self.ingestion = stage,
            PipelineStage::Validation => self.validation = stage,
            PipelineStage::Transformation => self.transformation = stage,
            PipelineStage::Training => self.training = stage,
            PipelineStage::Evaluation => self.evaluation = stage,
        }
        self
    }

    pub fn get(&self, stage: PipelineStage) -> &Arc<dyn Stage> {
        match stage {
            PipelineStage::Ingestion => &self.ingestion,
            PipelineStage::Validation => &self.validation,
            PipelineStage::Transformation => &self.transformation,
            PipelineStage::Training => &self.training,
            PipelineStage::Evaluation => &self.evaluation,
        }
    }
}

pub struct TrainingPipeline {
    stages: StageSet,
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(stages: StageSet, config: PipelineConfig) -> Self {
        Self { stages, config }
    }

    /// Production pipeline for `manager`. Creates the artifacts root.
    pub fn from_config(manager: &ConfigurationManager) -> Result<Self, MlError> {
        persistence::create_directories(&[manager.artifacts_root()])?;
        Ok(Self::new(
            StageSet::from_config(manager)?,
            manager.pipeline_config(),
        ))
    }

    /// Run every stage from ingestion to evaluation.
    pub async fn run(&self) -> Result<PipelineRun, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut records = Vec::with_capacity(PipelineStage::ALL.len());
        let mut state = PipelineState::Running(PipelineStage::Ingestion);
        info!(%run_id, "training pipeline started");

        while let PipelineState::Running(stage) = state {
            match self.execute(stage).await {
                Ok(record) => {
                    records.push(record);
                    state = match stage.next() {
                        Some(next) => PipelineState::Running(next),
                        None => PipelineState::Done,
                    };
                }
                Err(source) => {
                    error!(%run_id, stage = %stage, error = %source, "training pipeline aborted");
                    return Err(PipelineError::StageFailed { stage, source });
                }
            }
        }

        let finished_at = Utc::now();
        info!(
            %run_id,
            stages = records.len(),
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "training pipeline completed"
        );
        Ok(PipelineRun {
            run_id,
            started_at,
            finished_at,
            state,
            stages: records,
        })
    }

    /// Run a single stage on its own, against whatever artifacts already exist.
    pub async fn run_stage(&self, stage: PipelineStage) -> Result<StageRecord, PipelineError> {
        self.execute(stage)
            .await
            .map_err(|source| PipelineError::StageFailed { stage, source })
    }

    async fn execute(&self, stage: PipelineStage) -> Result<StageRecord, MlError> {
        info!(stage = %stage, ">>>>>> stage started <<<<<<");
        let clock = Instant::now();
        let output = self.stages.get(stage).run().await?;

        if let StageOutput::Validated(report) = &output {
            if !report.status && self.config.halt_on_invalid_schema {
                return Err(MlError::SchemaMismatch(format!(
                    "missing columns {:?}, unexpected columns {:?}, order mismatch: {}",
                    report.missing_columns, report.unexpected_columns, report.order_mismatch
                )));
            }
        }

        let record = StageRecord {
            stage,
            duration_ms: clock.elapsed().as_millis() as u64,
            summary: output.summary(),
            output,
        };
        info!(
            stage = %stage,
            duration_ms = record.duration_ms,
            summary = %record.summary,
            ">>>>>> stage completed <<<<<<"
        );
        Ok(record)
    }
}
