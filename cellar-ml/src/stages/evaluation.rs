//! Model evaluation: score the test split, persist metrics, report to a tracker.

use super::{PipelineStage, Stage, StageOutput, run_blocking};
use crate::dataset::NumericFrame;
use crate::error::MlError;
use crate::metrics::RegressionMetrics;
use crate::model::TrainedModel;
use crate::tracking::{ExperimentTracker, MlflowTracker, TrackedRun};
use async_trait::async_trait;
use cellar_core::ModelEvaluationConfig;
use cellar_core::persistence;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct EvaluationStage {
    config: ModelEvaluationConfig,
    tracker: Option<Arc<dyn ExperimentTracker>>,
}

impl EvaluationStage {
    /// Build the stage with the MLflow tracker described by the configuration, if any.
    pub fn new(config: ModelEvaluationConfig) -> Result<Self, MlError> {
        let tracker = MlflowTracker::from_settings(&config.tracking)?
            .map(|t| Arc::new(t) as Arc<dyn ExperimentTracker>);
        Ok(Self { config, tracker })
    }

    pub fn with_tracker(
        config: ModelEvaluationConfig,
        tracker: Option<Arc<dyn ExperimentTracker>>,
    ) -> Self {
        Self { config, tracker }
    }

    pub fn evaluate(&self) -> Result<RegressionMetrics, MlError> {
        let model = TrainedModel::load(&self.config.model_path)?;
        if model.target_column != self.config.target_column {
            return Err(MlError::model(format!(
                "model was trained for target '{}', evaluation expects '{}'",
                model.target_column, self.config.target_column
            )));
        }
        let frame = NumericFrame::from_csv(
            &self.config.test_data_path,
            &model.feature_names,
            &self.config.target_column,
        )?;
        let predictions = model.predict(&frame.features)?;
        RegressionMetrics::compute(&predictions, &frame.target)
    }

    /// Report to the tracker. Failures are logged and swallowed.
    async fn track(&self, metrics: &RegressionMetrics) -> bool {
        let Some(tracker) = &self.tracker else {
            return false;
        };
        let run = TrackedRun {
            run_name: format!("elasticnet-{}", uuid::Uuid::new_v4()),
            params: self.config.all_params.elastic_net.as_pairs(),
            metrics: *metrics,
            model_path: self.config.model_path.clone(),
            registered_model_name: self.config.tracking.registered_model_name.clone(),
        };
        match tracker.log_run(&run).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    tracker = tracker.name(),
                    error = %e,
                    "experiment tracking failed; metrics are saved locally"
                );
                false
            }
        }
    }
}

#[async_trait]
impl Stage for EvaluationStage {
    fn kind(&self) -> PipelineStage {
        PipelineStage::Evaluation
    }

    async fn run(&self) -> Result<StageOutput, MlError> {
        let stage = self.clone();
        let metrics = run_blocking(self.kind(), move || {
            persistence::create_directories(&[&stage.config.root_dir])?;
            let metrics = stage.evaluate()?;
            persistence::atomic_write_json(&stage.config.metric_file_name, &metrics)?;
            Ok(metrics)
        })
        .await?;
        info!(
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            path = %self.config.metric_file_name.display(),
            "metrics saved"
        );
        let tracked = self.track(&metrics).await;
        Ok(StageOutput::Evaluated {
            metrics_path: self.config.metric_file_name.clone(),
            metrics,
            tracked,
        })
    }
}
