//! Model trainer: fit ElasticNet on the training split.

use super::{PipelineStage, Stage, StageOutput, run_blocking};
use crate::dataset::NumericFrame;
use crate::error::MlError;
use crate::model::{ElasticNetEstimator, TrainedModel};
use async_trait::async_trait;
use cellar_core::ModelTrainerConfig;
use cellar_core::persistence;
use tracing::info;

#[derive(Clone)]
pub struct TrainerStage {
    config: ModelTrainerConfig,
}

impl TrainerStage {
    pub fn new(config: ModelTrainerConfig) -> Self {
        Self { config }
    }

    pub fn train(&self) -> Result<TrainedModel, MlError> {
        let features = self.config.schema.feature_names();
        let target = self.config.target_column();
        let frame = NumericFrame::from_csv(&self.config.train_data_path, &features, target)?;

        let estimator = ElasticNetEstimator::new(self.config.params.elastic_net.clone());
        let model = estimator.fit(&frame, target)?;
        let path = self.config.model_path();
        model.save(&path)?;

        info!(
            path = %path.display(),
            rows = model.train_rows,
            features = model.n_features(),
            intercept = model.intercept,
            "model trained"
        );
        Ok(model)
    }
}

#[async_trait]
impl Stage for TrainerStage {
    fn kind(&self) -> PipelineStage {
        PipelineStage::Training
    }

    async fn run(&self) -> Result<StageOutput, MlError> {
        let stage = self.clone();
        run_blocking(self.kind(), move || {
            persistence::create_directories(&[&stage.config.root_dir])?;
            let model = stage.train()?;
            Ok(StageOutput::Trained {
                model_path: stage.config.model_path(),
                train_rows: model.train_rows,
                n_features: model.n_features(),
            })
        })
        .await
    }
}
