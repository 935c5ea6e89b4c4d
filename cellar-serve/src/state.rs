//! Shared service state: configuration, the model handle and the training lock.

use crate::error::ServeError;
use crate::views::Views;
use cellar_core::ConfigurationManager;
use cellar_ml::{MlError, PipelineState, TrainedModel, TrainingPipeline};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Currently served model. Replaced wholesale, never mutated in place.
#[derive(Default)]
pub struct ModelHandle {
    slot: RwLock<Option<Arc<TrainedModel>>>,
}

impl ModelHandle {
    pub async fn get(&self) -> Option<Arc<TrainedModel>> {
        self.slot.read().await.clone()
    }

    pub async fn replace(&self, model: TrainedModel) -> Arc<TrainedModel> {
        let model = Arc::new(model);
        *self.slot.write().await = Some(model.clone());
        model
    }

    /// Install `model` only if the slot is still empty, returning whichever
    /// model ends up being served.
    pub async fn install_if_empty(&self, model: TrainedModel) -> Arc<TrainedModel> {
        let mut slot = self.slot.write().await;
        if let Some(current) = slot.as_ref() {
            return current.clone();
        }
        let model = Arc::new(model);
        *slot = Some(model.clone());
        model
    }

    pub async fn is_loaded(&self) -> bool {
        self.slot.read().await.is_some()
    }
}

struct Inner {
    manager: ConfigurationManager,
    pipeline: TrainingPipeline,
    views: Views,
    model: ModelHandle,
    training: Mutex<()>,
    last_run: RwLock<Option<PipelineState>>,
}

/// Cheaply cloneable handle passed to every request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    /// State wired to the production pipeline of `manager`.
    pub fn from_config(manager: ConfigurationManager) -> Result<Self, ServeError> {
        let pipeline = TrainingPipeline::from_config(&manager)?;
        Self::new(manager, pipeline)
    }

    pub fn new(manager: ConfigurationManager, pipeline: TrainingPipeline) -> Result<Self, ServeError> {
        Ok(Self {
            inner: Arc::new(Inner {
                manager,
                pipeline,
                views: Views::new()?,
                model: ModelHandle::default(),
                training: Mutex::new(()),
                last_run: RwLock::new(None),
            }),
        })
    }

    pub fn manager(&self) -> &ConfigurationManager {
        &self.inner.manager
    }

    pub fn pipeline(&self) -> &TrainingPipeline {
        &self.inner.pipeline
    }

    pub fn views(&self) -> &Views {
        &self.inner.views
    }

    pub fn model_handle(&self) -> &ModelHandle {
        &self.inner.model
    }

    /// Claim the training slot, or `None` while another run holds it.
    pub fn try_begin_training(&self) -> Option<MutexGuard<'_, ()>> {
        self.inner.training.try_lock().ok()
    }

    pub async fn last_run(&self) -> Option<PipelineState> {
        *self.inner.last_run.read().await
    }

    pub async fn record_run(&self, state: PipelineState) {
        *self.inner.last_run.write().await = Some(state);
    }

    /// The loaded model, loading it from disk on first use.
    pub async fn model(&self) -> Result<Arc<TrainedModel>, ServeError> {
        if let Some(model) = self.inner.model.get().await {
            return Ok(model);
        }
        let path = self.inner.manager.model_path();
        match TrainedModel::load(&path) {
            Ok(model) => {
                tracing::info!(path = %path.display(), "model loaded from disk");
                // A retrain may have installed a newer model while we were reading.
                Ok(self.inner.model.install_if_empty(model).await)
            }
            Err(MlError::NotFound(_)) => Err(ServeError::ModelNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Reload the model from disk after a training run.
    pub async fn reload_model(&self) -> Result<Arc<TrainedModel>, ServeError> {
        let model = TrainedModel::load(&self.inner.manager.model_path())?;
        Ok(self.inner.model.replace(model).await)
    }
}
