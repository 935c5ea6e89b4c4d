//! Experiment tracking against an MLflow-compatible REST API.
//!
//! Tracking is best-effort: the evaluation stage persists metrics first and
//! only logs a warning when the tracker fails.

use crate::error::MlError;
use crate::metrics::RegressionMetrics;
use async_trait::async_trait;
use cellar_core::TrackingSettings;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

/// Everything reported for one evaluated model.
#[derive(Debug, Clone)]
pub struct TrackedRun {
    pub run_name: String,
    pub params: Vec<(String, String)>,
    pub metrics: RegressionMetrics,
    pub model_path: PathBuf,
    pub registered_model_name: String,
}

/// Sink for evaluation results.
#[async_trait]
pub trait ExperimentTracker: Send + Sync {
    fn name(&self) -> &str;

    /// Record the run and return the tracker's run id.
    async fn log_run(&self, run: &TrackedRun) -> Result<String, MlError>;
}

/// Client for the MLflow tracking REST API (`/api/2.0/mlflow/...`).
pub struct MlflowTracker {
    base_url: String,
    experiment_id: String,
    credentials: Option<(String, String)>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: RunEnvelope,
}

#[derive(Deserialize)]
struct RunEnvelope {
    info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
    run_id: String,
}

impl MlflowTracker {
    /// Build a tracker when a URI is configured; `None` disables tracking.
    pub fn from_settings(settings: &TrackingSettings) -> Result<Option<Self>, MlError> {
        let Some(uri) = settings.uri.as_deref() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        let credentials = settings
            .username
            .clone()
            .map(|user| (user, settings.password.clone().unwrap_or_default()));
        Ok(Some(Self {
            base_url: uri.trim_end_matches('/').to_string(),
            experiment_id: settings.experiment_id.clone(),
            credentials,
            client,
        }))
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/api/2.0/mlflow/{method}", self.base_url)
    }

    async fn post(&self, method: &str, body: serde_json::Value) -> Result<reqwest::Response, MlError> {
        let mut request = self.client.post(self.endpoint(method)).json(&body);
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MlError::tracking(format!("{method} returned HTTP {status}: {text}")));
        }
        Ok(response)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl ExperimentTracker for MlflowTracker {
    fn name(&self) -> &str {
        "mlflow"
    }

    async fn log_run(&self, run: &TrackedRun) -> Result<String, MlError> {
        let started = now_millis();
        let created: CreateRunResponse = self
            .post(
                "runs/create",
                json!({
                    "experiment_id": self.experiment_id,
                    "run_name": run.run_name,
                    "start_time": started,
                }),
            )
            .await?
            .json()
            .await?;
        let run_id = created.run.info.run_id;

        let params: Vec<_> = run
            .params
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": v }))
            .collect();
        let metrics: Vec<_> = run
            .metrics
            .as_pairs()
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": v, "timestamp": started, "step": 0 }))
            .collect();
        let tags = vec![
            json!({ "key": "model_path", "value": run.model_path.display().to_string() }),
            json!({ "key": "registered_model_name", "value": run.registered_model_name }),
        ];
        self.post(
            "runs/log-batch",
            json!({ "run_id": run_id, "params": params, "metrics": metrics, "tags": tags }),
        )
        .await?;

        self.post(
            "runs/update",
            json!({ "run_id": run_id, "status": "FINISHED", "end_time": now_millis() }),
        )
        .await?;

        tracing::info!(tracker = self.name(), run_id = %run_id, "run logged to tracking server");
        Ok(run_id)
    }
}
