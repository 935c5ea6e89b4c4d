//! Regression metrics written to `metrics.json`.

use crate::error::MlError;
use linfa::prelude::SingleTargetRegression;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    /// Score `predictions` against `truth`.
    pub fn compute(predictions: &Array1<f64>, truth: &Array1<f64>) -> Result<Self, MlError> {
        if predictions.len() != truth.len() {
            return Err(MlError::evaluation(format!(
                "prediction count {} does not match target count {}",
                predictions.len(),
                truth.len()
            )));
        }
        if truth.is_empty() {
            return Err(MlError::evaluation("cannot score an empty test set"));
        }
        let mse = predictions
            .mean_squared_error(truth)
            .map_err(|e| MlError::evaluation(e.to_string()))?;
        let mae = predictions
            .mean_absolute_error(truth)
            .map_err(|e| MlError::evaluation(e.to_string()))?;
        Ok(Self {
            rmse: mse.sqrt(),
            mae,
            r2: r2_score(predictions, truth),
        })
    }

    /// Key/value view for experiment trackers.
    pub fn as_pairs(&self) -> [(&'static str, f64); 3] {
        [("rmse", self.rmse), ("mae", self.mae), ("r2", self.r2)]
    }
}

/// Coefficient of determination, `1 - SSres / SStot`.
///
/// A constant target (including a single test row) has `SStot == 0`: that
/// scores 1.0 when every prediction is exact and 0.0 otherwise.
fn r2_score(predictions: &Array1<f64>, truth: &Array1<f64>) -> f64 {
    let mean = truth.mean().unwrap_or(0.0);
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = truth
        .iter()
        .zip(predictions.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
