//! ElasticNet estimator and the persisted model artifact.
//!
//! Fitting is delegated to `linfa-elasticnet`. The fitted hyperplane and
//! intercept are copied into a [`TrainedModel`], which is what gets written
//! to `model.json` and what the inference service loads back. Prediction
//! from a `TrainedModel` is a plain affine map, so no refit is needed.

use crate::dataset::NumericFrame;
use crate::error::MlError;
use cellar_core::ElasticNetParams;
use cellar_core::persistence;
use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa_elasticnet::ElasticNet;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const MODEL_KIND: &str = "ElasticNet";

/// Fits an ElasticNet regressor with fixed hyperparameters.
#[derive(Debug, Clone)]
pub struct ElasticNetEstimator {
    params: ElasticNetParams,
}

impl ElasticNetEstimator {
    pub fn new(params: ElasticNetParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ElasticNetParams {
        &self.params
    }

    /// Fit on `frame`, recording `target_column` in the result.
    pub fn fit(&self, frame: &NumericFrame, target_column: &str) -> Result<TrainedModel, MlError> {
        if frame.n_rows() == 0 {
            return Err(MlError::training("cannot fit on an empty dataset"));
        }
        let dataset = Dataset::new(frame.features.clone(), frame.target.clone());
        let fitted = ElasticNet::params()
            .penalty(self.params.alpha)
            .l1_ratio(self.params.l1_ratio)
            .max_iterations(self.params.max_iterations)
            .tolerance(self.params.tolerance)
            .with_intercept(true)
            .fit(&dataset)
            .map_err(|e| MlError::training(e.to_string()))?;

        let coefficients = fitted.hyperplane().to_vec();
        let intercept = fitted.intercept();
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(MlError::training("fit produced non-finite coefficients"));
        }

        Ok(TrainedModel {
            model: MODEL_KIND.to_string(),
            params: self.params.clone(),
            feature_names: frame.feature_names.clone(),
            target_column: target_column.to_string(),
            coefficients,
            intercept,
            trained_at: Utc::now(),
            train_rows: frame.n_rows(),
        })
    }
}

/// A fitted model as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub model: String,
    pub params: ElasticNetParams,
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
}

impl TrainedModel {
    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Predict one value per row of `records`.
    pub fn predict(&self, records: &Array2<f64>) -> Result<Array1<f64>, MlError> {
        if records.ncols() != self.n_features() {
            return Err(MlError::model(format!(
                "model expects {} features, got {}",
                self.n_features(),
                records.ncols()
            )));
        }
        let weights = ArrayView1::from(self.coefficients.as_slice());
        Ok(records.dot(&weights) + self.intercept)
    }

    pub fn predict_one(&self, features: &[f64]) -> Result<f64, MlError> {
        if features.len() != self.n_features() {
            return Err(MlError::model(format!(
                "model expects {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }
        let weights = ArrayView1::from(self.coefficients.as_slice());
        Ok(ArrayView1::from(features).dot(&weights) + self.intercept)
    }

    /// Lay out named values in training order. Every feature must be present.
    pub fn feature_vector(&self, values: &HashMap<String, f64>) -> Result<Vec<f64>, MlError> {
        let missing: Vec<&str> = self
            .feature_names
            .iter()
            .filter(|name| !values.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(MlError::invalid_input(format!(
                "missing feature values: {}",
                missing.join(", ")
            )));
        }
        Ok(self
            .feature_names
            .iter()
            .filter_map(|name| values.get(name).copied())
            .collect())
    }

    /// Write atomically, replacing any previous model.
    pub fn save(&self, path: &Path) -> Result<(), MlError> {
        persistence::atomic_write_json(path, self)?;
        tracing::debug!(path = %path.display(), "model saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, MlError> {
        let model: Self = persistence::load_json(path)
            .map_err(|e| MlError::model(format!("cannot read {}: {e}", path.display())))?
            .ok_or_else(|| MlError::not_found(format!("model not found: {}", path.display())))?;
        if model.coefficients.len() != model.feature_names.len() {
            return Err(MlError::model(format!(
                "corrupt model file {}: {} coefficients for {} features",
                path.display(),
                model.coefficients.len(),
                model.feature_names.len()
            )));
        }
        Ok(model)
    }
}
