//! Model hyperparameters loaded from `params.yaml`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hyperparameters keyed by model name, as declared in `params.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    #[serde(rename = "ElasticNet")]
    pub elastic_net: ElasticNetParams,
}

/// ElasticNet regularisation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetParams {
    /// Overall penalty strength.
    pub alpha: f64,
    /// Mix between L1 (1.0) and L2 (0.0) penalties.
    pub l1_ratio: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_max_iterations() -> u32 {
    1000
}

fn default_tolerance() -> f64 {
    1e-4
}

impl Default for ElasticNetParams {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            l1_ratio: 0.1,
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl ElasticNetParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(ConfigError::invalid("ElasticNet.alpha must be >= 0"));
        }
        if !self.l1_ratio.is_finite() || !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(ConfigError::invalid(
                "ElasticNet.l1_ratio must be within [0, 1]",
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid(
                "ElasticNet.max_iterations must be >= 1",
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::invalid("ElasticNet.tolerance must be > 0"));
        }
        Ok(())
    }

    /// Flat key/value view, used when reporting to an experiment tracker.
    pub fn as_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("alpha".into(), self.alpha.to_string()),
            ("l1_ratio".into(), self.l1_ratio.to_string()),
            ("max_iterations".into(), self.max_iterations.to_string()),
            ("tolerance".into(), self.tolerance.to_string()),
        ]
    }
}

impl Hyperparameters {
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::parse(path, e))?;
        let params: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::parse(path, e))?;
        params.elastic_net.validate()?;
        tracing::info!(path = %path.display(), "hyperparameters loaded");
        Ok(params)
    }
}
