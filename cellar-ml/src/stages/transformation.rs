//! Data transformation: seeded train/test split.

use super::{PipelineStage, Stage, StageOutput, run_blocking};
use crate::dataset::CsvTable;
use crate::error::MlError;
use async_trait::async_trait;
use cellar_core::DataTransformationConfig;
use cellar_core::persistence;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

pub const TRAIN_FILE: &str = "train.csv";
pub const TEST_FILE: &str = "test.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Shuffle `0..n` with `seed` and cut off `ceil(n * test_size)` test indices.
///
/// Returns `(train, test)`. Both sides must be non-empty.
pub fn train_test_split(
    n: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), MlError> {
    if n == 0 {
        return Err(MlError::dataset("dataset has no rows to split"));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(MlError::invalid_input(format!(
            "test_size must be within (0, 1), got {test_size}"
        )));
    }
    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(MlError::dataset(format!(
            "splitting {n} rows with test_size {test_size} leaves an empty side"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train = indices.split_off(n_test);
    Ok((train, indices))
}

#[derive(Clone)]
pub struct TransformationStage {
    config: DataTransformationConfig,
}

impl TransformationStage {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self { config }
    }

    pub fn train_test_splitting(&self) -> Result<SplitSummary, MlError> {
        let table = CsvTable::read(&self.config.data_path)?;
        let (train, test) =
            train_test_split(table.len(), self.config.test_size, self.config.random_seed)?;

        let train_path = self.config.root_dir.join(TRAIN_FILE);
        let test_path = self.config.root_dir.join(TEST_FILE);
        table.write_subset(&train_path, &train)?;
        table.write_subset(&test_path, &test)?;

        info!(
            rows = table.len(),
            train_rows = train.len(),
            test_rows = test.len(),
            seed = self.config.random_seed,
            "dataset split into train and test sets"
        );
        Ok(SplitSummary {
            train_path,
            test_path,
            train_rows: train.len(),
            test_rows: test.len(),
        })
    }
}

#[async_trait]
impl Stage for TransformationStage {
    fn kind(&self) -> PipelineStage {
        PipelineStage::Transformation
    }

    async fn run(&self) -> Result<StageOutput, MlError> {
        let stage = self.clone();
        run_blocking(self.kind(), move || {
            persistence::create_directories(&[&stage.config.root_dir])?;
            Ok(StageOutput::Transformed(stage.train_test_splitting()?))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_split_sizes() {
        let (train, test) = train_test_split(100, 0.25, 42).unwrap();
        assert_eq!(test.len(), 25);
        assert_eq!(train.len(), 75);

        // ceil(10 * 0.25) = 3
        let (train, test) = train_test_split(10, 0.25, 42).unwrap();
        assert_eq!((train.len(), test.len()), (7, 3));
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(
            train_test_split(50, 0.2, 7).unwrap(),
            train_test_split(50, 0.2, 7).unwrap()
        );
        assert_ne!(
            train_test_split(50, 0.2, 7).unwrap(),
            train_test_split(50, 0.2, 8).unwrap()
        );
    }

    #[test]
    fn test_degenerate_splits_rejected() {
        assert!(train_test_split(0, 0.25, 1).is_err());
        // one row: ceil(0.25) = 1 test row, zero train rows
        assert!(train_test_split(1, 0.25, 1).is_err());
        assert!(train_test_split(10, 1.0, 1).is_err());
    }

    #[tokio::test]
    async fn test_stage_writes_both_files_with_header() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("wine.csv");
        let mut body = String::from("a,quality\n");
        for i in 0..8 {
            body.push_str(&format!("{i},{}\n", i % 3));
        }
        std::fs::write(&data, &body).unwrap();

        let stage = TransformationStage::new(DataTransformationConfig {
            root_dir: dir.path().join("data_transformation"),
            data_path: data,
            test_size: 0.25,
            random_seed: 42,
        });
        let output = stage.run().await.unwrap();
        let StageOutput::Transformed(summary) = output else {
            panic!("unexpected output");
        };
        assert_eq!((summary.train_rows, summary.test_rows), (6, 2));

        let train = std::fs::read_to_string(&summary.train_path).unwrap();
        let test = std::fs::read_to_string(&summary.test_path).unwrap();
        assert!(train.starts_with("a,quality\n"));
        assert!(test.starts_with("a,quality\n"));

        let rows: HashSet<&str> = train.lines().skip(1).chain(test.lines().skip(1)).collect();
        assert_eq!(rows.len(), 8);
    }

    #[tokio::test]
    async fn test_empty_dataset_is_fatal() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("wine.csv");
        std::fs::write(&data, "a,quality\n").unwrap();
        let stage = TransformationStage::new(DataTransformationConfig {
            root_dir: dir.path().join("out"),
            data_path: data,
            test_size: 0.25,
            random_seed: 42,
        });
        assert!(matches!(stage.run().await, Err(MlError::Dataset(_))));
    }
}
