//! Data ingestion: fetch the dataset archive and unpack it.

use super::{PipelineStage, Stage, StageOutput, run_blocking};
use crate::error::MlError;
use async_trait::async_trait;
use cellar_core::DataIngestionConfig;
use cellar_core::persistence;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct IngestionStage {
    config: DataIngestionConfig,
    client: reqwest::Client,
}

impl IngestionStage {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(config: DataIngestionConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Download the archive unless it is already on disk.
    ///
    /// Returns `true` when a download happened.
    pub async fn download_file(&self) -> Result<bool, MlError> {
        let target = &self.config.local_data_file;
        if target.exists() {
            info!(path = %target.display(), "archive already exists, skipping download");
            return Ok(false);
        }
        info!(url = %self.config.source_url, "downloading dataset archive");
        let response = self
            .client
            .get(&self.config.source_url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        persistence::atomic_write(target, &bytes)?;
        info!(path = %target.display(), bytes = bytes.len(), "archive downloaded");
        Ok(true)
    }

    /// Unpack every file entry into `unzip_dir`, overwriting existing files.
    pub fn extract_zip_file(&self) -> Result<Vec<PathBuf>, MlError> {
        extract_archive(&self.config.local_data_file, &self.config.unzip_dir)
    }
}

fn extract_archive(archive_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, MlError> {
    std::fs::create_dir_all(output_dir)?;
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping archive entry outside the output directory");
            continue;
        };
        let out_path = output_dir.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        extracted.push(out_path);
    }

    info!(
        archive = %archive_path.display(),
        dir = %output_dir.display(),
        files = extracted.len(),
        "archive extracted"
    );
    Ok(extracted)
}

#[async_trait]
impl Stage for IngestionStage {
    fn kind(&self) -> PipelineStage {
        PipelineStage::Ingestion
    }

    async fn run(&self) -> Result<StageOutput, MlError> {
        persistence::create_directories(&[&self.config.root_dir])?;
        let downloaded = self.download_file().await?;
        let archive = self.config.local_data_file.clone();
        let unzip_dir = self.config.unzip_dir.clone();
        let extracted =
            run_blocking(self.kind(), move || extract_archive(&archive, &unzip_dir)).await?;
        Ok(StageOutput::Ingested {
            archive: self.config.local_data_file.clone(),
            extracted,
            downloaded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn config(dir: &TempDir) -> DataIngestionConfig {
        let root = dir.path().join("artifacts/data_ingestion");
        DataIngestionConfig {
            root_dir: root.clone(),
            source_url: "http://127.0.0.1:9/unused.zip".into(),
            local_data_file: root.join("data.zip"),
            unzip_dir: root,
        }
    }

    #[tokio::test]
    async fn test_existing_archive_skips_download() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        std::fs::create_dir_all(&cfg.root_dir).unwrap();
        write_zip(&cfg.local_data_file, &[("wine.csv", "a,b\n1,2\n")]);

        let stage = IngestionStage::new(cfg.clone());
        let output = stage.run().await.unwrap();
        match output {
            StageOutput::Ingested {
                extracted,
                downloaded,
                ..
            } => {
                assert!(!downloaded);
                assert_eq!(extracted, vec![cfg.unzip_dir.join("wine.csv")]);
            }
            other => panic!("unexpected output: {other:?}"),
        }
        let body = std::fs::read_to_string(cfg.unzip_dir.join("wine.csv")).unwrap();
        assert_eq!(body, "a,b\n1,2\n");
    }

    #[test]
    fn test_traversal_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(
            &archive,
            &[("../escape.txt", "x"), ("nested/ok.csv", "a\n1\n")],
        );
        let out = dir.path().join("out");
        let extracted = extract_archive(&archive, &out).unwrap();
        assert_eq!(extracted, vec![out.join("nested/ok.csv")]);
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_corrupt_archive_is_fatal() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bad.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        let err = extract_archive(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, MlError::Archive(_)));
    }
}
