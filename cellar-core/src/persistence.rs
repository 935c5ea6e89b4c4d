//! Writing and reading pipeline artifacts.
//!
//! The service can read `model.json` while a retrain is producing a new one,
//! so artifacts are staged in a hidden sibling and renamed over the target.
//! A reader sees either the old file or the new one, never a partial write.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Hidden sibling used while an artifact is being written.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Replace `path` with `data`, creating missing parent directories.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    let mut file = File::create(&staging)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&staging, path)
}

/// Pretty-printed JSON variant of [`atomic_write`].
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    bytes.push(b'\n');
    atomic_write(path, &bytes)
}

/// Read a JSON artifact. A missing file is `Ok(None)`; malformed JSON is
/// `InvalidData`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact read");
    Ok(Some(value))
}

/// Make sure each stage directory exists.
pub fn create_directories<P: AsRef<Path>>(dirs: &[P]) -> io::Result<()> {
    for dir in dirs.iter().map(AsRef::as_ref) {
        fs::create_dir_all(dir)?;
        tracing::debug!(path = %dir.display(), "directory ready");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Scores {
        rmse: f64,
        mae: f64,
    }

    #[test]
    fn test_atomic_write_json_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");

        let scores = Scores {
            rmse: 0.61,
            mae: 0.48,
        };
        atomic_write_json(&path, &scores).unwrap();
        let loaded: Option<Scores> = load_json(&path).unwrap();
        assert_eq!(loaded, Some(scores));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model_trainer").join("model.json");

        atomic_write(&path, b"{}").unwrap();
        assert!(path.exists());
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn test_load_json_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded: Option<Scores> = load_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_json_invalid_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_json::<Scores>(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_atomic_write_replaces_existing_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.txt");
        atomic_write(&path, b"Validation status: false").unwrap();
        atomic_write(&path, b"Validation status: true").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Validation status: true"
        );
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_create_directories() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b").join("c");
        create_directories(&[&a, &b]).unwrap();
        assert!(a.is_dir());
        assert!(b.is_dir());
    }
}
