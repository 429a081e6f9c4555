// File system operations for the data directory and model files
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR_NAME: &str = "player-performance";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Where the service keeps its files, without touching the disk.
/// Falls back to `./data` when the platform has no data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Write `data` to `path` and return its SHA256 hash.
/// Written through a sibling `.tmp` file that is renamed into place.
pub fn write_file(path: &Path, data: &[u8]) -> StorageResult<String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    Ok(calculate_sha256(data))
}

/// Whole-file read; a missing file surfaces as `io::ErrorKind::NotFound`
pub fn read_file(path: &Path) -> StorageResult<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Lowercase hex SHA-256 digest
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_sha256() {
        let data = b"hello world";
        let hash = calculate_sha256(data);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_write_creates_parents_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("model.json");

        let first = write_file(&path, b"first").unwrap();
        let second = write_file(&path, b"second").unwrap();

        assert_ne!(first, second);
        assert_eq!(read_file(&path).unwrap(), b"second");
        assert_eq!(second, calculate_sha256(b"second"));
        assert!(!temp_dir.path().join("nested").join("model.json.tmp").exists());
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        match read_file(&temp_dir.path().join("missing.json")) {
            Err(StorageError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn test_default_data_dir_is_named_for_app() {
        assert!(default_data_dir().ends_with(APP_DIR_NAME) || default_data_dir() == PathBuf::from("data"));
    }
}
