//! Pluggable storage for uploaded call feedback files.
//!
//! Paths handed to a [`FileStorage`] are always relative, `/`-separated keys
//! such as `uploads/calls/<call>/<field>/<uuid>.pdf`.

#[cfg(feature = "drive")]
pub mod s3;

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info};

use crate::core::shared::error::ApiError;

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores `data` under `path` and returns the public URL of the object.
    async fn save(&self, path: &str, data: Vec<u8>) -> Result<String, ApiError>;

    async fn delete(&self, path: &str) -> Result<(), ApiError>;
}

pub fn validate_key(path: &str) -> Result<(), ApiError> {
    let p = Path::new(path);
    if path.is_empty() || p.is_absolute() {
        return Err(ApiError::Storage(format!("Invalid storage path '{}'", path)));
    }
    if p.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(ApiError::Storage(format!("Invalid storage path '{}'", path)));
    }
    Ok(())
}

/// Files under a directory on local disk, served by the HTTP layer at `media_url`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    media_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, media_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            media_url: media_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path)
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn save(&self, path: &str, data: Vec<u8>) -> Result<String, ApiError> {
        validate_key(path)?;
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::Storage(format!("Failed to create directory: {}", e)))?;
        }
        tokio::fs::write(&full, &data)
            .await
            .map_err(|e| ApiError::Storage(format!("Failed to write file: {}", e)))?;

        info!("Stored {} bytes at {}", data.len(), full.display());
        Ok(self.url_for(path))
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        validate_key(path)?;
        let full = self.root.join(path);
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                debug!("Removed {}", full.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Storage(format!("Failed to delete file: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("uploads/calls/a/b/c.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("uploads/../../secret").is_err());
        assert!(validate_key("./uploads/x").is_err());
    }

    #[tokio::test]
    async fn test_local_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/");

        let url = storage
            .save("uploads/calls/1/receipt/a.pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        assert_eq!(url, "/media/uploads/calls/1/receipt/a.pdf");

        let full = dir.path().join("uploads/calls/1/receipt/a.pdf");
        assert_eq!(std::fs::read(&full).unwrap(), b"%PDF");

        storage.delete("uploads/calls/1/receipt/a.pdf").await.unwrap();
        assert!(!full.exists());

        // Deleting a missing file is not an error.
        storage.delete("uploads/calls/1/receipt/a.pdf").await.unwrap();
    }
}
