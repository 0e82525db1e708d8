use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::Result;

/// Local filesystem storage for rendered tracks, one directory per job.
#[derive(Debug, Clone)]
pub struct StorageService {
    base_path: PathBuf,
}

impl StorageService {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn file_path(&self, job_id: Uuid, filename: &str) -> PathBuf {
        self.base_path.join(job_id.to_string()).join(filename)
    }

    /// Writes an artifact and returns its path and size in bytes.
    pub async fn write(&self, job_id: Uuid, filename: &str, data: &[u8]) -> Result<(String, i64)> {
        let path = self.file_path(job_id, filename);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        fs::write(&path, data).await?;

        tracing::debug!("Stored {} bytes at {:?}", data.len(), path);

        Ok((path.to_string_lossy().into_owned(), data.len() as i64))
    }

    pub async fn exists(&self, path: &str) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(path).await?)
    }

    /// Removes a file and its job directory if that leaves it empty.
    /// Returns whether the file was deleted.
    pub async fn delete(&self, path: &str) -> bool {
        match fs::remove_file(path).await {
            Ok(()) => {
                if let Some(dir) = Path::new(path).parent() {
                    // Fails harmlessly when the directory still has entries.
                    let _ = fs::remove_dir(dir).await;
                }
                true
            }
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", path, e);
                false
            }
        }
    }
}
