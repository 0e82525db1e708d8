use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{entities::jobs, enums::JobStatus};
use crate::models::job_config::JobConfig;

/// A job as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: JobStatus,
    pub progress: i32,
    pub progress_message: Option<String>,
    pub error_message: Option<String>,
    pub config: JobConfig,
    pub file_path: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn from_model(model: jobs::Model) -> Result<Self, serde_json::Error> {
        let config: JobConfig = serde_json::from_value(model.config)?;

        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            status: model.status,
            progress: model.progress,
            progress_message: model.progress_message,
            error_message: model.error_message,
            config,
            file_path: model.file_path,
            file_size_bytes: model.file_size_bytes,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
            completed_at: model.completed_at.map(|dt| dt.with_timezone(&Utc)),
            archived_at: model.archived_at.map(|dt| dt.with_timezone(&Utc)),
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.config.title.as_deref()
    }

    /// Overwrites the fields carried by a status poll.
    pub fn apply_status(&mut self, status: &JobStatusResponse) {
        self.status = status.status;
        self.progress = status.progress;
        self.progress_message = status.progress_message.clone();
        self.error_message = status.error_message.clone();
    }

    /// `meditation-<voice>-<minutes>min.flac`, safe to quote in a header.
    pub fn download_filename(&self) -> String {
        let voice: String = self
            .config
            .voice_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();

        format!("meditation-{}-{}min.flac", voice, self.config.duration_minutes)
    }
}

/// Lightweight payload for polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: i32,
    pub progress_message: Option<String>,
    pub error_message: Option<String>,
}

impl From<&jobs::Model> for JobStatusResponse {
    fn from(model: &jobs::Model) -> Self {
        Self {
            id: model.id,
            status: model.status,
            progress: model.progress,
            progress_message: model.progress_message.clone(),
            error_message: model.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub config: JobConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameJobRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub used_bytes: i64,
    pub limit_bytes: i64,
    pub used_percentage: f64,
}

impl StorageInfo {
    pub fn new(used_bytes: i64, limit_bytes: i64) -> Self {
        let used_percentage = if limit_bytes > 0 {
            (used_bytes as f64 / limit_bytes as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            used_bytes,
            limit_bytes,
            used_percentage,
        }
    }

    pub fn is_full(&self) -> bool {
        self.used_bytes >= self.limit_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_percentage_rounds_to_one_decimal() {
        let info = StorageInfo::new(1, 3);
        assert_eq!(info.used_percentage, 33.3);
        assert_eq!(StorageInfo::new(5, 0).used_percentage, 0.0);
        assert!(StorageInfo::new(10, 10).is_full());
    }

    #[test]
    fn test_download_filename_replaces_header_breaking_characters() {
        let now = chrono::Utc::now();
        let mut config = JobConfig::new(vec!["I am calm".into()]);
        config.voice_id = "a\"; filename=\"evil.exe\r\n".to_string();
        let job = Job {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: JobStatus::Completed,
            progress: 100,
            progress_message: None,
            error_message: None,
            config,
            file_path: None,
            file_size_bytes: None,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
            archived_at: None,
        };

        assert_eq!(
            job.download_filename(),
            "meditation-a___filename__evil_exe__-40min.flac"
        );
    }
}
