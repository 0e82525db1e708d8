//! Client-side dashboard state: the user's jobs, storage usage and the
//! notifications raised while they change.

pub mod form;
pub mod storage_usage;

use std::{cmp::Ordering, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::db::enums::JobStatus;
use crate::models::{Job, StorageInfo};
use crate::tracker::{JobTracker, TrackerEvent};

pub use form::{FormError, GeneratorForm};
pub use storage_usage::{days_remaining, format_bytes, StorageUsage, UsageLevel};

const JOBS_PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Success(String),
    Error(String),
}

pub struct Dashboard {
    client: Arc<ApiClient>,
    tracker: JobTracker<ApiClient>,
    events: mpsc::UnboundedReceiver<TrackerEvent>,
    jobs: Vec<Job>,
    storage: Option<StorageInfo>,
    highlight: Option<Uuid>,
    error: Option<String>,
    toasts: Vec<Toast>,
}

/// Highlighted job first, then newest first.
pub fn sort_jobs<'a>(jobs: &'a [Job], highlight: Option<Uuid>) -> Vec<&'a Job> {
    let mut sorted: Vec<&Job> = jobs.iter().collect();
    sorted.sort_by(|a, b| match (Some(a.id) == highlight, Some(b.id) == highlight) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b.created_at.cmp(&a.created_at),
    });
    sorted
}

impl Dashboard {
    pub fn new(client: ApiClient, highlight: Option<Uuid>) -> Self {
        let client = Arc::new(client);
        let (tracker, events) = JobTracker::new(client.clone());

        Self {
            client,
            tracker,
            events,
            jobs: Vec::new(),
            storage: None,
            highlight,
            error: None,
            toasts: Vec::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.tracker = self.tracker.with_interval(interval);
        self
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: Uuid) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn sorted_jobs(&self) -> Vec<&Job> {
        sort_jobs(&self.jobs, self.highlight)
    }

    pub fn highlight(&self) -> Option<Uuid> {
        self.highlight
    }

    pub fn storage(&self) -> Option<StorageUsage> {
        self.storage.map(StorageUsage::new)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_tracking(&self, id: Uuid) -> bool {
        self.tracker.is_tracking(id)
    }

    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    /// Loads jobs and storage together. On failure the error message is kept
    /// and calling `load` again retries.
    pub async fn load(&mut self) {
        let (jobs, storage) = tokio::join!(
            self.client.list_jobs(JOBS_PAGE_SIZE, 0),
            self.client.get_storage_info()
        );

        match (jobs, storage) {
            (Ok(jobs), Ok(storage)) => {
                self.jobs = jobs;
                self.storage = Some(storage);
                self.error = None;
                self.track_active();
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Failed to load dashboard: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    /// Storage refresh failures leave the previous value in place.
    pub async fn refresh_storage(&mut self) {
        match self.client.get_storage_info().await {
            Ok(storage) => self.storage = Some(storage),
            Err(e) => tracing::debug!("Storage refresh failed: {}", e),
        }
    }

    pub fn track_active(&mut self) {
        for job in &self.jobs {
            self.tracker.track(job);
        }
    }

    /// Creates a job from the form. Returns the new job, or `None` after
    /// raising an error toast.
    pub async fn submit(&mut self, form: &GeneratorForm, credits: i32) -> Option<Job> {
        if self.storage().is_some_and(|usage| !usage.can_generate()) {
            self.toasts.push(Toast::Error(
                storage_usage::STORAGE_FULL_NOTICE.to_string(),
            ));
            return None;
        }

        let config = match form.build(credits) {
            Ok(config) => config,
            Err(e) => {
                self.toasts.push(Toast::Error(e.to_string()));
                return None;
            }
        };

        match self.client.create_job(&config).await {
            Ok(job) => {
                self.toasts.push(Toast::Success("Generation started!".to_string()));
                self.insert_new(job.clone());
                self.refresh_storage().await;
                Some(job)
            }
            Err(e) => {
                self.toasts.push(Toast::Error(e.to_string()));
                None
            }
        }
    }

    pub async fn delete(&mut self, id: Uuid) -> bool {
        match self.client.delete_job(id).await {
            Ok(()) => {
                self.tracker.untrack(id);
                self.jobs.retain(|job| job.id != id);
                self.toasts.push(Toast::Success("Job deleted".to_string()));
                self.refresh_storage().await;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to delete job {}: {}", id, e);
                self.toasts.push(Toast::Error("Failed to delete job".to_string()));
                false
            }
        }
    }

    pub async fn archive(&mut self, id: Uuid) -> bool {
        match self.client.archive_job(id).await {
            Ok(archived) => {
                self.replace(archived);
                self.toasts.push(Toast::Success("Track archived".to_string()));
                self.refresh_storage().await;
                true
            }
            Err(e) => {
                self.toasts.push(Toast::Error(e.to_string()));
                false
            }
        }
    }

    pub async fn regenerate(&mut self, id: Uuid) -> Option<Job> {
        match self.client.regenerate_job(id).await {
            Ok(job) => {
                self.insert_new(job.clone());
                self.toasts.push(Toast::Success("Regeneration started!".to_string()));
                self.refresh_storage().await;
                Some(job)
            }
            Err(e) => {
                self.toasts.push(Toast::Error(e.to_string()));
                None
            }
        }
    }

    /// Shows the new title immediately and restores the previous one if the
    /// server rejects it.
    pub async fn rename(&mut self, id: Uuid, title: &str) -> bool {
        let Some(job) = self.jobs.iter_mut().find(|job| job.id == id) else {
            return false;
        };

        let previous = job.config.title.clone();
        let trimmed = title.trim();
        job.config.title = (!trimmed.is_empty()).then(|| trimmed.to_string());

        match self.client.rename_job(id, Some(title)).await {
            Ok(renamed) => {
                self.replace(renamed);
                true
            }
            Err(e) => {
                if let Some(job) = self.jobs.iter_mut().find(|job| job.id == id) {
                    job.config.title = previous;
                }
                self.toasts
                    .push(Toast::Error(format!("Failed to rename track: {}", e)));
                false
            }
        }
    }

    /// Waits for the next tracker event and applies it. Returns `None` once
    /// no more events can arrive.
    pub async fn next_event(&mut self) -> Option<TrackerEvent> {
        let event = self.events.recv().await?;
        self.apply_event(event.clone()).await;
        Some(event)
    }

    pub async fn apply_event(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::Progress(status) => {
                if let Some(job) = self.jobs.iter_mut().find(|job| job.id == status.id) {
                    job.apply_status(&status);
                }
            }
            TrackerEvent::Completed { id, detail } => {
                match detail {
                    Some(job) => self.replace(job),
                    None => self.set_status(id, JobStatus::Completed),
                }
                self.toasts.push(Toast::Success(
                    "Your meditation track is ready!".to_string(),
                ));
                self.refresh_storage().await;
            }
            TrackerEvent::Failed { id, message } => {
                if let Some(job) = self.jobs.iter_mut().find(|job| job.id == id) {
                    job.status = JobStatus::Failed;
                    job.error_message = Some(message.clone());
                }
                self.toasts
                    .push(Toast::Error(format!("Generation failed: {}", message)));
            }
            TrackerEvent::Stopped { id, status } => self.set_status(id, status),
        }
    }

    fn insert_new(&mut self, job: Job) {
        self.highlight = Some(job.id);
        self.tracker.track(&job);
        self.jobs.retain(|existing| existing.id != job.id);
        self.jobs.insert(0, job);
    }

    fn replace(&mut self, job: Job) {
        if let Some(existing) = self.jobs.iter_mut().find(|existing| existing.id == job.id) {
            *existing = job;
        }
    }

    fn set_status(&mut self, id: Uuid, status: JobStatus) {
        if let Some(job) = self.jobs.iter_mut().find(|job| job.id == id) {
            job.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobConfig;
    use chrono::{Duration as ChronoDuration, Utc};

    fn job_created(minutes_ago: i64) -> Job {
        let created = Utc::now() - ChronoDuration::minutes(minutes_ago);
        Job {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: JobStatus::Completed,
            progress: 100,
            progress_message: None,
            error_message: None,
            config: JobConfig::new(vec!["I am calm".into()]),
            file_path: None,
            file_size_bytes: None,
            created_at: created,
            updated_at: created,
            completed_at: Some(created),
            archived_at: None,
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let jobs = vec![job_created(30), job_created(1), job_created(10)];
        let sorted = sort_jobs(&jobs, None);
        let ids: Vec<Uuid> = sorted.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![jobs[1].id, jobs[2].id, jobs[0].id]);
    }

    #[test]
    fn test_highlighted_job_comes_first() {
        let jobs = vec![job_created(1), job_created(5), job_created(500)];
        let oldest = jobs[2].id;

        let sorted = sort_jobs(&jobs, Some(oldest));
        assert_eq!(sorted[0].id, oldest);
        assert_eq!(sorted[1].id, jobs[0].id);
        assert_eq!(sorted[2].id, jobs[1].id);
    }

    #[test]
    fn test_unknown_highlight_is_ignored() {
        let jobs = vec![job_created(5), job_created(1)];
        let sorted = sort_jobs(&jobs, Some(Uuid::new_v4()));
        assert_eq!(sorted[0].id, jobs[1].id);
    }
}
