use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db::{entities::jobs, enums::JobStatus};

pub const INTERRUPTED_MESSAGE: &str = "Generation was interrupted. Please try again.";

/// A job ready to be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobMessage {
    pub job_id: Uuid,
}

/// In-process queue feeding the job executor
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<JobMessage>,
}

impl JobQueue {
    /// Create a new job queue and return (queue, receiver)
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn submit(&self, message: JobMessage) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|e| anyhow::anyhow!("Job queue closed, could not submit {}", e.0.job_id))?;

        tracing::info!("Job {} submitted to queue", message.job_id);

        Ok(())
    }

    /// Picks up work left over by a previous run. Jobs still `pending` are
    /// submitted again, oldest first. Jobs caught mid-render are failed, since
    /// their partial output is gone. Returns how many jobs were resubmitted.
    pub async fn recover(&self, db: &DatabaseConnection) -> Result<usize> {
        let interrupted = jobs::Entity::find()
            .filter(jobs::Column::Status.eq(JobStatus::Processing))
            .all(db)
            .await?;

        for job in interrupted {
            let id = job.id;
            let mut active: jobs::ActiveModel = job.into();
            active.status = Set(JobStatus::Failed);
            active.error_message = Set(Some(INTERRUPTED_MESSAGE.to_string()));
            active.progress_message = Set(None);
            active.updated_at = Set(Utc::now().into());
            active.update(db).await?;

            tracing::warn!("Job {} was interrupted mid-render, marked failed", id);
        }

        let pending = jobs::Entity::find()
            .filter(jobs::Column::Status.eq(JobStatus::Pending))
            .order_by_asc(jobs::Column::CreatedAt)
            .all(db)
            .await?;

        for job in &pending {
            self.submit(JobMessage { job_id: job.id })?;
        }

        if !pending.is_empty() {
            tracing::info!("Resubmitted {} pending jobs", pending.len());
        }

        Ok(pending.len())
    }
}
