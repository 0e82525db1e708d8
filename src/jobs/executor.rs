use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    db::{entities::jobs, enums::JobStatus},
    jobs::{
        queue::JobMessage,
        renderer::{ProgressReporter, TrackRenderer},
    },
    models::JobConfig,
    state::AppState,
};

/// File name of the rendered artifact inside a job's storage directory.
pub const ARTIFACT_FILENAME: &str = "track.flac";

/// Background job executor that processes jobs from the queue
pub struct JobExecutor {
    state: AppState,
    renderer: Arc<dyn TrackRenderer>,
    receiver: mpsc::UnboundedReceiver<JobMessage>,
}

impl JobExecutor {
    pub fn new(
        state: AppState,
        renderer: Arc<dyn TrackRenderer>,
        receiver: mpsc::UnboundedReceiver<JobMessage>,
    ) -> Self {
        Self {
            state,
            renderer,
            receiver,
        }
    }

    /// Start the job executor loop
    pub async fn start(mut self) {
        tracing::info!("Job executor started");

        while let Some(message) = self.receiver.recv().await {
            tracing::info!("Processing job {}", message.job_id);

            // Spawn each job in its own task to allow concurrent processing
            let state = self.state.clone();
            let renderer = self.renderer.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::execute_job(state, renderer, message.job_id).await {
                    tracing::error!("Job execution failed: {}", e);
                }
            });
        }

        tracing::warn!("Job executor stopped - queue closed");
    }

    /// Execute a single job
    pub async fn execute_job(
        state: AppState,
        renderer: Arc<dyn TrackRenderer>,
        job_id: Uuid,
    ) -> Result<()> {
        let Some(job) = transition(&state, job_id, JobStatus::Processing, |active| {
            active.progress = Set(0);
            active.progress_message = Set(Some("Starting".to_string()));
        })
        .await?
        else {
            return Ok(());
        };

        let config: JobConfig = match serde_json::from_value(job.config) {
            Ok(config) => config,
            Err(e) => {
                fail(&state, job_id, format!("Invalid job configuration: {}", e)).await?;
                return Ok(());
            }
        };

        let reporter = ProgressReporter::new(state.db.clone(), job_id);
        let rendered = renderer.render(&config, &reporter).await;

        match rendered {
            Ok(bytes) => {
                let (path, size) = state.storage.write(job_id, ARTIFACT_FILENAME, &bytes).await?;

                let completed = transition(&state, job_id, JobStatus::Completed, |active| {
                    active.progress = Set(100);
                    active.progress_message = Set(Some("Complete".to_string()));
                    active.file_path = Set(Some(path.clone()));
                    active.file_size_bytes = Set(Some(size));
                    active.completed_at = Set(Some(Utc::now().into()));
                })
                .await;

                match completed {
                    Ok(Some(_)) => {
                        tracing::info!("Job {} completed successfully ({} bytes)", job_id, size);
                    }
                    Ok(None) => {
                        // Deleted while rendering.
                        state.storage.delete(&path).await;
                    }
                    Err(e) => {
                        state.storage.delete(&path).await;
                        return Err(e);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", job_id, e);
                fail(&state, job_id, e.to_string()).await?;
            }
        }

        Ok(())
    }
}

async fn fail(state: &AppState, job_id: Uuid, message: String) -> Result<()> {
    transition(state, job_id, JobStatus::Failed, |active| {
        active.error_message = Set(Some(message));
        active.progress_message = Set(None);
    })
    .await?;
    Ok(())
}

/// Moves a job to `next` if that edge is legal, applying `update` to the row.
/// Returns `None` when the job no longer exists or the edge is illegal.
async fn transition(
    state: &AppState,
    job_id: Uuid,
    next: JobStatus,
    update: impl FnOnce(&mut jobs::ActiveModel),
) -> Result<Option<jobs::Model>> {
    let Some(job_record) = jobs::Entity::find_by_id(job_id).one(&state.db).await? else {
        tracing::warn!("Job {} no longer exists, skipping transition to {}", job_id, next);
        return Ok(None);
    };

    if !job_record.status.can_transition_to(next) {
        tracing::warn!(
            "Refusing transition of job {} from {} to {}",
            job_id,
            job_record.status,
            next
        );
        return Ok(None);
    }

    let mut active: jobs::ActiveModel = job_record.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    update(&mut active);

    Ok(Some(active.update(&state.db).await?))
}
