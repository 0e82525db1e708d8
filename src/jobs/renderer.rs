use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::time::Duration;
use uuid::Uuid;

use crate::db::{entities::jobs, enums::JobStatus};
use crate::models::JobConfig;

/// Produces the audio artifact for a job.
///
/// Implementations report progress through the [`ProgressReporter`] and return
/// the encoded FLAC bytes. Any error fails the job with its message.
#[async_trait]
pub trait TrackRenderer: Send + Sync {
    async fn render(&self, config: &JobConfig, progress: &ProgressReporter) -> Result<Vec<u8>>;
}

/// Persists progress for a job that is currently `processing`.
#[derive(Clone)]
pub struct ProgressReporter {
    db: DatabaseConnection,
    job_id: Uuid,
}

impl ProgressReporter {
    pub fn new(db: DatabaseConnection, job_id: Uuid) -> Self {
        Self { db, job_id }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Stores `progress` (clamped to 0..=100) and `message`. Updates that would
    /// move progress backwards are dropped.
    pub async fn report(&self, progress: i32, message: impl Into<String>) -> Result<()> {
        let progress = progress.clamp(0, 100);
        let message: String = message.into();
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        let result = jobs::Entity::update_many()
            .col_expr(jobs::Column::Progress, Expr::value(progress))
            .col_expr(jobs::Column::ProgressMessage, Expr::value(message))
            .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
            .filter(jobs::Column::Id.eq(self.job_id))
            .filter(jobs::Column::Status.eq(JobStatus::Processing))
            .filter(jobs::Column::Progress.lte(progress))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            tracing::debug!("Progress {} for job {} not applied", progress, self.job_id);
        }

        Ok(())
    }
}

/// Stand-in for the external audio pipeline. Walks through the pipeline
/// stages, pausing `step` between each, and returns a placeholder artifact
/// holding the stream marker followed by the rendered configuration.
#[derive(Debug, Clone)]
pub struct SimulatedRenderer {
    step: Duration,
}

const STAGES: [(i32, &str); 4] = [
    (10, "Generating affirmation audio"),
    (40, "Synthesizing binaural beats"),
    (70, "Mixing tracks"),
    (90, "Encoding FLAC"),
];

impl SimulatedRenderer {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }
}

#[async_trait]
impl TrackRenderer for SimulatedRenderer {
    async fn render(&self, config: &JobConfig, progress: &ProgressReporter) -> Result<Vec<u8>> {
        tracing::debug!(
            "Rendering {} affirmations x{} over {} min at {} Hz",
            config.affirmations.len(),
            config.repetitions,
            config.duration_minutes,
            config.binaural_frequency()
        );

        for (percent, stage) in STAGES {
            progress.report(percent, stage).await?;
            if !self.step.is_zero() {
                tokio::time::sleep(self.step).await;
            }
        }

        let mut artifact = b"fLaC".to_vec();
        artifact.extend(serde_json::to_vec(config)?);
        Ok(artifact)
    }
}
