use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::{
    db::{entities::jobs, enums::JobStatus},
    error::Result,
    services::StorageService,
};

/// Expires old jobs:
/// - completed jobs whose file is older than the retention window are
///   archived (file deleted, config kept for regeneration)
/// - failed jobs older than the retention window are deleted
///
/// Returns the number of jobs touched.
pub async fn cleanup_expired_jobs(
    db: &DatabaseConnection,
    storage: &StorageService,
    retention_days: i64,
) -> Result<u64> {
    let now = Utc::now();
    let cutoff: sea_orm::prelude::DateTimeWithTimeZone = (now - Duration::days(retention_days)).into();

    let expired_completed = jobs::Entity::find()
        .filter(jobs::Column::Status.eq(JobStatus::Completed))
        .filter(jobs::Column::FilePath.is_not_null())
        .filter(jobs::Column::CompletedAt.lt(cutoff))
        .all(db)
        .await?;

    let archived = expired_completed.len() as u64;
    for job in expired_completed {
        if let Some(path) = &job.file_path {
            storage.delete(path).await;
        }

        let mut active: jobs::ActiveModel = job.into();
        active.status = Set(JobStatus::Archived);
        active.file_path = Set(None);
        active.file_size_bytes = Set(None);
        active.archived_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        active.update(db).await?;
    }

    let deleted = jobs::Entity::delete_many()
        .filter(jobs::Column::Status.eq(JobStatus::Failed))
        .filter(jobs::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?
        .rows_affected;

    if archived + deleted > 0 {
        tracing::info!(
            "Cleanup: archived {} completed, deleted {} failed jobs",
            archived,
            deleted
        );
    }

    Ok(archived + deleted)
}
