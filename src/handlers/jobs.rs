use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        entities::{jobs, users},
        enums::JobStatus,
        repositories::{storage_used_bytes, CustomVoiceRepository, JobRepository},
    },
    error::{AppError, Result},
    handlers::auth::CurrentUser,
    jobs::JobMessage,
    models::{
        job_config::normalize_title, CreateJobRequest, Job, JobConfig, JobStatusResponse,
        MessageResponse, RenameJobRequest, StorageInfo,
    },
    services::ledger::{add_credits, deduct_credits},
    state::AppState,
    tasks::cleanup::cleanup_expired_jobs,
};

const STORAGE_FULL_MESSAGE: &str = "Storage full. Archive or delete old tracks to free up space.";
const QUEUE_UNAVAILABLE_MESSAGE: &str = "Job queue unavailable";
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    20
}

fn plural(n: i32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

pub async fn create_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateJobRequest>,
) -> Result<Json<Job>> {
    let config = payload.config.normalized()?;
    let job = admit_job(&state, &user, &config).await?;

    Ok(Json(Job::from_model(job)?))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<Job>>> {
    if let Err(e) = cleanup_expired_jobs(
        &state.db,
        &state.storage,
        state.config.file_retention_days,
    )
    .await
    {
        tracing::warn!("Cleanup before listing failed: {}", e);
    }

    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let jobs = JobRepository::new(state.db.clone())
        .list_for_user(user.id, limit, query.offset)
        .await?;

    let responses = jobs
        .into_iter()
        .map(Job::from_model)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Json(responses))
}

pub async fn get_storage(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StorageInfo>> {
    let used_bytes = storage_used_bytes(&state.db, user.id).await?;

    Ok(Json(StorageInfo::new(
        used_bytes,
        state.config.user_storage_limit_bytes,
    )))
}

pub async fn get_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>> {
    let job = find_job(&state, id, user.id).await?;
    Ok(Json(Job::from_model(job)?))
}

/// Lightweight status endpoint for polling
pub async fn get_job_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>> {
    let job = find_job(&state, id, user.id).await?;
    Ok(Json(JobStatusResponse::from(&job)))
}

pub async fn rename_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenameJobRequest>,
) -> Result<Json<Job>> {
    let job = find_job(&state, id, user.id).await?;

    if !job.status.can_rename() {
        return Err(AppError::InvalidState(
            "Only completed or archived jobs can be renamed".to_string(),
        ));
    }

    let title = normalize_title(payload.title.as_deref())?;
    let mut config: JobConfig = serde_json::from_value(job.config.clone())?;
    config.title = title;

    let mut active: jobs::ActiveModel = job.into();
    active.config = Set(serde_json::to_value(&config)?);
    active.updated_at = Set(Utc::now().into());

    let updated = JobRepository::new(state.db.clone()).update(active).await?;
    tracing::debug!("Renamed job {} to {:?}", id, config.title);

    Ok(Json(Job::from_model(updated)?))
}

pub async fn delete_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    let job = find_job(&state, id, user.id).await?;

    if !job.status.can_delete() {
        return Err(AppError::InvalidState(
            "Cannot delete a processing job".to_string(),
        ));
    }

    if let Some(path) = &job.file_path {
        state.storage.delete(path).await;
    }

    JobRepository::new(state.db.clone()).delete(job.id).await?;
    tracing::info!("Deleted job {}", id);

    Ok(Json(MessageResponse {
        message: "Job deleted".to_string(),
    }))
}

/// Archive a job: delete its file but keep config for regeneration
pub async fn archive_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>> {
    let job = find_job(&state, id, user.id).await?;

    if job.status == JobStatus::Archived {
        return Ok(Json(Job::from_model(job)?));
    }
    if !job.status.can_transition_to(JobStatus::Archived) {
        return Err(AppError::InvalidState(format!(
            "Only completed jobs can be archived (job is {})",
            job.status
        )));
    }

    if let Some(path) = &job.file_path {
        state.storage.delete(path).await;
    }

    let now = Utc::now();
    let mut active: jobs::ActiveModel = job.into();
    active.status = Set(JobStatus::Archived);
    active.file_path = Set(None);
    active.file_size_bytes = Set(None);
    active.archived_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());

    let archived = JobRepository::new(state.db.clone()).update(active).await?;
    tracing::info!("Archived job {}", id);

    Ok(Json(Job::from_model(archived)?))
}

/// Regenerate a job from its archived config
pub async fn regenerate_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>> {
    let old_job = find_job(&state, id, user.id).await?;

    if old_job.status != JobStatus::Archived {
        return Err(AppError::InvalidState(
            "Only archived jobs can be regenerated".to_string(),
        ));
    }

    let config: JobConfig = serde_json::from_value(old_job.config)?;
    let new_job = admit_job(&state, &user, &config).await?;
    tracing::info!("Regenerated job {} as {}", id, new_job.id);

    Ok(Json(Job::from_model(new_job)?))
}

async fn find_job(state: &AppState, id: Uuid, user_id: Uuid) -> Result<jobs::Model> {
    JobRepository::new(state.db.clone())
        .find_for_user(id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))
}

/// Checks the voice, storage and credits, then charges and persists a
/// `pending` job in one transaction and hands it to the executor. If the
/// executor cannot take it, the job is failed and the charge refunded.
async fn admit_job(state: &AppState, user: &users::Model, config: &JobConfig) -> Result<jobs::Model> {
    let credits_needed = config.credits_required() as i32;
    let is_admin = state.config.is_admin(&user.email);
    let charge = !state.config.dev_unlimited_credits && !is_admin;

    if !CustomVoiceRepository::new(state.db.clone())
        .is_available(user.id, &config.voice_id)
        .await?
    {
        return Err(AppError::Validation(format!("Unknown voice: {}", config.voice_id)));
    }

    let txn = state.db.begin().await?;

    if !is_admin {
        let used_bytes = storage_used_bytes(&txn, user.id).await?;
        if used_bytes >= state.config.user_storage_limit_bytes {
            return Err(AppError::StorageFull(STORAGE_FULL_MESSAGE.to_string()));
        }
    }

    if charge && !deduct_credits(&txn, user.id, credits_needed).await? {
        let balance = users::Entity::find_by_id(user.id)
            .one(&txn)
            .await?
            .map(|u| u.credits)
            .unwrap_or(0);
        return Err(AppError::InsufficientCredits(format!(
            "Insufficient credits. This job requires {} credit{} but you have {}.",
            credits_needed,
            plural(credits_needed),
            balance
        )));
    }

    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let job = jobs::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        status: Set(JobStatus::Pending),
        progress: Set(0),
        progress_message: Set(None),
        error_message: Set(None),
        config: Set(serde_json::to_value(config)?),
        file_path: Set(None),
        file_size_bytes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
        archived_at: Set(None),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(e) = state.job_queue.submit(JobMessage { job_id: job.id }) {
        tracing::error!("Could not enqueue job {}: {}", job.id, e);

        let txn = state.db.begin().await?;
        if charge {
            add_credits(&txn, user.id, credits_needed).await?;
        }
        let mut active: jobs::ActiveModel = job.into();
        active.status = Set(JobStatus::Failed);
        active.error_message = Set(Some(QUEUE_UNAVAILABLE_MESSAGE.to_string()));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
        txn.commit().await?;

        return Err(AppError::Internal(QUEUE_UNAVAILABLE_MESSAGE.to_string()));
    }

    tracing::info!(
        "Created job {} for user {} ({} credit{})",
        job.id,
        user.id,
        credits_needed,
        plural(credits_needed)
    );

    Ok(job)
}
