use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dashboard::{sort_jobs, StorageUsage},
    db::repositories::{storage_used_bytes, JobRepository},
    error::{AppError, Result},
    handlers::auth::CurrentUser,
    models::{Job, StorageInfo},
    state::AppState,
    templates::{dashboard_page, job_card, job_list, storage_usage_bar},
};

const PARTIAL_PAGE_SIZE: u64 = 100;

/// Client event raised when a polled job settles, so the storage bar reloads.
pub const JOBS_CHANGED_EVENT: &str = "jobs-changed";

#[derive(Deserialize)]
pub struct JobsPartialQuery {
    pub job: Option<Uuid>,
}

pub async fn dashboard(Query(query): Query<JobsPartialQuery>) -> Html<String> {
    Html(dashboard_page(query.job).into_string())
}

/// Storage bar partial (for HTMX updates)
pub async fn storage_partial(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>> {
    let used_bytes = storage_used_bytes(&state.db, user.id).await?;
    let usage = StorageUsage::new(StorageInfo::new(
        used_bytes,
        state.config.user_storage_limit_bytes,
    ));

    Ok(Html(storage_usage_bar(&usage).into_string()))
}

/// Job list partial, highlighted job first
pub async fn jobs_partial(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<JobsPartialQuery>,
) -> Result<Html<String>> {
    let jobs = JobRepository::new(state.db.clone())
        .list_for_user(user.id, PARTIAL_PAGE_SIZE, 0)
        .await?
        .into_iter()
        .map(Job::from_model)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let sorted = sort_jobs(&jobs, query.job);

    Ok(Html(job_list(&sorted, query.job, Utc::now()).into_string()))
}

/// Single job card, polled while the job is active. Once the job settles the
/// response carries `HX-Trigger: jobs-changed`.
pub async fn job_partial(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let job = JobRepository::new(state.db.clone())
        .find_for_user(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let job = Job::from_model(job)?;
    let card = Html(job_card(&job, false, Utc::now()).into_string());

    if job.status.is_terminal() {
        return Ok(([("HX-Trigger", JOBS_CHANGED_EVENT)], card).into_response());
    }

    Ok(card.into_response())
}
