use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    db::{enums::JobStatus, repositories::JobRepository},
    error::{AppError, Result},
    handlers::auth::CurrentUser,
    models::Job,
    state::AppState,
};

/// Download the rendered FLAC for a completed job
pub async fn download_file(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let job = JobRepository::new(state.db.clone())
        .find_for_user(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    if job.status != JobStatus::Completed {
        return Err(AppError::InvalidState("Job not completed yet".to_string()));
    }

    let path = job
        .file_path
        .clone()
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    if !state.storage.exists(&path).await {
        return Err(AppError::NotFound("File not found on storage".to_string()));
    }

    let data = state.storage.read(&path).await?;
    let filename = Job::from_model(job)?.download_filename();

    Ok((
        [
            (header::CONTENT_TYPE, "audio/flac".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        data,
    )
        .into_response())
}
