//! Integration tests for job handler routes
//!
//! Tests all job-related API endpoints including:
//! - Create (credit deduction, storage limit, validation)
//! - List, detail and status polling
//! - Rename, delete, archive and regenerate transitions
//! - Storage usage and file download
//! - Voice validation and refunds when the queue is down

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Duration;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use entrain::db::{
    entities::{custom_voices, jobs, users},
    enums::JobStatus,
};
use entrain::handlers;
use entrain::state::AppState;
use entrain::test_utils::*;

const EMAIL: &str = "listener@entrain.test";

/// Helper to create a test router with API routes
fn create_test_router(state: &AppState) -> Router {
    Router::new()
        .nest("/api", handlers::api_routes())
        .with_state(state.clone())
}

fn api_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-email", EMAIL);

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to parse JSON response body
async fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: axum::response::Response,
) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn affirmations(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("I breathe slowly {}", i)).collect()
}

async fn credits_of(state: &AppState, user_id: uuid::Uuid) -> i32 {
    users::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .unwrap()
        .unwrap()
        .credits
}

#[tokio::test]
async fn test_requests_without_user_are_rejected() {
    let state = setup_test_app_state().await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(Request::builder().uri("/api/jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["detail"], "Not authenticated");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let state = setup_test_app_state().await;
    let app = create_test_router(&state);

    let response = app.oneshot(api_request("GET", "/api/jobs", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_job_deducts_credits_and_enqueues() {
    let (state, mut receiver) = setup_test_app_state_with_queue().await;
    let user = create_test_user(&state.db, EMAIL, 3).await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(api_request(
            "POST",
            "/api/jobs",
            Some(json!({ "config": { "affirmations": affirmations(120), "title": "  Evening  " } })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["progress"], 0);
    assert_eq!(body["config"]["title"], "Evening");
    assert_eq!(body["config"]["voice_id"], "Rachel");
    assert_eq!(body["config"]["duration_minutes"], 40);

    assert_eq!(credits_of(&state, user.id).await, 0);

    let message = receiver.try_recv().expect("job should be enqueued");
    assert_eq!(message.job_id.to_string(), body["id"].as_str().unwrap());
}

#[tokio::test]
async fn test_create_job_insufficient_credits() {
    let (state, mut receiver) = setup_test_app_state_with_queue().await;
    let user = create_test_user(&state.db, EMAIL, 2).await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(api_request(
            "POST",
            "/api/jobs",
            Some(json!({ "config": { "affirmations": affirmations(120) } })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = parse_json_response(response).await;
    assert_eq!(
        body["detail"],
        "Insufficient credits. This job requires 3 credits but you have 2."
    );

    assert_eq!(credits_of(&state, user.id).await, 2);
    assert!(jobs::Entity::find().all(&state.db).await.unwrap().is_empty());
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_create_job_with_blank_affirmations_is_invalid() {
    let (state, _receiver) = setup_test_app_state_with_queue().await;
    let user = create_test_user(&state.db, EMAIL, 5).await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(api_request(
            "POST",
            "/api/jobs",
            Some(json!({ "config": { "affirmations": ["   ", ""] } })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["detail"], "Please enter at least one affirmation");
    assert_eq!(credits_of(&state, user.id).await, 5);
}

#[tokio::test]
async fn test_create_job_with_full_storage_is_conflict() {
    let (state, _receiver) = setup_test_app_state_with_queue().await;
    let user = create_test_user(&state.db, EMAIL, 5).await;
    let limit = state.config.user_storage_limit_bytes as usize;
    create_completed_job_with_file(&state.db, &state.storage, user.id, limit, Duration::zero())
        .await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(api_request(
            "POST",
            "/api/jobs",
            Some(json!({ "config": { "affirmations": affirmations(1) } })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(credits_of(&state, user.id).await, 5);
}

#[tokio::test]
async fn test_admin_skips_credit_check() {
    let (state, _receiver) = setup_test_app_state_with_queue().await;
    let user = create_test_user(&state.db, "admin@entrain.test", 0).await;
    let app = create_test_router(&state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header("x-user-email", "admin@entrain.test")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "config": { "affirmations": affirmations(500) } }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(credits_of(&state, user.id).await, 0);
}

#[tokio::test]
async fn test_list_jobs_newest_first_and_scoped_to_user() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;
    let other = create_test_user(&state.db, "other@entrain.test", 1).await;

    let old = create_test_job(&state.db, user.id, JobStatus::Completed, Duration::hours(5)).await;
    let new = create_test_job(&state.db, user.id, JobStatus::Pending, Duration::minutes(1)).await;
    create_test_job(&state.db, other.id, JobStatus::Pending, Duration::zero()).await;

    let app = create_test_router(&state);
    let response = app.oneshot(api_request("GET", "/api/jobs", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    let jobs = body.as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], new.id.to_string());
    assert_eq!(jobs[1]["id"], old.id.to_string());
}

#[tokio::test]
async fn test_list_jobs_applies_retention_cleanup() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;

    let expired = create_completed_job_with_file(
        &state.db,
        &state.storage,
        user.id,
        64,
        Duration::days(8),
    )
    .await;
    let fresh =
        create_completed_job_with_file(&state.db, &state.storage, user.id, 64, Duration::days(1))
            .await;
    create_test_job(&state.db, user.id, JobStatus::Failed, Duration::days(9)).await;

    let app = create_test_router(&state);
    let response = app.oneshot(api_request("GET", "/api/jobs", None)).await.unwrap();
    let body: Value = parse_json_response(response).await;
    let jobs = body.as_array().unwrap();

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], fresh.id.to_string());
    assert_eq!(jobs[0]["status"], "completed");
    assert_eq!(jobs[1]["id"], expired.id.to_string());
    assert_eq!(jobs[1]["status"], "archived");
    assert!(jobs[1]["file_path"].is_null());
    assert!(!state.storage.exists(expired.file_path.as_deref().unwrap()).await);
}

#[tokio::test]
async fn test_get_job_status_and_other_users_job() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;
    let other = create_test_user(&state.db, "other@entrain.test", 1).await;
    let job = create_test_job(&state.db, user.id, JobStatus::Failed, Duration::zero()).await;
    let foreign = create_test_job(&state.db, other.id, JobStatus::Pending, Duration::zero()).await;

    let app = create_test_router(&state);

    let response = app
        .clone()
        .oneshot(api_request("GET", &format!("/api/jobs/{}/status", job.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error_message"], "Render failed");
    assert!(body.get("config").is_none());

    let response = app
        .oneshot(api_request("GET", &format!("/api/jobs/{}", foreign.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_storage_reports_usage() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;
    let limit = state.config.user_storage_limit_bytes;
    let size = (limit as f64 * 0.85) as usize;
    create_completed_job_with_file(&state.db, &state.storage, user.id, size, Duration::zero())
        .await;

    let app = create_test_router(&state);
    let response = app
        .oneshot(api_request("GET", "/api/jobs/storage", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["used_bytes"], size as i64);
    assert_eq!(body["limit_bytes"], limit);
    assert_eq!(body["used_percentage"], 85.0);
}

#[tokio::test]
async fn test_archive_then_regenerate() {
    let (state, mut receiver) = setup_test_app_state_with_queue().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;
    let job =
        create_completed_job_with_file(&state.db, &state.storage, user.id, 128, Duration::zero())
            .await;
    let path = job.file_path.clone().unwrap();

    let app = create_test_router(&state);

    let response = app
        .clone()
        .oneshot(api_request("POST", &format!("/api/jobs/{}/archive", job.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let archived: Value = parse_json_response(response).await;
    assert_eq!(archived["status"], "archived");
    assert!(archived["file_path"].is_null());
    assert!(archived["file_size_bytes"].is_null());
    assert!(!archived["archived_at"].is_null());
    assert!(!state.storage.exists(&path).await);

    // Archiving again is a no-op
    let response = app
        .clone()
        .oneshot(api_request("POST", &format!("/api/jobs/{}/archive", job.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(api_request("POST", &format!("/api/jobs/{}/regenerate", job.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let regenerated: Value = parse_json_response(response).await;
    assert_eq!(regenerated["status"], "pending");
    assert_ne!(regenerated["id"], archived["id"]);
    assert_eq!(regenerated["config"], archived["config"]);

    assert_eq!(credits_of(&state, user.id).await, 0);
    assert!(receiver.try_recv().is_ok());

    let original = jobs::Entity::find_by_id(job.id)
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(original.status, JobStatus::Archived);
}

#[tokio::test]
async fn test_illegal_transitions_are_refused() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 5).await;
    let pending = create_test_job(&state.db, user.id, JobStatus::Pending, Duration::zero()).await;
    let processing =
        create_test_job(&state.db, user.id, JobStatus::Processing, Duration::zero()).await;
    let completed =
        create_test_job(&state.db, user.id, JobStatus::Completed, Duration::zero()).await;

    let app = create_test_router(&state);

    let cases = [
        ("POST", format!("/api/jobs/{}/archive", pending.id), None),
        ("POST", format!("/api/jobs/{}/regenerate", completed.id), None),
        (
            "PATCH",
            format!("/api/jobs/{}", pending.id),
            Some(json!({ "title": "Too soon" })),
        ),
        ("DELETE", format!("/api/jobs/{}", processing.id), None),
    ];

    for (method, uri, body) in cases {
        let response = app
            .clone()
            .oneshot(api_request(method, &uri, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
        let body: Value = parse_json_response(response).await;
        assert_eq!(body["error"], "invalid_state");
    }

    assert_eq!(credits_of(&state, user.id).await, 5);
}

#[tokio::test]
async fn test_rename_job() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;
    let job = create_test_job(&state.db, user.id, JobStatus::Completed, Duration::zero()).await;
    let app = create_test_router(&state);
    let uri = format!("/api/jobs/{}", job.id);

    let response = app
        .clone()
        .oneshot(api_request("PATCH", &uri, Some(json!({ "title": "  Deep Rest " }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["config"]["title"], "Deep Rest");

    let response = app
        .clone()
        .oneshot(api_request("PATCH", &uri, Some(json!({ "title": "x".repeat(101) }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(api_request("PATCH", &uri, Some(json!({ "title": "   " }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert!(body["config"].get("title").is_none());
}

#[tokio::test]
async fn test_delete_job_removes_file() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;
    let job =
        create_completed_job_with_file(&state.db, &state.storage, user.id, 32, Duration::zero())
            .await;

    let app = create_test_router(&state);
    let response = app
        .oneshot(api_request("DELETE", &format!("/api/jobs/{}", job.id), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["message"], "Job deleted");

    assert!(jobs::Entity::find_by_id(job.id).one(&state.db).await.unwrap().is_none());
    assert!(!state.storage.exists(job.file_path.as_deref().unwrap()).await);
}

#[tokio::test]
async fn test_download_file() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;
    let job =
        create_completed_job_with_file(&state.db, &state.storage, user.id, 16, Duration::zero())
            .await;
    let pending = create_test_job(&state.db, user.id, JobStatus::Pending, Duration::zero()).await;

    let app = create_test_router(&state);

    let response = app
        .clone()
        .oneshot(api_request("GET", &format!("/api/files/{}", job.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/flac");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"meditation-Rachel-40min.flac\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.len(), 16);

    let response = app
        .oneshot(api_request("GET", &format!("/api/files/{}", pending.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_job_rejects_header_breaking_voice_ids() {
    let (state, mut receiver) = setup_test_app_state_with_queue().await;
    let user = create_test_user(&state.db, EMAIL, 5).await;
    let app = create_test_router(&state);

    for voice_id in ["Rachel\nX", "a\"; filename=\"evil.exe", "Unknown"] {
        let response = app
            .clone()
            .oneshot(api_request(
                "POST",
                "/api/jobs",
                Some(json!({ "config": { "affirmations": affirmations(1), "voice_id": voice_id } })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{:?}", voice_id);
    }

    assert_eq!(credits_of(&state, user.id).await, 5);
    assert!(jobs::Entity::find().all(&state.db).await.unwrap().is_empty());
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_create_job_accepts_own_custom_voice() {
    let (state, _receiver) = setup_test_app_state_with_queue().await;
    let user = create_test_user(&state.db, EMAIL, 5).await;
    custom_voices::ActiveModel {
        id: Set(uuid::Uuid::new_v4()),
        user_id: Set(user.id),
        name: Set("My Voice".to_string()),
        provider_voice_id: Set("cloned_Voice-01".to_string()),
        preview_url: Set(None),
        created_at: Set(chrono::Utc::now().into()),
    }
    .insert(&state.db)
    .await
    .unwrap();
    let app = create_test_router(&state);

    let response = app
        .oneshot(api_request(
            "POST",
            "/api/jobs",
            Some(json!({ "config": { "affirmations": affirmations(1), "voice_id": "cloned_Voice-01" } })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["config"]["voice_id"], "cloned_Voice-01");
}

#[tokio::test]
async fn test_download_filename_is_sanitized_for_stored_voice() {
    let state = setup_test_app_state().await;
    let user = create_test_user(&state.db, EMAIL, 1).await;
    let job =
        create_completed_job_with_file(&state.db, &state.storage, user.id, 8, Duration::zero())
            .await;

    let mut config = job.config.clone();
    config["voice_id"] = json!("x\"; filename=\"evil.exe\n");
    let mut active: jobs::ActiveModel = job.clone().into();
    active.config = Set(config);
    active.update(&state.db).await.unwrap();

    let app = create_test_router(&state);
    let response = app
        .oneshot(api_request("GET", &format!("/api/files/{}", job.id), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"meditation-x___filename__evil_exe_-40min.flac\""
    );
}

#[tokio::test]
async fn test_create_job_refunds_when_queue_is_down() {
    let (state, receiver) = setup_test_app_state_with_queue().await;
    drop(receiver);
    let user = create_test_user(&state.db, EMAIL, 3).await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(api_request(
            "POST",
            "/api/jobs",
            Some(json!({ "config": { "affirmations": affirmations(1) } })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(credits_of(&state, user.id).await, 3);

    let jobs = jobs::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert_eq!(jobs[0].error_message.as_deref(), Some("Job queue unavailable"));
}
