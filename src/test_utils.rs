//! Test utilities for Entrain
//!
//! Provides helpers for creating isolated test environments with:
//! - In-memory SQLite databases (one per test)
//! - Per-test storage directories
//! - AppState factories
//! - Test data generators

use chrono::{Duration, Utc};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    config::Config,
    db::{
        entities::{jobs, users},
        enums::JobStatus,
    },
    jobs::{JobMessage, JobQueue},
    models::JobConfig,
    services::StorageService,
    state::AppState,
};

/// Setup an in-memory SQLite database with all migrations applied
///
/// Each call creates a fresh, isolated database perfect for parallel testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// A storage directory no other test shares
pub fn test_storage_path() -> String {
    std::env::temp_dir()
        .join(format!("entrain-test-{}", Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

/// Create a test configuration with sensible defaults
pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 8000,
        storage_path: test_storage_path(),
        user_storage_limit_bytes: 1024 * 1024,
        file_retention_days: 7,
        dev_unlimited_credits: false,
        admin_emails: vec!["admin@entrain.test".to_string()],
        frontend_url: "http://localhost:3000".to_string(),
        app_base_url: "http://localhost:3000".to_string(),
        stripe_secret_key: "sk_test_123".to_string(),
        stripe_api_base: "http://127.0.0.1:9".to_string(),
        stripe_price_map: HashMap::from([
            ("price_small".to_string(), 5),
            ("price_large".to_string(), 20),
        ]),
        render_step_ms: 0,
    }
}

/// Create a complete test AppState with an isolated database
pub async fn setup_test_app_state() -> AppState {
    let (state, _receiver) = setup_test_app_state_with_config(test_config()).await;
    state
}

/// Create a test AppState with job queue that keeps the receiver alive
/// Returns (AppState, receiver) tuple - keep receiver in scope to prevent queue from closing
pub async fn setup_test_app_state_with_queue() -> (
    AppState,
    tokio::sync::mpsc::UnboundedReceiver<JobMessage>,
) {
    setup_test_app_state_with_config(test_config()).await
}

pub async fn setup_test_app_state_with_config(
    config: Config,
) -> (
    AppState,
    tokio::sync::mpsc::UnboundedReceiver<JobMessage>,
) {
    let db = setup_test_db().await;
    let (job_queue, receiver) = JobQueue::new();

    (AppState::new(db, config, job_queue), receiver)
}

// ============================================================================
// Test Data Factories
// ============================================================================

/// Create a test user in the database
pub async fn create_test_user(db: &DatabaseConnection, email: &str, credits: i32) -> users::Model {
    let now = Utc::now().into();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(Some("Test User".to_string())),
        image: Set(None),
        credits: Set(credits),
        created_at: Set(now),
        updated_at: Set(now),
    };

    user.insert(db).await.expect("Failed to insert test user")
}

pub fn test_job_config(affirmation_count: usize) -> JobConfig {
    JobConfig::new(
        (1..=affirmation_count)
            .map(|i| format!("I am calm and focused {}", i))
            .collect(),
    )
}

/// Create a test job in the database, created `age` ago
pub async fn create_test_job(
    db: &DatabaseConnection,
    user_id: Uuid,
    status: JobStatus,
    age: Duration,
) -> jobs::Model {
    let created_at = Utc::now() - age;
    let finished = matches!(status, JobStatus::Completed | JobStatus::Archived);

    let job = jobs::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        status: Set(status),
        progress: Set(if finished { 100 } else { 0 }),
        progress_message: Set(None),
        error_message: Set((status == JobStatus::Failed).then(|| "Render failed".to_string())),
        config: Set(serde_json::to_value(test_job_config(3)).expect("config serializes")),
        file_path: Set(None),
        file_size_bytes: Set(None),
        created_at: Set(created_at.into()),
        updated_at: Set(created_at.into()),
        completed_at: Set(finished.then(|| created_at.into())),
        archived_at: Set((status == JobStatus::Archived).then(|| created_at.into())),
    };

    job.insert(db).await.expect("Failed to insert test job")
}

/// Create a completed job that owns a stored file of `size` bytes
pub async fn create_completed_job_with_file(
    db: &DatabaseConnection,
    storage: &StorageService,
    user_id: Uuid,
    size: usize,
    age: Duration,
) -> jobs::Model {
    let job = create_test_job(db, user_id, JobStatus::Completed, age).await;
    let (path, stored) = storage
        .write(job.id, "track.flac", &vec![0u8; size])
        .await
        .expect("Failed to write test file");

    let mut active: jobs::ActiveModel = job.into();
    active.file_path = Set(Some(path));
    active.file_size_bytes = Set(Some(stored));

    active.update(db).await.expect("Failed to attach test file")
}
