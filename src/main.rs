use anyhow::{Context, Result};
use dotenvy::dotenv;
use migration::MigratorTrait;
use sea_orm::Database;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entrain::{
    config::Config,
    create_router,
    jobs::{JobExecutor, JobQueue, SimulatedRenderer},
    state::AppState,
    tasks,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entrain=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Entrain...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations completed");

    // Prepare file storage
    tokio::fs::create_dir_all(&config.storage_path)
        .await
        .with_context(|| format!("Failed to create storage directory {}", config.storage_path))?;

    // Initialize job queue and executor
    let (job_queue, job_receiver) = JobQueue::new();
    let render_step = Duration::from_millis(config.render_step_ms);
    tracing::info!("Job queue initialized");

    // Initialize application state
    let state = AppState::new(db, config.clone(), job_queue);

    // Start job executor
    let executor = JobExecutor::new(
        state.clone(),
        Arc::new(SimulatedRenderer::new(render_step)),
        job_receiver,
    );
    tokio::spawn(async move {
        executor.start().await;
    });
    tracing::info!("Job executor started");

    // Resume work left by a previous run
    state.job_queue.recover(&state.db).await?;

    // Start background tasks
    let _scheduler = tasks::start_scheduler(state.clone()).await?;
    tracing::info!("Background task scheduler started");

    // Build application routes
    let app = create_router(state);

    // Start server

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("SERVER_HOST and SERVER_PORT must form a valid socket address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
