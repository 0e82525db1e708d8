pub mod auth;
pub mod files;
pub mod health;
pub mod html;
pub mod jobs;
pub mod payments;
pub mod referrals;
pub mod users;
pub mod voices;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Job endpoints
        .route("/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/jobs/storage", get(jobs::get_storage))
        .route(
            "/jobs/:id",
            get(jobs::get_job)
                .patch(jobs::rename_job)
                .delete(jobs::delete_job),
        )
        .route("/jobs/:id/status", get(jobs::get_job_status))
        .route("/jobs/:id/archive", post(jobs::archive_job))
        .route("/jobs/:id/regenerate", post(jobs::regenerate_job))

        // File endpoints
        .route("/files/:id", get(files::download_file))

        // Payment endpoints
        .route(
            "/payments/create-checkout-session",
            post(payments::create_checkout_session),
        )
        .route("/payments/confirm", post(payments::confirm_payment))

        // User endpoints
        .route("/users/sync", post(users::sync_user))
        .route("/users/me", get(users::get_me))

        // Referral endpoints
        .route("/referrals", post(referrals::capture_referral))
        .route("/referrals/me", get(referrals::get_referral_summary))

        // Voice endpoints
        .route("/voices", get(voices::list_voices))
        .route(
            "/custom-voices",
            get(voices::list_custom_voices).post(voices::create_custom_voice),
        )
        .route("/custom-voices/:id", delete(voices::delete_custom_voice))
}

pub fn html_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(html::dashboard))
        .route("/partials/storage", get(html::storage_partial))
        .route("/partials/jobs", get(html::jobs_partial))
        .route("/partials/jobs/:id", get(html::job_partial))
}
