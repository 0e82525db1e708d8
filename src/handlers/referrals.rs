use axum::{extract::State, Json};

use crate::{
    error::{AppError, Result},
    handlers::auth::CurrentUser,
    models::{CaptureReferralRequest, MessageResponse, ReferralSummary},
    services::ledger::{build_referral_link, normalize_referral_code},
    state::AppState,
};

pub async fn capture_referral(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CaptureReferralRequest>,
) -> Result<Json<MessageResponse>> {
    let referrer_id = normalize_referral_code(&payload.referral_code)
        .ok_or_else(|| AppError::Validation("Invalid referral code".to_string()))?;

    let captured = state
        .ledger()
        .capture_referral_signup(user.id, referrer_id)
        .await?;

    let message = if captured {
        "Referral recorded"
    } else {
        "Referral not applicable"
    };

    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}

pub async fn get_referral_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ReferralSummary>> {
    let (rewarded_count, pending_count) = state.ledger().referral_counts(user.id).await?;

    Ok(Json(ReferralSummary {
        referral_link: build_referral_link(&state.config.app_base_url, user.id),
        rewarded_count,
        pending_count,
    }))
}
