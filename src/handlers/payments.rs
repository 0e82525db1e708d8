use axum::{extract::State, Json};

use crate::{
    db::repositories::UserRepository,
    error::{AppError, Result},
    handlers::auth::CurrentUser,
    models::{
        CheckoutSessionRequest, CheckoutSessionResponse, ConfirmPaymentRequest,
        ConfirmPaymentResponse,
    },
    services::{NewCheckout, PaymentRecord},
    state::AppState,
};

pub async fn create_checkout_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CheckoutSessionRequest>,
) -> Result<Json<CheckoutSessionResponse>> {
    let credits = *state
        .config
        .stripe_price_map
        .get(&payload.price_id)
        .ok_or_else(|| AppError::Validation("Invalid price ID".to_string()))?;

    let frontend = state.config.frontend_url.trim_end_matches('/');
    let session = state
        .checkout
        .create_session(NewCheckout {
            price_id: &payload.price_id,
            user_id: user.id,
            user_email: &user.email,
            credits,
            success_url: format!("{}/credits/success?session_id={{CHECKOUT_SESSION_ID}}", frontend),
            cancel_url: format!("{}/credits", frontend),
        })
        .await?;

    let checkout_url = session
        .url
        .ok_or_else(|| AppError::ExternalApi("Checkout session has no URL".to_string()))?;

    Ok(Json(CheckoutSessionResponse { checkout_url }))
}

/// Credits the caller for a paid checkout session. Safe to call repeatedly.
pub async fn confirm_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>> {
    let session = state.checkout.retrieve_session(&payload.session_id).await?;

    if session.metadata_user_id() != Some(user.id) {
        return Err(AppError::NotFound("Checkout session not found".to_string()));
    }
    if !session.is_paid() {
        return Err(AppError::InvalidState("Payment not completed".to_string()));
    }

    let credits = session.metadata_credits();
    if credits <= 0 {
        tracing::warn!("Invalid payment metadata on session {}", session.id);
        return Err(AppError::ExternalApi("Invalid payment metadata".to_string()));
    }

    let credited = state
        .ledger()
        .record_payment(PaymentRecord {
            user_id: user.id,
            checkout_session_id: session.id.clone(),
            payment_intent_id: session.payment_intent.clone(),
            credits,
            amount_cents: session.amount_total.unwrap_or(0),
            currency: session.currency.clone().unwrap_or_else(|| "usd".to_string()),
        })
        .await?;

    let balance = UserRepository::new(state.db.clone())
        .find_by_id(user.id)
        .await?
        .map(|u| u.credits)
        .unwrap_or(user.credits);

    Ok(Json(ConfirmPaymentResponse {
        credited,
        credits: balance,
    }))
}
