use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{
    db::{entities::users, repositories::UserRepository},
    error::AppError,
    state::AppState,
};

/// Header carrying the signed-in user's email. The sign-in front end sets it
/// after verifying the session; a request without it is unauthenticated.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Email of the caller, taken from [`USER_EMAIL_HEADER`].
pub struct UserEmail(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserEmail {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(|email| Self(email.to_string()))
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

/// The caller's user record.
pub struct CurrentUser(pub users::Model);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let UserEmail(email) = UserEmail::from_request_parts(parts, state).await?;

        let user = UserRepository::new(state.db.clone())
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(Self(user))
    }
}
