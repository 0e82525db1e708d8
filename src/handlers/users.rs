use axum::{extract::State, Json};
use chrono::Utc;
use sea_orm::Set;
use uuid::Uuid;

use crate::{
    db::{entities::users, repositories::UserRepository},
    error::{AppError, Result},
    handlers::auth::CurrentUser,
    models::{SyncUserRequest, UserResponse},
    state::AppState,
};

/// Credits granted on first sign-in.
pub const SIGNUP_CREDITS: i32 = 1;

/// Create the user on first sign-in, refresh name/image afterwards
pub async fn sync_user(
    State(state): State<AppState>,
    Json(payload): Json<SyncUserRequest>,
) -> Result<Json<UserResponse>> {
    let email = payload.email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }

    let repo = UserRepository::new(state.db.clone());
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

    let user = match repo.find_by_email(&email).await? {
        Some(existing) => {
            let mut active: users::ActiveModel = existing.into();
            if let Some(name) = payload.name {
                active.name = Set(Some(name));
            }
            if let Some(image) = payload.image {
                active.image = Set(Some(image));
            }
            active.updated_at = Set(now);
            repo.update(active).await?
        }
        None => {
            let user = repo
                .create(users::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    email: Set(email),
                    name: Set(payload.name),
                    image: Set(payload.image),
                    credits: Set(SIGNUP_CREDITS),
                    created_at: Set(now),
                    updated_at: Set(now),
                })
                .await?;
            tracing::info!("Provisioned user {}", user.id);
            user
        }
    };

    Ok(Json(UserResponse::from(user)))
}

pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}
