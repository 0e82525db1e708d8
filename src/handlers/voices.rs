use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use sea_orm::Set;
use uuid::Uuid;

use crate::{
    db::{
        entities::custom_voices,
        repositories::{CustomVoiceRepository, UserRepository},
    },
    error::{AppError, Result},
    handlers::auth::{CurrentUser, UserEmail},
    models::{
        voice::{is_preset_voice, is_valid_voice_id, VOICE_ID_MAX_CHARS, VOICE_NAME_MAX_CHARS},
        CreateCustomVoiceRequest, CustomVoiceResponse, MessageResponse, VoiceResponse,
    },
    state::AppState,
};

/// Preset voices, followed by the caller's own voices when the request is
/// authenticated.
pub async fn list_voices(
    State(state): State<AppState>,
    email: Option<UserEmail>,
) -> Result<Json<Vec<VoiceResponse>>> {
    let mut voices = VoiceResponse::presets();

    if let Some(UserEmail(email)) = email {
        if let Some(user) = UserRepository::new(state.db.clone())
            .find_by_email(&email)
            .await?
        {
            let custom = CustomVoiceRepository::new(state.db.clone())
                .list_for_user(user.id)
                .await?;
            voices.extend(custom.into_iter().map(VoiceResponse::from));
        }
    }

    Ok(Json(voices))
}

pub async fn list_custom_voices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CustomVoiceResponse>>> {
    let voices = CustomVoiceRepository::new(state.db.clone())
        .list_for_user(user.id)
        .await?;

    Ok(Json(voices.into_iter().map(CustomVoiceResponse::from).collect()))
}

pub async fn create_custom_voice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateCustomVoiceRequest>,
) -> Result<Json<CustomVoiceResponse>> {
    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > VOICE_NAME_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Voice name must be 1 to {} characters",
            VOICE_NAME_MAX_CHARS
        )));
    }

    let voice_id = payload.voice_id.trim();
    if !is_valid_voice_id(voice_id) {
        return Err(AppError::Validation(format!(
            "Voice ID must be 1 to {} letters, digits, '-' or '_'",
            VOICE_ID_MAX_CHARS
        )));
    }
    if is_preset_voice(voice_id) {
        return Err(AppError::Validation(format!("{} is already a preset voice", voice_id)));
    }

    let repo = CustomVoiceRepository::new(state.db.clone());
    if repo.find_by_voice_id(user.id, voice_id).await?.is_some() {
        return Err(AppError::Validation("Voice already added".to_string()));
    }

    let preview_url = payload
        .preview_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    let voice = repo
        .create(custom_voices::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            name: Set(name.to_string()),
            provider_voice_id: Set(voice_id.to_string()),
            preview_url: Set(preview_url),
            created_at: Set(Utc::now().into()),
        })
        .await?;

    tracing::info!("User {} added custom voice {}", user.id, voice.id);

    Ok(Json(CustomVoiceResponse::from(voice)))
}

pub async fn delete_custom_voice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    let repo = CustomVoiceRepository::new(state.db.clone());
    let voice = repo
        .find_for_user(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Custom voice not found".to_string()))?;

    repo.delete(voice.id).await?;
    tracing::info!("User {} deleted custom voice {}", user.id, id);

    Ok(Json(MessageResponse {
        message: "Custom voice deleted".to_string(),
    }))
}
