use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::entities::custom_voices;

pub const VOICE_ID_MAX_CHARS: usize = 64;
pub const VOICE_NAME_MAX_CHARS: usize = 100;

/// Built-in narrator voices: display name and provider voice id. Jobs refer to
/// these by name.
pub const PRESET_VOICES: [(&str, &str); 9] = [
    ("Rachel", "21m00Tcm4TlvDq8ikWAM"),
    ("Clara", "Qggl4b0xRMiqOwhPtVWT"),
    ("Anne", "flHkNRp1BlvT73UL6gyz"),
    ("Emma", "56bWURjYFHyYyVf490Dp"),
    ("Sadie", "bD9maNcCuQQS75DGuteM"),
    ("Brian", "nPczCjzI2devNBz1zQrb"),
    ("Charlie", "IKne3meq5aSn9XLyUdCD"),
    ("Jon", "Cz0K1kOv9tD8l0b5Qu53"),
    ("Clancy", "FLpz0UhC9a7CIfUSBo6S"),
];

pub fn is_preset_voice(voice_id: &str) -> bool {
    PRESET_VOICES.iter().any(|(name, _)| *name == voice_id)
}

/// Voice ids are plain tokens: they end up in file names and headers.
pub fn is_valid_voice_id(voice_id: &str) -> bool {
    !voice_id.is_empty()
        && voice_id.len() <= VOICE_ID_MAX_CHARS
        && voice_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceResponse {
    /// Value to put in `JobConfig::voice_id`.
    pub id: String,
    pub name: String,
    pub preview_url: Option<String>,
    pub is_custom: bool,
}

impl VoiceResponse {
    pub fn presets() -> Vec<Self> {
        PRESET_VOICES
            .iter()
            .map(|(name, _)| Self {
                id: name.to_string(),
                name: name.to_string(),
                preview_url: None,
                is_custom: false,
            })
            .collect()
    }
}

impl From<custom_voices::Model> for VoiceResponse {
    fn from(model: custom_voices::Model) -> Self {
        Self {
            id: model.provider_voice_id,
            name: model.name,
            preview_url: model.preview_url,
            is_custom: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomVoiceRequest {
    pub name: String,
    pub voice_id: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomVoiceResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub voice_id: String,
    pub preview_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<custom_voices::Model> for CustomVoiceResponse {
    fn from(model: custom_voices::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            voice_id: model.provider_voice_id,
            preview_url: model.preview_url,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
