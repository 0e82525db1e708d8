use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::voice::{is_valid_voice_id, VOICE_ID_MAX_CHARS};

/// Affirmations covered by a single credit.
pub const AFFIRMATIONS_PER_CREDIT: u32 = 50;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DURATION_STEP_MINUTES: u32 = 5;
pub const MIN_DURATION_MINUTES: u32 = 10;
pub const MAX_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinauralPreset {
    /// Deep sleep.
    Delta,
    /// Meditation, creativity.
    #[default]
    Theta,
    /// Relaxation.
    Alpha,
    /// Focus, alertness.
    Beta,
}

impl BinauralPreset {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Delta => "delta",
            Self::Theta => "theta",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
        }
    }

    pub fn frequency_hz(&self) -> f64 {
        match self {
            Self::Delta => 2.0,
            Self::Theta => 6.0,
            Self::Alpha => 10.0,
            Self::Beta => 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.8,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowpassFilter {
    pub enabled: bool,
    pub cutoff_hz: u32,
}

impl Default for LowpassFilter {
    fn default() -> Self {
        Self {
            enabled: true,
            cutoff_hz: 3750,
        }
    }
}

/// Everything the renderer needs to produce a track. Immutable once a job
/// exists, except for `title`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub affirmations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub binaural_preset: BinauralPreset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binaural_frequency_hz: Option<f64>,
    #[serde(default = "default_affirmation_volume_db")]
    pub affirmation_volume_db: f64,
    #[serde(default = "default_binaural_volume_db")]
    pub binaural_volume_db: f64,
    #[serde(default)]
    pub voice_settings: VoiceSettings,
    #[serde(default)]
    pub lowpass_filter: LowpassFilter,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
}

fn default_voice_id() -> String {
    "Rachel".to_string()
}

fn default_duration_minutes() -> u32 {
    40
}

fn default_affirmation_volume_db() -> f64 {
    -15.0
}

fn default_binaural_volume_db() -> f64 {
    -12.0
}

fn default_repetitions() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Please enter at least one affirmation")]
    EmptyAffirmations,

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("duration_minutes must be a multiple of {DURATION_STEP_MINUTES}")]
    DurationStep,

    #[error("title must be at most {TITLE_MAX_CHARS} characters")]
    TitleTooLong,

    #[error("voice_id must be 1 to {VOICE_ID_MAX_CHARS} letters, digits, '-' or '_'")]
    InvalidVoice,
}

/// `max(1, ceil(affirmations * repetitions / 50))`.
pub fn credits_required(affirmation_count: usize, repetitions: u32) -> u32 {
    let total = affirmation_count as u64 * u64::from(repetitions);
    let per_credit = u64::from(AFFIRMATIONS_PER_CREDIT);
    total.div_ceil(per_credit).max(1) as u32
}

/// Splits textarea input into affirmations, dropping blank lines.
pub fn parse_affirmations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trims a title; an empty title means "no title".
pub fn normalize_title(title: Option<&str>) -> Result<Option<String>, ConfigError> {
    match title.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) if t.chars().count() > TITLE_MAX_CHARS => Err(ConfigError::TitleTooLong),
        Some(t) => Ok(Some(t.to_string())),
    }
}

impl JobConfig {
    pub fn new(affirmations: Vec<String>) -> Self {
        Self {
            affirmations,
            title: None,
            voice_id: default_voice_id(),
            duration_minutes: default_duration_minutes(),
            binaural_preset: BinauralPreset::default(),
            binaural_frequency_hz: None,
            affirmation_volume_db: default_affirmation_volume_db(),
            binaural_volume_db: default_binaural_volume_db(),
            voice_settings: VoiceSettings::default(),
            lowpass_filter: LowpassFilter::default(),
            repetitions: default_repetitions(),
        }
    }

    pub fn credits_required(&self) -> u32 {
        credits_required(self.affirmations.len(), self.repetitions)
    }

    /// The explicit frequency if one was given, otherwise the preset's.
    pub fn binaural_frequency(&self) -> f64 {
        self.binaural_frequency_hz
            .unwrap_or_else(|| self.binaural_preset.frequency_hz())
    }

    /// Trims affirmations and title, then checks every bound.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.affirmations = self
            .affirmations
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        self.title = normalize_title(self.title.as_deref())?;
        self.voice_id = self.voice_id.trim().to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.affirmations.iter().all(|a| a.trim().is_empty()) {
            return Err(ConfigError::EmptyAffirmations);
        }
        if let Some(title) = &self.title {
            if title.chars().count() > TITLE_MAX_CHARS {
                return Err(ConfigError::TitleTooLong);
            }
        }
        if !is_valid_voice_id(&self.voice_id) {
            return Err(ConfigError::InvalidVoice);
        }

        check_range(
            "duration_minutes",
            f64::from(self.duration_minutes),
            f64::from(MIN_DURATION_MINUTES),
            f64::from(MAX_DURATION_MINUTES),
        )?;
        if self.duration_minutes % DURATION_STEP_MINUTES != 0 {
            return Err(ConfigError::DurationStep);
        }

        if let Some(hz) = self.binaural_frequency_hz {
            check_range("binaural_frequency_hz", hz, 0.5, 30.0)?;
        }
        check_range("affirmation_volume_db", self.affirmation_volume_db, -30.0, 0.0)?;
        check_range("binaural_volume_db", self.binaural_volume_db, -30.0, 0.0)?;
        check_range("voice_settings.stability", self.voice_settings.stability, 0.0, 1.0)?;
        check_range(
            "voice_settings.similarity_boost",
            self.voice_settings.similarity_boost,
            0.0,
            1.0,
        )?;
        check_range("voice_settings.style", self.voice_settings.style, 0.0, 1.0)?;
        check_range(
            "lowpass_filter.cutoff_hz",
            f64::from(self.lowpass_filter.cutoff_hz),
            2000.0,
            8000.0,
        )?;
        check_range("repetitions", f64::from(self.repetitions), 1.0, 10.0)?;

        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    // NaN fails both comparisons, so test for containment rather than exclusion.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, min, max })
    }
}
