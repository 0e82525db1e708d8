use thiserror::Error;

use crate::models::job_config::{credits_required, parse_affirmations};
use crate::models::{BinauralPreset, ConfigError, JobConfig, LowpassFilter, VoiceSettings};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("Please enter at least one affirmation")]
    NoAffirmations,

    #[error(
        "Insufficient credits. This job requires {needed} credit{} but you have {available}.",
        plural(.needed)
    )]
    InsufficientCredits { needed: u32, available: i32 },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

fn plural(n: &u32) -> &'static str {
    if *n == 1 {
        ""
    } else {
        "s"
    }
}

/// Raw generator input, as typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorForm {
    /// One affirmation per line.
    pub affirmations: String,
    pub title: String,
    pub voice_id: String,
    pub duration_minutes: u32,
    pub binaural_preset: BinauralPreset,
    pub affirmation_volume_db: f64,
    pub binaural_volume_db: f64,
    pub voice_stability: f64,
    pub voice_similarity: f64,
    pub lowpass_enabled: bool,
    pub lowpass_cutoff: u32,
    pub repetitions: u32,
}

impl Default for GeneratorForm {
    fn default() -> Self {
        Self {
            affirmations: String::new(),
            title: String::new(),
            voice_id: "Rachel".to_string(),
            duration_minutes: 40,
            binaural_preset: BinauralPreset::Theta,
            affirmation_volume_db: -15.0,
            binaural_volume_db: -12.0,
            voice_stability: 0.8,
            voice_similarity: 0.75,
            lowpass_enabled: true,
            lowpass_cutoff: 3750,
            repetitions: 1,
        }
    }
}

impl GeneratorForm {
    pub fn affirmation_count(&self) -> usize {
        parse_affirmations(&self.affirmations).len()
    }

    pub fn credits_needed(&self) -> u32 {
        credits_required(self.affirmation_count(), self.repetitions)
    }

    pub fn can_submit(&self, credits: i32) -> bool {
        i64::from(credits) >= i64::from(self.credits_needed())
    }

    /// Builds the submitted config. The credit check runs first, matching
    /// what the user sees next to the submit button.
    pub fn build(&self, credits: i32) -> Result<JobConfig, FormError> {
        let needed = self.credits_needed();
        if !self.can_submit(credits) {
            return Err(FormError::InsufficientCredits {
                needed,
                available: credits,
            });
        }

        let affirmations = parse_affirmations(&self.affirmations);
        if affirmations.is_empty() {
            return Err(FormError::NoAffirmations);
        }

        let config = JobConfig {
            affirmations,
            title: Some(self.title.clone()),
            voice_id: self.voice_id.clone(),
            duration_minutes: self.duration_minutes,
            binaural_preset: self.binaural_preset,
            binaural_frequency_hz: None,
            affirmation_volume_db: self.affirmation_volume_db,
            binaural_volume_db: self.binaural_volume_db,
            voice_settings: VoiceSettings {
                stability: self.voice_stability,
                similarity_boost: self.voice_similarity,
                ..VoiceSettings::default()
            },
            lowpass_filter: LowpassFilter {
                enabled: self.lowpass_enabled,
                cutoff_hz: self.lowpass_cutoff,
            },
            repetitions: self.repetitions,
        };

        Ok(config.normalized()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form_with_lines(n: usize) -> GeneratorForm {
        GeneratorForm {
            affirmations: (0..n)
                .map(|i| format!("I am at peace {i}"))
                .collect::<Vec<_>>()
                .join("\n"),
            ..GeneratorForm::default()
        }
    }

    #[test]
    fn test_120_affirmations_need_three_credits() {
        let form = form_with_lines(120);
        assert_eq!(form.credits_needed(), 3);
        assert!(!form.can_submit(2));
        assert!(form.can_submit(3));

        assert_eq!(
            form.build(2),
            Err(FormError::InsufficientCredits {
                needed: 3,
                available: 2
            })
        );
        assert_eq!(form.build(3).unwrap().affirmations.len(), 120);
    }

    #[test]
    fn test_insufficient_credits_message() {
        let err = form_with_lines(10).build(0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient credits. This job requires 1 credit but you have 0."
        );
    }

    #[test]
    fn test_blank_form_is_rejected() {
        let form = GeneratorForm {
            affirmations: "\n   \n".to_string(),
            ..GeneratorForm::default()
        };
        assert_eq!(form.build(5), Err(FormError::NoAffirmations));
    }

    #[test]
    fn test_build_maps_fields_and_drops_blank_title() {
        let mut form = form_with_lines(2);
        form.title = "   ".to_string();
        form.voice_stability = 0.5;
        form.lowpass_enabled = false;

        let config = form.build(1).unwrap();
        assert_eq!(config.title, None);
        assert_eq!(config.voice_settings.stability, 0.5);
        assert_eq!(config.voice_settings.similarity_boost, 0.75);
        assert!(!config.lowpass_filter.enabled);
        assert_eq!(config.binaural_frequency(), 6.0);
    }

    #[test]
    fn test_out_of_range_values_surface_config_error() {
        let mut form = form_with_lines(1);
        form.repetitions = 0;
        assert!(matches!(form.build(10), Err(FormError::Invalid(_))));
    }
}
