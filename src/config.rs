//! Tunable parameters.
//!
//! Every field has a default, so a host only needs to send the values it
//! overrides. [`CoreConfig::from_json`] validates after parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Speech parameters handed to the speech channel with every utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// User-level "voice enabled" toggle.
    pub enabled: bool,
    pub voice: String,
    pub rate: f32,
    pub volume: f32,
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: "en-US".to_string(),
            rate: 0.5,
            volume: 1.0,
            pitch: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Distance to the maneuver point at which a step becomes Approaching.
    pub approach_threshold_m: f64,
    /// Distance at which the step's instruction is announced.
    pub announce_threshold_m: f64,
    pub guidance_tick_ms: u64,
    pub speed_tick_ms: u64,
    pub haptics_enabled: bool,
    pub voice: VoiceSettings,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            approach_threshold_m: 100.0,
            announce_threshold_m: 50.0,
            guidance_tick_ms: 2_000,
            speed_tick_ms: 1_000,
            haptics_enabled: true,
            voice: VoiceSettings::default(),
        }
    }
}

impl GuidanceConfig {
    pub fn guidance_tick(&self) -> Duration {
        Duration::from_millis(self.guidance_tick_ms)
    }

    pub fn speed_tick(&self) -> Duration {
        Duration::from_millis(self.speed_tick_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive("guidance.approach_threshold_m", self.approach_threshold_m)?;
        positive("guidance.announce_threshold_m", self.announce_threshold_m)?;
        if self.announce_threshold_m > self.approach_threshold_m {
            return Err(ConfigError::Invalid {
                field: "guidance.announce_threshold_m",
                reason: "must not exceed approach_threshold_m".to_string(),
            });
        }
        nonzero("guidance.guidance_tick_ms", self.guidance_tick_ms)?;
        nonzero("guidance.speed_tick_ms", self.speed_tick_ms)
    }
}

/// Score and detour estimate for one suggestion rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleTuning {
    pub score: f64,
    pub detour_m: f64,
    pub detour_s: f64,
}

impl RuleTuning {
    const fn new(score: f64, detour_m: f64, detour_s: f64) -> Self {
        Self {
            score,
            detour_m,
            detour_s,
        }
    }
}

/// Thresholds for the stop-suggestion rules.
///
/// The numbers are product decisions rather than derived values, which is
/// why they are all configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub interval_ms: u64,
    pub snooze_ms: u64,
    pub max_suggestions: usize,
    pub relevance_threshold: f64,

    pub fuel_min_distance_km: f64,
    pub fuel_liters_per_km: f64,
    pub fuel_min_liters: f64,
    /// Inclusive hour ranges considered meal times.
    pub meal_windows: Vec<(u32, u32)>,
    pub food_min_remaining_s: f64,
    pub rest_min_remaining_s: f64,
    pub charging_min_distance_km: f64,
    /// Indoor rule fires at or after this hour...
    pub indoor_from_hour: u32,
    /// ...or at or before this one.
    pub indoor_until_hour: u32,

    pub fuel: RuleTuning,
    pub food: RuleTuning,
    pub rest: RuleTuning,
    pub charging: RuleTuning,
    pub indoor: RuleTuning,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            snooze_ms: 5 * 60 * 1_000,
            max_suggestions: 3,
            relevance_threshold: 0.6,
            fuel_min_distance_km: 50.0,
            fuel_liters_per_km: 0.08,
            fuel_min_liters: 20.0,
            meal_windows: vec![(11, 14), (17, 20)],
            food_min_remaining_s: 3_600.0,
            rest_min_remaining_s: 7_200.0,
            charging_min_distance_km: 100.0,
            indoor_from_hour: 18,
            indoor_until_hour: 6,
            fuel: RuleTuning::new(0.9, 2_000.0, 600.0),
            food: RuleTuning::new(0.8, 3_000.0, 1_800.0),
            rest: RuleTuning::new(0.7, 1_500.0, 900.0),
            charging: RuleTuning::new(0.6, 5_000.0, 2_400.0),
            indoor: RuleTuning::new(0.5, 2_000.0, 1_200.0),
        }
    }
}

impl SuggestionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn snooze(&self) -> Duration {
        Duration::from_millis(self.snooze_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        nonzero("suggestions.interval_ms", self.interval_ms)?;
        if self.max_suggestions == 0 {
            return Err(ConfigError::Invalid {
                field: "suggestions.max_suggestions",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ConfigError::Invalid {
                field: "suggestions.relevance_threshold",
                reason: format!("{} is outside [0, 1]", self.relevance_threshold),
            });
        }
        for (name, tuning) in [
            ("suggestions.fuel.score", self.fuel),
            ("suggestions.food.score", self.food),
            ("suggestions.rest.score", self.rest),
            ("suggestions.charging.score", self.charging),
            ("suggestions.indoor.score", self.indoor),
        ] {
            if !(0.0..=1.0).contains(&tuning.score) {
                return Err(ConfigError::Invalid {
                    field: name,
                    reason: format!("{} is outside [0, 1]", tuning.score),
                });
            }
        }
        Ok(())
    }
}

/// Complete configuration for the guidance core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub guidance: GuidanceConfig,
    pub suggestions: SuggestionConfig,
}

impl CoreConfig {
    /// Parse and validate a JSON document. Missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.guidance.validate()?;
        self.suggestions.validate()
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not a positive distance"),
        })
    }
}

fn nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_json("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.guidance.guidance_tick(), Duration::from_secs(2));
        assert_eq!(config.suggestions.interval(), Duration::from_secs(30));
        assert_eq!(config.suggestions.snooze(), Duration::from_secs(300));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = CoreConfig::from_json(
            r#"{"guidance":{"voice":{"enabled":false}},"suggestions":{"max_suggestions":5}}"#,
        )
        .unwrap();
        assert!(!config.guidance.voice.enabled);
        assert_eq!(config.guidance.voice.voice, "en-US");
        assert_eq!(config.suggestions.max_suggestions, 5);
        assert_eq!(config.suggestions.relevance_threshold, 0.6);
    }

    #[test]
    fn announce_threshold_cannot_exceed_approach() {
        let err = CoreConfig::from_json(
            r#"{"guidance":{"approach_threshold_m":40,"announce_threshold_m":50}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "guidance.announce_threshold_m", .. }
        ));
    }

    #[test]
    fn zero_max_suggestions_is_rejected() {
        assert!(CoreConfig::from_json(r#"{"suggestions":{"max_suggestions":0}}"#).is_err());
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(CoreConfig::from_json("{"), Err(ConfigError::Json(_))));
    }
}
