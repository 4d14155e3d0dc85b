//! User-facing text.
//!
//! The core only picks a [`MessageKey`] and its positional arguments; the
//! host resolves them through a [`Localizer`]. [`EnglishLocalizer`] is the
//! built-in fallback.

use crate::route::LaneGuidance;

/// Identifiers for every message the core can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    GuidanceStarted,
    GuidancePaused,
    GuidanceResumed,
    GuidanceCompleted,
    ApproachingStep,
    CurrentStep,
    FuelTitle,
    FuelSubtitle,
    FoodTitle,
    FoodSubtitle,
    RestTitle,
    RestSubtitle,
    ChargingTitle,
    ChargingSubtitle,
    IndoorTitle,
    IndoorSubtitle,
}

impl MessageKey {
    /// Stable key used by host string tables.
    pub fn id(self) -> &'static str {
        match self {
            MessageKey::GuidanceStarted => "guidance_started",
            MessageKey::GuidancePaused => "guidance_paused",
            MessageKey::GuidanceResumed => "guidance_resumed",
            MessageKey::GuidanceCompleted => "guidance_completed",
            MessageKey::ApproachingStep => "approaching_step",
            MessageKey::CurrentStep => "current_step",
            MessageKey::FuelTitle => "suggestion_fuel_title",
            MessageKey::FuelSubtitle => "suggestion_fuel_subtitle",
            MessageKey::FoodTitle => "suggestion_food_title",
            MessageKey::FoodSubtitle => "suggestion_food_subtitle",
            MessageKey::RestTitle => "suggestion_rest_title",
            MessageKey::RestSubtitle => "suggestion_rest_subtitle",
            MessageKey::ChargingTitle => "suggestion_charging_title",
            MessageKey::ChargingSubtitle => "suggestion_charging_subtitle",
            MessageKey::IndoorTitle => "suggestion_indoor_title",
            MessageKey::IndoorSubtitle => "suggestion_indoor_subtitle",
        }
    }
}

/// Resolves message keys to display/spoken text.
pub trait Localizer: Send {
    fn message(&self, key: MessageKey, args: &[String]) -> String;
}

/// Built-in English strings with `{0}`, `{1}`... placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishLocalizer;

impl EnglishLocalizer {
    fn template(key: MessageKey) -> &'static str {
        match key {
            MessageKey::GuidanceStarted => "Starting navigation to {0}",
            MessageKey::GuidancePaused => "Navigation paused",
            MessageKey::GuidanceResumed => "Navigation resumed",
            MessageKey::GuidanceCompleted => "You have arrived at your destination",
            MessageKey::ApproachingStep => "Approaching: {0}",
            MessageKey::CurrentStep => "{0}",
            MessageKey::FuelTitle => "Fuel stop",
            MessageKey::FuelSubtitle => "About {0} L needed for the remaining {1}",
            MessageKey::FoodTitle => "Time for a meal",
            MessageKey::FoodSubtitle => "{0} of driving left",
            MessageKey::RestTitle => "Take a break",
            MessageKey::RestSubtitle => "{0} of driving left",
            MessageKey::ChargingTitle => "Charging stop",
            MessageKey::ChargingSubtitle => "{0} to go",
            MessageKey::IndoorTitle => "Stop somewhere indoors",
            MessageKey::IndoorSubtitle => "It is getting late",
        }
    }
}

impl Localizer for EnglishLocalizer {
    fn message(&self, key: MessageKey, args: &[String]) -> String {
        args.iter()
            .enumerate()
            .fold(Self::template(key).to_string(), |text, (i, arg)| {
                text.replace(&format!("{{{i}}}"), arg)
            })
    }
}

/// "750m" below one kilometer, otherwise "1.5km".
pub fn format_distance(meters: f64) -> String {
    let meters = if meters.is_finite() { meters.max(0.0) } else { 0.0 };
    let rounded = meters.round();
    if rounded < 1000.0 {
        format!("{}m", rounded as i64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

/// "1h 05min" or "45min".
pub fn format_duration(seconds: f64) -> String {
    let minutes = if seconds.is_finite() {
        (seconds.max(0.0) / 60.0).round() as i64
    } else {
        0
    };
    if minutes >= 60 {
        format!("{}h {:02}min", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}min")
    }
}

/// Distance prefix, raw instruction, then lane hint when present.
pub fn format_instruction(distance_m: f64, instruction: &str, lanes: Option<&LaneGuidance>) -> String {
    let mut text = format!("{} {}", format_distance(distance_m), instruction);
    if let Some(hint) = lanes.and_then(LaneGuidance::text) {
        text.push_str(", ");
        text.push_str(&hint);
    }
    text
}
