//! Haptic feedback policy.
//!
//! Maps maneuvers and session cues to an intensity class and forwards it to
//! the host's [`HapticChannel`]. The channel is fire-and-forget.

use log::debug;
use serde::Serialize;

use crate::route::Maneuver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticIntensity {
    Light,
    Medium,
    Heavy,
}

/// Session-level events that carry a haptic pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCue {
    Start,
    Stop,
    SkipStep,
    Completion,
}

/// Host vibration motor.
pub trait HapticChannel: Send {
    fn pulse(&mut self, intensity: HapticIntensity);
}

pub fn intensity_for_maneuver(maneuver: Maneuver) -> HapticIntensity {
    match maneuver {
        Maneuver::TurnLeft | Maneuver::TurnRight => HapticIntensity::Medium,
        Maneuver::UTurn => HapticIntensity::Heavy,
        _ => HapticIntensity::Light,
    }
}

pub fn intensity_for_cue(cue: SessionCue) -> HapticIntensity {
    match cue {
        SessionCue::Start | SessionCue::Completion => HapticIntensity::Heavy,
        SessionCue::SkipStep => HapticIntensity::Medium,
        SessionCue::Stop => HapticIntensity::Light,
    }
}

/// Haptic channel plus the user's "haptics enabled" toggle.
pub struct FeedbackPolicy {
    channel: Box<dyn HapticChannel>,
    enabled: bool,
}

impl FeedbackPolicy {
    pub fn new(channel: Box<dyn HapticChannel>, enabled: bool) -> Self {
        Self { channel, enabled }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn maneuver(&mut self, maneuver: Maneuver) {
        self.emit(intensity_for_maneuver(maneuver));
    }

    pub fn cue(&mut self, cue: SessionCue) {
        self.emit(intensity_for_cue(cue));
    }

    fn emit(&mut self, intensity: HapticIntensity) {
        if self.enabled {
            self.channel.pulse(intensity);
        } else {
            debug!("haptics disabled, dropping {intensity:?} pulse");
        }
    }
}
