//! Turn-by-turn guidance session.
//!
//! The session is a state machine driven from a single serialized context:
//! host commands, position fixes and the two periodic ticks all call into
//! it one at a time. It has no threads or timers of its own; it only says
//! whether its timers should be running (see [`GuidanceSession::timers_running`])
//! and the driver arms or disarms them accordingly.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Active <-> Paused
//! Active | Paused -> Cancelled
//! Active -> Completed
//! ```
//!
//! Completed and Cancelled are terminal for the session's route; `start`
//! may begin a new one from either.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::GuidanceConfig;
use crate::error::GuidanceError;
use crate::feedback::{FeedbackPolicy, HapticChannel, SessionCue};
use crate::localization::{format_instruction, Localizer, MessageKey};
use crate::route::{Coordinate, Route, RouteStep};
use crate::speech::{AnnouncementScheduler, SpeechChannel, SpeechSignal};
use crate::tracker::{ProgressTracker, ProximityState, TrackerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Active,
    Paused,
    Completed,
    Cancelled,
}

/// A position report from the host's location provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    /// Instantaneous speed in m/s; negative means unknown.
    pub speed_mps: f64,
    pub timestamp: DateTime<Utc>,
}

/// Most recent fix known to the host's location provider.
pub trait PositionSource: Send {
    fn latest(&self) -> Option<PositionFix>;
}

/// What a session operation did, for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuidanceEvent {
    Started { route_name: String },
    Paused,
    Resumed,
    Cancelled,
    Completed,
    StepAdvanced { from: usize, to: usize },
    Approaching { step_index: usize, distance_m: f64 },
    StepAnnounced { step_index: usize, distance_m: f64 },
}

/// Host services the session talks to.
pub struct Collaborators {
    pub speech: Box<dyn SpeechChannel>,
    pub haptics: Box<dyn HapticChannel>,
    pub position: Box<dyn PositionSource>,
    pub localizer: Box<dyn Localizer>,
}

/// Read-only view for the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub step_index: usize,
    pub proximity: ProximityState,
    pub distance_to_maneuver_m: Option<f64>,
    pub remaining_distance_m: f64,
    pub remaining_time_s: f64,
    pub speed_mps: f64,
    pub is_speaking: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct GuidanceSession {
    state: SessionState,
    route: Option<Arc<Route>>,
    tracker: ProgressTracker,
    speech: AnnouncementScheduler,
    feedback: FeedbackPolicy,
    position: Box<dyn PositionSource>,
    localizer: Box<dyn Localizer>,
    started_at: Option<DateTime<Utc>>,
    last_position: Option<PositionFix>,
    speed_mps: f64,
    remaining_distance_m: f64,
    remaining_time_s: f64,
    last_error: Option<GuidanceError>,
    timers_running: bool,
}

impl GuidanceSession {
    pub fn new(config: &GuidanceConfig, collaborators: Collaborators) -> Self {
        Self {
            state: SessionState::Idle,
            route: None,
            tracker: ProgressTracker::new(config.approach_threshold_m, config.announce_threshold_m),
            speech: AnnouncementScheduler::new(collaborators.speech, config.voice.clone()),
            feedback: FeedbackPolicy::new(collaborators.haptics, config.haptics_enabled),
            position: collaborators.position,
            localizer: collaborators.localizer,
            started_at: None,
            last_position: None,
            speed_mps: 0.0,
            remaining_distance_m: 0.0,
            remaining_time_s: 0.0,
            last_error: None,
            timers_running: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn step_index(&self) -> usize {
        self.tracker.step_index()
    }

    pub fn current_step(&self) -> Option<&RouteStep> {
        self.route.as_ref()?.step(self.tracker.step_index())
    }

    pub fn proximity(&self) -> ProximityState {
        self.tracker.proximity()
    }

    pub fn remaining_distance_m(&self) -> f64 {
        self.remaining_distance_m
    }

    pub fn remaining_time_s(&self) -> f64 {
        self.remaining_time_s
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    pub fn last_position(&self) -> Option<&PositionFix> {
        self.last_position.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_error(&self) -> Option<&GuidanceError> {
        self.last_error.as_ref()
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    /// Whether the guidance and speed ticks should currently fire.
    pub fn timers_running(&self) -> bool {
        self.timers_running
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            step_index: self.tracker.step_index(),
            proximity: self.tracker.proximity(),
            distance_to_maneuver_m: self.tracker.distance_to_maneuver(),
            remaining_distance_m: self.remaining_distance_m,
            remaining_time_s: self.remaining_time_s,
            speed_mps: self.speed_mps,
            is_speaking: self.speech.is_speaking(),
            started_at: self.started_at,
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, route: Arc<Route>) -> Option<GuidanceEvent> {
        if matches!(self.state, SessionState::Active | SessionState::Paused) {
            warn!("start ignored, session already {:?}", self.state);
            return None;
        }
        info!("starting guidance on '{}' ({} steps)", route.name(), route.len());

        let route_name = route.name().to_string();
        self.tracker.reset();
        self.route = Some(route);
        self.state = SessionState::Active;
        self.started_at = Some(Utc::now());
        self.speed_mps = 0.0;
        self.last_position = None;
        self.last_error = None;
        self.timers_running = true;

        self.say(MessageKey::GuidanceStarted, &[route_name.clone()]);
        self.feedback.cue(SessionCue::Start);
        self.update_guidance();

        Some(GuidanceEvent::Started { route_name })
    }

    pub fn pause(&mut self) -> Option<GuidanceEvent> {
        if self.state != SessionState::Active {
            return None;
        }
        info!("pausing guidance at step {}", self.tracker.step_index());
        self.state = SessionState::Paused;
        self.timers_running = false;
        self.say(MessageKey::GuidancePaused, &[]);
        Some(GuidanceEvent::Paused)
    }

    pub fn resume(&mut self) -> Option<GuidanceEvent> {
        if self.state != SessionState::Paused {
            return None;
        }
        info!("resuming guidance at step {}", self.tracker.step_index());
        self.state = SessionState::Active;
        self.timers_running = true;
        self.say(MessageKey::GuidanceResumed, &[]);
        Some(GuidanceEvent::Resumed)
    }

    /// Stop guidance, interrupting any speech in flight.
    pub fn stop(&mut self) -> Option<GuidanceEvent> {
        if !matches!(self.state, SessionState::Active | SessionState::Paused) {
            return None;
        }
        info!("guidance cancelled at step {}", self.tracker.step_index());
        self.teardown();
        self.speech.silence();
        self.state = SessionState::Cancelled;
        self.feedback.cue(SessionCue::Stop);
        Some(GuidanceEvent::Cancelled)
    }

    pub fn cancel(&mut self) -> Option<GuidanceEvent> {
        self.stop()
    }

    /// Jump to the next step without waiting for proximity detection.
    /// No-op on the last step.
    pub fn skip_step(&mut self) -> Option<GuidanceEvent> {
        if self.state != SessionState::Active {
            return None;
        }
        let route = self.route.clone()?;
        let from = self.tracker.step_index();
        if from + 1 >= route.len() {
            debug!("skip ignored on last step {from}");
            return None;
        }

        let to = self.tracker.advance(Some(&route))?;
        if let Some(step) = route.step(to) {
            let text = format_instruction(step.distance_m, &step.instruction, step.lanes.as_ref());
            self.say(MessageKey::CurrentStep, &[text]);
        }
        self.feedback.cue(SessionCue::SkipStep);
        self.refresh_remaining(&route);
        Some(GuidanceEvent::StepAdvanced { from, to })
    }

    /// Advance after the host detected arrival at the maneuver point.
    /// Passing the last step completes the session.
    pub fn advance_step(&mut self) -> Vec<GuidanceEvent> {
        let mut events = Vec::new();
        if self.state != SessionState::Active {
            return events;
        }
        let Some(route) = self.route.clone() else {
            return events;
        };
        let from = self.tracker.step_index();
        if let Some(to) = self.tracker.advance(Some(&route)) {
            events.push(GuidanceEvent::StepAdvanced { from, to });
        }
        events.extend(self.update_guidance());
        events
    }

    pub fn set_voice_enabled(&mut self, enabled: bool) {
        self.speech.set_voice_enabled(enabled);
    }

    pub fn set_haptics_enabled(&mut self, enabled: bool) {
        self.feedback.set_enabled(enabled);
    }

    // ── Inputs ───────────────────────────────────────────────────────

    /// Guidance tick: refresh remaining totals and detect completion.
    pub fn update_guidance(&mut self) -> Option<GuidanceEvent> {
        if self.state != SessionState::Active {
            return None;
        }
        let route = self.route.clone()?;
        if self.tracker.is_complete(&route) {
            return Some(self.complete());
        }
        self.refresh_remaining(&route);
        None
    }

    /// Speed tick: pull the latest speed from the position source.
    pub fn update_speed(&mut self) {
        if self.state != SessionState::Active {
            return;
        }
        if let Some(fix) = self.position.latest() {
            if self
                .last_position
                .as_ref()
                .is_some_and(|last| last.timestamp > fix.timestamp)
            {
                debug!("position source fix is older than the last delivered one, ignoring");
                return;
            }
            self.speed_mps = sanitize_speed(fix.speed_mps);
            self.last_position = Some(fix);
        }
    }

    pub fn update_location(&mut self, fix: PositionFix) -> Vec<GuidanceEvent> {
        self.speed_mps = sanitize_speed(fix.speed_mps);
        let coordinate = fix.coordinate;
        self.last_position = Some(fix);

        let mut events = Vec::new();
        if self.state != SessionState::Active {
            return events;
        }
        let Some(route) = self.route.clone() else {
            return events;
        };

        match self.tracker.evaluate(Some(&route), &coordinate) {
            Some(TrackerEvent::Approaching {
                step_index,
                distance_m,
            }) => {
                if let Some(step) = route.step(step_index) {
                    let text = format_instruction(distance_m, &step.instruction, step.lanes.as_ref());
                    self.say(MessageKey::ApproachingStep, &[text]);
                }
                events.push(GuidanceEvent::Approaching {
                    step_index,
                    distance_m,
                });
            }
            Some(TrackerEvent::CurrentStep {
                step_index,
                distance_m,
            }) => {
                if let Some(step) = route.step(step_index) {
                    let text = format_instruction(distance_m, &step.instruction, step.lanes.as_ref());
                    self.say(MessageKey::CurrentStep, &[text]);
                    self.feedback.maneuver(step.maneuver);
                }
                events.push(GuidanceEvent::StepAnnounced {
                    step_index,
                    distance_m,
                });
            }
            Some(TrackerEvent::RouteComplete) => {
                events.push(self.complete());
            }
            None => {}
        }
        events
    }

    /// Record a delivery failure from the position source.
    pub fn report_position_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("position source error: {message}");
        self.last_error = Some(GuidanceError::PositionUnavailable(message));
    }

    pub fn handle_speech_signal(&mut self, signal: SpeechSignal) {
        if let Some(err) = self.speech.handle_signal(signal) {
            self.last_error = Some(err);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self) -> GuidanceEvent {
        info!("route complete");
        self.teardown();
        self.state = SessionState::Completed;
        self.say(MessageKey::GuidanceCompleted, &[]);
        self.feedback.cue(SessionCue::Completion);
        GuidanceEvent::Completed
    }

    fn teardown(&mut self) {
        self.timers_running = false;
        self.route = None;
        self.remaining_distance_m = 0.0;
        self.remaining_time_s = 0.0;
    }

    fn refresh_remaining(&mut self, route: &Route) {
        let index = self.tracker.step_index();
        self.remaining_distance_m = route.remaining_distance_from(index);
        self.remaining_time_s = route.remaining_time_from(index);
    }

    fn say(&mut self, key: MessageKey, args: &[String]) {
        let text = self.localizer.message(key, args);
        self.speech.announce(&text);
    }
}

fn sanitize_speed(speed_mps: f64) -> f64 {
    if speed_mps.is_finite() && speed_mps > 0.0 {
        speed_mps
    } else {
        0.0
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::feedback::HapticIntensity;
    use crate::route::test_support::sample_route;

    fn started() -> Harness {
        let mut h = harness(&GuidanceConfig::default());
        h.session.start(Arc::new(sample_route()));
        h.speech.take_texts();
        h.haptics.taken();
        h
    }

    // sample_route maneuver points sit at 48.01, 48.02, 48.03 N on 16.0 E
    fn south_of(lat: f64, meters: f64) -> PositionFix {
        fix(lat - meters / 111_195.0, 16.0, 12.0)
    }

    #[test]
    fn start_announces_route_and_pulses_heavy() {
        let mut h = harness(&GuidanceConfig::default());
        let event = h.session.start(Arc::new(sample_route()));

        assert_eq!(
            event,
            Some(GuidanceEvent::Started {
                route_name: "Ring Road".to_string()
            })
        );
        assert_eq!(h.session.state(), SessionState::Active);
        assert!(h.session.timers_running());
        assert!(h.session.started_at().is_some());
        assert_eq!(h.session.remaining_distance_m(), 3_350.0);
        assert_eq!(h.speech.texts(), vec!["Starting navigation to Ring Road".to_string()]);
        assert_eq!(h.haptics.taken(), vec![HapticIntensity::Heavy]);
    }

    #[test]
    fn start_while_active_is_ignored() {
        let mut h = started();
        assert_eq!(h.session.start(Arc::new(sample_route())), None);
        assert!(h.speech.texts().is_empty());
    }

    #[test]
    fn approaching_then_current_step_announcements() {
        let mut h = started();

        let events = h.session.update_location(south_of(48.01, 90.0));
        assert!(matches!(events[..], [GuidanceEvent::Approaching { step_index: 0, .. }]));
        assert_eq!(h.speech.take_texts(), vec!["Approaching: 90m Head north".to_string()]);
        assert!(h.haptics.taken().is_empty());

        let events = h.session.update_location(south_of(48.01, 40.0));
        assert!(matches!(events[..], [GuidanceEvent::StepAnnounced { step_index: 0, .. }]));
        assert_eq!(h.speech.take_texts(), vec!["40m Head north".to_string()]);
        assert_eq!(h.haptics.taken(), vec![HapticIntensity::Light]);

        assert!(h.session.update_location(south_of(48.01, 30.0)).is_empty());
        assert_eq!(h.session.proximity(), ProximityState::Announced);
    }

    #[test]
    fn turn_announcement_uses_medium_pulse() {
        let mut h = started();
        h.session.advance_step();
        h.session.update_location(south_of(48.02, 10.0));
        assert_eq!(h.speech.take_texts(), vec!["10m Turn left onto Main St".to_string()]);
        assert_eq!(h.haptics.taken(), vec![HapticIntensity::Medium]);
    }

    #[test]
    fn pause_resume_preserves_progress() {
        let mut h = started();
        h.session.advance_step();
        h.session.update_location(south_of(48.02, 80.0));
        let route_before = h.session.route().cloned();
        let index_before = h.session.step_index();
        let proximity_before = h.session.proximity();

        assert_eq!(h.session.pause(), Some(GuidanceEvent::Paused));
        assert!(!h.session.timers_running());
        assert_eq!(h.session.resume(), Some(GuidanceEvent::Resumed));

        assert_eq!(h.session.step_index(), index_before);
        assert_eq!(h.session.proximity(), proximity_before);
        assert!(Arc::ptr_eq(
            h.session.route().unwrap(),
            route_before.as_ref().unwrap()
        ));
        assert!(h.session.timers_running());
    }

    #[test]
    fn paused_session_stays_silent_on_fixes() {
        let mut h = started();
        h.session.pause();
        h.speech.take_texts();

        assert!(h.session.update_location(south_of(48.01, 20.0)).is_empty());
        assert!(h.speech.texts().is_empty());
        assert!(h.haptics.taken().is_empty());
        assert_eq!(h.session.speed_mps(), 12.0);
    }

    #[test]
    fn pause_announcement_respects_voice_toggle() {
        let mut h = started();
        h.session.set_voice_enabled(false);
        h.session.pause();
        assert!(h.speech.texts().is_empty());
    }

    #[test]
    fn stop_silences_and_clears_route() {
        let mut h = started();
        // interrupts the start announcement
        h.session.update_location(south_of(48.01, 90.0));

        assert_eq!(h.session.stop(), Some(GuidanceEvent::Cancelled));
        assert_eq!(h.session.state(), SessionState::Cancelled);
        assert!(h.session.route().is_none());
        assert!(!h.session.timers_running());
        assert!(!h.session.is_speaking());
        assert_eq!(h.speech.log.lock().unwrap().cancelled.len(), 2);
        assert_eq!(h.haptics.taken(), vec![HapticIntensity::Light]);
        assert_eq!(h.session.stop(), None);
    }

    #[test]
    fn skip_step_reannounces_with_medium_pulse() {
        let mut h = started();
        assert_eq!(
            h.session.skip_step(),
            Some(GuidanceEvent::StepAdvanced { from: 0, to: 1 })
        );
        assert_eq!(h.speech.take_texts(), vec!["750m Turn left onto Main St".to_string()]);
        assert_eq!(h.haptics.taken(), vec![HapticIntensity::Medium]);
        assert_eq!(h.session.proximity(), ProximityState::NotApproaching);
        assert_eq!(h.session.remaining_distance_m(), 2_250.0);
    }

    #[test]
    fn skip_step_on_last_step_is_a_no_op() {
        let mut h = started();
        h.session.skip_step();
        h.session.skip_step();
        assert_eq!(h.session.step_index(), 2);
        h.speech.take_texts();
        h.haptics.taken();

        assert_eq!(h.session.skip_step(), None);
        assert_eq!(h.session.step_index(), 2);
        assert!(h.haptics.taken().is_empty());
        assert!(h.speech.texts().is_empty());
    }

    #[test]
    fn advancing_past_last_step_completes_once() {
        let mut h = started();
        h.session.advance_step();
        h.session.advance_step();
        h.speech.take_texts();
        h.haptics.taken();

        let events = h.session.advance_step();
        assert_eq!(
            events,
            vec![
                GuidanceEvent::StepAdvanced { from: 2, to: 3 },
                GuidanceEvent::Completed
            ]
        );
        assert_eq!(h.session.state(), SessionState::Completed);
        assert_eq!(
            h.speech.take_texts(),
            vec!["You have arrived at your destination".to_string()]
        );
        assert_eq!(h.haptics.taken(), vec![HapticIntensity::Heavy]);

        assert_eq!(h.session.update_guidance(), None);
        assert!(h.session.advance_step().is_empty());
        assert!(h.session.update_location(fix(48.03, 16.0, 0.0)).is_empty());
        assert!(h.speech.texts().is_empty());
        assert!(h.haptics.taken().is_empty());
        assert!(!h.session.timers_running());
    }

    #[test]
    fn speed_tick_clamps_negative_readings() {
        let mut h = started();
        h.position.set(fix(48.0, 16.0, -3.0));
        h.session.update_speed();
        assert_eq!(h.session.speed_mps(), 0.0);

        h.position.set(fix(48.0, 16.0, f64::NAN));
        h.session.update_speed();
        assert_eq!(h.session.speed_mps(), 0.0);

        h.position.set(fix(48.0, 16.0, 8.5));
        h.session.update_speed();
        assert_eq!(h.session.speed_mps(), 8.5);
    }

    #[test]
    fn speed_tick_never_rolls_back_to_an_older_fix() {
        let mut h = started();
        let mut stale = fix(48.0, 16.0, 5.0);
        stale.timestamp = Utc::now() - chrono::Duration::seconds(30);
        h.position.set(stale);

        let fresh = fix(48.001, 16.0, 20.0);
        h.session.update_location(fresh.clone());
        h.session.update_speed();

        assert_eq!(h.session.speed_mps(), 20.0);
        assert_eq!(h.session.last_position(), Some(&fresh));
    }

    #[test]
    fn upstream_errors_are_recorded_without_state_change() {
        let mut h = started();
        h.session.report_position_error("GPS lost");
        assert_eq!(
            h.session.last_error(),
            Some(&GuidanceError::PositionUnavailable("GPS lost".to_string()))
        );
        assert_eq!(h.session.state(), SessionState::Active);
        assert_eq!(
            h.session.snapshot().last_error.as_deref(),
            Some("position update failed: GPS lost")
        );
    }

    #[test]
    fn commands_without_route_are_no_ops() {
        let mut h = harness(&GuidanceConfig::default());
        assert_eq!(h.session.pause(), None);
        assert_eq!(h.session.resume(), None);
        assert_eq!(h.session.stop(), None);
        assert_eq!(h.session.skip_step(), None);
        assert!(h.session.advance_step().is_empty());
        assert_eq!(h.session.update_guidance(), None);
        assert!(h.session.update_location(fix(48.0, 16.0, 1.0)).is_empty());
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.speech.texts().is_empty());
    }

    #[test]
    fn restart_after_cancel_begins_fresh() {
        let mut h = started();
        h.session.skip_step();
        h.session.stop();
        assert!(h.session.start(Arc::new(sample_route())).is_some());
        assert_eq!(h.session.step_index(), 0);
        assert_eq!(h.session.proximity(), ProximityState::NotApproaching);
    }

    #[test]
    fn restart_drops_previous_position_and_error() {
        let mut h = started();
        h.session.update_location(fix(48.0, 16.0, 9.0));
        h.session.report_position_error("GPS lost");
        h.session.stop();

        h.session.start(Arc::new(sample_route()));
        assert_eq!(h.session.last_position(), None);
        assert_eq!(h.session.last_error(), None);
        assert_eq!(h.session.snapshot().last_error, None);
    }
}
