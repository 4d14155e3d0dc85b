//! End-to-end guidance scenarios through the public API.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use guidance_core::config::GuidanceConfig;
use guidance_core::feedback::{HapticChannel, HapticIntensity};
use guidance_core::localization::{format_distance, EnglishLocalizer};
use guidance_core::route::{Coordinate, Maneuver, Route, RouteStep};
use guidance_core::session::PositionSource;
use guidance_core::speech::{SpeechChannel, Utterance};
use guidance_core::{Collaborators, GuidanceEvent, GuidanceSession, PositionFix, SessionState};
use rstest::rstest;

#[derive(Clone, Default)]
struct Spoken(Arc<Mutex<Vec<String>>>);

impl SpeechChannel for Spoken {
    fn speak(&mut self, utterance: &Utterance) {
        self.0.lock().unwrap().push(utterance.text.clone());
    }

    fn stop_speaking(&mut self) {}

    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Clone, Default)]
struct Pulses(Arc<Mutex<Vec<HapticIntensity>>>);

impl HapticChannel for Pulses {
    fn pulse(&mut self, intensity: HapticIntensity) {
        self.0.lock().unwrap().push(intensity);
    }
}

struct NoFix;

impl PositionSource for NoFix {
    fn latest(&self) -> Option<PositionFix> {
        None
    }
}

fn step(maneuver: Maneuver, instruction: &str, distance_m: f64, lat: f64) -> RouteStep {
    RouteStep {
        instruction: instruction.to_string(),
        maneuver,
        distance_m,
        expected_time_s: distance_m / 10.0,
        polyline: vec![Coordinate::new(lat, 16.0)],
        lanes: None,
    }
}

fn commute() -> Arc<Route> {
    Arc::new(
        Route::new(
            "Commute",
            vec![
                step(Maneuver::Start, "Head north", 1_100.0, 48.01),
                step(Maneuver::TurnRight, "Turn right onto Ring Rd", 750.0, 48.02),
                step(Maneuver::End, "Arrive at destination", 500.0, 48.03),
            ],
        )
        .unwrap(),
    )
}

fn session() -> (GuidanceSession, Spoken, Pulses) {
    let spoken = Spoken::default();
    let pulses = Pulses::default();
    let session = GuidanceSession::new(
        &GuidanceConfig::default(),
        Collaborators {
            speech: Box::new(spoken.clone()),
            haptics: Box::new(pulses.clone()),
            position: Box::new(NoFix),
            localizer: Box::new(EnglishLocalizer),
        },
    );
    (session, spoken, pulses)
}

fn near(lat: f64, meters_south: f64) -> PositionFix {
    PositionFix {
        coordinate: Coordinate::new(lat - meters_south / 111_195.0, 16.0),
        speed_mps: 13.0,
        timestamp: Utc::now(),
    }
}

#[rstest]
#[case(0.0, "0m")]
#[case(750.0, "750m")]
#[case(1_000.0, "1.0km")]
#[case(1_500.0, "1.5km")]
fn distances_format_for_display(#[case] meters: f64, #[case] expected: &str) {
    assert_eq!(format_distance(meters), expected);
}

#[test]
fn drive_the_whole_route() {
    let (mut s, spoken, pulses) = session();
    s.start(commute());
    assert_eq!(spoken.0.lock().unwrap()[0], "Starting navigation to Commute");

    let events = s.update_location(near(48.02, 30.0));
    assert!(events.is_empty(), "still on step 0, far from its maneuver");

    s.advance_step();
    let events = s.update_location(near(48.02, 30.0));
    assert!(matches!(
        events.as_slice(),
        [GuidanceEvent::StepAnnounced { step_index: 1, .. }]
    ));
    assert!(spoken
        .0
        .lock()
        .unwrap()
        .last()
        .unwrap()
        .ends_with("Turn right onto Ring Rd"));
    assert_eq!(pulses.0.lock().unwrap().last(), Some(&HapticIntensity::Medium));

    s.advance_step();
    let events = s.advance_step();
    assert_eq!(events.last(), Some(&GuidanceEvent::Completed));
    assert_eq!(s.state(), SessionState::Completed);
    assert!(!s.timers_running());
    assert_eq!(
        spoken.0.lock().unwrap().last().map(String::as_str),
        Some("You have arrived at your destination")
    );
}

#[test]
fn muted_voice_still_tracks_progress() {
    let (mut s, spoken, _) = session();
    s.set_voice_enabled(false);
    s.start(commute());

    let events = s.update_location(near(48.01, 80.0));
    assert!(matches!(events.as_slice(), [GuidanceEvent::Approaching { step_index: 0, .. }]));
    assert!(spoken.0.lock().unwrap().is_empty());
}

#[test]
fn skip_on_last_step_is_ignored() {
    let (mut s, _, _) = session();
    s.start(commute());
    assert!(s.skip_step().is_some());
    assert!(s.skip_step().is_some());
    assert_eq!(s.skip_step(), None);
    assert_eq!(s.step_index(), 2);
    assert_eq!(s.state(), SessionState::Active);
}
