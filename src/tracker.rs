//! Progress along the active route.
//!
//! Maps position fixes onto the current step and decides when the step's
//! proximity state advances. Pure decisions only: the tracker returns what
//! fired and leaves speech and haptics to the session.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::nav::haversine;
use crate::route::{Coordinate, Route};

/// How close the traveller is to the current step's maneuver point.
///
/// Ordered: a step only ever moves forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityState {
    NotApproaching,
    Approaching,
    Announced,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerEvent {
    Approaching { step_index: usize, distance_m: f64 },
    CurrentStep { step_index: usize, distance_m: f64 },
    RouteComplete,
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    approach_threshold_m: f64,
    announce_threshold_m: f64,
    step_index: usize,
    proximity: ProximityState,
    /// Steps already announced; kept across advances for dedup.
    announced: BTreeSet<usize>,
    distance_to_maneuver_m: Option<f64>,
}

impl ProgressTracker {
    pub fn new(approach_threshold_m: f64, announce_threshold_m: f64) -> Self {
        Self {
            approach_threshold_m,
            announce_threshold_m,
            step_index: 0,
            proximity: ProximityState::NotApproaching,
            announced: BTreeSet::new(),
            distance_to_maneuver_m: None,
        }
    }

    pub fn reset(&mut self) {
        self.step_index = 0;
        self.proximity = ProximityState::NotApproaching;
        self.announced.clear();
        self.distance_to_maneuver_m = None;
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn proximity(&self) -> ProximityState {
        self.proximity
    }

    /// Great-circle distance to the current maneuver point at the last fix.
    pub fn distance_to_maneuver(&self) -> Option<f64> {
        self.distance_to_maneuver_m
    }

    pub fn was_announced(&self, step_index: usize) -> bool {
        self.announced.contains(&step_index)
    }

    pub fn is_complete(&self, route: &Route) -> bool {
        self.step_index >= route.len()
    }

    /// Evaluate a new fix against the current step.
    ///
    /// A fix already inside the announce radius skips straight to
    /// `Announced` and only reports the current-step event.
    pub fn evaluate(&mut self, route: Option<&Route>, fix: &Coordinate) -> Option<TrackerEvent> {
        let route = route?;
        let Some(step) = route.step(self.step_index) else {
            return Some(TrackerEvent::RouteComplete);
        };
        let end = step.end_coordinate()?;
        let distance_m = haversine(fix, &end);
        self.distance_to_maneuver_m = Some(distance_m);

        let step_index = self.step_index;
        if distance_m <= self.announce_threshold_m && !self.was_announced(step_index) {
            self.proximity = ProximityState::Announced;
            self.announced.insert(step_index);
            return Some(TrackerEvent::CurrentStep {
                step_index,
                distance_m,
            });
        }
        if distance_m <= self.approach_threshold_m && self.proximity == ProximityState::NotApproaching {
            self.proximity = ProximityState::Approaching;
            return Some(TrackerEvent::Approaching {
                step_index,
                distance_m,
            });
        }
        None
    }

    /// Move to the next step. Returns the new index, which equals the step
    /// count once the last step has been passed.
    pub fn advance(&mut self, route: Option<&Route>) -> Option<usize> {
        let route = route?;
        if self.step_index >= route.len() {
            return None;
        }
        self.step_index += 1;
        self.proximity = ProximityState::NotApproaching;
        self.distance_to_maneuver_m = None;
        Some(self.step_index)
    }
}
