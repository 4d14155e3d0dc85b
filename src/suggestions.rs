//! Contextual stop suggestions.
//!
//! While a route is active the engine periodically runs a fixed set of
//! independent rules against the remaining trip and the local hour, merges
//! what fires into a small ranked list, and lets the UI dismiss, accept or
//! snooze entries. Suggestions are replaced, never edited.
//!
//! Identity is the category plus a coarse bucket of the condition that
//! triggered it (distance band, meal window, ...). An unchanged condition
//! therefore maps to the same identity and is not added twice, while a
//! changed condition yields a new one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Local, Timelike};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::{RuleTuning, SuggestionConfig};
use crate::localization::{format_distance, format_duration, Localizer, MessageKey};
use crate::presentation::{suggestion_hint, PresentationHint};
use crate::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Fuel,
    Food,
    Rest,
    Charging,
    WeatherIndoor,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestionId(String);

impl SuggestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmartStopSuggestion {
    pub id: SuggestionId,
    pub category: SuggestionCategory,
    pub title: String,
    pub subtitle: String,
    /// Heuristic ranking in [0, 1].
    pub relevance: f64,
    pub detour_distance_m: f64,
    pub detour_time_s: f64,
    pub presentation: PresentationHint,
}

/// Local wall-clock source. `None` means the time is unknown.
pub trait Clock: Send {
    fn local_hour(&self) -> Option<u32>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn local_hour(&self) -> Option<u32> {
        Some(Local::now().hour())
    }
}

/// What the rules see of the trip.
struct Outlook {
    distance_m: f64,
    time_s: f64,
    hour: Option<u32>,
}

pub struct SuggestionEngine {
    config: SuggestionConfig,
    localizer: Box<dyn Localizer>,
    clock: Box<dyn Clock>,
    route: Option<Arc<Route>>,
    step_index: usize,
    analyzing: bool,
    suggestions: Vec<SmartStopSuggestion>,
    /// Identities kept out of the list: `None` until analysis stops,
    /// `Some(deadline)` until a snooze elapses.
    suppressed: HashMap<SuggestionId, Option<Instant>>,
    pending_snoozes: Vec<Instant>,
}

impl SuggestionEngine {
    pub fn new(config: SuggestionConfig, localizer: Box<dyn Localizer>, clock: Box<dyn Clock>) -> Self {
        Self {
            config,
            localizer,
            clock,
            route: None,
            step_index: 0,
            analyzing: false,
            suggestions: Vec::new(),
            suppressed: HashMap::new(),
            pending_snoozes: Vec::new(),
        }
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    /// Route under analysis, if any.
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    /// Current ranked list, best first.
    pub fn suggestions(&self) -> &[SmartStopSuggestion] {
        &self.suggestions
    }

    /// Earliest snooze deadline still waiting to fire.
    pub fn next_snooze_deadline(&self) -> Option<Instant> {
        self.pending_snoozes.iter().min().copied()
    }

    pub fn start_analysis(&mut self, route: Arc<Route>) {
        info!("starting stop analysis for '{}'", route.name());
        self.route = Some(route);
        self.step_index = 0;
        self.analyzing = true;
        self.suggestions.clear();
        self.suppressed.clear();
        self.pending_snoozes.clear();
    }

    pub fn stop_analysis(&mut self) {
        if self.analyzing {
            info!("stopping stop analysis");
        }
        self.analyzing = false;
        self.route = None;
        self.suggestions.clear();
        self.suppressed.clear();
        self.pending_snoozes.clear();
    }

    /// Record guidance progress so only the remaining steps are considered.
    pub fn update_progress(&mut self, step_index: usize) {
        self.step_index = step_index;
    }

    /// Run every rule once and merge the results. Returns whether the list
    /// changed.
    pub fn evaluate(&mut self, now: Instant) -> bool {
        if !self.analyzing {
            return false;
        }
        let Some(route) = self.route.as_ref() else {
            return false;
        };
        let outlook = Outlook {
            distance_m: route.remaining_distance_from(self.step_index),
            time_s: route.remaining_time_from(self.step_index),
            hour: self.clock.local_hour(),
        };

        self.suppressed
            .retain(|_, until| until.map_or(true, |deadline| deadline > now));

        let before: Vec<SuggestionId> = self.suggestions.iter().map(|s| s.id.clone()).collect();

        let candidates = [
            self.fuel_rule(&outlook),
            self.food_rule(&outlook),
            self.rest_rule(&outlook),
            self.charging_rule(&outlook),
            self.indoor_rule(&outlook),
        ];
        for candidate in candidates.into_iter().flatten() {
            if candidate.relevance < self.config.relevance_threshold {
                debug!("{} below relevance threshold", candidate.id);
                continue;
            }
            if self.suppressed.contains_key(&candidate.id)
                || self.suggestions.iter().any(|s| s.id == candidate.id)
            {
                continue;
            }
            debug!("new suggestion {}", candidate.id);
            self.suggestions.push(candidate);
        }

        self.suggestions
            .sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        self.suggestions.truncate(self.config.max_suggestions);

        self.suggestions.iter().map(|s| &s.id).ne(before.iter())
    }

    pub fn dismiss(&mut self, id: &SuggestionId) -> Option<SmartStopSuggestion> {
        let removed = self.remove(id)?;
        debug!("dismissed {id}");
        self.suppressed.insert(id.clone(), None);
        Some(removed)
    }

    /// Remove the suggestion and hand it back for the routing collaborator
    /// to add as a stop.
    pub fn accept(&mut self, id: &SuggestionId) -> Option<SmartStopSuggestion> {
        let removed = self.remove(id)?;
        info!("accepted {id}");
        self.suppressed.insert(id.clone(), None);
        Some(removed)
    }

    /// Hide the suggestion and schedule one extra evaluation after the
    /// snooze duration.
    pub fn snooze(&mut self, id: &SuggestionId, now: Instant) -> Option<SmartStopSuggestion> {
        let removed = self.remove(id)?;
        let deadline = now + self.config.snooze();
        debug!("snoozed {id}");
        self.suppressed.insert(id.clone(), Some(deadline));
        self.pending_snoozes.push(deadline);
        Some(removed)
    }

    /// Called when a snooze deadline elapses. Does nothing once analysis
    /// has stopped.
    pub fn on_snooze_deadline(&mut self, now: Instant) -> bool {
        self.pending_snoozes.retain(|deadline| *deadline > now);
        if !self.analyzing {
            debug!("snooze fired after analysis stopped, ignoring");
            return false;
        }
        self.evaluate(now)
    }

    fn remove(&mut self, id: &SuggestionId) -> Option<SmartStopSuggestion> {
        let pos = self.suggestions.iter().position(|s| &s.id == id)?;
        Some(self.suggestions.remove(pos))
    }

    // ── Rules ────────────────────────────────────────────────────────

    fn fuel_rule(&self, outlook: &Outlook) -> Option<SmartStopSuggestion> {
        let km = outlook.distance_m / 1000.0;
        let liters = km * self.config.fuel_liters_per_km;
        if km <= self.config.fuel_min_distance_km || liters <= self.config.fuel_min_liters {
            return None;
        }
        Some(self.build(
            SuggestionCategory::Fuel,
            format!("fuel:{}", (km / 50.0).floor() as u64),
            self.config.fuel,
            (MessageKey::FuelTitle, MessageKey::FuelSubtitle),
            &[format!("{}", liters.round() as u64), format_distance(outlook.distance_m)],
        ))
    }

    fn food_rule(&self, outlook: &Outlook) -> Option<SmartStopSuggestion> {
        let hour = outlook.hour?;
        let (start, _) = self
            .config
            .meal_windows
            .iter()
            .copied()
            .find(|(start, end)| (*start..=*end).contains(&hour))?;
        if outlook.time_s <= self.config.food_min_remaining_s {
            return None;
        }
        Some(self.build(
            SuggestionCategory::Food,
            format!("food:{start}"),
            self.config.food,
            (MessageKey::FoodTitle, MessageKey::FoodSubtitle),
            &[format_duration(outlook.time_s)],
        ))
    }

    fn rest_rule(&self, outlook: &Outlook) -> Option<SmartStopSuggestion> {
        if outlook.time_s <= self.config.rest_min_remaining_s {
            return None;
        }
        Some(self.build(
            SuggestionCategory::Rest,
            format!("rest:{}", (outlook.time_s / 3600.0).floor() as u64),
            self.config.rest,
            (MessageKey::RestTitle, MessageKey::RestSubtitle),
            &[format_duration(outlook.time_s)],
        ))
    }

    fn charging_rule(&self, outlook: &Outlook) -> Option<SmartStopSuggestion> {
        let km = outlook.distance_m / 1000.0;
        if km <= self.config.charging_min_distance_km {
            return None;
        }
        Some(self.build(
            SuggestionCategory::Charging,
            format!("charging:{}", (km / 100.0).floor() as u64),
            self.config.charging,
            (MessageKey::ChargingTitle, MessageKey::ChargingSubtitle),
            &[format_distance(outlook.distance_m)],
        ))
    }

    fn indoor_rule(&self, outlook: &Outlook) -> Option<SmartStopSuggestion> {
        let hour = outlook.hour?;
        let bucket = if hour >= self.config.indoor_from_hour {
            "evening"
        } else if hour <= self.config.indoor_until_hour {
            "night"
        } else {
            return None;
        };
        Some(self.build(
            SuggestionCategory::WeatherIndoor,
            format!("indoor:{bucket}"),
            self.config.indoor,
            (MessageKey::IndoorTitle, MessageKey::IndoorSubtitle),
            &[],
        ))
    }

    fn build(
        &self,
        category: SuggestionCategory,
        id: String,
        tuning: RuleTuning,
        (title, subtitle): (MessageKey, MessageKey),
        args: &[String],
    ) -> SmartStopSuggestion {
        SmartStopSuggestion {
            id: SuggestionId(id),
            category,
            title: self.localizer.message(title, &[]),
            subtitle: self.localizer.message(subtitle, args),
            relevance: tuning.score.clamp(0.0, 1.0),
            detour_distance_m: tuning.detour_m,
            detour_time_s: tuning.detour_s,
            presentation: suggestion_hint(category),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::route::{Coordinate, Maneuver, RouteStep};

    #[derive(Clone, Default)]
    pub struct ManualClock {
        pub hour: Arc<Mutex<Option<u32>>>,
    }

    impl ManualClock {
        pub fn at(hour: Option<u32>) -> Self {
            Self {
                hour: Arc::new(Mutex::new(hour)),
            }
        }

        pub fn set(&self, hour: Option<u32>) {
            *self.hour.lock().unwrap() = hour;
        }
    }

    impl Clock for ManualClock {
        fn local_hour(&self) -> Option<u32> {
            *self.hour.lock().unwrap()
        }
    }

    /// One-step route with the given length and duration.
    pub fn trip(distance_m: f64, time_s: f64) -> Arc<Route> {
        Arc::new(
            Route::new(
                "Trip",
                vec![RouteStep {
                    instruction: "Drive".to_string(),
                    maneuver: Maneuver::End,
                    distance_m,
                    expected_time_s: time_s,
                    polyline: vec![Coordinate::new(48.0, 16.0)],
                    lanes: None,
                }],
            )
            .unwrap(),
        )
    }
}
