//! Route data model consumed by guidance.
//!
//! A [`Route`] is produced by an external routing collaborator (or the GPX
//! importer in [`crate::route_builder`]) and never changes once a session
//! has started. Sessions share it as `Arc<Route>`.

use serde::{Deserialize, Serialize};

use crate::error::RouteError;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// The kind of driving action a step represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    Start,
    End,
    TurnLeft,
    TurnRight,
    Continue,
    Merge,
    Exit,
    UTurn,
    Roundabout,
    Ferry,
    Transit,
    Toll,
}

/// A single lane at the maneuver point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    /// Whether this lane leads through the maneuver.
    pub recommended: bool,
}

/// Lane layout for a step, ordered left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneGuidance {
    pub lanes: Vec<Lane>,
}

impl LaneGuidance {
    /// Short spoken hint such as "use the 2 right lanes".
    ///
    /// Returns `None` when no lane is recommended or every lane is.
    pub fn text(&self) -> Option<String> {
        let total = self.lanes.len();
        let first = self.lanes.iter().position(|l| l.recommended)?;
        let last = self.lanes.iter().rposition(|l| l.recommended)?;
        let count = self.lanes.iter().filter(|l| l.recommended).count();
        if count == total {
            return None;
        }

        let side = if first == 0 {
            "left"
        } else if last == total - 1 {
            "right"
        } else {
            "middle"
        };

        Some(if count == 1 {
            format!("use the {side} lane")
        } else {
            format!("use the {count} {side} lanes")
        })
    }
}

/// One leg of a route, ending at a maneuver point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    pub maneuver: Maneuver,
    /// Length of the step in meters.
    pub distance_m: f64,
    /// Expected travel time in seconds.
    pub expected_time_s: f64,
    /// Ordered coordinates; the last one is the maneuver point.
    pub polyline: Vec<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lanes: Option<LaneGuidance>,
}

impl RouteStep {
    /// The coordinate where this step's maneuver happens.
    pub fn end_coordinate(&self) -> Option<Coordinate> {
        self.polyline.last().copied()
    }
}

/// A validated, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    name: String,
    steps: Vec<RouteStep>,
}

impl Route {
    /// Validate and build a route.
    pub fn new(name: impl Into<String>, steps: Vec<RouteStep>) -> Result<Self, RouteError> {
        if steps.is_empty() {
            return Err(RouteError::NoSteps);
        }
        for (index, step) in steps.iter().enumerate() {
            if step.polyline.is_empty() {
                return Err(RouteError::EmptyPolyline { index });
            }
            check_measure(index, "distance", step.distance_m)?;
            check_measure(index, "travel time", step.expected_time_s)?;
        }
        Ok(Self {
            name: name.into(),
            steps,
        })
    }

    /// Parse and validate a route from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, RouteError> {
        #[derive(Deserialize)]
        struct Raw {
            name: String,
            steps: Vec<RouteStep>,
        }
        let raw: Raw = serde_json::from_str(json).map_err(|e| RouteError::Json(e.to_string()))?;
        Self::new(raw.name, raw.steps)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&RouteStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Final coordinate of the last step.
    pub fn destination(&self) -> Option<Coordinate> {
        self.steps.last().and_then(RouteStep::end_coordinate)
    }

    /// Sum of step distances from `index` to the end, in meters.
    pub fn remaining_distance_from(&self, index: usize) -> f64 {
        self.steps.iter().skip(index).map(|s| s.distance_m).sum()
    }

    /// Sum of step travel times from `index` to the end, in seconds.
    pub fn remaining_time_from(&self, index: usize) -> f64 {
        self.steps.iter().skip(index).map(|s| s.expected_time_s).sum()
    }

    pub fn total_distance(&self) -> f64 {
        self.remaining_distance_from(0)
    }

    pub fn total_time(&self) -> f64 {
        self.remaining_time_from(0)
    }
}

fn check_measure(index: usize, field: &'static str, value: f64) -> Result<(), RouteError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RouteError::InvalidMeasure {
            index,
            field,
            value,
        })
    }
}
