//! Guidance routes from plain coordinate lists.
//!
//! Derives one step per leg between consecutive waypoints and classifies the
//! maneuver at each waypoint from the bearing change. Used when the route
//! source is a GPX file rather than a routing service.

use std::io::Read;

use log::debug;
use serde::Deserialize;

use crate::error::RouteError;
use crate::gpx;
use crate::nav::{bearing, polyline_length};
use crate::route::{Coordinate, Maneuver, Route, RouteStep};
use crate::simplify::rdp_simplify;

/// Tuning for route derivation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Assumed travel speed for expected step times, m/s.
    pub cruise_speed_mps: f64,
    /// RDP tolerance applied to recorded tracks, meters.
    pub simplify_tolerance_m: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cruise_speed_mps: 13.9,
            simplify_tolerance_m: 25.0,
        }
    }
}

/// Turn categories derived from the bearing change at a waypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Turn {
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
}

/// Build a route from waypoints.
///
/// The first step is a zero-length `Start` at the first point; every later
/// step covers one leg and ends at the maneuver it announces.
pub fn build_route(
    name: &str,
    points: &[Coordinate],
    options: &BuildOptions,
) -> Result<Route, RouteError> {
    if points.len() < 2 {
        return Err(RouteError::TooFewPoints(points.len()));
    }

    let mut steps = Vec::with_capacity(points.len());
    steps.push(RouteStep {
        instruction: "Start navigation".to_string(),
        maneuver: Maneuver::Start,
        distance_m: 0.0,
        expected_time_s: 0.0,
        polyline: vec![points[0]],
        lanes: None,
    });

    let last = points.len() - 1;
    for i in 1..=last {
        let (maneuver, instruction) = if i == last {
            (Maneuver::End, "Arrive at destination")
        } else {
            let turn = compute_turn(&points[i - 1], &points[i], &points[i + 1]);
            (turn_maneuver(turn), turn_text(turn))
        };
        let polyline = vec![points[i - 1], points[i]];
        let distance_m = polyline_length(&polyline);
        steps.push(RouteStep {
            instruction: instruction.to_string(),
            maneuver,
            distance_m,
            expected_time_s: travel_time(distance_m, options.cruise_speed_mps),
            polyline,
            lanes: None,
        });
    }

    debug!("built route '{name}' with {} steps", steps.len());
    Route::new(name, steps)
}

/// Read a GPX document and build a route from its first `<rte>`, falling
/// back to its first `<trk>` after simplification.
pub fn route_from_gpx<R: Read>(reader: R, options: &BuildOptions) -> Result<Route, RouteError> {
    let paths = gpx::parse(reader)?;

    if let Some(rte) = paths.routes.into_iter().find(|r| r.points.len() >= 2) {
        let name = rte.name.unwrap_or_else(|| "Route".to_string());
        return build_route(&name, &rte.points, options);
    }

    let trk = paths.tracks.into_iter().next().ok_or(RouteError::NoPath)?;
    let simplified = rdp_simplify(&trk.points, options.simplify_tolerance_m);
    debug!(
        "simplified track from {} to {} points",
        trk.points.len(),
        simplified.len()
    );
    let name = trk.name.unwrap_or_else(|| "Track".to_string());
    build_route(&name, &simplified, options)
}

fn travel_time(distance_m: f64, speed_mps: f64) -> f64 {
    if speed_mps > 0.0 {
        distance_m / speed_mps
    } else {
        0.0
    }
}

/// Turn at `b` when arriving from `a` and leaving toward `c`.
fn compute_turn(a: &Coordinate, b: &Coordinate, c: &Coordinate) -> Turn {
    // positive = right, negative = left
    let mut angle = bearing(b, c) - bearing(a, b);
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }
    classify_turn(angle)
}

fn classify_turn(angle: f64) -> Turn {
    let abs_angle = angle.abs();

    if abs_angle > 170.0 {
        Turn::UTurn
    } else if abs_angle > 120.0 {
        if angle > 0.0 { Turn::SharpRight } else { Turn::SharpLeft }
    } else if abs_angle > 60.0 {
        if angle > 0.0 { Turn::Right } else { Turn::Left }
    } else if abs_angle > 20.0 {
        if angle > 0.0 { Turn::SlightRight } else { Turn::SlightLeft }
    } else {
        Turn::Straight
    }
}

fn turn_maneuver(turn: Turn) -> Maneuver {
    match turn {
        Turn::Left | Turn::SharpLeft => Maneuver::TurnLeft,
        Turn::Right | Turn::SharpRight => Maneuver::TurnRight,
        Turn::UTurn => Maneuver::UTurn,
        Turn::Straight | Turn::SlightLeft | Turn::SlightRight => Maneuver::Continue,
    }
}

fn turn_text(turn: Turn) -> &'static str {
    match turn {
        Turn::Straight => "Continue straight",
        Turn::SlightLeft => "Keep slightly left",
        Turn::Left => "Turn left",
        Turn::SharpLeft => "Turn sharp left",
        Turn::SlightRight => "Keep slightly right",
        Turn::Right => "Turn right",
        Turn::SharpRight => "Turn sharp right",
        Turn::UTurn => "Make a U-turn",
    }
}
