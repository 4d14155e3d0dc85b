//! Icon and color lookups for the host UI.

use serde::Serialize;

use crate::route::Maneuver;
use crate::suggestions::SuggestionCategory;

/// Icon and color class attached to a suggestion card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresentationHint {
    pub icon: &'static str,
    pub color: &'static str,
}

pub fn maneuver_icon(maneuver: Maneuver) -> &'static str {
    match maneuver {
        Maneuver::Start => "location.fill",
        Maneuver::End => "flag.checkered",
        Maneuver::TurnLeft => "arrow.turn.up.left",
        Maneuver::TurnRight => "arrow.turn.up.right",
        Maneuver::Continue => "arrow.up",
        Maneuver::Merge => "arrow.merge",
        Maneuver::Exit => "arrow.up.right",
        Maneuver::UTurn => "arrow.uturn.down",
        Maneuver::Roundabout => "arrow.triangle.circlepath",
        Maneuver::Ferry => "ferry",
        Maneuver::Transit => "tram",
        Maneuver::Toll => "dollarsign.circle",
    }
}

pub fn suggestion_hint(category: SuggestionCategory) -> PresentationHint {
    let (icon, color) = match category {
        SuggestionCategory::Fuel => ("fuelpump.fill", "orange"),
        SuggestionCategory::Food => ("fork.knife", "green"),
        SuggestionCategory::Rest => ("bed.double.fill", "blue"),
        SuggestionCategory::Charging => ("bolt.car.fill", "yellow"),
        SuggestionCategory::WeatherIndoor => ("house.fill", "purple"),
    };
    PresentationHint { icon, color }
}
