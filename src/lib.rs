//! Turn-by-turn guidance core.
//!
//! Tracks progress along a route, schedules spoken announcements and
//! haptic cues, and ranks contextual stop suggestions. Platform services
//! (speech, haptics, positioning, localized strings, wall clock) are
//! injected as trait objects; [`driver`] runs everything on one tokio task.

pub mod android_jni;
pub mod config;
pub mod driver;
pub mod error;
pub mod feedback;
pub mod gpx;
pub mod localization;
pub mod nav;
pub mod presentation;
pub mod route;
pub mod route_builder;
pub mod session;
pub mod simplify;
pub mod speech;
pub mod suggestions;
pub mod tracker;

pub use config::CoreConfig;
pub use driver::{Command, DriverEvent, DriverHandle};
pub use error::{ConfigError, GuidanceError, RouteError};
pub use route::{Coordinate, Maneuver, Route, RouteStep};
pub use session::{Collaborators, GuidanceEvent, GuidanceSession, PositionFix, SessionState};
pub use suggestions::{SmartStopSuggestion, SuggestionEngine, SuggestionId};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
