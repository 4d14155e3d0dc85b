//! Error types for the guidance core.
//!
//! Only route construction and configuration loading return errors to the
//! caller. Everything that happens during an active session is recorded as
//! a [`GuidanceError`] in the session's last-error slot instead.

use thiserror::Error;

/// Errors raised while building or importing a [`crate::route::Route`].
#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    /// The route has no steps.
    #[error("route must contain at least one step")]
    NoSteps,
    /// A step carries no coordinates.
    #[error("step {index} has an empty polyline")]
    EmptyPolyline { index: usize },
    /// A step distance or travel time is negative or not finite.
    #[error("step {index} has an invalid {field}: {value}")]
    InvalidMeasure {
        index: usize,
        field: &'static str,
        value: f64,
    },
    /// Not enough points to derive any step.
    #[error("need at least 2 points to build a route, got {0}")]
    TooFewPoints(usize),
    /// The GPX document could not be read.
    #[error("GPX parse error: {0}")]
    Gpx(String),
    /// The JSON route document could not be read.
    #[error("route JSON error: {0}")]
    Json(String),
    /// The GPX document has neither a route nor a track.
    #[error("GPX document contains no route or track")]
    NoPath,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Transient failures observed during a session.
///
/// These never change the session state. The most recent one is exposed
/// through `GuidanceSession::last_error` for the UI.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuidanceError {
    /// The position source reported a delivery failure.
    #[error("position update failed: {0}")]
    PositionUnavailable(String),
    /// The speech channel failed to speak an utterance.
    #[error("speech synthesis failed for utterance {id}: {message}")]
    SpeechFailed { id: u64, message: String },
}
