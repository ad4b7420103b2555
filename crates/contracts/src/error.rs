//! Layered error definitions
//!
//! `ContractError` covers startup-time and transport failures
//! (config / source / sink / io). `DetectorError` is the steady-state
//! taxonomy of the correlation core; every variant is recovered locally.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Source Errors =====
    /// Drive source could not be opened
    #[error("source '{source_id}' open error: {message}")]
    SourceOpen { source_id: String, message: String },

    /// Recorded drive event could not be decoded
    #[error("replay record error at line {line}: {message}")]
    ReplayRecord { line: usize, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create source open error
    pub fn source_open(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceOpen {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Expected, frequent conditions of the correlation core.
///
/// None of these is fatal: each one maps onto a well-defined publication
/// and frame processing continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DetectorError {
    /// Waypoint query before the route arrived (or the route is empty)
    #[error("no route loaded")]
    NoRouteLoaded,

    /// Pose query before the first pose update
    #[error("no vehicle pose received yet")]
    NoPoseYet,

    /// Classifier invoked without a camera frame
    #[error("no camera image available")]
    NoImageAvailable,

    /// Every configured stop line is behind the vehicle
    #[error("no upcoming stop line at or after waypoint {vehicle_waypoint}")]
    NoUpcomingStopLine { vehicle_waypoint: usize },
}

impl DetectorError {
    /// Stable label used for metrics and structured logs
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoRouteLoaded => "no_route",
            Self::NoPoseYet => "no_pose",
            Self::NoImageAvailable => "no_image",
            Self::NoUpcomingStopLine { .. } => "no_upcoming_stop_line",
        }
    }
}
