//! Error types for phase sampling, singularity detection and track precomputation.
//!
//! A failure inside one condition aborts that condition only; the driver
//! records it and carries on with the remaining conditions.

use thiserror::Error;

use crate::phase::ConditionKey;

/// Result alias for tracking operations.
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Errors raised while turning a phase series into tracks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    /// Time index outside the bounds of the phase series.
    #[error("time index {index} is out of range for a series with {len} time points")]
    OutOfRange { index: usize, len: usize },

    /// A grid or series with unusable dimensions.
    #[error("invalid shape in {context}: {rows}x{cols}")]
    InvalidShape {
        context: &'static str,
        rows: usize,
        cols: usize,
    },

    /// Channel count of a series does not tile the electrode grid.
    #[error("series has {channels} channels, a {grid_dim}x{grid_dim} grid needs {grid_dim}^2")]
    GridMismatch { channels: usize, grid_dim: usize },

    /// The phase series cache has no entry for a requested condition.
    #[error("no phase series for condition {0}")]
    MissingCondition(ConditionKey),

    /// Interpolation order without a matching scheme.
    #[error("interpolation order {0} is not supported (use 0, 1 or 3)")]
    UnsupportedInterpolation(usize),

    /// Scalar parameter outside its valid domain.
    #[error("invalid parameter {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

impl TrackingError {
    pub fn invalid_parameter(parameter: &'static str, reason: impl Into<String>) -> Self {
        TrackingError::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading a [`TrackingConfig`](crate::config::TrackingConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] TrackingError),
}
