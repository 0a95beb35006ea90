//! Phase series conditions and angle helpers.

use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};
use std::fmt::{self, Display};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Identifies which phase series a computation runs on: the raw LFP phase or
/// the phase of one band-pass filtered signal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConditionKey {
    pub filtered: bool,
    pub band: Option<String>,
}

impl ConditionKey {
    /// Raw (unfiltered) phase, `(false, None)`.
    pub fn raw() -> Self {
        Self {
            filtered: false,
            band: None,
        }
    }

    /// Filtered phase of the named band, `(true, Some(name))`.
    pub fn band(name: impl Into<String>) -> Self {
        Self {
            filtered: true,
            band: Some(name.into()),
        }
    }

    pub fn is_raw(&self) -> bool {
        !self.filtered && self.band.is_none()
    }
}

impl Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.band, self.filtered) {
            (None, false) => write!(f, "raw"),
            (None, true) => write!(f, "filtered"),
            (Some(band), true) => write!(f, "filtered:{band}"),
            (Some(band), false) => write!(f, "raw:{band}"),
        }
    }
}

/// Phase time series per condition, each shaped `(grid_dim², num_time_points)`
/// with angles in radians.
pub type PhaseSeriesCache = BTreeMap<ConditionKey, Array2<f64>>;

/// Wrap a phase difference into `[-π, π)`.
///
/// Uses Euclidean remainder so negative differences wrap the same way as
/// positive ones.
#[inline]
pub fn wrap_phase(diff: f64) -> f64 {
    (diff + PI).rem_euclid(TAU) - PI
}
