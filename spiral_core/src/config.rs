//! Tracking configuration via TOML files.
//!
//! Every section is optional; missing keys fall back to the defaults of a
//! 20x20 array zoomed 3x with bilinear interpolation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detector::DEFAULT_PHASE_TOLERANCE;
use crate::error::{ConfigError, TrackingError};
use crate::interpolate::Interpolation;
use crate::manager::TrackingParams;
use crate::phase::ConditionKey;
use crate::sampler::GridParams;

const DEFAULT_GRID_DIM: usize = 20;
const DEFAULT_UPSAMPLE_FACTOR: usize = 3;
const DEFAULT_INTERPOLATION_ORDER: usize = 1;
const DEFAULT_MAX_DISPLACEMENT: f64 = 7.0;
const DEFAULT_MAX_POINTS_PER_TRACK: usize = 50;

/// A named frequency band whose filtered phase forms one condition.
///
/// The cutoffs are informational here: filtering happens upstream and only
/// `name` selects a cached series. They are still validated so a config file
/// stays usable by the preprocessing step that reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    /// Display name, also the band half of the condition key.
    pub name: String,
    /// Lower cutoff in Hz.
    pub low_hz: f64,
    /// Upper cutoff in Hz, strictly above `low_hz`.
    pub high_hz: f64,
}

impl FrequencyBand {
    pub fn new(name: impl Into<String>, low_hz: f64, high_hz: f64) -> Self {
        Self {
            name: name.into(),
            low_hz,
            high_hz,
        }
    }

    pub fn condition(&self) -> ConditionKey {
        ConditionKey::band(self.name.clone())
    }
}

fn default_bands() -> Vec<FrequencyBand> {
    vec![
        FrequencyBand::new("Delta (δ)", 0.5, 4.0),
        FrequencyBand::new("Theta (θ)", 4.0, 8.0),
        FrequencyBand::new("Alpha (α)", 8.0, 13.0),
        FrequencyBand::new("Sigma (σ)", 12.0, 16.0),
        FrequencyBand::new("Beta (β)", 13.0, 30.0),
        FrequencyBand::new("Gamma (γ)", 30.0, 80.0),
    ]
}

/// Complete configuration for a precomputation run.
///
/// # Examples
///
/// ```
/// use lfp_spiral_core::TrackingConfig;
///
/// let config = TrackingConfig::from_str("[grid]\ngrid_dim = 8").unwrap();
/// assert_eq!(config.grid.grid_dim, 8);
/// assert_eq!(config.tracking.max_track_distance_sq, 49.0);
/// assert_eq!(config.conditions().len(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingConfig {
    pub grid: GridParams,
    pub tracking: TrackingParams,
    /// Bands in configuration order.
    pub bands: Vec<FrequencyBand>,
    /// Run conditions on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Optional JSON-lines journal, one entry per condition.
    pub journal_path: Option<PathBuf>,
}

impl TrackingConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawTrackingConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let config = Self::try_from(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackingError> {
        self.grid.validate()?;
        self.tracking.validate()?;

        let mut seen = HashSet::new();
        for band in &self.bands {
            if band.name.trim().is_empty() {
                return Err(TrackingError::invalid_parameter(
                    "bands.name",
                    "band names must not be empty",
                ));
            }
            if !seen.insert(band.name.as_str()) {
                return Err(TrackingError::invalid_parameter(
                    "bands.name",
                    format!("duplicate band {}", band.name),
                ));
            }
            if !(band.low_hz.is_finite() && band.high_hz.is_finite())
                || band.low_hz < 0.0
                || band.low_hz >= band.high_hz
            {
                return Err(TrackingError::invalid_parameter(
                    "bands",
                    format!(
                        "band {} needs 0 <= low_hz < high_hz, got {}..{}",
                        band.name, band.low_hz, band.high_hz
                    ),
                ));
            }
        }
        Ok(())
    }

    /// The raw-phase condition followed by one filtered condition per band.
    pub fn conditions(&self) -> Vec<ConditionKey> {
        std::iter::once(ConditionKey::raw())
            .chain(self.bands.iter().map(FrequencyBand::condition))
            .collect()
    }
}

impl FromStr for TrackingConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackingConfig::from_str(s)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            grid: GridParams {
                grid_dim: DEFAULT_GRID_DIM,
                upsample_factor: DEFAULT_UPSAMPLE_FACTOR,
                interpolation: Interpolation::Linear,
            },
            tracking: TrackingParams {
                phase_tolerance: DEFAULT_PHASE_TOLERANCE,
                max_track_distance_sq: DEFAULT_MAX_DISPLACEMENT * DEFAULT_MAX_DISPLACEMENT,
                max_points_per_track: DEFAULT_MAX_POINTS_PER_TRACK,
            },
            bands: default_bands(),
            parallel: true,
            journal_path: None,
        }
    }
}

impl TryFrom<RawTrackingConfig> for TrackingConfig {
    type Error = TrackingError;

    fn try_from(raw: RawTrackingConfig) -> Result<Self, Self::Error> {
        let grid = GridParams {
            grid_dim: raw.grid.grid_dim.unwrap_or(DEFAULT_GRID_DIM),
            upsample_factor: raw.grid.upsample_factor.unwrap_or(DEFAULT_UPSAMPLE_FACTOR),
            interpolation: Interpolation::from_order(
                raw.grid
                    .interpolation_order
                    .unwrap_or(DEFAULT_INTERPOLATION_ORDER),
            )?,
        };

        let max_displacement = raw
            .tracking
            .max_displacement
            .unwrap_or(DEFAULT_MAX_DISPLACEMENT);
        if !(max_displacement.is_finite() && max_displacement > 0.0) {
            return Err(TrackingError::invalid_parameter(
                "tracking.max_displacement",
                format!("must be positive, got {max_displacement}"),
            ));
        }

        let tracking = TrackingParams {
            phase_tolerance: raw
                .detection
                .phase_tolerance
                .unwrap_or(DEFAULT_PHASE_TOLERANCE),
            max_track_distance_sq: max_displacement * max_displacement,
            max_points_per_track: raw
                .tracking
                .max_points_per_track
                .unwrap_or(DEFAULT_MAX_POINTS_PER_TRACK),
        };

        let bands = match raw.bands {
            Some(bands) => bands
                .into_iter()
                .map(|band| FrequencyBand::new(band.name, band.low_hz, band.high_hz))
                .collect(),
            None => default_bands(),
        };

        Ok(Self {
            grid,
            tracking,
            bands,
            parallel: raw.run.parallel.unwrap_or(true),
            journal_path: raw.run.journal_path,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTrackingConfig {
    #[serde(default)]
    grid: RawGrid,
    #[serde(default)]
    detection: RawDetection,
    #[serde(default)]
    tracking: RawTracking,
    #[serde(default)]
    run: RawRun,
    bands: Option<Vec<RawBand>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGrid {
    grid_dim: Option<usize>,
    upsample_factor: Option<usize>,
    interpolation_order: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDetection {
    phase_tolerance: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTracking {
    max_displacement: Option<f64>,
    max_points_per_track: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRun {
    parallel: Option<bool>,
    journal_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBand {
    name: String,
    low_hz: f64,
    high_hz: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_file_matches_defaults() {
        let config = TrackingConfig::from_str(include_str!("../config/tracking.toml")).unwrap();
        assert_eq!(config, TrackingConfig::default());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = TrackingConfig::from_str("").unwrap();
        assert_eq!(config, TrackingConfig::default());
        assert_eq!(config.conditions()[0], ConditionKey::raw());
        assert_eq!(config.conditions()[6], ConditionKey::band("Gamma (γ)"));
    }

    #[test]
    fn custom_values_are_parsed() {
        let toml = r#"
            [grid]
            grid_dim = 10
            upsample_factor = 2
            interpolation_order = 0

            [tracking]
            max_displacement = 3.0
            max_points_per_track = 8

            [run]
            parallel = false
            journal_path = "logs/run.jsonl"

            [[bands]]
            name = "Theta"
            low_hz = 4.0
            high_hz = 8.0
        "#;
        let config = TrackingConfig::from_str(toml).unwrap();
        assert_eq!(config.grid.grid_dim, 10);
        assert_eq!(config.grid.interpolation, Interpolation::Nearest);
        assert_eq!(config.tracking.max_track_distance_sq, 9.0);
        assert_eq!(config.tracking.max_points_per_track, 8);
        assert!(!config.parallel);
        assert_eq!(config.journal_path, Some(PathBuf::from("logs/run.jsonl")));
        assert_eq!(
            config.conditions(),
            vec![ConditionKey::raw(), ConditionKey::band("Theta")]
        );
    }

    #[test]
    fn explicit_empty_band_list_leaves_only_raw() {
        let config = TrackingConfig::from_str("bands = []").unwrap();
        assert_eq!(config.conditions(), vec![ConditionKey::raw()]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            TrackingConfig::from_str("[grid]\ninterpolation_order = 2"),
            Err(ConfigError::Invalid(TrackingError::UnsupportedInterpolation(2)))
        ));
        assert!(TrackingConfig::from_str("[grid]\nupsample_factor = 0").is_err());
        assert!(TrackingConfig::from_str("[tracking]\nmax_displacement = -1.0").is_err());
        assert!(TrackingConfig::from_str("[detection]\nphase_tolerance = 0.0").is_err());
        assert!(matches!(
            TrackingConfig::from_str("[grid]\ngrid_dim = \"big\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            TrackingConfig::from_str("[grid]\ncolour = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn duplicate_or_inverted_bands_are_rejected() {
        let duplicate = r#"
            [[bands]]
            name = "Beta"
            low_hz = 13.0
            high_hz = 30.0
            [[bands]]
            name = "Beta"
            low_hz = 14.0
            high_hz = 20.0
        "#;
        assert!(TrackingConfig::from_str(duplicate).is_err());

        let inverted = "[[bands]]\nname = \"x\"\nlow_hz = 9.0\nhigh_hz = 4.0";
        assert!(TrackingConfig::from_str(inverted).is_err());
    }
}
