//! # LFP Spiral Core
//!
//! Phase singularity detection and spiral-wave tracking for multichannel LFP
//! recordings laid out on a square electrode grid.
//!
//! The input is one precomputed phase time series per condition (raw phase or
//! the phase of a band-pass filtered signal), shaped `(grid_dim², T)`. For
//! every frame the grid is upsampled in the cosine/sine domain, every unit
//! plaquette is checked for a `±2π` circulation, and the resulting spirals and
//! anti-spirals are chained into tracks by greedy nearest-neighbour gating.
//!
//! ## Quick Start
//!
//! ```rust
//! use lfp_spiral_core::{precompute, ConditionKey, PhaseSeriesCache, TrackingConfig};
//! use ndarray::Array2;
//!
//! let config = TrackingConfig::from_str("bands = []\n[grid]\ngrid_dim = 6\nupsample_factor = 2")
//!     .expect("valid configuration");
//! let frames = 4;
//!
//! // A single vortex centred between electrodes, constant over time.
//! let series = Array2::from_shape_fn((36, frames), |(ch, _)| {
//!     let (r, c) = ((ch / 6) as f64, (ch % 6) as f64);
//!     (r - 2.5).atan2(c - 2.5)
//! });
//! let mut phases = PhaseSeriesCache::new();
//! phases.insert(ConditionKey::raw(), series);
//!
//! let outcome = precompute(&phases, frames, &config);
//! let tracks = outcome.cache.get(&ConditionKey::raw()).unwrap();
//! assert_eq!(tracks.len(), 1);
//! assert_eq!(tracks[0].end_time(), frames - 1);
//! ```
//!
//! ## Core Modules
//!
//! - [`sampler`] - per-frame zoomed phase grids
//! - [`detector`] - plaquette circulation and spiral classification
//! - [`manager`] - frame-to-frame track association
//! - [`driver`] - precomputation over all conditions
//! - [`config`] - TOML configuration
//! - [`logging`] - JSON-lines run journal

pub mod config;
pub mod detector;
pub mod driver;
pub mod error;
pub mod interpolate;
pub mod logging;
pub mod manager;
pub mod phase;
pub mod sampler;
pub mod track;

pub use config::{FrequencyBand, TrackingConfig};
pub use detector::{circulation, classify, detect, Singularities, DEFAULT_PHASE_TOLERANCE};
pub use driver::{precompute, run_all, ConditionSummary, PrecomputeOutcome, TrackCache};
pub use error::{ConfigError, TrackingError, TrackingResult};
pub use interpolate::{zoom, Interpolation};
pub use logging::{ConditionLogEntry, ConditionStatus, RunJournal};
pub use manager::{
    associate, run_condition, singularities_at, Association, TrackIdSequence, TrackManager,
    TrackingParams,
};
pub use phase::{wrap_phase, ConditionKey, PhaseSeriesCache};
pub use sampler::{sample, GridParams};
pub use track::{GridPoint, Observation, SingularityKind, Track, TrackId, TrackWindow};
