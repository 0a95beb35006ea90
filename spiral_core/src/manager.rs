//! Frame-by-frame association of singularities into tracks.
//!
//! Association is greedy and order dependent: active tracks are visited in
//! their stored order and each claims the nearest unclaimed detection inside
//! the gate, ties going to the detection seen first in scan order. Matched
//! tracks keep their relative order; new tracks are appended after them in
//! detection order. Track output order depends on all of this.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::detector::{detect, Singularities, DEFAULT_PHASE_TOLERANCE};
use crate::error::{TrackingError, TrackingResult};
use crate::sampler::{sample, GridParams};
use crate::track::{GridPoint, SingularityKind, Track, TrackId};

/// Frames between progress messages.
const PROGRESS_INTERVAL: usize = 500;

/// Detection and association parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingParams {
    /// Accepted distance of a plaquette circulation from `±2π`, radians.
    pub phase_tolerance: f64,
    /// Inclusive squared-distance gate in zoomed-grid units.
    pub max_track_distance_sq: f64,
    /// Sliding-window length of each track's observation history.
    pub max_points_per_track: usize,
}

impl TrackingParams {
    pub fn validate(&self) -> TrackingResult<()> {
        if !(self.phase_tolerance.is_finite() && self.phase_tolerance > 0.0) {
            return Err(TrackingError::invalid_parameter(
                "phase_tolerance",
                format!("must be positive, got {}", self.phase_tolerance),
            ));
        }
        if !(self.max_track_distance_sq.is_finite() && self.max_track_distance_sq > 0.0) {
            return Err(TrackingError::invalid_parameter(
                "max_track_distance_sq",
                format!("must be positive, got {}", self.max_track_distance_sq),
            ));
        }
        if self.max_points_per_track == 0 {
            return Err(TrackingError::invalid_parameter(
                "max_points_per_track",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for TrackingParams {
    fn default() -> Self {
        Self {
            phase_tolerance: DEFAULT_PHASE_TOLERANCE,
            max_track_distance_sq: 49.0,
            max_points_per_track: 50,
        }
    }
}

/// Result of associating one frame's detections of a single kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    /// Tracks still alive after this frame: continued ones, then new ones.
    pub active: Vec<Track>,
    /// Tracks that found no continuation and are now final.
    pub closed: Vec<Track>,
}

/// Hands out track ids in creation order.
#[derive(Debug, Clone, Default)]
pub struct TrackIdSequence {
    next: u64,
}

impl TrackIdSequence {
    pub fn next_id(&mut self) -> TrackId {
        let id = TrackId(self.next);
        self.next += 1;
        id
    }

    pub fn issued(&self) -> u64 {
        self.next
    }
}

/// Associate `detections` (all of `kind`) with the `active` tracks of the
/// same kind at `time_index`.
pub fn associate(
    time_index: usize,
    kind: SingularityKind,
    detections: &[GridPoint],
    active: Vec<Track>,
    params: &TrackingParams,
    ids: &mut TrackIdSequence,
) -> Association {
    let mut claimed = vec![false; detections.len()];
    let mut outcome = Association {
        active: Vec::with_capacity(active.len() + detections.len()),
        closed: Vec::new(),
    };

    for mut track in active {
        let Some(last) = track.last_point() else {
            outcome.closed.push(track);
            continue;
        };

        let mut best: Option<(usize, f64)> = None;
        for (idx, point) in detections.iter().enumerate() {
            if claimed[idx] {
                continue;
            }
            let dist_sq = point.distance_sq(&last);
            if dist_sq <= params.max_track_distance_sq
                && best.map_or(true, |(_, best_sq)| dist_sq < best_sq)
            {
                best = Some((idx, dist_sq));
            }
        }

        match best {
            Some((idx, _)) => {
                claimed[idx] = true;
                track.extend(detections[idx], time_index);
                outcome.active.push(track);
            }
            None => outcome.closed.push(track),
        }
    }

    for (point, taken) in detections.iter().zip(claimed) {
        if taken {
            continue;
        }
        outcome.active.push(Track::new(
            ids.next_id(),
            kind,
            *point,
            time_index,
            params.max_points_per_track,
        ));
    }

    outcome
}

/// Tracking state for one condition: one active set per kind plus every
/// track already finalised.
#[derive(Debug, Clone)]
pub struct TrackManager {
    params: TrackingParams,
    ids: TrackIdSequence,
    active_spirals: Vec<Track>,
    active_anti_spirals: Vec<Track>,
    finished: Vec<Track>,
}

impl TrackManager {
    pub fn new(params: TrackingParams) -> Self {
        Self {
            params,
            ids: TrackIdSequence::default(),
            active_spirals: Vec::new(),
            active_anti_spirals: Vec::new(),
            finished: Vec::new(),
        }
    }

    pub fn params(&self) -> &TrackingParams {
        &self.params
    }

    pub fn active(&self, kind: SingularityKind) -> &[Track] {
        match kind {
            SingularityKind::Spiral => &self.active_spirals,
            SingularityKind::AntiSpiral => &self.active_anti_spirals,
        }
    }

    fn active_mut(&mut self, kind: SingularityKind) -> &mut Vec<Track> {
        match kind {
            SingularityKind::Spiral => &mut self.active_spirals,
            SingularityKind::AntiSpiral => &mut self.active_anti_spirals,
        }
    }

    /// Tracks closed so far, in closing order.
    pub fn closed(&self) -> &[Track] {
        &self.finished
    }

    /// Advance by one frame. Spirals are associated before anti-spirals.
    pub fn step(&mut self, time_index: usize, found: &Singularities) {
        for kind in SingularityKind::ALL {
            let active = std::mem::take(self.active_mut(kind));
            let outcome = associate(
                time_index,
                kind,
                found.of_kind(kind),
                active,
                &self.params,
                &mut self.ids,
            );
            self.finished.extend(outcome.closed);
            *self.active_mut(kind) = outcome.active;
        }
    }

    /// Closed tracks followed by the still-active spirals and anti-spirals.
    pub fn finish(mut self) -> Vec<Track> {
        self.finished.append(&mut self.active_spirals);
        self.finished.append(&mut self.active_anti_spirals);
        self.finished
    }
}

/// Sample and scan a single frame.
pub fn singularities_at(
    phase_series: ArrayView2<'_, f64>,
    time_index: usize,
    grid: &GridParams,
    phase_tolerance: f64,
) -> TrackingResult<Singularities> {
    let zoomed = sample(time_index, phase_series, grid)?;
    detect(zoomed.view(), phase_tolerance)
}

/// Track every singularity of one condition over `0..num_time_points`.
///
/// Frames are processed strictly in order; the first sampling or detection
/// error aborts the whole condition.
pub fn run_condition(
    phase_series: ArrayView2<'_, f64>,
    num_time_points: usize,
    grid: &GridParams,
    params: &TrackingParams,
) -> TrackingResult<Vec<Track>> {
    grid.validate()?;
    params.validate()?;
    grid.check_series(phase_series)?;

    let mut manager = TrackManager::new(*params);
    for time_index in 0..num_time_points {
        if time_index > 0 && time_index % PROGRESS_INTERVAL == 0 {
            tracing::debug!("tracking frame {}/{}", time_index, num_time_points);
        }
        let found = singularities_at(phase_series, time_index, grid, params.phase_tolerance)?;
        manager.step(time_index, &found);
    }

    Ok(manager.finish())
}
