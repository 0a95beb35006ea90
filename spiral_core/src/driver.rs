//! Precomputation across every condition.
//!
//! Conditions are independent: each one reads its own phase series and
//! produces its own track list, so they may run on the rayon pool. A failing
//! or missing condition is logged and left out of the cache; the others are
//! unaffected.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::config::TrackingConfig;
use crate::error::{TrackingError, TrackingResult};
use crate::logging::{timestamp_now, ConditionLogEntry, ConditionStatus, RunJournal};
use crate::manager::run_condition;
use crate::phase::{ConditionKey, PhaseSeriesCache};
use crate::track::{SingularityKind, Track};

/// Track lists per condition. A missing key means the condition is
/// unavailable, not that it produced no tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackCache {
    entries: BTreeMap<ConditionKey, Vec<Track>>,
}

impl TrackCache {
    pub fn get(&self, key: &ConditionKey) -> Option<&[Track]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &ConditionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConditionKey> + '_ {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConditionKey, &[Track])> + '_ {
        self.entries.iter().map(|(key, tracks)| (key, tracks.as_slice()))
    }

    /// Tracks of `key` whose lifetime covers `time_index`.
    pub fn active_at(&self, key: &ConditionKey, time_index: usize) -> Option<Vec<&Track>> {
        self.get(key).map(|tracks| {
            tracks
                .iter()
                .filter(|track| track.spans(time_index))
                .collect()
        })
    }

    fn insert(&mut self, key: ConditionKey, tracks: Vec<Track>) {
        self.entries.insert(key, tracks);
    }
}

/// Per-condition statistics for a completed condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionSummary {
    /// Condition the tracks belong to.
    pub key: ConditionKey,
    /// Number of spiral tracks produced.
    pub spiral_tracks: usize,
    /// Number of anti-spiral tracks produced.
    pub anti_spiral_tracks: usize,
    /// Frames processed for this condition.
    pub frames: usize,
    /// Wall time spent on the condition.
    pub elapsed: Duration,
}

impl ConditionSummary {
    fn from_tracks(key: ConditionKey, tracks: &[Track], frames: usize, elapsed: Duration) -> Self {
        let spiral_tracks = tracks
            .iter()
            .filter(|track| track.kind() == SingularityKind::Spiral)
            .count();
        Self {
            key,
            spiral_tracks,
            anti_spiral_tracks: tracks.len() - spiral_tracks,
            frames,
            elapsed,
        }
    }

    pub fn total_tracks(&self) -> usize {
        self.spiral_tracks + self.anti_spiral_tracks
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PrecomputeOutcome {
    pub run_id: Uuid,
    pub cache: TrackCache,
    /// Completed conditions in request order.
    pub summaries: Vec<ConditionSummary>,
    /// Skipped conditions in request order.
    pub failures: Vec<(ConditionKey, TrackingError)>,
    pub elapsed: Duration,
}

impl PrecomputeOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ConditionRun {
    key: ConditionKey,
    result: TrackingResult<Vec<Track>>,
    elapsed: Duration,
}

fn run_one(
    phase_series_cache: &PhaseSeriesCache,
    key: &ConditionKey,
    num_time_points: usize,
    config: &TrackingConfig,
) -> ConditionRun {
    let span = tracing::info_span!("condition", key = %key);
    let _entered = span.enter();
    let started = Instant::now();

    let result = phase_series_cache
        .get(key)
        .ok_or_else(|| TrackingError::MissingCondition(key.clone()))
        .and_then(|series| {
            tracing::info!("precomputing tracks for {} over {} frames", key, num_time_points);
            run_condition(series.view(), num_time_points, &config.grid, &config.tracking)
        });

    ConditionRun {
        key: key.clone(),
        result,
        elapsed: started.elapsed(),
    }
}

fn journal_entry(
    run_id: Uuid,
    run: &ConditionRun,
    summary: Option<&ConditionSummary>,
) -> ConditionLogEntry {
    let (status, error) = match &run.result {
        Ok(_) => (ConditionStatus::Completed, None),
        Err(err) => {
            let status = if matches!(err, TrackingError::MissingCondition(_)) {
                ConditionStatus::Missing
            } else {
                ConditionStatus::Failed
            };
            (status, Some(err.to_string()))
        }
    };
    ConditionLogEntry {
        run_id,
        condition: run.key.to_string(),
        status,
        spiral_tracks: summary.map_or(0, |s| s.spiral_tracks),
        anti_spiral_tracks: summary.map_or(0, |s| s.anti_spiral_tracks),
        frames: summary.map_or(0, |s| s.frames),
        elapsed_ms: run.elapsed.as_millis(),
        error,
        timestamp_ms: timestamp_now(),
    }
}

/// Run [`run_condition`] for every key in `conditions`.
///
/// `num_time_points` is shared by all conditions. Missing or failing
/// conditions are reported in [`PrecomputeOutcome::failures`] and have no
/// cache entry.
pub fn run_all(
    phase_series_cache: &PhaseSeriesCache,
    conditions: &[ConditionKey],
    num_time_points: usize,
    config: &TrackingConfig,
) -> PrecomputeOutcome {
    let run_id = Uuid::new_v4();
    let started = Instant::now();
    tracing::info!(
        "starting track precomputation {} for {} conditions",
        run_id,
        conditions.len()
    );

    let runs: Vec<ConditionRun> = if config.parallel {
        conditions
            .par_iter()
            .map(|key| run_one(phase_series_cache, key, num_time_points, config))
            .collect()
    } else {
        conditions
            .iter()
            .map(|key| run_one(phase_series_cache, key, num_time_points, config))
            .collect()
    };

    let journal = config.journal_path.as_ref().map(RunJournal::new);
    let mut outcome = PrecomputeOutcome {
        run_id,
        cache: TrackCache::default(),
        summaries: Vec::new(),
        failures: Vec::new(),
        elapsed: Duration::ZERO,
    };

    for run in runs {
        let summary = match &run.result {
            Ok(tracks) => {
                let summary = ConditionSummary::from_tracks(
                    run.key.clone(),
                    tracks,
                    num_time_points,
                    run.elapsed,
                );
                tracing::info!(
                    "finished {}: {} segments ({} spiral, {} anti-spiral) in {:.2}s",
                    run.key,
                    summary.total_tracks(),
                    summary.spiral_tracks,
                    summary.anti_spiral_tracks,
                    run.elapsed.as_secs_f64()
                );
                Some(summary)
            }
            Err(err) => {
                tracing::error!("skipping condition {}: {}", run.key, err);
                None
            }
        };

        if let Some(journal) = &journal {
            let entry = journal_entry(run_id, &run, summary.as_ref());
            if let Err(err) = journal.record(&entry) {
                tracing::warn!(
                    "failed to append to journal {}: {}",
                    journal.path().display(),
                    err
                );
            }
        }

        match run.result {
            Ok(tracks) => {
                outcome.cache.insert(run.key, tracks);
                outcome.summaries.extend(summary);
            }
            Err(err) => outcome.failures.push((run.key, err)),
        }
    }

    outcome.elapsed = started.elapsed();
    tracing::info!(
        "track precomputation {} finished in {:.2}s ({} ok, {} skipped)",
        run_id,
        outcome.elapsed.as_secs_f64(),
        outcome.summaries.len(),
        outcome.failures.len()
    );
    outcome
}

/// Run every condition named by `config`: raw phase, then each band.
pub fn precompute(
    phase_series_cache: &PhaseSeriesCache,
    num_time_points: usize,
    config: &TrackingConfig,
) -> PrecomputeOutcome {
    run_all(
        phase_series_cache,
        &config.conditions(),
        num_time_points,
        config,
    )
}
