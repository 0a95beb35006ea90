use std::collections::BTreeSet;
use std::f64::consts::PI;

use lfp_spiral_core::{
    detect, precompute, run_all, run_condition, sample, singularities_at, wrap_phase,
    ConditionKey, GridParams, GridPoint, PhaseSeriesCache, SingularityKind, Track,
    TrackingConfig, TrackingParams, DEFAULT_PHASE_TOLERANCE,
};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const RANDOM_SEED: u64 = 42;

/// Vortex with centre `(row, col)`; `handedness` +1 gives a spiral, -1 an anti-spiral.
#[derive(Clone, Copy)]
struct Vortex {
    row: f64,
    col: f64,
    handedness: f64,
}

impl Vortex {
    fn spiral(row: f64, col: f64) -> Self {
        Self {
            row,
            col,
            handedness: 1.0,
        }
    }

    fn anti(row: f64, col: f64) -> Self {
        Self {
            row,
            col,
            handedness: -1.0,
        }
    }

    fn phase(&self, r: usize, c: usize) -> f64 {
        (self.handedness * (r as f64 - self.row)).atan2(c as f64 - self.col)
    }
}

/// Build a `(grid_dim², T)` series where frame `t` superimposes `frames[t]`.
fn vortex_series(grid_dim: usize, frames: &[Vec<Vortex>]) -> Array2<f64> {
    Array2::from_shape_fn((grid_dim * grid_dim, frames.len()), |(ch, t)| {
        let (r, c) = (ch / grid_dim, ch % grid_dim);
        wrap_phase(frames[t].iter().map(|v| v.phase(r, c)).sum())
    })
}

fn random_series(rng: &mut StdRng, grid_dim: usize, frames: usize) -> Array2<f64> {
    Array2::from_shape_fn((grid_dim * grid_dim, frames), |_| rng.gen_range(-PI..PI))
}

fn params(max_track_distance_sq: f64, max_points_per_track: usize) -> TrackingParams {
    TrackingParams {
        phase_tolerance: DEFAULT_PHASE_TOLERANCE,
        max_track_distance_sq,
        max_points_per_track,
    }
}

#[test]
fn drifting_spiral_forms_a_single_track() {
    let frames: Vec<Vec<Vortex>> = (0..5)
        .map(|t| vec![Vortex::spiral(4.5, 2.5 + t as f64)])
        .collect();
    let series = vortex_series(10, &frames);
    let grid = GridParams::new(10, 1, 0).unwrap();

    let tracks = run_condition(series.view(), 5, &grid, &params(49.0, 50)).unwrap();
    assert_eq!(tracks.len(), 1);
    let track = &tracks[0];
    assert_eq!(track.kind(), SingularityKind::Spiral);
    assert_eq!(track.start_time(), 0);
    assert_eq!(track.end_time(), 4);
    assert_eq!(
        track.points().collect::<Vec<_>>(),
        (2..7).map(|c| GridPoint::new(4, c)).collect::<Vec<_>>()
    );
    assert_eq!(track.time_indices().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn drifting_spiral_is_tracked_on_the_zoomed_grid() {
    let frames: Vec<Vec<Vortex>> = (0..4)
        .map(|t| vec![Vortex::spiral(4.5, 2.5 + t as f64)])
        .collect();
    let series = vortex_series(10, &frames);
    let grid = GridParams::new(10, 3, 1).unwrap();

    let zoomed = sample(0, series.view(), &grid).unwrap();
    assert_eq!(zoomed.dim(), (30, 30));

    let tracks = run_condition(series.view(), 4, &grid, &params(49.0, 50)).unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].duration(), 4);
    let first = tracks[0].points().next().unwrap();
    let last = tracks[0].last_point().unwrap();
    assert_eq!(first.row, 14);
    assert!(last.col > first.col + 6);
}

#[test]
fn spiral_and_anti_spiral_get_separate_tracks() {
    let frames: Vec<Vec<Vortex>> = (0..3)
        .map(|_| vec![Vortex::spiral(2.5, 2.5), Vortex::anti(7.5, 7.5)])
        .collect();
    let series = vortex_series(10, &frames);
    let grid = GridParams::new(10, 1, 0).unwrap();

    let found = singularities_at(series.view(), 0, &grid, DEFAULT_PHASE_TOLERANCE).unwrap();
    assert_eq!(found.spirals, vec![GridPoint::new(2, 2)]);
    assert_eq!(found.anti_spirals, vec![GridPoint::new(7, 7)]);

    let tracks = run_condition(series.view(), 3, &grid, &params(49.0, 50)).unwrap();
    let kinds: Vec<SingularityKind> = tracks.iter().map(Track::kind).collect();
    assert_eq!(
        kinds,
        vec![SingularityKind::Spiral, SingularityKind::AntiSpiral]
    );
    assert!(tracks.iter().all(|t| t.len() == 3));
}

#[test]
fn long_lived_track_keeps_only_the_latest_points() {
    let frames: Vec<Vec<Vortex>> = (0..12).map(|_| vec![Vortex::spiral(3.5, 3.5)]).collect();
    let series = vortex_series(8, &frames);
    let grid = GridParams::new(8, 1, 0).unwrap();

    let tracks = run_condition(series.view(), 12, &grid, &params(49.0, 5)).unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].len(), 5);
    assert_eq!(tracks[0].start_time(), 0);
    assert_eq!(tracks[0].end_time(), 11);
    assert_eq!(
        tracks[0].time_indices().collect::<Vec<_>>(),
        vec![7, 8, 9, 10, 11]
    );
}

#[test]
fn detection_never_reports_a_plaquette_twice() {
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
    for _ in 0..50 {
        let grid = Array2::from_shape_fn((15, 15), |_| rng.gen_range(-PI..PI));
        let found = detect(grid.view(), DEFAULT_PHASE_TOLERANCE).unwrap();
        let spirals: BTreeSet<GridPoint> = found.spirals.iter().copied().collect();
        assert_eq!(spirals.len(), found.spirals.len());
        assert!(found.anti_spirals.iter().all(|p| !spirals.contains(p)));
    }
}

#[test]
fn identity_sampling_holds_for_random_phases() {
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED + 1);
    let series = random_series(&mut rng, 7, 5);
    let grid = GridParams::new(7, 1, 0).unwrap();
    for t in 0..5 {
        let sampled = sample(t, series.view(), &grid).unwrap();
        for r in 0..7 {
            for c in 0..7 {
                let original = series[[r * 7 + c, t]];
                assert!(wrap_phase(sampled[[r, c]] - original).abs() < 1e-12);
            }
        }
    }
}

#[test]
fn random_runs_respect_track_invariants() {
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED + 2);
    let series = random_series(&mut rng, 12, 25);
    let grid = GridParams::new(12, 1, 0).unwrap();

    let windowed = run_condition(series.view(), 25, &grid, &params(9.0, 4)).unwrap();
    assert!(!windowed.is_empty());
    for track in &windowed {
        assert!(track.len() <= 4);
        assert!(track.end_time() >= track.start_time());
        let times: Vec<usize> = track.time_indices().collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert!(times
            .iter()
            .all(|&t| track.start_time() <= t && t <= track.end_time()));
    }

    // With an unbounded window every detection must be owned by exactly one track.
    let full = run_condition(series.view(), 25, &grid, &params(9.0, usize::MAX)).unwrap();
    for t in 0..25 {
        let found = singularities_at(series.view(), t, &grid, DEFAULT_PHASE_TOLERANCE).unwrap();
        for kind in SingularityKind::ALL {
            let mut owned: Vec<GridPoint> = full
                .iter()
                .filter(|track| track.kind() == kind)
                .flat_map(|track| track.observations())
                .filter(|obs| obs.time_index == t)
                .map(|obs| obs.point)
                .collect();
            owned.sort();
            let mut detected = found.of_kind(kind).to_vec();
            detected.sort();
            assert_eq!(owned, detected, "frame {t}, {kind}");
        }
    }
}

#[test]
fn repeated_runs_are_identical() {
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED + 3);
    let series = random_series(&mut rng, 10, 15);
    let grid = GridParams::new(10, 2, 1).unwrap();
    let p = params(16.0, 10);

    let first = run_condition(series.view(), 15, &grid, &p).unwrap();
    let second = run_condition(series.view(), 15, &grid, &p).unwrap();
    assert_eq!(first, second);
}

#[test]
fn parallel_and_sequential_precomputation_agree() {
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED + 4);
    let mut config = TrackingConfig::from_str(
        r#"
        [grid]
        grid_dim = 8
        upsample_factor = 2

        [[bands]]
        name = "Theta (θ)"
        low_hz = 4.0
        high_hz = 8.0

        [[bands]]
        name = "Gamma (γ)"
        low_hz = 30.0
        high_hz = 80.0
        "#,
    )
    .unwrap();

    let mut phases = PhaseSeriesCache::new();
    for key in config.conditions() {
        phases.insert(key, random_series(&mut rng, 8, 10));
    }

    let parallel = precompute(&phases, 10, &config);
    config.parallel = false;
    let sequential = precompute(&phases, 10, &config);

    assert!(parallel.is_complete());
    assert_eq!(parallel.cache.len(), 3);
    assert_eq!(parallel.cache, sequential.cache);
    assert_ne!(parallel.run_id, sequential.run_id);
    let keys: Vec<&ConditionKey> = parallel.cache.keys().collect();
    assert!(keys[0].is_raw());
}

#[test]
fn cache_answers_display_queries() {
    let mut frames: Vec<Vec<Vortex>> = (0..3).map(|_| vec![Vortex::spiral(2.5, 2.5)]).collect();
    frames.extend((0..3).map(|_| vec![Vortex::anti(6.5, 6.5)]));
    let mut phases = PhaseSeriesCache::new();
    phases.insert(ConditionKey::raw(), vortex_series(10, &frames));

    let mut config = TrackingConfig::from_str("[grid]\ngrid_dim = 10\nupsample_factor = 1")
        .unwrap();
    config.bands.clear();
    let outcome = run_all(&phases, &config.conditions(), 6, &config);
    let raw = ConditionKey::raw();

    let early = outcome.cache.active_at(&raw, 1).unwrap();
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].kind(), SingularityKind::Spiral);
    assert_eq!(
        early[0].trail_until(1),
        vec![GridPoint::new(2, 2), GridPoint::new(2, 2)]
    );

    let late = outcome.cache.active_at(&raw, 4).unwrap();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].kind(), SingularityKind::AntiSpiral);
    assert_eq!(late[0].start_time(), 3);

    assert!(outcome.cache.active_at(&ConditionKey::band("Beta (β)"), 1).is_none());
}
