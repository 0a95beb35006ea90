//! Track a synthetic spiral orbiting an anti-spiral.
//!
//! Run with: cargo run --example rotating_spiral [config.toml]

use std::f64::consts::TAU;

use lfp_spiral_core::{precompute, wrap_phase, ConditionKey, PhaseSeriesCache, TrackingConfig};
use ndarray::Array2;

const FRAMES: usize = 400;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => TrackingConfig::load_from_file(path)?,
        None => TrackingConfig::default(),
    };
    config.bands.clear();

    let dim = config.grid.grid_dim;
    let mid = dim as f64 / 2.0;
    let radius = dim as f64 / 4.0;

    // The spiral circles the grid centre once every 200 frames; the
    // anti-spiral sits still near the lower-right corner.
    let series = Array2::from_shape_fn((dim * dim, FRAMES), |(ch, t)| {
        let (r, c) = ((ch / dim) as f64, (ch % dim) as f64);
        let angle = TAU * t as f64 / 200.0;
        let (sr, sc) = (mid + radius * angle.sin(), mid + radius * angle.cos());
        let spiral = (r - sr).atan2(c - sc);
        let anti = (-(r - (dim as f64 - 2.3))).atan2(c - (dim as f64 - 2.3));
        wrap_phase(spiral + anti)
    });

    let mut phases = PhaseSeriesCache::new();
    phases.insert(ConditionKey::raw(), series);

    let outcome = precompute(&phases, FRAMES, &config);
    for summary in &outcome.summaries {
        println!(
            "{}: {} spiral / {} anti-spiral tracks in {:.2?}",
            summary.key, summary.spiral_tracks, summary.anti_spiral_tracks, summary.elapsed
        );
    }

    if let Some(tracks) = outcome.cache.get(&ConditionKey::raw()) {
        for track in tracks.iter().filter(|t| t.duration() > 10) {
            println!(
                "  {} {} frames {}..={} last at {:?}",
                track.id(),
                track.kind(),
                track.start_time(),
                track.end_time(),
                track.last_point()
            );
        }
    }

    for (key, err) in &outcome.failures {
        eprintln!("{key} unavailable: {err}");
    }

    Ok(())
}
