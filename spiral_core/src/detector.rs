//! Phase singularity detection on unit plaquettes.
//!
//! Each plaquette `(r, c)` is walked top-left → top-right → bottom-right →
//! bottom-left → top-left. The wrapped phase steps around the loop sum to the
//! circulation, which is `±2π` around a singularity and `0` elsewhere.

use std::f64::consts::{FRAC_PI_2, TAU};

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::{TrackingError, TrackingResult};
use crate::phase::wrap_phase;
use crate::track::{GridPoint, SingularityKind};

/// Default tolerance around `±2π`.
pub const DEFAULT_PHASE_TOLERANCE: f64 = FRAC_PI_2;

/// Singularities found in one frame, each list in row-major scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Singularities {
    pub spirals: Vec<GridPoint>,
    pub anti_spirals: Vec<GridPoint>,
}

impl Singularities {
    pub fn of_kind(&self, kind: SingularityKind) -> &[GridPoint] {
        match kind {
            SingularityKind::Spiral => &self.spirals,
            SingularityKind::AntiSpiral => &self.anti_spirals,
        }
    }

    pub fn len(&self) -> usize {
        self.spirals.len() + self.anti_spirals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spirals.is_empty() && self.anti_spirals.is_empty()
    }
}

/// Signed circulation around the plaquette whose top-left corner is `(r, c)`.
pub fn circulation(grid: ArrayView2<'_, f64>, r: usize, c: usize) -> f64 {
    let p1 = grid[[r, c]];
    let p2 = grid[[r, c + 1]];
    let p3 = grid[[r + 1, c + 1]];
    let p4 = grid[[r + 1, c]];

    wrap_phase(p2 - p1) + wrap_phase(p3 - p2) + wrap_phase(p4 - p3) + wrap_phase(p1 - p4)
}

/// Classify a circulation value, inclusive of the tolerance bound.
pub fn classify(circulation: f64, phase_tolerance: f64) -> Option<SingularityKind> {
    if (circulation - TAU).abs() <= phase_tolerance {
        Some(SingularityKind::Spiral)
    } else if (circulation + TAU).abs() <= phase_tolerance {
        Some(SingularityKind::AntiSpiral)
    } else {
        None
    }
}

/// Scan every unit plaquette of `phase_grid` for spirals and anti-spirals.
///
/// Coordinates are the plaquette's top-left corner in the grid's own units.
pub fn detect(
    phase_grid: ArrayView2<'_, f64>,
    phase_tolerance: f64,
) -> TrackingResult<Singularities> {
    let (rows, cols) = phase_grid.dim();
    if rows < 2 || cols < 2 {
        return Err(TrackingError::InvalidShape {
            context: "phase grid",
            rows,
            cols,
        });
    }

    let mut found = Singularities::default();
    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            match classify(circulation(phase_grid, r, c), phase_tolerance) {
                Some(SingularityKind::Spiral) => found.spirals.push(GridPoint::new(r, c)),
                Some(SingularityKind::AntiSpiral) => {
                    found.anti_spirals.push(GridPoint::new(r, c))
                }
                None => {}
            }
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use std::f64::consts::PI;

    fn vortex(rows: usize, cols: usize, center: (f64, f64), handedness: f64) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, c)| {
            (handedness * (r as f64 - center.0)).atan2(c as f64 - center.1)
        })
    }

    #[test]
    fn quarter_turn_corners_form_a_spiral() {
        // top-left, top-right / bottom-left, bottom-right
        let grid = array![[0.0, FRAC_PI_2], [3.0 * FRAC_PI_2, PI]];
        let found = detect(grid.view(), 1e-9).unwrap();
        assert_eq!(found.spirals, vec![GridPoint::new(0, 0)]);
        assert!(found.anti_spirals.is_empty());
        assert!((circulation(grid.view(), 0, 0) - TAU).abs() < 1e-12);
    }

    #[test]
    fn reversed_winding_is_an_anti_spiral() {
        let grid = array![[0.0, 3.0 * FRAC_PI_2], [FRAC_PI_2, PI]];
        let found = detect(grid.view(), DEFAULT_PHASE_TOLERANCE).unwrap();
        assert!(found.spirals.is_empty());
        assert_eq!(found.anti_spirals, vec![GridPoint::new(0, 0)]);
    }

    #[test]
    fn vortex_centre_is_found_in_its_plaquette() {
        let spiral = vortex(8, 8, (3.5, 4.5), 1.0);
        let found = detect(spiral.view(), DEFAULT_PHASE_TOLERANCE).unwrap();
        assert_eq!(found.spirals, vec![GridPoint::new(3, 4)]);
        assert!(found.anti_spirals.is_empty());

        let anti = vortex(8, 8, (3.5, 4.5), -1.0);
        let found = detect(anti.view(), DEFAULT_PHASE_TOLERANCE).unwrap();
        assert!(found.spirals.is_empty());
        assert_eq!(found.anti_spirals, vec![GridPoint::new(3, 4)]);
    }

    #[test]
    fn smooth_field_has_no_singularities() {
        let plane = Array2::from_shape_fn((6, 6), |(r, c)| {
            super::wrap_phase(0.4 * r as f64 + 0.9 * c as f64)
        });
        let found = detect(plane.view(), DEFAULT_PHASE_TOLERANCE).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn detections_are_in_row_major_order() {
        let mut grid = vortex(10, 10, (2.5, 6.5), 1.0);
        // Superimpose a second vortex far away by adding phases.
        let second = vortex(10, 10, (7.5, 1.5), 1.0);
        grid.zip_mut_with(&second, |a, b| *a = super::wrap_phase(*a + *b));
        let found = detect(grid.view(), DEFAULT_PHASE_TOLERANCE).unwrap();
        assert_eq!(
            found.spirals,
            vec![GridPoint::new(2, 6), GridPoint::new(7, 1)]
        );
    }

    #[test]
    fn degenerate_grids_are_rejected() {
        let grid = Array2::<f64>::zeros((1, 5));
        assert!(matches!(
            detect(grid.view(), DEFAULT_PHASE_TOLERANCE),
            Err(TrackingError::InvalidShape { rows: 1, cols: 5, .. })
        ));
    }
}
