//! Per-frame phase grid extraction and upsampling.
//!
//! Angles are never interpolated directly: each phase is split into its
//! cosine and sine, both components are zoomed, and `atan2` recombines them.
//! Interpolating raw angles would smear values across the ±π seam.

use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{TrackingError, TrackingResult};
use crate::interpolate::{zoom, Interpolation};

/// Electrode grid geometry and zoom settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    /// Side length of the square electrode grid.
    pub grid_dim: usize,
    /// Integer spatial upsampling factor.
    pub upsample_factor: usize,
    pub interpolation: Interpolation,
}

impl GridParams {
    pub fn new(
        grid_dim: usize,
        upsample_factor: usize,
        interpolation_order: usize,
    ) -> TrackingResult<Self> {
        let params = Self {
            grid_dim,
            upsample_factor,
            interpolation: Interpolation::from_order(interpolation_order)?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> TrackingResult<()> {
        if self.grid_dim == 0 {
            return Err(TrackingError::invalid_parameter(
                "grid_dim",
                "must be positive",
            ));
        }
        if self.upsample_factor == 0 {
            return Err(TrackingError::invalid_parameter(
                "upsample_factor",
                "must be positive",
            ));
        }
        Ok(())
    }

    pub fn channels(&self) -> usize {
        self.grid_dim * self.grid_dim
    }

    /// Side length of the zoomed grid.
    pub fn zoomed_dim(&self) -> usize {
        self.grid_dim * self.upsample_factor
    }

    /// Check that a `(channels, time)` series tiles this grid.
    pub fn check_series(&self, series: ArrayView2<'_, f64>) -> TrackingResult<()> {
        if series.nrows() != self.channels() {
            return Err(TrackingError::GridMismatch {
                channels: series.nrows(),
                grid_dim: self.grid_dim,
            });
        }
        Ok(())
    }
}

/// Zoomed phase grid for one time index of a `(grid_dim², T)` phase series.
///
/// The channel column is reshaped row-major into `grid_dim × grid_dim`.
pub fn sample(
    time_index: usize,
    phase_series: ArrayView2<'_, f64>,
    grid: &GridParams,
) -> TrackingResult<Array2<f64>> {
    grid.check_series(phase_series)?;
    let len = phase_series.ncols();
    if time_index >= len {
        return Err(TrackingError::OutOfRange {
            index: time_index,
            len,
        });
    }

    let column = phase_series.column(time_index);
    let dim = grid.grid_dim;
    let phase_grid = Array2::from_shape_fn((dim, dim), |(r, c)| column[r * dim + c]);

    let cos_phi = zoom(
        phase_grid.mapv(f64::cos).view(),
        grid.upsample_factor,
        grid.interpolation,
    )?;
    let sin_phi = zoom(
        phase_grid.mapv(f64::sin).view(),
        grid.upsample_factor,
        grid.interpolation,
    )?;

    Ok(Zip::from(&sin_phi)
        .and(&cos_phi)
        .map_collect(|&s, &c| s.atan2(c)))
}
