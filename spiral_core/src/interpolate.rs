//! Spatial upsampling of real-valued grids.
//!
//! Output coordinates map onto the input with aligned end points:
//! `src = out · (n − 1) / (N − 1)` for an axis of input length `n` and
//! output length `N = n · factor`. Every scheme is separable, so each output
//! cell is a weighted sum over a small tap table per axis.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{TrackingError, TrackingResult};

/// Interpolation scheme selected by spline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Order 0: nearest input sample.
    Nearest,
    /// Order 1: bilinear.
    Linear,
    /// Order 3: Keys cubic convolution (a = -0.5), edge samples replicated.
    /// Not a prefiltered B-spline, so results differ from spline order 3.
    KeysCubic,
}

impl Interpolation {
    pub fn from_order(order: usize) -> TrackingResult<Self> {
        match order {
            0 => Ok(Interpolation::Nearest),
            1 => Ok(Interpolation::Linear),
            3 => Ok(Interpolation::KeysCubic),
            other => Err(TrackingError::UnsupportedInterpolation(other)),
        }
    }

    pub fn order(&self) -> usize {
        match self {
            Interpolation::Nearest => 0,
            Interpolation::Linear => 1,
            Interpolation::KeysCubic => 3,
        }
    }
}

impl TryFrom<usize> for Interpolation {
    type Error = TrackingError;

    fn try_from(order: usize) -> Result<Self, Self::Error> {
        Self::from_order(order)
    }
}

type Taps = Vec<Vec<(usize, f64)>>;

fn source_coordinate(out_idx: usize, in_len: usize, out_len: usize) -> f64 {
    if out_len <= 1 {
        return 0.0;
    }
    // Integer numerator keeps grid-aligned coordinates exact.
    (out_idx * (in_len - 1)) as f64 / (out_len - 1) as f64
}

fn cubic_kernel(x: f64) -> f64 {
    const A: f64 = -0.5;
    let x = x.abs();
    if x <= 1.0 {
        ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((A * x - 5.0 * A) * x + 8.0 * A) * x - 4.0 * A
    } else {
        0.0
    }
}

fn axis_taps(in_len: usize, out_len: usize, scheme: Interpolation) -> Taps {
    let last = in_len - 1;
    (0..out_len)
        .map(|out_idx| {
            let src = source_coordinate(out_idx, in_len, out_len);
            match scheme {
                Interpolation::Nearest => vec![((src.round() as usize).min(last), 1.0)],
                Interpolation::Linear => {
                    let base = (src.floor() as usize).min(last);
                    let frac = src - base as f64;
                    if frac == 0.0 || base == last {
                        vec![(base, 1.0)]
                    } else {
                        vec![(base, 1.0 - frac), (base + 1, frac)]
                    }
                }
                Interpolation::KeysCubic => {
                    let base = (src.floor() as usize).min(last);
                    let frac = src - base as f64;
                    if frac == 0.0 {
                        return vec![(base, 1.0)];
                    }
                    (-1isize..=2)
                        .map(|offset| {
                            let idx = (base as isize + offset).clamp(0, last as isize) as usize;
                            (idx, cubic_kernel(frac - offset as f64))
                        })
                        .collect()
                }
            }
        })
        .collect()
}

/// Upsample `grid` by an integer `factor` along both axes.
///
/// Returns a `(rows · factor, cols · factor)` grid. With `factor = 1` and any
/// scheme the input is reproduced exactly.
pub fn zoom(
    grid: ArrayView2<'_, f64>,
    factor: usize,
    scheme: Interpolation,
) -> TrackingResult<Array2<f64>> {
    let (rows, cols) = grid.dim();
    if rows == 0 || cols == 0 {
        return Err(TrackingError::InvalidShape {
            context: "zoom input",
            rows,
            cols,
        });
    }
    if factor == 0 {
        return Err(TrackingError::invalid_parameter(
            "upsample_factor",
            "must be a positive integer",
        ));
    }

    let out_rows = rows * factor;
    let out_cols = cols * factor;
    let row_taps = axis_taps(rows, out_rows, scheme);
    let col_taps = axis_taps(cols, out_cols, scheme);

    let zoomed = Array2::from_shape_fn((out_rows, out_cols), |(r, c)| {
        let mut acc = 0.0;
        for &(src_r, w_r) in &row_taps[r] {
            for &(src_c, w_c) in &col_taps[c] {
                acc += w_r * w_c * grid[[src_r, src_c]];
            }
        }
        acc
    });

    Ok(zoomed)
}
