/* src/reduce.rs */
//! # Reductions
//!
//! Column normalisation, global extrema and tolerance equality over the logical
//! elements of a [`Matrix`]. Padding rows never contribute to a result.
//!
//! The free functions accept absent matrices so that a failure earlier in a
//! pipeline yields a defined value here (NaN, `None`, no-op) instead of a panic.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use wide::f32x4;

use crate::matrix::{Matrix, LANE_WIDTH};

/// Lane mask selecting the logical rows of a column's last lane group.
fn live_lane_mask(padding: usize) -> f32x4 {
    let live = LANE_WIDTH - padding;
    let bits: [u32; LANE_WIDTH] = std::array::from_fn(|lane| if lane < live { u32::MAX } else { 0 });
    bytemuck::cast(bits)
}

impl Matrix {
    /// Divides every column by the sum of its logical rows, so each column sums
    /// to one. No exponentiation is applied.
    pub fn row_normalise(&mut self) {
        let mask = live_lane_mask(self.padding());
        for col in 0..self.nc() {
            let lanes = self.column_lanes_mut(col);
            let Some((&last, body)) = lanes.split_last() else {
                continue;
            };
            let sum = body.iter().fold(last & mask, |acc, &lane| acc + lane);
            let total: f32 = sum.to_array().iter().sum();
            let recip = f32x4::splat(1.0 / total);
            for lane in lanes.iter_mut() {
                *lane = *lane * recip;
            }
        }
    }

    /// Flat padded offset and value of the first logical element preferred by
    /// `better`, scanning column by column, rows ascending.
    fn extremum_by(&self, better: impl Fn(f32, f32) -> bool) -> (usize, f32) {
        let mut best = (0, self.as_slice()[0]);
        for (col, column) in self.columns().enumerate() {
            for (row, &value) in column.iter().enumerate() {
                if better(value, best.1) {
                    best = (self.offset(row, col), value);
                }
            }
        }
        best
    }

    /// Largest logical element.
    pub fn max_value(&self) -> f32 {
        self.extremum_by(|v, best| v > best).1
    }

    /// Smallest logical element.
    pub fn min_value(&self) -> f32 {
        self.extremum_by(|v, best| v < best).1
    }

    /// Flat padded offset of the first largest logical element.
    pub fn argmax(&self) -> usize {
        self.extremum_by(|v, best| v > best).0
    }

    /// Flat padded offset of the first smallest logical element.
    pub fn argmin(&self) -> usize {
        self.extremum_by(|v, best| v < best).0
    }

    /// Same logical shape and every logical pair within absolute tolerance `tol`.
    pub fn approx_eq(&self, other: &Matrix, tol: f32) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        debug_assert_eq!(self.nrq(), other.nrq());
        self.columns()
            .zip(other.columns())
            .all(|(a, b)| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tol))
    }
}

/// Normalises `c` in place; an absent matrix is left absent.
pub fn row_normalise_inplace(c: Option<&mut Matrix>) {
    if let Some(c) = c {
        c.row_normalise();
    }
}

/// Largest logical element, or NaN for an absent matrix.
pub fn max_matrix(x: Option<&Matrix>) -> f32 {
    x.map_or(f32::NAN, Matrix::max_value)
}

/// Smallest logical element, or NaN for an absent matrix.
pub fn min_matrix(x: Option<&Matrix>) -> f32 {
    x.map_or(f32::NAN, Matrix::min_value)
}

/// Flat padded offset of the largest logical element; `None` for an absent matrix.
pub fn argmax_matrix(x: Option<&Matrix>) -> Option<usize> {
    x.map(Matrix::argmax)
}

/// Flat padded offset of the smallest logical element; `None` for an absent matrix.
pub fn argmin_matrix(x: Option<&Matrix>) -> Option<usize> {
    x.map(Matrix::argmin)
}

/// Tolerance equality. Two absent matrices are equal; one absent is not.
pub fn equality(a: Option<&Matrix>, b: Option<&Matrix>, tol: f32) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.approx_eq(b, tol),
        _ => false,
    }
}
