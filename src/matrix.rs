/* src/matrix.rs */
//! # Padded Matrices
//!
//! Column-major dense matrices whose row dimension is padded up to a multiple of
//! the SIMD lane width. Each column is stored as `nrq = ceil(nr / 4)` lane groups,
//! so the scalar length of a column (its leading dimension) is `4 * nrq`.
//!
//! ```text
//!            column 0          column 1
//! lanes:  [r0 r1 r2 r3] .. [r0 r1 r2 r3] ..
//!         [r4 p  p  p ]    [r4 p  p  p ]      nr = 5, nrq = 2, p = padding
//! ```
//!
//! The backing store is a `Vec` of lane groups (`wide::f32x4` or `wide::i32x4`,
//! both 16-byte aligned). The scalar view is a `bytemuck` cast of the same
//! storage, never a second allocation.
//!
//! Padding rows are zero after allocation and after every public operation
//! unless a caller deliberately writes a different mask value into them.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use std::fmt;
use std::mem::size_of;

use bytemuck::Pod;
use tracing::{debug, trace};
use wide::{f32x4, i32x4};

use crate::error::{Result, SquiggleError};

/// Number of scalars held by one lane group.
pub const LANE_WIDTH: usize = 4;

/// A 16-byte SIMD lane group that can back a [`PaddedMatrix`].
pub trait Lane: Pod + PartialEq + fmt::Debug + Send + Sync {
    /// Scalar element type seen through the flat view.
    type Scalar: Pod + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Default;
}

impl Lane for f32x4 {
    type Scalar = f32;
}

impl Lane for i32x4 {
    type Scalar = i32;
}

/// Padded matrix with 32-bit float lanes.
pub type Matrix = PaddedMatrix<f32x4>;

/// Padded matrix with 32-bit integer lanes, used for index and label data.
pub type IMatrix = PaddedMatrix<i32x4>;

/// Owning, lane-padded, column-major matrix.
pub struct PaddedMatrix<L: Lane> {
    nr: usize,
    nrq: usize,
    nc: usize,
    data: Vec<L>,
}

impl<L: Lane> fmt::Debug for PaddedMatrix<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaddedMatrix")
            .field("nr", &self.nr)
            .field("nrq", &self.nrq)
            .field("nc", &self.nc)
            .finish_non_exhaustive()
    }
}

/// Number of lane groups and bytes needed for an `nr x nc` matrix, or `None`
/// when the padded size cannot be represented.
fn padded_size<L: Lane>(nr: usize, nc: usize) -> Option<(usize, usize)> {
    let nrq = nr.div_ceil(LANE_WIDTH);
    let groups = nrq.checked_mul(nc)?;
    let bytes = groups.checked_mul(size_of::<L>())?;
    // Rust allocations are capped at isize::MAX bytes.
    if bytes > isize::MAX as usize {
        return None;
    }
    Some((groups, bytes))
}

impl<L: Lane> PaddedMatrix<L> {
    /// Allocates a zero-filled `nr x nc` matrix.
    ///
    /// Zero dimensions are a contract violation (asserted in debug builds).
    /// A padded size that overflows, or an allocator refusal, is reported as an
    /// error and never produces a truncated buffer.
    pub fn new(nr: usize, nc: usize) -> Result<Self> {
        debug_assert!(nr > 0, "matrix row count must be positive");
        debug_assert!(nc > 0, "matrix column count must be positive");
        if nr == 0 || nc == 0 {
            return Err(SquiggleError::ZeroDimension { nr, nc });
        }

        let (groups, bytes) =
            padded_size::<L>(nr, nc).ok_or(SquiggleError::SizeOverflow { nr, nc })?;

        let mut data = Vec::new();
        data.try_reserve_exact(groups)
            .map_err(|_| SquiggleError::Allocation { bytes })?;
        data.resize(groups, L::zeroed());

        trace!(nr, nc, bytes, "allocated padded matrix");
        Ok(Self {
            nr,
            nrq: nr.div_ceil(LANE_WIDTH),
            nc,
            data,
        })
    }

    /// Returns `existing` untouched when it already has shape `nr x nc`,
    /// otherwise releases it and allocates a fresh zeroed matrix.
    ///
    /// Contents of a reused matrix are not cleared.
    pub fn reshape_or_reallocate(existing: Option<Self>, nr: usize, nc: usize) -> Result<Self> {
        match existing {
            Some(m) if m.nr == nr && m.nc == nc => Ok(m),
            other => {
                if let Some(old) = &other {
                    debug!(from = ?old.shape(), to = ?(nr, nc), "reallocating padded matrix");
                }
                drop(other);
                Self::new(nr, nc)
            }
        }
    }

    /// Deep copy of the full padded buffer, padding lanes included.
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self::new(self.nr, self.nc)?;
        copy.data.copy_from_slice(&self.data);
        Ok(copy)
    }

    /// Clears every scalar, padding included.
    pub fn zero(&mut self) {
        self.data.fill(L::zeroed());
    }

    /// Writes `value` into every padding row of every column.
    pub fn fill_padding(&mut self, value: L::Scalar) {
        let (nr, ld) = (self.nr, self.stride());
        for column in self.as_mut_slice().chunks_exact_mut(ld) {
            column[nr..].fill(value);
        }
    }

    /// Logical row count.
    #[inline]
    pub fn nr(&self) -> usize {
        self.nr
    }

    /// Lane groups per column.
    #[inline]
    pub fn nrq(&self) -> usize {
        self.nrq
    }

    /// Column count.
    #[inline]
    pub fn nc(&self) -> usize {
        self.nc
    }

    /// Logical shape as `(nr, nc)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nr, self.nc)
    }

    /// Scalar distance between the starts of two adjacent columns (`4 * nrq`).
    #[inline]
    pub fn stride(&self) -> usize {
        LANE_WIDTH * self.nrq
    }

    /// Number of padding rows per column.
    #[inline]
    pub fn padding(&self) -> usize {
        self.stride() - self.nr
    }

    /// Flat padded offset of logical element `(row, col)`.
    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        col * self.stride() + row
    }

    /// Scalar view of the whole padded buffer.
    #[inline]
    pub fn as_slice(&self) -> &[L::Scalar] {
        bytemuck::cast_slice(&self.data)
    }

    /// Mutable scalar view of the whole padded buffer.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [L::Scalar] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Lane-group view of the whole padded buffer.
    #[inline]
    pub fn lanes(&self) -> &[L] {
        &self.data
    }

    /// Mutable lane-group view of the whole padded buffer.
    #[inline]
    pub fn lanes_mut(&mut self) -> &mut [L] {
        &mut self.data
    }

    /// Lane groups of column `col`, padding included.
    #[inline]
    pub fn column_lanes(&self, col: usize) -> &[L] {
        &self.data[col * self.nrq..(col + 1) * self.nrq]
    }

    /// Mutable lane groups of column `col`, padding included.
    #[inline]
    pub fn column_lanes_mut(&mut self, col: usize) -> &mut [L] {
        let nrq = self.nrq;
        &mut self.data[col * nrq..(col + 1) * nrq]
    }

    /// Logical rows of column `col`.
    #[inline]
    pub fn column(&self, col: usize) -> &[L::Scalar] {
        let start = col * self.stride();
        &self.as_slice()[start..start + self.nr]
    }

    /// Mutable logical rows of column `col`.
    #[inline]
    pub fn column_mut(&mut self, col: usize) -> &mut [L::Scalar] {
        let (start, nr) = (col * self.stride(), self.nr);
        &mut self.as_mut_slice()[start..start + nr]
    }

    /// Iterator over the logical rows of every column, in column order.
    pub fn columns(&self) -> impl Iterator<Item = &[L::Scalar]> + '_ {
        let nr = self.nr;
        self.as_slice()
            .chunks_exact(self.stride())
            .map(move |column| &column[..nr])
    }

    /// Logical element `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> L::Scalar {
        debug_assert!(row < self.nr && col < self.nc);
        self.as_slice()[self.offset(row, col)]
    }

    /// Sets logical element `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: L::Scalar) {
        debug_assert!(row < self.nr && col < self.nc);
        let offset = self.offset(row, col);
        self.as_mut_slice()[offset] = value;
    }
}

/// Null-propagating deep copy.
pub fn copy<L: Lane>(src: Option<&PaddedMatrix<L>>) -> Result<Option<PaddedMatrix<L>>> {
    src.map(PaddedMatrix::try_clone).transpose()
}

/// Clears `m` when present; absent input is a no-op.
pub fn zero<L: Lane>(m: Option<&mut PaddedMatrix<L>>) {
    if let Some(m) = m {
        m.zero();
    }
}

/// Frees `m` and hands back `None`, so a handle can be overwritten in one step:
/// `m = release(m)`.
pub fn release<L: Lane>(m: Option<PaddedMatrix<L>>) -> Option<PaddedMatrix<L>> {
    drop(m);
    None
}
