/* src/linalg.rs */
//! Affine kernels: `C = Wᵗ·X + b` and its bidirectional two-input form.
//!
//! Shapes follow the padded column-major convention: `X` is `[nr, nc]`, `W` is
//! `[nr, nk]`, the bias is a matrix with `nk` logical rows (only its first column
//! is read) and the result is `[nk, nc]`. Each operand's stride `4 * nrq` is
//! handed to the multiply as its leading dimension.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use tracing::trace;

use crate::error::Result;
use crate::gemm::{FaerGemm, Gemm};
use crate::matrix::Matrix;

/// Copies the first column of `b`, padding lanes included, into every column of `c`.
fn broadcast_bias(c: &mut Matrix, b: &Matrix) {
    let bias = b.column_lanes(0);
    for col in 0..c.nc() {
        c.column_lanes_mut(col).copy_from_slice(bias);
    }
}

/// `c += wᵗ · x` through `gemm`.
fn accumulate<G: Gemm + ?Sized>(gemm: &G, c: &mut Matrix, w: &Matrix, x: &Matrix) {
    let (m, n, k) = (w.nc(), x.nc(), w.nr());
    let ldc = c.stride();
    gemm.gemm_tn(
        m,
        n,
        k,
        w.as_slice(),
        w.stride(),
        x.as_slice(),
        x.stride(),
        c.as_mut_slice(),
        ldc,
    );
}

/// Affine transform `C = Wᵗ·X + b` using the default `faer` multiply.
///
/// `c` is reused when it already has shape `[W.nc, X.nc]`, otherwise it is
/// replaced by a fresh allocation.
pub fn affine_map(x: &Matrix, w: &Matrix, b: &Matrix, c: Option<Matrix>) -> Result<Matrix> {
    affine_map_with(&FaerGemm::sequential(), x, w, b, c)
}

/// [`affine_map`] with an explicit multiply backend.
pub fn affine_map_with<G: Gemm + ?Sized>(
    gemm: &G,
    x: &Matrix,
    w: &Matrix,
    b: &Matrix,
    c: Option<Matrix>,
) -> Result<Matrix> {
    debug_assert_eq!(w.nr(), x.nr(), "weight rows must match input rows");
    debug_assert_eq!(b.nr(), w.nc(), "bias rows must match weight columns");

    let mut c = Matrix::reshape_or_reallocate(c, w.nc(), x.nc())?;
    trace!(nk = w.nc(), nr = x.nr(), nc = x.nc(), "affine_map");

    broadcast_bias(&mut c, b);
    accumulate(gemm, &mut c, w, x);
    Ok(c)
}

/// Bidirectional affine transform `C = Wfᵗ·Xf + Wbᵗ·Xb + b` using the default
/// `faer` multiply.
pub fn affine_map2(
    xf: &Matrix,
    xb: &Matrix,
    wf: &Matrix,
    wb: &Matrix,
    b: &Matrix,
    c: Option<Matrix>,
) -> Result<Matrix> {
    affine_map2_with(&FaerGemm::sequential(), xf, xb, wf, wb, b, c)
}

/// [`affine_map2`] with an explicit multiply backend.
///
/// The bias is broadcast once, then the forward and backward products are
/// accumulated into the same output, forward first.
pub fn affine_map2_with<G: Gemm + ?Sized>(
    gemm: &G,
    xf: &Matrix,
    xb: &Matrix,
    wf: &Matrix,
    wb: &Matrix,
    b: &Matrix,
    c: Option<Matrix>,
) -> Result<Matrix> {
    debug_assert_eq!(wf.nr(), xf.nr(), "forward weight rows must match forward input rows");
    debug_assert_eq!(wb.nr(), xb.nr(), "backward weight rows must match backward input rows");
    debug_assert_eq!(xf.nc(), xb.nc(), "forward and backward inputs must have equal columns");
    debug_assert_eq!(wf.nc(), wb.nc(), "forward and backward weights must have equal columns");
    debug_assert_eq!(b.nr(), wf.nc(), "bias rows must match weight columns");

    let mut c = Matrix::reshape_or_reallocate(c, wf.nc(), xf.nc())?;
    trace!(nk = wf.nc(), nrf = xf.nr(), nrb = xb.nr(), nc = xf.nc(), "affine_map2");

    broadcast_bias(&mut c, b);
    accumulate(gemm, &mut c, wf, xf);
    accumulate(gemm, &mut c, wb, xb);
    Ok(c)
}

/// Applies `tanh` to every logical element; padding rows are left as they are.
pub fn tanh_activation(x: &mut Matrix) {
    for col in 0..x.nc() {
        x.column_mut(col).iter_mut().for_each(|v| *v = v.tanh());
    }
}
