/* src/gemm.rs */
//! Dense matrix-multiply capability used by the affine kernels.
//!
//! The engine never multiplies matrices itself. It hands strided column-major
//! slices to a [`Gemm`] implementation; the default one is backed by `faer`.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use faer::linalg::matmul::matmul;
use faer::{Accum, MatMut, MatRef, Par};

/// Accumulating `C += Aᵗ·B` over column-major, column-strided operands.
///
/// * `a` holds a `k x m` matrix with column stride `lda`
/// * `b` holds a `k x n` matrix with column stride `ldb`
/// * `c` holds an `m x n` matrix with column stride `ldc`
///
/// Rows between the logical row count and the stride are never read or written.
/// Implementations may parallelise internally but must return only once `c`
/// is fully updated.
pub trait Gemm {
    /// Performs `c += aᵗ · b`.
    #[allow(clippy::too_many_arguments)]
    fn gemm_tn(
        &self,
        m: usize,
        n: usize,
        k: usize,
        a: &[f32],
        lda: usize,
        b: &[f32],
        ldb: usize,
        c: &mut [f32],
        ldc: usize,
    );
}

/// `faer`-backed multiply.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaerGemm {
    threads: usize,
}

impl FaerGemm {
    /// Sequential multiply.
    pub const fn sequential() -> Self {
        Self { threads: 1 }
    }

    /// Multiply spread over `threads` workers; `0` uses every available core.
    pub fn with_threads(threads: usize) -> Self {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        Self { threads }
    }

    /// Number of workers the multiply may use.
    pub fn threads(&self) -> usize {
        self.threads.max(1)
    }

    fn parallelism(&self) -> Par {
        if self.threads() <= 1 {
            Par::Seq
        } else {
            Par::rayon(self.threads)
        }
    }
}

impl Gemm for FaerGemm {
    fn gemm_tn(
        &self,
        m: usize,
        n: usize,
        k: usize,
        a: &[f32],
        lda: usize,
        b: &[f32],
        ldb: usize,
        c: &mut [f32],
        ldc: usize,
    ) {
        let a = MatRef::from_column_major_slice_with_stride(a, k, m, lda);
        let b = MatRef::from_column_major_slice_with_stride(b, k, n, ldb);
        let c = MatMut::from_column_major_slice_with_stride_mut(c, m, n, ldc);
        matmul(c, Accum::Add, a.transpose(), b, 1.0f32, self.parallelism());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Triple-loop reference used to cross-check backends.
    pub(crate) struct NaiveGemm;

    impl Gemm for NaiveGemm {
        fn gemm_tn(
            &self,
            m: usize,
            n: usize,
            k: usize,
            a: &[f32],
            lda: usize,
            b: &[f32],
            ldb: usize,
            c: &mut [f32],
            ldc: usize,
        ) {
            for j in 0..n {
                for i in 0..m {
                    let dot: f32 = (0..k).map(|p| a[i * lda + p] * b[j * ldb + p]).sum();
                    c[j * ldc + i] += dot;
                }
            }
        }
    }

    #[test]
    fn test_accumulates_into_existing_values() {
        // a = [[1, 2], [3, 4]] column-major (k = 2, m = 2), b = identity.
        let a = [1.0, 3.0, 2.0, 4.0];
        let b = [1.0, 0.0, 0.0, 1.0];
        let mut c = [10.0, 10.0, 10.0, 10.0];
        FaerGemm::sequential().gemm_tn(2, 2, 2, &a, 2, &b, 2, &mut c, 2);
        // aᵗ = [[1, 3], [2, 4]] -> columns (1, 2) and (3, 4)
        assert_eq!(c, [11.0, 13.0, 12.0, 14.0]);
    }

    #[test]
    fn test_respects_strides_and_leaves_padding() {
        // k = 3 rows stored with stride 4, padding holds a sentinel.
        let a = [1.0, 2.0, 3.0, -99.0];
        let b = [4.0, 5.0, 6.0, -99.0, 1.0, 1.0, 1.0, -99.0];
        let mut c = [0.0, -7.0, 0.0, -7.0];
        FaerGemm::sequential().gemm_tn(1, 2, 3, &a, 4, &b, 4, &mut c, 2);
        assert_eq!(c, [32.0, -7.0, 6.0, -7.0]);
    }

    #[test]
    fn test_thread_count_resolution() {
        assert_eq!(FaerGemm::sequential().threads(), 1);
        assert_eq!(FaerGemm::default().threads(), 1);
        assert_eq!(FaerGemm::with_threads(0).threads(), num_cpus::get().max(1));
        assert_eq!(FaerGemm::with_threads(3).threads(), 3);
    }

    proptest! {
        #[test]
        fn prop_faer_matches_naive(
            (m, n, k, a, b) in (1usize..9, 1usize..7, 1usize..11).prop_flat_map(|(m, n, k)| {
                (
                    Just(m),
                    Just(n),
                    Just(k),
                    prop::collection::vec(-4.0f32..4.0, k * m),
                    prop::collection::vec(-4.0f32..4.0, k * n),
                )
            })
        ) {
            let mut expected = vec![0.5f32; m * n];
            let mut actual = expected.clone();
            NaiveGemm.gemm_tn(m, n, k, &a, k, &b, k, &mut expected, m);
            FaerGemm::with_threads(2).gemm_tn(m, n, k, &a, k, &b, k, &mut actual, m);
            for (x, y) in expected.iter().zip(&actual) {
                prop_assert!((x - y).abs() <= 1.0e-4, "{} vs {}", x, y);
            }
        }
    }
}
