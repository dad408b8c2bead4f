/* src/validate.rs */
//! # Contract Validator
//!
//! Bounds, finiteness and padding-mask checks over matrices and flat vectors.
//!
//! The active checker is compiled in for debug builds (or with the `validation`
//! feature). Otherwise every validator reports success without looking at its
//! argument, so calls can stay in release code at no cost. Callers normally
//! wrap the `validate_*!` macros in `debug_assert!`; the macros record the call
//! site for the diagnostic.
//!
//! An unspecified bound or mask is `None` (a NaN value is treated the same way).
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

/// Whether the active validator is compiled into this build.
pub const ENABLED: bool = cfg!(any(debug_assertions, feature = "validation"));

/// Validates a [`Matrix`](crate::matrix::Matrix), recording the call site.
///
/// `validate_matrix!(Some(&m), lower, upper, mask, only_finite)`
#[macro_export]
macro_rules! validate_matrix {
    ($m:expr, $lower:expr, $upper:expr, $mask:expr, $only_finite:expr $(,)?) => {
        $crate::validate::validate_matrix($m, $lower, $upper, $mask, $only_finite, file!(), line!())
    };
}

/// Validates a float slice against optional bounds, recording the call site.
#[macro_export]
macro_rules! validate_vector {
    ($v:expr, $lower:expr, $upper:expr $(,)?) => {
        $crate::validate::validate_vector($v, $lower, $upper, file!(), line!())
    };
}

/// Validates an integer slice against inclusive bounds, recording the call site.
#[macro_export]
macro_rules! validate_ivector {
    ($v:expr, $lower:expr, $upper:expr $(,)?) => {
        $crate::validate::validate_ivector($v, $lower, $upper, file!(), line!())
    };
}

#[cfg(any(debug_assertions, feature = "validation"))]
mod imp {
    use tracing::warn;

    use crate::matrix::Matrix;

    /// Slack allowed on float bounds.
    const TOLERANCE: f32 = f32::EPSILON;

    /// First entry of `m` for which `violates` holds, as `(row, col, value)`.
    /// Scans padding rows when `padding` is set, logical rows otherwise.
    fn find_entry(
        m: &Matrix,
        padding: bool,
        mut violates: impl FnMut(f32) -> bool,
    ) -> Option<(usize, usize, f32)> {
        let nr = m.nr();
        m.as_slice()
            .chunks_exact(m.stride())
            .enumerate()
            .find_map(|(col, column)| {
                let (start, rows) = if padding {
                    (nr, &column[nr..])
                } else {
                    (0, &column[..nr])
                };
                rows.iter()
                    .position(|&v| violates(v))
                    .map(|i| (start + i, col, rows[i]))
            })
    }

    /// Checks padding against `mask`, then finiteness, lower and upper bounds on
    /// logical rows, stopping at the first violation.
    pub fn validate_matrix(
        m: Option<&Matrix>,
        lower: Option<f32>,
        upper: Option<f32>,
        mask: Option<f32>,
        only_finite: bool,
        file: &str,
        line: u32,
    ) -> bool {
        let Some(m) = m else {
            return false;
        };
        assert!(m.nr() > 0 && m.nc() > 0);
        assert!(m.stride() >= m.nr());

        if let Some(mask) = mask.filter(|v| !v.is_nan()) {
            if let Some((row, col, value)) = find_entry(m, true, |v| v != mask) {
                warn!(file, line, row, col, value, "Matrix entry violates masking rules");
                return false;
            }
        }

        if only_finite {
            if let Some((row, col, value)) = find_entry(m, false, |v| !v.is_finite()) {
                warn!(file, line, row, col, value, "Matrix entry contains a non-finite value");
                return false;
            }
        }

        if let Some(lower) = lower.filter(|v| !v.is_nan()) {
            if let Some((row, col, value)) = find_entry(m, false, |v| v + TOLERANCE < lower) {
                warn!(file, line, row, col, value, excess = value - lower, "Matrix entry violates lower bound");
                return false;
            }
        }

        if let Some(upper) = upper.filter(|v| !v.is_nan()) {
            if let Some((row, col, value)) = find_entry(m, false, |v| v > upper + TOLERANCE) {
                warn!(file, line, row, col, value, excess = value - upper, "Matrix entry violates upper bound");
                return false;
            }
        }

        true
    }

    /// Checks every element of `v` against the optional bounds.
    pub fn validate_vector(
        v: Option<&[f32]>,
        lower: Option<f32>,
        upper: Option<f32>,
        file: &str,
        line: u32,
    ) -> bool {
        let Some(v) = v else {
            return false;
        };

        if let Some(lower) = lower.filter(|b| !b.is_nan()) {
            if let Some((index, value)) = v.iter().copied().enumerate().find(|&(_, x)| x + TOLERANCE < lower) {
                warn!(file, line, index, value, "Vector entry violates lower bound");
                return false;
            }
        }

        if let Some(upper) = upper.filter(|b| !b.is_nan()) {
            if let Some((index, value)) = v.iter().copied().enumerate().find(|&(_, x)| x > upper + TOLERANCE) {
                warn!(file, line, index, value, "Vector entry violates upper bound");
                return false;
            }
        }

        true
    }

    /// Checks every element of `v` lies in `lower..=upper`.
    pub fn validate_ivector(v: Option<&[i32]>, lower: i32, upper: i32, file: &str, line: u32) -> bool {
        let Some(v) = v else {
            return false;
        };

        if let Some((index, value)) = v.iter().copied().enumerate().find(|&(_, x)| x < lower) {
            warn!(file, line, index, value, "Vector entry violates lower bound");
            return false;
        }
        if let Some((index, value)) = v.iter().copied().enumerate().find(|&(_, x)| x > upper) {
            warn!(file, line, index, value, "Vector entry violates upper bound");
            return false;
        }

        true
    }
}

#[cfg(not(any(debug_assertions, feature = "validation")))]
mod imp {
    use crate::matrix::Matrix;

    /// Always succeeds in this build.
    #[inline(always)]
    pub fn validate_matrix(
        _m: Option<&Matrix>,
        _lower: Option<f32>,
        _upper: Option<f32>,
        _mask: Option<f32>,
        _only_finite: bool,
        _file: &str,
        _line: u32,
    ) -> bool {
        true
    }

    /// Always succeeds in this build.
    #[inline(always)]
    pub fn validate_vector(
        _v: Option<&[f32]>,
        _lower: Option<f32>,
        _upper: Option<f32>,
        _file: &str,
        _line: u32,
    ) -> bool {
        true
    }

    /// Always succeeds in this build.
    #[inline(always)]
    pub fn validate_ivector(_v: Option<&[i32]>, _lower: i32, _upper: i32, _file: &str, _line: u32) -> bool {
        true
    }
}

pub use imp::*;
