/* src/convert.rs */
//! Conversions between unpadded column-major arrays and padded matrices, plus
//! the human-readable diagnostic dump.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use std::io::Write;

use crate::error::{Result, SquiggleError};
use crate::matrix::{Lane, Matrix, PaddedMatrix};

/// Builds a padded matrix from `nr * nc` column-major scalars.
///
/// Padding rows keep the zero written by allocation.
pub fn from_flat_array<L: Lane>(x: &[L::Scalar], nr: usize, nc: usize) -> Result<PaddedMatrix<L>> {
    let expected = nr.saturating_mul(nc);
    if x.len() != expected {
        return Err(SquiggleError::LengthMismatch {
            expected,
            actual: x.len(),
        });
    }

    let mut m = PaddedMatrix::new(nr, nc)?;
    for (col, src) in x.chunks_exact(nr).enumerate() {
        m.column_mut(col).copy_from_slice(src);
    }
    Ok(m)
}

/// Unpadded column-major copy of the logical elements of `m`.
pub fn to_flat_array<L: Lane>(m: &PaddedMatrix<L>) -> Result<Vec<L::Scalar>> {
    let nelt = m.nr() * m.nc();
    let mut out = Vec::new();
    out.try_reserve_exact(nelt)
        .map_err(|_| SquiggleError::Allocation {
            bytes: nelt * std::mem::size_of::<L::Scalar>(),
        })?;
    for column in m.columns() {
        out.extend_from_slice(column);
    }
    Ok(out)
}

/// Renders `value` the way C's `% 12e` does: space for a positive sign, six
/// fractional digits and an exponent of at least two digits.
fn scientific(value: f32) -> String {
    let body = if value.is_nan() {
        " nan".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { " inf" } else { "-inf" };
        text.to_string()
    } else {
        let raw = format!("{value:.6e}");
        let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        let space = if value.is_sign_negative() { "" } else { " " };
        format!("{space}{mantissa}e{sign}{:02}", exponent.abs())
    };
    format!("{body:>12}")
}

/// Writes a column-major dump of `m`: an optional header line, then one line per
/// column holding the column index followed by its values.
///
/// `row_limit == 0`, or a limit beyond the available rows, shows every logical
/// row (every stored row when `include_padding` is set). `col_limit` clamps the
/// same way against the column count. Output is best-effort; write failures are
/// absorbed and leave `m` untouched.
pub fn format_matrix<W: Write>(
    out: &mut W,
    header: Option<&str>,
    m: &Matrix,
    row_limit: usize,
    col_limit: usize,
    include_padding: bool,
) {
    let _ = write_matrix(out, header, m, row_limit, col_limit, include_padding);
}

fn write_matrix<W: Write>(
    out: &mut W,
    header: Option<&str>,
    m: &Matrix,
    row_limit: usize,
    col_limit: usize,
    include_padding: bool,
) -> std::io::Result<()> {
    let rlim = if include_padding { m.stride() } else { m.nr() };
    let nr = if row_limit == 0 || row_limit > rlim { rlim } else { row_limit };
    let nc = if col_limit == 0 || col_limit > m.nc() { m.nc() } else { col_limit };

    if let Some(header) = header {
        writeln!(out, "{header}")?;
    }
    let data = m.as_slice();
    for col in 0..nc {
        let column = &data[col * m.stride()..col * m.stride() + nr];
        write!(out, "{col:4} : {}", scientific(column[0]))?;
        for &value in &column[1..] {
            write!(out, "  {}", scientific(value))?;
        }
        writeln!(out)?;
    }
    Ok(())
}
