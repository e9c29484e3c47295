//! Dense matrix checks and small helpers shared by the algorithms.
//!
//! Everything here works on `ndarray` views so callers keep ownership of
//! their inputs.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2, Axis};

/// Relative tolerance used by [`ensure_symmetric`].
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Fail unless `m` is square. Returns the vertex count.
pub fn ensure_square(m: ArrayView2<'_, f64>) -> Result<usize> {
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(Error::NotSquare { rows, cols });
    }
    Ok(rows)
}

/// Validate an adjacency matrix: square, finite, non-negative.
pub fn validate_adjacency(m: ArrayView2<'_, f64>) -> Result<usize> {
    let n = ensure_square(m)?;
    for ((row, col), &value) in m.indexed_iter() {
        if !value.is_finite() {
            return Err(Error::NonFinite { row, col });
        }
        if value < 0.0 {
            return Err(Error::NegativeEntry { row, col, value });
        }
    }
    Ok(n)
}

/// Validate a distance matrix: square, no NaN, non-negative.
///
/// `+inf` is accepted and means "unreachable".
pub fn validate_distances(m: ArrayView2<'_, f64>) -> Result<usize> {
    let n = ensure_square(m)?;
    for ((row, col), &value) in m.indexed_iter() {
        if value.is_nan() {
            return Err(Error::NonFinite { row, col });
        }
        if value < 0.0 {
            return Err(Error::NegativeEntry { row, col, value });
        }
    }
    Ok(n)
}

/// Fail unless `m[i,j]` and `m[j,i]` agree up to [`SYMMETRY_TOLERANCE`] (relative).
pub fn ensure_symmetric(m: ArrayView2<'_, f64>) -> Result<()> {
    let n = ensure_square(m)?;
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (m[[i, j]], m[[j, i]]);
            let scale = a.abs().max(b.abs()).max(1.0);
            if (a - b).abs() > SYMMETRY_TOLERANCE * scale {
                return Err(Error::NotSymmetric { row: i, col: j });
            }
        }
    }
    Ok(())
}

/// `1 <= k < n`, no clamping.
pub fn check_neighbor_count(k: usize, n: usize) -> Result<()> {
    if k == 0 || k >= n {
        return Err(Error::InvalidNeighborCount { k, n });
    }
    Ok(())
}

/// Largest entry, or `None` for an empty matrix.
pub fn max_entry(m: ArrayView2<'_, f64>) -> Option<f64> {
    m.iter().copied().reduce(f64::max)
}

/// First non-finite entry, if any.
pub fn find_non_finite(m: ArrayView2<'_, f64>) -> Option<(usize, usize)> {
    m.indexed_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(idx, _)| idx)
}

/// Divide every column by its sum.
pub fn column_normalize(m: &mut Array2<f64>) -> Result<()> {
    let sums = m.sum_axis(Axis(0));
    if let Some(col) = sums.iter().position(|&s| s <= 0.0 || !s.is_finite()) {
        return Err(Error::ZeroNormalization(format!(
            "column {col} sums to {}",
            sums[col]
        )));
    }
    *m /= &sums;
    Ok(())
}
