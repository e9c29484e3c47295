//! Symmetric eigendecomposition: A = Q Λ Qᵀ.
//!
//! # Algorithm
//!
//! 1. Householder reduction of A to tridiagonal form, accumulating the
//!    orthogonal transform (`tridiagonalize`).
//! 2. Implicit QL iteration with Wilkinson-style shifts on the tridiagonal
//!    matrix, rotating the accumulated transform along (`ql_implicit`).
//!
//! Both steps are O(n³) with small constants, so one decomposition is far
//! cheaper than `a` dense matrix products once `a` grows past a few.
//!
//! Eigenvalues come back in ascending order; eigenvectors are the columns of
//! `vectors` and form an orthonormal basis.
//!
//! # References
//!
//! - Wilkinson & Reinsch (1971). "Handbook for Automatic Computation, Vol. II:
//!   Linear Algebra" (procedures tred2 / tql2)
//! - Golub & Van Loan (2013). "Matrix Computations", §8.3

use crate::error::{Error, Result};
use crate::matrix;
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// QL sweeps allowed per eigenvalue before giving up.
pub const MAX_QL_ITERATIONS: usize = 30;

/// Eigenvalues and eigenvectors of a real symmetric matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues, ascending.
    pub values: Array1<f64>,
    /// Orthonormal eigenvectors, one per column, matching `values`.
    pub vectors: Array2<f64>,
}

impl SymmetricEigen {
    /// Decompose a symmetric matrix.
    ///
    /// Only symmetry up to [`matrix::SYMMETRY_TOLERANCE`] is checked; the
    /// lower triangle is what the reduction actually reads.
    pub fn new(a: ArrayView2<'_, f64>) -> Result<Self> {
        Self::with_iteration_cap(a, MAX_QL_ITERATIONS)
    }

    /// [`Self::new`] with `max_iterations` QL sweeps allowed per eigenvalue.
    pub(crate) fn with_iteration_cap(a: ArrayView2<'_, f64>, max_iterations: usize) -> Result<Self> {
        let n = matrix::ensure_square(a)?;
        if let Some((row, col)) = matrix::find_non_finite(a) {
            return Err(Error::NonFinite { row, col });
        }
        matrix::ensure_symmetric(a)?;

        if n == 0 {
            return Ok(Self {
                values: Array1::zeros(0),
                vectors: Array2::zeros((0, 0)),
            });
        }

        let mut v = a.to_owned();
        let mut d = vec![0.0; n];
        let mut e = vec![0.0; n];

        tridiagonalize(&mut v, &mut d, &mut e);
        ql_implicit(&mut v, &mut d, &mut e, max_iterations)?;
        sort_ascending(&mut v, &mut d);

        Ok(Self {
            values: Array1::from_vec(d),
            vectors: v,
        })
    }

    /// Number of rows/columns of the decomposed matrix.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Q · diag(`spectrum`) · Qᵀ for a replacement spectrum.
    ///
    /// # Panics
    ///
    /// If `spectrum.len()` differs from [`Self::dim`].
    pub fn compose(&self, spectrum: &Array1<f64>) -> Array2<f64> {
        assert_eq!(spectrum.len(), self.dim(), "spectrum length mismatch");
        // Scale column j of Q by spectrum[j], then multiply by Qᵀ.
        let scaled = &self.vectors * &spectrum.view().insert_axis(Axis(0));
        scaled.dot(&self.vectors.t())
    }

    /// Q f(Λ) Qᵀ.
    pub fn map_spectrum(&self, f: impl Fn(f64) -> f64) -> Array2<f64> {
        self.compose(&self.values.mapv(f))
    }

    /// Q Λ Qᵀ (should reproduce the input up to rounding).
    pub fn reconstruct(&self) -> Array2<f64> {
        self.map_spectrum(|x| x)
    }
}

/// Householder tridiagonalization (tred2).
///
/// On return `d` holds the diagonal, `e[1..]` the sub-diagonal (`e[0] = 0`)
/// and `v` the accumulated orthogonal transform.
fn tridiagonalize(v: &mut Array2<f64>, d: &mut [f64], e: &mut [f64]) {
    let n = d.len();

    for j in 0..n {
        d[j] = v[[n - 1, j]];
    }

    for i in (1..n).rev() {
        let mut scale = 0.0;
        let mut h = 0.0;
        for dk in d.iter().take(i) {
            scale += dk.abs();
        }

        if scale == 0.0 {
            e[i] = d[i - 1];
            for j in 0..i {
                d[j] = v[[i - 1, j]];
                v[[i, j]] = 0.0;
                v[[j, i]] = 0.0;
            }
        } else {
            // Generate Householder vector.
            for dk in d.iter_mut().take(i) {
                *dk /= scale;
                h += *dk * *dk;
            }
            let mut f = d[i - 1];
            let mut g = h.sqrt();
            if f > 0.0 {
                g = -g;
            }
            e[i] = scale * g;
            h -= f * g;
            d[i - 1] = f - g;
            for ej in e.iter_mut().take(i) {
                *ej = 0.0;
            }

            // Apply similarity transformation to remaining columns.
            for j in 0..i {
                f = d[j];
                v[[j, i]] = f;
                g = e[j] + v[[j, j]] * f;
                for k in (j + 1)..i {
                    g += v[[k, j]] * d[k];
                    e[k] += v[[k, j]] * f;
                }
                e[j] = g;
            }
            f = 0.0;
            for j in 0..i {
                e[j] /= h;
                f += e[j] * d[j];
            }
            let hh = f / (h + h);
            for j in 0..i {
                e[j] -= hh * d[j];
            }
            for j in 0..i {
                f = d[j];
                g = e[j];
                for k in j..i {
                    v[[k, j]] -= f * e[k] + g * d[k];
                }
                d[j] = v[[i - 1, j]];
                v[[i, j]] = 0.0;
            }
        }
        d[i] = h;
    }

    // Accumulate transformations.
    for i in 0..(n - 1) {
        v[[n - 1, i]] = v[[i, i]];
        v[[i, i]] = 1.0;
        let h = d[i + 1];
        if h != 0.0 {
            for k in 0..=i {
                d[k] = v[[k, i + 1]] / h;
            }
            for j in 0..=i {
                let mut g = 0.0;
                for k in 0..=i {
                    g += v[[k, i + 1]] * v[[k, j]];
                }
                for k in 0..=i {
                    v[[k, j]] -= g * d[k];
                }
            }
        }
        for k in 0..=i {
            v[[k, i + 1]] = 0.0;
        }
    }
    for j in 0..n {
        d[j] = v[[n - 1, j]];
        v[[n - 1, j]] = 0.0;
    }
    v[[n - 1, n - 1]] = 1.0;
    e[0] = 0.0;
}

/// Implicit QL on the tridiagonal form (tql2).
fn ql_implicit(
    v: &mut Array2<f64>,
    d: &mut [f64],
    e: &mut [f64],
    max_iterations: usize,
) -> Result<()> {
    let n = d.len();

    for i in 1..n {
        e[i - 1] = e[i];
    }
    e[n - 1] = 0.0;

    let mut f = 0.0;
    let mut tst1: f64 = 0.0;
    let eps = f64::EPSILON;

    for l in 0..n {
        // Find small sub-diagonal element. e[n-1] == 0 bounds the scan.
        tst1 = tst1.max(d[l].abs() + e[l].abs());
        let mut m = l;
        while m < n - 1 && e[m].abs() > eps * tst1 {
            m += 1;
        }

        if m > l {
            let mut iterations = 0;
            loop {
                iterations += 1;
                if iterations > max_iterations {
                    return Err(Error::NoConvergence {
                        index: l,
                        iterations: max_iterations,
                    });
                }

                // Compute implicit shift.
                let mut g = d[l];
                let mut p = (d[l + 1] - g) / (2.0 * e[l]);
                let mut r = p.hypot(1.0);
                if p < 0.0 {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let mut h = g - d[l];
                for di in d.iter_mut().skip(l + 2) {
                    *di -= h;
                }
                f += h;

                // Implicit QL transformation.
                p = d[m];
                let mut c = 1.0;
                let mut c2 = c;
                let mut c3 = c;
                let el1 = e[l + 1];
                let mut s = 0.0;
                let mut s2 = 0.0;
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    g = c * e[i];
                    h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);

                    for k in 0..n {
                        let vk1 = v[[k, i + 1]];
                        let vk = v[[k, i]];
                        v[[k, i + 1]] = s * vk + c * vk1;
                        v[[k, i]] = c * vk - s * vk1;
                    }
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                if !p.is_finite() || !d[l].is_finite() {
                    return Err(Error::Numerical(format!(
                        "non-finite value during QL iteration for eigenvalue {l}"
                    )));
                }
                if e[l].abs() <= eps * tst1 {
                    break;
                }
            }
        }
        d[l] += f;
        e[l] = 0.0;
    }
    Ok(())
}

/// Selection sort on eigenvalues, swapping eigenvector columns along.
fn sort_ascending(v: &mut Array2<f64>, d: &mut [f64]) {
    let n = d.len();
    for i in 0..n.saturating_sub(1) {
        let mut k = i;
        for j in (i + 1)..n {
            if d[j] < d[k] {
                k = j;
            }
        }
        if k != i {
            d.swap(i, k);
            for row in 0..n {
                let tmp = v[[row, i]];
                v[[row, i]] = v[[row, k]];
                v[[row, k]] = tmp;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_eigen_diagonal() {
        let a = array![[3.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]];
        let eig = SymmetricEigen::new(a.view()).unwrap();

        let values: Vec<f64> = eig.values.to_vec();
        for (got, want) in values.iter().zip([1.0, 2.0, 3.0]) {
            assert!((got - want).abs() < 1e-12, "got {values:?}");
        }
    }

    #[test]
    fn test_eigen_path_graph() {
        // Path P3: eigenvalues -√2, 0, √2
        let a = array![[0.0, 1.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        let eig = SymmetricEigen::new(a.view()).unwrap();

        let s2 = 2.0_f64.sqrt();
        assert!((eig.values[0] + s2).abs() < 1e-10);
        assert!(eig.values[1].abs() < 1e-10);
        assert!((eig.values[2] - s2).abs() < 1e-10);
    }

    #[test]
    fn test_eigen_reconstruct() {
        let a = array![
            [4.0, 1.0, 2.0, 0.5],
            [1.0, 3.0, 0.0, 1.0],
            [2.0, 0.0, 5.0, 1.5],
            [0.5, 1.0, 1.5, 2.0]
        ];
        let eig = SymmetricEigen::new(a.view()).unwrap();
        let diff = max_abs_diff(&eig.reconstruct(), &a);
        assert!(diff < 1e-10, "reconstruction error {diff}");
    }

    #[test]
    fn test_eigenvectors_orthonormal() {
        let a = array![[2.0, 1.0, 1.0], [1.0, 2.0, 1.0], [1.0, 1.0, 2.0]];
        let eig = SymmetricEigen::new(a.view()).unwrap();

        let qtq = eig.vectors.t().dot(&eig.vectors);
        let diff = max_abs_diff(&qtq, &Array2::eye(3));
        assert!(diff < 1e-10, "QᵀQ deviates from I by {diff}");
    }

    #[test]
    fn test_eigen_repeated_eigenvalues() {
        // K4 adjacency: eigenvalues -1 (x3), 3
        let mut a = Array2::<f64>::ones((4, 4));
        a.diag_mut().fill(0.0);
        let eig = SymmetricEigen::new(a.view()).unwrap();

        for &x in eig.values.iter().take(3) {
            assert!((x + 1.0).abs() < 1e-10, "expected -1, got {x}");
        }
        assert!((eig.values[3] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_eigen_single_and_empty() {
        let one = array![[7.0]];
        let eig = SymmetricEigen::new(one.view()).unwrap();
        assert_eq!(eig.dim(), 1);
        assert!((eig.values[0] - 7.0).abs() < 1e-12);
        assert!((eig.vectors[[0, 0]].abs() - 1.0).abs() < 1e-12);

        let empty = Array2::<f64>::zeros((0, 0));
        assert_eq!(SymmetricEigen::new(empty.view()).unwrap().dim(), 0);
    }

    #[test]
    fn test_eigen_rejects_asymmetric() {
        let a = array![[0.0, 1.0], [0.0, 0.0]];
        assert!(matches!(
            SymmetricEigen::new(a.view()),
            Err(Error::NotSymmetric { .. })
        ));
    }

    #[test]
    fn test_iteration_cap_reports_no_convergence() {
        let p3 = array![[0.0, 1.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        let err = SymmetricEigen::with_iteration_cap(p3.view(), 0).unwrap_err();
        assert_eq!(err, Error::NoConvergence { index: 0, iterations: 0 });
        assert!(err.is_numerical());

        // Already diagonal: no sweep needed, so even a zero cap succeeds.
        let diag = array![[2.0, 0.0], [0.0, -1.0]];
        let eig = SymmetricEigen::with_iteration_cap(diag.view(), 0).unwrap();
        assert_eq!(eig.values.to_vec(), vec![-1.0, 2.0]);
    }

    #[test]
    fn test_map_spectrum_squares() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        let eig = SymmetricEigen::new(a.view()).unwrap();
        let squared = eig.map_spectrum(|x| x * x);
        let diff = max_abs_diff(&squared, &a.dot(&a));
        assert!(diff < 1e-10, "Q Λ² Qᵀ vs A² differ by {diff}");
    }
}
