//! The binary, symmetric weight matrix handed to the layout optimizer.
//!
//! `W[i,j] = 1` means "i and j pull on each other during layout". The matrix
//! is symmetric with a zero diagonal by construction: the only way to set an
//! entry is [`WeightMatrix::link`], which writes both directions and refuses
//! self-pairs.

use crate::algo::diffusion::DiffusionConfig;
use crate::algo::topk;
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2};

/// Symmetric 0/1 matrix with zero diagonal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightMatrix {
    data: Array2<u8>,
}

impl WeightMatrix {
    /// All-zero matrix over `n` vertices.
    pub fn zeros(n: usize) -> Self {
        Self {
            data: Array2::zeros((n, n)),
        }
    }

    /// Build from unordered pairs; duplicates and reversed duplicates collapse.
    ///
    /// # Errors
    ///
    /// A pair referencing a vertex `>= n`, or a self-pair `(i, i)`.
    pub fn from_pairs(n: usize, pairs: impl IntoIterator<Item = (usize, usize)>) -> Result<Self> {
        let mut w = Self::zeros(n);
        for (i, j) in pairs {
            if i >= n || j >= n {
                return Err(Error::DimensionMismatch {
                    expected: n,
                    got: i.max(j) + 1,
                });
            }
            if i == j {
                return Err(Error::InvalidParameter(format!(
                    "self-pair ({i}, {i}) in weight matrix"
                )));
            }
            w.link(i, j);
        }
        Ok(w)
    }

    /// Mark `i` and `j` as mutual neighbors. Self-pairs are ignored.
    pub(crate) fn link(&mut self, i: usize, j: usize) {
        if i != j {
            self.data[[i, j]] = 1;
            self.data[[j, i]] = 1;
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.data[[i, j]] != 0
    }

    /// Post-symmetrization degree of `vertex`.
    pub fn degree(&self, vertex: usize) -> usize {
        self.data.row(vertex).iter().filter(|&&x| x != 0).count()
    }

    /// Neighbors of `vertex`, ascending.
    pub fn neighbors(&self, vertex: usize) -> Vec<usize> {
        self.data
            .row(vertex)
            .iter()
            .enumerate()
            .filter(|(_, &x)| x != 0)
            .map(|(j, _)| j)
            .collect()
    }

    /// Unordered edges `(i, j)` with `i < j`, in row-major order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let n = self.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if self.data[[i, j]] != 0 {
                    out.push((i, j));
                }
            }
        }
        out
    }

    pub fn edge_count(&self) -> usize {
        self.data.iter().filter(|&&x| x != 0).count() / 2
    }

    pub fn is_symmetric(&self) -> bool {
        self.data == self.data.t()
    }

    pub fn has_zero_diagonal(&self) -> bool {
        self.data.diag().iter().all(|&x| x == 0)
    }

    pub fn as_array(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }

    pub fn into_array(self) -> Array2<u8> {
        self.data
    }

    /// As `f64` (what most optimizers multiply with).
    pub fn to_f64(&self) -> Array2<f64> {
        self.data.mapv(f64::from)
    }
}

/// Weight matrix from an affinity matrix (top-k with zero-score early exit).
pub fn affinity_weights(affinity: ArrayView2<'_, f64>, k: usize) -> Result<WeightMatrix> {
    Ok(topk::select_by_affinity(affinity, k)?.to_weights())
}

/// Weight matrix from the `k` nearest vertices by distance.
pub fn k_nearest_weights(distances: ArrayView2<'_, f64>, k: usize) -> Result<WeightMatrix> {
    Ok(topk::select_k_nearest(distances, k)?.to_weights())
}

/// Weight matrix from diffusion scores, materialized through the pair set.
pub fn diffusion_weights(
    distances: ArrayView2<'_, f64>,
    config: &DiffusionConfig,
) -> Result<WeightMatrix> {
    Ok(topk::select_by_diffusion(distances, config)?.to_weights_via_pairs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_pairs_symmetric() {
        let w = WeightMatrix::from_pairs(4, [(0, 1), (1, 0), (2, 3)]).unwrap();
        assert!(w.is_symmetric());
        assert!(w.has_zero_diagonal());
        assert_eq!(w.edge_count(), 2);
        assert_eq!(w.edges(), vec![(0, 1), (2, 3)]);
        assert_eq!(w.neighbors(1), vec![0]);
        assert_eq!(w.degree(2), 1);
    }

    #[test]
    fn test_from_pairs_rejects_bad_pairs() {
        assert!(matches!(
            WeightMatrix::from_pairs(3, [(0, 3)]),
            Err(Error::DimensionMismatch { expected: 3, got: 4 })
        ));
        assert!(matches!(
            WeightMatrix::from_pairs(3, [(1, 1)]),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_link_ignores_self() {
        let mut w = WeightMatrix::zeros(2);
        w.link(1, 1);
        assert_eq!(w.edge_count(), 0);
        assert!(w.has_zero_diagonal());
    }

    #[test]
    fn test_affinity_weights_symmetrizes() {
        // 0 picks 1; 2 picks 1; 1 picks 0. Vertex 1 ends with degree 2 > k.
        let aff = array![[0.0, 3.0, 1.0], [3.0, 0.0, 2.0], [1.0, 2.0, 0.0]];
        let w = affinity_weights(aff.view(), 1).unwrap();
        assert!(w.contains(0, 1) && w.contains(1, 0));
        assert!(w.contains(2, 1) && w.contains(1, 2));
        assert!(!w.contains(0, 2));
        assert_eq!(w.degree(1), 2);
    }

    #[test]
    fn test_to_f64() {
        let w = WeightMatrix::from_pairs(2, [(0, 1)]).unwrap();
        assert_eq!(w.to_f64(), array![[0.0, 1.0], [1.0, 0.0]]);
    }
}
