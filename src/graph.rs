//! Adapters from graph representations to dense adjacency matrices.

use crate::error::{Error, Result};
use ndarray::Array2;
use petgraph::graph::IndexType;
use petgraph::visit::EdgeRef;
use petgraph::EdgeType;

/// Anything that can produce a dense n×n adjacency matrix.
///
/// Vertex `i` of the matrix must be vertex `i` of whatever distance matrix
/// the caller pairs it with.
pub trait AdjacencySource {
    fn vertex_count(&self) -> usize;

    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if the source cannot form an n×n matrix.
    fn adjacency(&self) -> Result<Array2<f64>>;
}

impl AdjacencySource for Array2<f64> {
    fn vertex_count(&self) -> usize {
        self.nrows()
    }

    fn adjacency(&self) -> Result<Array2<f64>> {
        Ok(self.clone())
    }
}

/// Borrowed row-major adjacency (`rows[i][j]` = weight of i→j).
pub struct AdjacencyMatrix<'a>(pub &'a [Vec<f64>]);

impl AdjacencySource for AdjacencyMatrix<'_> {
    fn vertex_count(&self) -> usize {
        self.0.len()
    }

    /// Every row must have exactly `n` entries.
    fn adjacency(&self) -> Result<Array2<f64>> {
        let n = self.0.len();
        if let Some(row) = self.0.iter().find(|row| row.len() != n) {
            return Err(Error::DimensionMismatch {
                expected: n,
                got: row.len(),
            });
        }
        let flat: Vec<f64> = self.0.iter().flatten().copied().collect();
        let len = flat.len();
        Array2::from_shape_vec((n, n), flat).map_err(|_| Error::DimensionMismatch {
            expected: n * n,
            got: len,
        })
    }
}

/// Unit weight per edge. Undirected edges are mirrored; parallel edges add up.
impl<N, E, Ty, Ix> AdjacencySource for petgraph::Graph<N, E, Ty, Ix>
where
    Ty: EdgeType,
    Ix: IndexType,
{
    fn vertex_count(&self) -> usize {
        self.node_count()
    }

    fn adjacency(&self) -> Result<Array2<f64>> {
        let n = self.node_count();
        let mut a = Array2::zeros((n, n));
        for edge in self.edge_references() {
            let (s, t) = (edge.source().index(), edge.target().index());
            a[[s, t]] += 1.0;
            if !self.is_directed() && s != t {
                a[[t, s]] += 1.0;
            }
        }
        Ok(a)
    }
}
