//! Per-vertex top-k selection.
//!
//! Three selectors, one output shape: a [`NeighborSelection`] holding, for
//! every vertex, the partners it picked itself. Symmetrization happens when
//! the selection is turned into a [`WeightMatrix`].
//!
//! | Selector | Input | Order | Early exit |
//! |----------|-------|-------|------------|
//! | [`select_by_affinity`] | affinity | descending | first score <= 0 |
//! | [`select_k_nearest`] | distances | ascending | none, k always filled |
//! | [`select_by_diffusion`] | distances | descending diffusion score | none |
//!
//! Ties are broken by ascending vertex index in all three, so output never
//! depends on sort stability.

use super::diffusion::{diffusion_scores, DiffusionConfig};
use crate::error::Result;
use crate::matrix;
use crate::weights::WeightMatrix;
use ndarray::{ArrayView1, ArrayView2};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Partners each vertex selected, before symmetrization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborSelection {
    k: usize,
    picks: Vec<Vec<usize>>,
}

impl NeighborSelection {
    fn new(k: usize, picks: Vec<Vec<usize>>) -> Self {
        Self { k, picks }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    /// The `k` the selection was made with.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Partners picked by `vertex`, best first.
    pub fn picks(&self, vertex: usize) -> &[usize] {
        &self.picks[vertex]
    }

    /// How many partners `vertex` picked itself (<= k).
    pub fn own_count(&self, vertex: usize) -> usize {
        self.picks[vertex].len()
    }

    /// Total number of (vertex, partner) picks.
    pub fn total(&self) -> usize {
        self.picks.iter().map(Vec::len).sum()
    }

    /// Unordered pairs `(min, max)`. A pair picked from both ends appears once.
    pub fn pairs(&self) -> BTreeSet<(usize, usize)> {
        self.picks
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |&j| (i.min(j), i.max(j))))
            .collect()
    }

    /// Symmetric weight matrix: every pick sets both `(i, j)` and `(j, i)`.
    pub fn to_weights(&self) -> WeightMatrix {
        let mut w = WeightMatrix::zeros(self.len());
        for (i, row) in self.picks.iter().enumerate() {
            for &j in row {
                w.link(i, j);
            }
        }
        w
    }

    /// Same result as [`Self::to_weights`], built from the deduplicated pair set.
    pub fn to_weights_via_pairs(&self) -> WeightMatrix {
        let mut w = WeightMatrix::zeros(self.len());
        for (i, j) in self.pairs() {
            w.link(i, j);
        }
        w
    }
}

/// Vertices ordered by descending score, ties by ascending index.
pub fn rank_descending(row: ArrayView1<'_, f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..row.len()).collect();
    order.sort_by(|&a, &b| row[b].total_cmp(&row[a]).then(a.cmp(&b)));
    order
}

/// Vertices ordered by ascending value, ties by ascending index.
pub fn rank_ascending(row: ArrayView1<'_, f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..row.len()).collect();
    order.sort_by(|&a, &b| row[a].total_cmp(&row[b]).then(a.cmp(&b)));
    order
}

/// Top-k by affinity, stopping a row at the first non-positive score.
///
/// For vertex `i`, the `k + 1` best candidates are scanned in order (the
/// extra slot leaves room for `i` itself, which usually ranks first). A
/// score `<= 0` ends the row: no relationship, nothing is picked just to
/// fill slots. `i` itself is skipped. At most `k` partners are kept.
///
/// # Errors
///
/// Non-square affinity, NaN entries, or `k` outside `1..n`.
#[tracing::instrument(skip(affinity), fields(n = affinity.nrows()))]
pub fn select_by_affinity(affinity: ArrayView2<'_, f64>, k: usize) -> Result<NeighborSelection> {
    let n = matrix::ensure_square(affinity)?;
    matrix::check_neighbor_count(k, n)?;
    if let Some((row, col)) = affinity
        .indexed_iter()
        .find(|(_, v)| v.is_nan())
        .map(|(idx, _)| idx)
    {
        return Err(crate::Error::NonFinite { row, col });
    }

    let mut picks = Vec::with_capacity(n);
    for (i, row) in affinity.rows().into_iter().enumerate() {
        let mut chosen = Vec::with_capacity(k);
        for v in rank_descending(row).into_iter().take(k + 1) {
            if row[v] <= 0.0 {
                break;
            }
            if v == i {
                continue;
            }
            chosen.push(v);
            if chosen.len() == k {
                break;
            }
        }
        if chosen.is_empty() {
            warn!(vertex = i, "no positive affinity, vertex selects no neighbors");
        }
        picks.push(chosen);
    }

    let selection = NeighborSelection::new(k, picks);
    debug!(picks = selection.total(), "affinity selection done");
    Ok(selection)
}

/// The `k` nearest vertices by distance, excluding the vertex itself.
///
/// Every row gets exactly `k` partners, however far they are.
///
/// # Errors
///
/// Malformed distances (see [`matrix::validate_distances`]) or `k` outside `1..n`.
#[tracing::instrument(skip(distances), fields(n = distances.nrows()))]
pub fn select_k_nearest(distances: ArrayView2<'_, f64>, k: usize) -> Result<NeighborSelection> {
    let n = matrix::validate_distances(distances)?;
    matrix::check_neighbor_count(k, n)?;

    let picks = distances
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            rank_ascending(row)
                .into_iter()
                .filter(|&j| j != i)
                .take(k)
                .collect()
        })
        .collect();

    Ok(NeighborSelection::new(k, picks))
}

/// Top-k by diffusion score, excluding the vertex itself.
///
/// Scores come from [`diffusion_scores`]. Use
/// [`NeighborSelection::to_weights_via_pairs`] to materialize through the
/// deduplicated pair set.
///
/// # Errors
///
/// Invalid config, malformed distances, `k` outside `1..n`, or a numerical
/// failure while building the kernel.
#[tracing::instrument(skip(distances, config), fields(n = distances.nrows(), k = config.k))]
pub fn select_by_diffusion(
    distances: ArrayView2<'_, f64>,
    config: &DiffusionConfig,
) -> Result<NeighborSelection> {
    let n = matrix::validate_distances(distances)?;
    matrix::check_neighbor_count(config.k, n)?;
    let scores = diffusion_scores(distances, config)?;

    let picks = scores
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            rank_descending(row)
                .into_iter()
                .filter(|&j| j != i)
                .take(config.k)
                .collect()
        })
        .collect();

    Ok(NeighborSelection::new(config.k, picks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use ndarray::{array, Array2};

    #[test]
    fn test_rank_ties_by_index() {
        let row = array![1.0, 3.0, 3.0, 0.0];
        assert_eq!(rank_descending(row.view()), vec![1, 2, 0, 3]);
        assert_eq!(rank_ascending(row.view()), vec![3, 0, 1, 2]);
    }

    #[test]
    fn test_affinity_skips_self() {
        // Self-affinity dominates every row.
        let aff = array![[9.0, 2.0, 1.0], [2.0, 9.0, 1.0], [1.0, 1.0, 9.0]];
        let sel = select_by_affinity(aff.view(), 1).unwrap();
        assert_eq!(sel.picks(0), &[1]);
        assert_eq!(sel.picks(1), &[0]);
        // Tie between 0 and 1: lower index wins.
        assert_eq!(sel.picks(2), &[0]);
    }

    #[test]
    fn test_affinity_caps_at_k_when_self_not_in_top() {
        // Vertex 0 has zero self-affinity, so k + 1 candidates are all others.
        let aff = array![
            [0.0, 4.0, 3.0, 2.0],
            [4.0, 0.0, 1.0, 1.0],
            [3.0, 1.0, 0.0, 1.0],
            [2.0, 1.0, 1.0, 0.0]
        ];
        let sel = select_by_affinity(aff.view(), 2).unwrap();
        assert_eq!(sel.picks(0), &[1, 2]);
        for i in 0..4 {
            assert!(sel.own_count(i) <= 2);
        }
    }

    #[test]
    fn test_affinity_zero_stops_row() {
        let aff = array![[1.0, 0.5, 0.0], [0.5, 1.0, 0.0], [0.0, 0.0, 0.0]];
        let sel = select_by_affinity(aff.view(), 2).unwrap();
        assert_eq!(sel.picks(0), &[1]);
        assert!(sel.picks(2).is_empty());
    }

    #[test]
    fn test_affinity_vertex_zero_is_selectable() {
        let aff = array![[0.0, 5.0, 1.0], [5.0, 0.0, 1.0], [5.0, 1.0, 0.0]];
        let sel = select_by_affinity(aff.view(), 1).unwrap();
        assert_eq!(sel.picks(1), &[0]);
        assert_eq!(sel.picks(2), &[0]);
    }

    #[test]
    fn test_affinity_rejects_nan_and_bad_k() {
        let aff = array![[0.0, f64::NAN], [1.0, 0.0]];
        assert!(matches!(
            select_by_affinity(aff.view(), 1),
            Err(Error::NonFinite { .. })
        ));

        let ok = array![[0.0, 1.0], [1.0, 0.0]];
        assert!(matches!(
            select_by_affinity(ok.view(), 2),
            Err(Error::InvalidNeighborCount { k: 2, n: 2 })
        ));
        assert!(select_by_affinity(ok.view(), 0).is_err());
    }

    #[test]
    fn test_k_nearest_fills_k() {
        let d = array![
            [0.0, 1.0, 100.0, 1000.0],
            [1.0, 0.0, 2.0, 1000.0],
            [100.0, 2.0, 0.0, 1000.0],
            [1000.0, 1000.0, 1000.0, 0.0]
        ];
        let sel = select_k_nearest(d.view(), 2).unwrap();
        assert_eq!(sel.picks(0), &[1, 2]);
        assert_eq!(sel.picks(3), &[0, 1]);
        assert_eq!(sel.total(), 8);
    }

    #[test]
    fn test_k_nearest_excludes_self_on_zero_ties() {
        // Vertex 1 sits at distance 0 from vertex 0 (duplicate position).
        let d = array![[0.0, 0.0, 3.0], [0.0, 0.0, 3.0], [3.0, 3.0, 0.0]];
        let sel = select_k_nearest(d.view(), 1).unwrap();
        assert_eq!(sel.picks(0), &[1]);
        assert_eq!(sel.picks(1), &[0]);
    }

    #[test]
    fn test_pairs_dedup() {
        let d = Array2::from_shape_fn((4, 4), |(i, j)| (i as f64 - j as f64).abs());
        let sel = select_k_nearest(d.view(), 1).unwrap();
        // 0->1, 1->0, 2->1, 3->2 : {(0,1), (1,2), (2,3)}
        let pairs: Vec<_> = sel.pairs().into_iter().collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(sel.to_weights(), sel.to_weights_via_pairs());
    }

    #[test]
    fn test_diffusion_prefers_close_vertices() {
        let d = Array2::from_shape_fn((6, 6), |(i, j)| (i as f64 - j as f64).abs());
        let config = DiffusionConfig::default().with_k(2);
        let sel = select_by_diffusion(d.view(), &config).unwrap();
        assert_eq!(sel.picks(0), &[1, 2]);
        let mut mid = sel.picks(3).to_vec();
        mid.sort_unstable();
        assert_eq!(mid, vec![2, 4]);
    }

    #[test]
    fn test_diffusion_k_validated() {
        let d = Array2::from_shape_fn((3, 3), |(i, j)| (i as f64 - j as f64).abs());
        let config = DiffusionConfig::default();
        assert!(matches!(
            select_by_diffusion(d.view(), &config),
            Err(Error::InvalidNeighborCount { k: 20, n: 3 })
        ));
    }
}
