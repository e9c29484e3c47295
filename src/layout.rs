//! Orchestration: from a graph and its distances to an optimizer-ready pair.
//!
//! The layout itself is computed elsewhere. This module builds the weight
//! matrix with the configured scheme, checks that it lines up with the
//! distance matrix, and hands both to a [`LayoutOptimizer`].
//!
//! # Example
//!
//! ```
//! use l2g::layout::{l2g, L2gConfig, LayoutOptimizer};
//! use l2g::{Result, WeightMatrix};
//! use ndarray::{Array2, ArrayView2};
//! use petgraph::graph::UnGraph;
//!
//! /// Places every vertex on a line at its index.
//! struct OnALine;
//!
//! impl LayoutOptimizer for OnALine {
//!     fn optimize(&self, d: ArrayView2<'_, f64>, _w: &WeightMatrix, _alpha: f64) -> Result<Array2<f64>> {
//!         Ok(Array2::from_shape_fn((d.nrows(), 2), |(i, c)| if c == 0 { i as f64 } else { 0.0 }))
//!     }
//! }
//!
//! let g = UnGraph::<(), ()>::from_edges(&[(0, 1), (1, 2), (2, 3), (3, 0)]);
//! let d = ndarray::array![
//!     [0.0, 1.0, 2.0, 1.0],
//!     [1.0, 0.0, 1.0, 2.0],
//!     [2.0, 1.0, 0.0, 1.0],
//!     [1.0, 2.0, 1.0, 0.0]
//! ];
//! let config = L2gConfig::default().with_k(2).with_walk_length(3);
//! let coords = l2g(&g, d.view(), &config, &OnALine).unwrap();
//! assert_eq!(coords.nrows(), 4);
//! ```

use crate::algo::affinity::{compute_affinity, AffinityConfig, AffinityMethod};
use crate::algo::diffusion::DiffusionConfig;
use crate::algo::topk;
use crate::error::{Error, Result};
use crate::graph::AdjacencySource;
use crate::matrix;
use crate::weights::WeightMatrix;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for [`find_neighbors`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborConfig {
    /// Partners selected per vertex (before symmetrization).
    pub k: usize,
    /// How the walk affinity is computed.
    pub affinity: AffinityConfig,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            k: 5,
            affinity: AffinityConfig::default(),
        }
    }
}

impl NeighborConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_walk_length(mut self, walk_length: usize) -> Self {
        self.affinity.walk_length = walk_length;
        self
    }

    pub fn with_method(mut self, method: AffinityMethod) -> Self {
        self.affinity.method = Some(method);
        self
    }
}

/// Walk-based weight matrix: affinity, then top-k with zero-score early exit.
#[tracing::instrument(skip(adjacency, config), fields(n = adjacency.nrows(), k = config.k))]
pub fn find_neighbors(
    adjacency: ArrayView2<'_, f64>,
    config: &NeighborConfig,
) -> Result<WeightMatrix> {
    let n = matrix::validate_adjacency(adjacency)?;
    matrix::check_neighbor_count(config.k, n)?;
    let affinity = compute_affinity(adjacency, &config.affinity)?;
    let weights = topk::select_by_affinity(affinity.view(), config.k)?.to_weights();
    debug!(edges = weights.edge_count(), "walk neighbors selected");
    Ok(weights)
}

/// Which selector builds the weight matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// Walk affinity over the adjacency matrix.
    #[default]
    Walks,
    /// Plain k nearest by shortest-path distance.
    KNearest,
    /// Diffusion over the distance matrix. The config's `k` is replaced by
    /// [`L2gConfig::k`].
    Diffusion(DiffusionConfig),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct L2gConfig {
    /// Neighbors selected per vertex (default: 5).
    pub k: usize,
    /// Walk bound `a` (default: 10).
    pub walk_length: usize,
    /// Repulsion strength passed to the optimizer; higher spreads more (default: 0.6).
    pub alpha: f64,
    /// Weight scheme (default: walks).
    pub scheme: WeightScheme,
    /// Power-series decay for the walk scheme (default: 0.1).
    pub power_decay: f64,
    /// Vertex count above which the walk scheme goes spectral (default: 1000).
    pub spectral_threshold: usize,
}

impl Default for L2gConfig {
    fn default() -> Self {
        Self {
            k: 5,
            walk_length: 10,
            alpha: 0.6,
            scheme: WeightScheme::Walks,
            power_decay: crate::algo::affinity::DEFAULT_POWER_DECAY,
            spectral_threshold: crate::algo::affinity::DEFAULT_SPECTRAL_THRESHOLD,
        }
    }
}

impl L2gConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_walk_length(mut self, walk_length: usize) -> Self {
        self.walk_length = walk_length;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_scheme(mut self, scheme: WeightScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_spectral_threshold(mut self, threshold: usize) -> Self {
        self.spectral_threshold = threshold;
        self
    }

    /// Checks everything except `k`, which needs the vertex count.
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "alpha must be finite and non-negative, got {}",
                self.alpha
            )));
        }
        match &self.scheme {
            WeightScheme::Walks => self.neighbor_config().affinity.validate(),
            WeightScheme::KNearest => Ok(()),
            WeightScheme::Diffusion(diffusion) => diffusion.validate(),
        }
    }

    /// The walk-scheme settings as a [`NeighborConfig`].
    pub fn neighbor_config(&self) -> NeighborConfig {
        NeighborConfig {
            k: self.k,
            affinity: AffinityConfig {
                walk_length: self.walk_length,
                decay: self.power_decay,
                method: None,
                spectral_threshold: self.spectral_threshold,
            },
        }
    }
}

/// Build the weight matrix for `scheme`.
///
/// The walk scheme reads `adjacency`; the other two read `distances`.
pub fn build_weights(
    adjacency: ArrayView2<'_, f64>,
    distances: ArrayView2<'_, f64>,
    config: &L2gConfig,
) -> Result<WeightMatrix> {
    match &config.scheme {
        WeightScheme::Walks => find_neighbors(adjacency, &config.neighbor_config()),
        WeightScheme::KNearest => crate::weights::k_nearest_weights(distances, config.k),
        WeightScheme::Diffusion(diffusion) => {
            let diffusion = diffusion.clone().with_k(config.k);
            crate::weights::diffusion_weights(distances, &diffusion)
        }
    }
}

/// Consumes (distances, weights, alpha) and produces one coordinate row per vertex.
pub trait LayoutOptimizer {
    fn optimize(
        &self,
        distances: ArrayView2<'_, f64>,
        weights: &WeightMatrix,
        alpha: f64,
    ) -> Result<Array2<f64>>;
}

/// Everything the optimizer needs, already checked for consistency.
#[derive(Debug, Clone)]
pub struct OptimizerInput {
    pub distances: Array2<f64>,
    pub weights: WeightMatrix,
    pub alpha: f64,
}

/// Validate inputs and build the weight matrix.
///
/// # Errors
///
/// - invalid config, `k` outside `1..n`
/// - distances not matching the graph's vertex count
/// - anything the selected scheme reports
#[tracing::instrument(skip(graph, distances, config), fields(n = graph.vertex_count(), k = config.k))]
pub fn prepare<G: AdjacencySource + ?Sized>(
    graph: &G,
    distances: ArrayView2<'_, f64>,
    config: &L2gConfig,
) -> Result<OptimizerInput> {
    config.validate()?;
    let n = graph.vertex_count();
    let d = matrix::validate_distances(distances)?;
    if d != n {
        return Err(Error::DimensionMismatch { expected: n, got: d });
    }
    matrix::check_neighbor_count(config.k, n)?;

    let adjacency = graph.adjacency()?;
    let weights = build_weights(adjacency.view(), distances, config)?;
    if weights.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            got: weights.len(),
        });
    }

    info!(
        scheme = ?config.scheme,
        edges = weights.edge_count(),
        "weight matrix ready"
    );
    Ok(OptimizerInput {
        distances: distances.to_owned(),
        weights,
        alpha: config.alpha,
    })
}

/// Prepare the weight matrix and run the optimizer.
///
/// # Errors
///
/// Everything [`prepare`] reports, whatever the optimizer reports, and
/// [`Error::DimensionMismatch`] if the optimizer returns a row count other
/// than the vertex count.
pub fn l2g<G, O>(
    graph: &G,
    distances: ArrayView2<'_, f64>,
    config: &L2gConfig,
    optimizer: &O,
) -> Result<Array2<f64>>
where
    G: AdjacencySource + ?Sized,
    O: LayoutOptimizer + ?Sized,
{
    let input = prepare(graph, distances, config)?;
    let coords = optimizer.optimize(input.distances.view(), &input.weights, input.alpha)?;
    if coords.nrows() != input.weights.len() {
        return Err(Error::DimensionMismatch {
            expected: input.weights.len(),
            got: coords.nrows(),
        });
    }
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::cell::Cell;

    fn cycle(n: usize) -> Array2<f64> {
        let mut a = Array2::zeros((n, n));
        for i in 0..n {
            let j = (i + 1) % n;
            a[[i, j]] = 1.0;
            a[[j, i]] = 1.0;
        }
        a
    }

    fn cycle_distances(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, n), |(i, j)| {
            let d = i.abs_diff(j);
            d.min(n - d) as f64
        })
    }

    struct Recording {
        calls: Cell<usize>,
        rows: usize,
    }

    impl LayoutOptimizer for Recording {
        fn optimize(
            &self,
            distances: ArrayView2<'_, f64>,
            weights: &WeightMatrix,
            alpha: f64,
        ) -> Result<Array2<f64>> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(distances.nrows(), weights.len());
            assert!((alpha - 0.6).abs() < 1e-12);
            Ok(Array2::zeros((self.rows, 2)))
        }
    }

    struct Failing;

    impl LayoutOptimizer for Failing {
        fn optimize(&self, _: ArrayView2<'_, f64>, _: &WeightMatrix, _: f64) -> Result<Array2<f64>> {
            Err(Error::Optimizer("diverged".into()))
        }
    }

    #[test]
    fn test_find_neighbors_cycle() {
        let a = cycle(8);
        let w = find_neighbors(a.view(), &NeighborConfig::default().with_k(2)).unwrap();
        // Strongest partners on a cycle are the two adjacent vertices.
        for i in 0..8 {
            assert!(w.contains(i, (i + 1) % 8), "missing edge {i}-{}", (i + 1) % 8);
        }
        assert!(w.is_symmetric());
        assert!(w.has_zero_diagonal());
    }

    #[test]
    fn test_find_neighbors_rejects_large_k() {
        let a = cycle(4);
        assert!(matches!(
            find_neighbors(a.view(), &NeighborConfig::default().with_k(4)),
            Err(Error::InvalidNeighborCount { k: 4, n: 4 })
        ));
    }

    #[test]
    fn test_l2g_calls_optimizer_once() {
        let a = cycle(6);
        let d = cycle_distances(6);
        let opt = Recording {
            calls: Cell::new(0),
            rows: 6,
        };
        let coords = l2g(&a, d.view(), &L2gConfig::default().with_k(2), &opt).unwrap();
        assert_eq!(coords.dim(), (6, 2));
        assert_eq!(opt.calls.get(), 1);
    }

    #[test]
    fn test_l2g_checks_optimizer_rows() {
        let a = cycle(6);
        let d = cycle_distances(6);
        let opt = Recording {
            calls: Cell::new(0),
            rows: 5,
        };
        assert!(matches!(
            l2g(&a, d.view(), &L2gConfig::default().with_k(2), &opt),
            Err(Error::DimensionMismatch { expected: 6, got: 5 })
        ));
    }

    #[test]
    fn test_l2g_surfaces_optimizer_error() {
        let a = cycle(5);
        let d = cycle_distances(5);
        let err = l2g(&a, d.view(), &L2gConfig::default().with_k(2), &Failing).unwrap_err();
        assert_eq!(err, Error::Optimizer("diverged".into()));
    }

    #[test]
    fn test_prepare_rejects_mismatched_distances() {
        let a = cycle(5);
        let d = cycle_distances(4);
        assert!(matches!(
            prepare(&a, d.view(), &L2gConfig::default().with_k(2)),
            Err(Error::DimensionMismatch { expected: 5, got: 4 })
        ));
    }

    #[test]
    fn test_prepare_rejects_bad_alpha() {
        let a = cycle(5);
        let d = cycle_distances(5);
        let config = L2gConfig::default().with_k(2).with_alpha(f64::NAN);
        assert!(matches!(
            prepare(&a, d.view(), &config),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_schemes_agree_on_cycle_neighbors() {
        let a = cycle(8);
        let d = cycle_distances(8);
        for scheme in [
            WeightScheme::Walks,
            WeightScheme::KNearest,
            WeightScheme::Diffusion(DiffusionConfig::default()),
        ] {
            let config = L2gConfig::default().with_k(2).with_scheme(scheme.clone());
            let input = prepare(&a, d.view(), &config).unwrap();
            for i in 0..8 {
                assert!(
                    input.weights.contains(i, (i + 1) % 8),
                    "{scheme:?}: missing edge {i}-{}",
                    (i + 1) % 8
                );
            }
        }
    }

    #[test]
    fn test_walk_scheme_isolated_vertex() {
        // Triangle 0-1-2 plus isolated vertex 3.
        let a = array![
            [0.0, 1.0, 1.0, 0.0],
            [1.0, 0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0]
        ];
        let w = find_neighbors(a.view(), &NeighborConfig::default().with_k(2)).unwrap();
        assert_eq!(w.degree(3), 0);
        assert_eq!(w.degree(0), 2);
    }
}
