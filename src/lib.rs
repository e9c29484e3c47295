// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::similar_names)]

//! Neighbor weight matrices for walk-based graph layout.
//!
//! A force-directed layout that only attracts adjacent vertices loses the
//! mid-range structure of the graph; one that attracts every pair by
//! distance loses the local structure. L2G sits in between: each vertex is
//! attracted to the `k` vertices it is most strongly tied to, where "tied"
//! is measured by walks or diffusion rather than direct edges. This crate
//! computes that choice as a symmetric 0/1 [`WeightMatrix`].
//!
//! # Pipeline
//!
//! ```text
//! adjacency ──► affinity (power series | spectral) ──► top-k ──► WeightMatrix
//! distances ──► k-nearest                          ──► top-k ──► WeightMatrix
//! distances ──► diffusion kernel ──► damped powers ──► top-k ──► WeightMatrix
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | [`algo::affinity`] | Σ walks up to length `a`, two methods split by graph size |
//! | [`algo::eigen`] | Symmetric eigendecomposition for the spectral method |
//! | [`algo::diffusion`] | Heat-kernel diffusion scores over distances |
//! | [`algo::topk`] | Per-vertex selection ([`NeighborSelection`]) |
//! | [`weights`] | The output matrix and one-call helpers |
//! | [`layout`] | Scheme dispatch and the hand-off to a [`LayoutOptimizer`] |
//! | [`graph`] | Adjacency from `ndarray` or `petgraph` |
//!
//! Shortest-path distances and the optimizer itself come from the caller.
//!
//! # Example
//!
//! ```rust
//! use l2g::layout::{find_neighbors, NeighborConfig};
//! use l2g::graph::AdjacencySource;
//! use petgraph::graph::UnGraph;
//!
//! // Two triangles joined by a bridge 2-3.
//! let g = UnGraph::<(), ()>::from_edges(&[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 5), (5, 3)]);
//! let adjacency = g.adjacency().unwrap();
//!
//! let w = find_neighbors(adjacency.view(), &NeighborConfig::default().with_k(2)).unwrap();
//! assert!(w.is_symmetric());
//! assert!(w.contains(0, 1));
//! ```
//!
//! All functions are pure: no global state, no randomness, identical input
//! gives bit-identical output.

pub mod algo;
pub mod error;
pub mod graph;
pub mod layout;
pub mod matrix;
pub mod weights;

pub use algo::{AffinityConfig, AffinityMethod, DiffusionConfig, NeighborSelection};
pub use error::{Error, Result};
pub use graph::{AdjacencyMatrix, AdjacencySource};
pub use layout::{find_neighbors, l2g, L2gConfig, LayoutOptimizer, NeighborConfig, WeightScheme};
pub use weights::{affinity_weights, diffusion_weights, k_nearest_weights, WeightMatrix};
