//! Error types for l2g.

use thiserror::Error;

/// Errors raised while building affinity or weight matrices.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input matrix is not square.
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    /// Two inputs (or an input and an output) disagree on vertex count.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// NaN (or, where not allowed, infinity) in an input matrix.
    #[error("non-finite entry at ({row}, {col})")]
    NonFinite { row: usize, col: usize },

    /// Negative adjacency weight or distance.
    #[error("negative entry {value} at ({row}, {col})")]
    NegativeEntry { row: usize, col: usize, value: f64 },

    /// Spectral method needs a symmetric adjacency matrix.
    #[error("matrix is not symmetric at ({row}, {col})")]
    NotSymmetric { row: usize, col: usize },

    /// `k` must satisfy `1 <= k < n`.
    #[error("invalid neighbor count: k = {k} for {n} vertices")]
    InvalidNeighborCount { k: usize, n: usize },

    /// Invalid configuration value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A matrix power (or kernel column) had nothing to normalize by.
    #[error("zero normalization factor: {0}")]
    ZeroNormalization(String),

    /// QL iteration ran out of sweeps.
    #[error("eigendecomposition did not converge for eigenvalue {index} after {iterations} iterations")]
    NoConvergence { index: usize, iterations: usize },

    /// NaN/Inf produced during computation.
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// Reported by an external layout optimizer.
    #[error("layout optimizer failed: {0}")]
    Optimizer(String),
}

impl Error {
    /// Malformed input or configuration (caller's fault, fixable before retrying).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotSquare { .. }
                | Self::DimensionMismatch { .. }
                | Self::NonFinite { .. }
                | Self::NegativeEntry { .. }
                | Self::NotSymmetric { .. }
                | Self::InvalidNeighborCount { .. }
                | Self::InvalidParameter(_)
        )
    }

    /// Deterministic numerical failure for the given input.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::ZeroNormalization(_) | Self::NoConvergence { .. } | Self::Numerical(_)
        )
    }
}

/// Result type alias for l2g.
pub type Result<T> = std::result::Result<T, Error>;
