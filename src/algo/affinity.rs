//! Walk affinity: how strongly two vertices are tied by walks up to length `a`.
//!
//! # Intuition
//!
//! `(A^p)[i,j]` counts the walks of length `p` from `i` to `j`. Summing
//! powers up to a walk bound `a` scores pairs that are connected by many
//! short walks, so two vertices in the same dense region score high even
//! when they are not adjacent. It is the finite, all-pairs cousin of Katz
//! centrality.
//!
//! # Methods
//!
//! | Method | Formula | Cost |
//! |--------|---------|------|
//! | Power series | Σ s^p · A^p / max(A^p) | a dense products, O(a·n³) |
//! | Spectral | Q · diag(Σ λ^p) · Qᵀ | one eigendecomposition, O(n³) + O(a·n) |
//!
//! The power series normalizes each power by its largest entry before the
//! decay `s` is applied, so no single power dominates however fast the
//! spectrum grows. The spectral method does no normalization. The two do
//! not agree numerically, only in which pairs they rank highest.
//!
//! # References
//!
//! - Miller, Huroyan, Kobourov (2023). arXiv:2308.16403 (the L2G layout)
//! - Estrada & Higham (2010). "Network properties revealed through matrix functions"

use super::eigen::SymmetricEigen;
use crate::error::{Error, Result};
use crate::matrix;
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Above this many vertices the spectral method is used by default.
pub const DEFAULT_SPECTRAL_THRESHOLD: usize = 1000;

/// Per-step decay for the power series.
pub const DEFAULT_POWER_DECAY: f64 = 0.1;

/// Multiplier on `n · ε · max|λ'|` below which spectral entries are zeroed.
const RESIDUE_FACTOR: f64 = 16.0;

/// How the affinity matrix is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffinityMethod {
    /// Repeated dense multiplication with per-power max normalization.
    PowerSeries,
    /// One symmetric eigendecomposition, powers applied to the eigenvalues.
    Spectral,
}

impl AffinityMethod {
    /// Size heuristic: spectral strictly above `threshold` vertices.
    pub fn for_vertex_count(n: usize, threshold: usize) -> Self {
        if n > threshold {
            Self::Spectral
        } else {
            Self::PowerSeries
        }
    }
}

/// Configuration for [`compute_affinity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffinityConfig {
    /// Longest walk counted (the walk bound `a`). Must be >= 1.
    pub walk_length: usize,
    /// Decay `s` applied per power in the power series. Must be in (0, 1).
    /// Ignored by the spectral method.
    pub decay: f64,
    /// Force a method. `None` picks by [`AffinityMethod::for_vertex_count`].
    pub method: Option<AffinityMethod>,
    /// Vertex count above which the spectral method is picked.
    pub spectral_threshold: usize,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            walk_length: 5,
            decay: DEFAULT_POWER_DECAY,
            method: None,
            spectral_threshold: DEFAULT_SPECTRAL_THRESHOLD,
        }
    }
}

impl AffinityConfig {
    pub fn with_walk_length(mut self, walk_length: usize) -> Self {
        self.walk_length = walk_length;
        self
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_method(mut self, method: AffinityMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_spectral_threshold(mut self, threshold: usize) -> Self {
        self.spectral_threshold = threshold;
        self
    }

    /// Method that will run for an `n`-vertex input.
    pub fn resolve_method(&self, n: usize) -> AffinityMethod {
        self.method
            .unwrap_or_else(|| AffinityMethod::for_vertex_count(n, self.spectral_threshold))
    }

    pub fn validate(&self) -> Result<()> {
        validate_walk_length(self.walk_length)?;
        validate_decay("decay", self.decay)
    }
}

pub(crate) fn validate_walk_length(walk_length: usize) -> Result<()> {
    if walk_length == 0 {
        return Err(Error::InvalidParameter(
            "walk_length must be at least 1".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_decay(name: &str, decay: f64) -> Result<()> {
    if decay.is_nan() || decay <= 0.0 || decay >= 1.0 {
        return Err(Error::InvalidParameter(format!(
            "{name} must be in (0, 1), got {decay}"
        )));
    }
    Ok(())
}

/// Compute the affinity matrix with the configured (or size-selected) method.
///
/// # Example
///
/// ```
/// use l2g::algo::affinity::{compute_affinity, AffinityConfig};
/// use ndarray::array;
///
/// // Path 0 - 1 - 2
/// let a = array![[0.0, 1.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
/// let aff = compute_affinity(a.view(), &AffinityConfig::default()).unwrap();
///
/// // 0 and 2 are linked by walks of length 2 even though not adjacent.
/// assert!(aff[[0, 2]] > 0.0);
/// ```
#[tracing::instrument(skip(adjacency, config), fields(n = adjacency.nrows(), walk_length = config.walk_length))]
pub fn compute_affinity(
    adjacency: ArrayView2<'_, f64>,
    config: &AffinityConfig,
) -> Result<Array2<f64>> {
    config.validate()?;
    let n = matrix::validate_adjacency(adjacency)?;
    let method = config.resolve_method(n);
    debug!(?method, n, "computing walk affinity");

    match method {
        AffinityMethod::PowerSeries => {
            power_series_affinity(adjacency, config.walk_length, config.decay)
        }
        AffinityMethod::Spectral => spectral_affinity(adjacency, config.walk_length),
    }
}

/// Σ_{p=1..a} s^p · A^p / max(A^p), by repeated multiplication.
///
/// Only the running sum and the current power are kept. The current power is
/// stored already divided by its maximum; since max-normalization is a
/// positive rescale, multiplying the normalized power by `A` and normalizing
/// again gives exactly `A^{p+1} / max(A^{p+1})` without letting magnitudes
/// grow with `p`.
///
/// # Errors
///
/// - malformed adjacency (see [`matrix::validate_adjacency`])
/// - `walk_length == 0`, `decay` outside (0, 1)
/// - [`Error::ZeroNormalization`] if some power has no positive entry
///   (e.g. a graph without edges)
pub fn power_series_affinity(
    adjacency: ArrayView2<'_, f64>,
    walk_length: usize,
    decay: f64,
) -> Result<Array2<f64>> {
    validate_walk_length(walk_length)?;
    validate_decay("decay", decay)?;
    let n = matrix::validate_adjacency(adjacency)?;
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }

    let mut power = adjacency.to_owned();
    let mut sum = Array2::<f64>::zeros((n, n));
    let mut weight = 1.0;

    for p in 1..=walk_length {
        if p > 1 {
            power = power.dot(&adjacency);
        }
        let max = matrix::max_entry(power.view()).unwrap_or(0.0);
        trace!(p, max, "walk power");
        if max <= 0.0 || !max.is_finite() {
            return Err(Error::ZeroNormalization(format!(
                "A^{p} has maximum entry {max}"
            )));
        }
        power /= max;
        weight *= decay;
        sum.scaled_add(weight, &power);
    }

    Ok(sum)
}

/// Σ_{p=1..a} λ^p for each eigenvalue λ.
pub fn eigenvalue_power_sum(values: &Array1<f64>, walk_length: usize) -> Array1<f64> {
    values.mapv(|lambda| {
        let mut term = 1.0;
        let mut acc = 0.0;
        for _ in 0..walk_length {
            term *= lambda;
            acc += term;
        }
        acc
    })
}

/// Q · diag(Σ_{p=1..a} Λ^p) · Qᵀ from one eigendecomposition.
///
/// Equals Σ_{p=1..a} A^p without the per-power normalization of
/// [`power_series_affinity`]. Entries within rounding distance of zero (a
/// small multiple of `n · ε · max|λ'|`) are set to exactly 0, so vertices
/// with no walk between them score 0 as they do in the power series.
///
/// # Errors
///
/// - malformed adjacency, or an adjacency that is not symmetric
/// - `walk_length == 0`
/// - [`Error::NoConvergence`] from the eigensolver
/// - [`Error::Numerical`] if the power sum overflows
pub fn spectral_affinity(adjacency: ArrayView2<'_, f64>, walk_length: usize) -> Result<Array2<f64>> {
    validate_walk_length(walk_length)?;
    let n = matrix::validate_adjacency(adjacency)?;
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }

    let eig = SymmetricEigen::new(adjacency)?;
    let summed = eigenvalue_power_sum(&eig.values, walk_length);
    debug!(
        lambda_min = eig.values[0],
        lambda_max = eig.values[n - 1],
        "eigendecomposition done"
    );

    if let Some(idx) = summed.iter().position(|x| !x.is_finite()) {
        return Err(Error::Numerical(format!(
            "power sum of eigenvalue {} overflows for walk length {walk_length}",
            eig.values[idx]
        )));
    }

    let mut affinity = eig.compose(&summed);

    if let Some((row, col)) = matrix::find_non_finite(affinity.view()) {
        return Err(Error::Numerical(format!(
            "non-finite affinity at ({row}, {col})"
        )));
    }

    // Pairs with no walk between them come back as rounding residue, not 0.
    let tol = residue_tolerance(n, &summed);
    let mut cleared = 0usize;
    affinity.mapv_inplace(|x| {
        if x != 0.0 && x.abs() <= tol {
            cleared += 1;
            0.0
        } else {
            x
        }
    });
    trace!(tol, cleared, "spectral residue cleared");
    Ok(affinity)
}

/// Entries at or below this magnitude after Q · diag(Λ') · Qᵀ are rounding
/// residue: `RESIDUE_FACTOR · n · ε · max|λ'|`.
fn residue_tolerance(n: usize, summed: &Array1<f64>) -> f64 {
    let scale = summed.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    RESIDUE_FACTOR * n as f64 * f64::EPSILON * scale
}
