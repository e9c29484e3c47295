//! Diffusion scores over a distance matrix.
//!
//! # Intuition
//!
//! Instead of counting walks on the raw graph, treat shortest-path distances
//! as a heat kernel: nearby vertices exchange a lot of "heat", far ones
//! almost none. Column-normalizing turns the kernel into a transition
//! matrix, and a damped sum of its powers measures how much mass reaches
//! `j` from `i` within `a` diffusion steps.
//!
//! # Definition
//!
//! ```text
//! K[i,j] = exp(-d[i,j]² / σ²)
//! P      = K with every column divided by its sum
//! S      = Σ_{p=1..a} c^p · P^p
//! ```
//!
//! `σ` controls the kernel width. As `σ → ∞` every entry of K tends to 1,
//! P becomes uniform and all scores tie.

use crate::error::{Error, Result};
use crate::matrix;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for diffusion scoring and selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionConfig {
    /// Kernel width σ. Must be > 0; `f64::INFINITY` gives a uniform kernel.
    pub sigma: f64,
    /// Number of diffusion steps `a`. Must be >= 1.
    pub walk_length: usize,
    /// Damping `c` per step. Must be in (0, 1).
    pub decay: f64,
    /// Partners selected per vertex.
    pub k: usize,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            walk_length: 5,
            decay: 0.05,
            k: 20,
        }
    }
}

impl DiffusionConfig {
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_walk_length(mut self, walk_length: usize) -> Self {
        self.walk_length = walk_length;
        self
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Checks everything except `k`, which needs the vertex count.
    pub fn validate(&self) -> Result<()> {
        if self.sigma.is_nan() || self.sigma <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        super::affinity::validate_walk_length(self.walk_length)?;
        super::affinity::validate_decay("diffusion decay", self.decay)
    }
}

/// Column-normalized heat kernel `exp(-d² / σ²)`.
///
/// # Errors
///
/// - malformed distances (see [`matrix::validate_distances`]), invalid σ
/// - [`Error::Numerical`] when an entry is not finite (`inf / inf` when both
///   distance and σ are infinite)
/// - [`Error::ZeroNormalization`] when a whole column underflows to zero
pub fn diffusion_kernel(distances: ArrayView2<'_, f64>, sigma: f64) -> Result<Array2<f64>> {
    if sigma.is_nan() || sigma <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "sigma must be positive, got {sigma}"
        )));
    }
    matrix::validate_distances(distances)?;

    let sigma_sq = sigma * sigma;
    let mut kernel = distances.mapv(|d| (-(d * d) / sigma_sq).exp());
    if let Some((row, col)) = matrix::find_non_finite(kernel.view()) {
        return Err(Error::Numerical(format!(
            "diffusion kernel is not finite at ({row}, {col}) for sigma {sigma}"
        )));
    }
    matrix::column_normalize(&mut kernel)?;
    Ok(kernel)
}

/// Σ_{p=1..a} c^p · P^p for the diffusion kernel P of `distances`.
///
/// Running-power accumulation: one matrix product per step, only the
/// running sum and the current power alive.
#[tracing::instrument(skip(distances, config), fields(n = distances.nrows(), sigma = config.sigma))]
pub fn diffusion_scores(
    distances: ArrayView2<'_, f64>,
    config: &DiffusionConfig,
) -> Result<Array2<f64>> {
    config.validate()?;
    let kernel = diffusion_kernel(distances, config.sigma)?;
    let n = kernel.nrows();

    let mut power = kernel.clone();
    let mut scores = Array2::<f64>::zeros((n, n));
    let mut weight = 1.0;
    for p in 1..=config.walk_length {
        if p > 1 {
            power = power.dot(&kernel);
        }
        weight *= config.decay;
        scores.scaled_add(weight, &power);
    }
    debug!(n, steps = config.walk_length, "diffusion scores ready");

    if let Some((row, col)) = matrix::find_non_finite(scores.view()) {
        return Err(Error::Numerical(format!(
            "non-finite diffusion score at ({row}, {col})"
        )));
    }
    Ok(scores)
}
