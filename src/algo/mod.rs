//! Affinity, diffusion and top-k selection.

pub mod affinity;
pub mod diffusion;
pub mod eigen;
pub mod topk;

pub use affinity::{
    compute_affinity, eigenvalue_power_sum, power_series_affinity, spectral_affinity,
    AffinityConfig, AffinityMethod,
};
pub use diffusion::{diffusion_kernel, diffusion_scores, DiffusionConfig};
pub use eigen::SymmetricEigen;
pub use topk::{select_by_affinity, select_by_diffusion, select_k_nearest, NeighborSelection};
