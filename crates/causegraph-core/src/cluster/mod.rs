//! Similarity clustering of canonical keys.
//!
//! - [`DensityClusterer`]: DBSCAN over cosine distance, the merge stage's
//!   source of near-duplicate groups.
//! - [`select_representatives`]: one centroid-closest key per group.
//! - [`kmeans`]: exploratory flat clustering with an elbow heuristic.

pub mod cosine;
mod dbscan;
pub mod kmeans;
mod representative;

pub use cosine::{cosine_distance, cosine_similarity};
pub use dbscan::{ClusteringConfig, DensityClusterer};
pub use representative::select_representatives;
