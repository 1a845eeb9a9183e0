//! Density-based clustering (DBSCAN) over cosine distance.
//!
//! Groups near-duplicate keys. Points with no dense neighbourhood are noise
//! and keep their own identity downstream.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cosine::norm;
use crate::error::{CausegraphError, CgResult, ErrorCode};
use crate::types::{Assignment, CanonicalKey, ClusterId};

/// Configuration for density clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Neighbourhood radius in cosine distance.
    /// Range: (0.0, 2.0]. Default: 0.05
    pub eps: f64,
    /// Neighbourhood size, the point itself included, that makes a core point.
    /// Minimum 2. Default: 2
    pub min_samples: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 0.05,
            min_samples: 2,
        }
    }
}

impl ClusteringConfig {
    /// Create config with a custom radius.
    pub fn with_eps(eps: f64) -> Self {
        Self {
            eps,
            ..Default::default()
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> CgResult<()> {
        if !self.eps.is_finite() || self.eps <= 0.0 || self.eps > 2.0 {
            return Err(CausegraphError::Configuration(format!(
                "eps must be in (0, 2], got {}",
                self.eps
            )));
        }
        if self.min_samples < 2 {
            return Err(CausegraphError::Configuration(format!(
                "min_samples must be at least 2, got {}",
                self.min_samples
            )));
        }
        Ok(())
    }
}

/// DBSCAN clusterer with cosine distance.
#[derive(Debug, Clone)]
pub struct DensityClusterer {
    config: ClusteringConfig,
}

impl DensityClusterer {
    /// Create a clusterer, validating the configuration.
    pub fn new(config: ClusteringConfig) -> CgResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Assign every key to a cluster or to noise.
    ///
    /// `embeddings[i]` belongs to `keys[i]`. Core points are expanded in input
    /// order and cluster ids are handed out `0, 1, 2, ...` in that order; a
    /// border point reachable from several clusters joins the first one that
    /// reaches it. The result is fully determined by the inputs.
    ///
    /// Fails on a length mismatch, inconsistent dimensions, or a zero or
    /// non-finite vector.
    pub fn cluster(&self, keys: &[CanonicalKey], embeddings: &[Vec<f32>]) -> CgResult<Vec<Assignment>> {
        if keys.len() != embeddings.len() {
            return Err(CausegraphError::data(
                format!("{} keys but {} embeddings", keys.len(), embeddings.len()),
                ErrorCode::DataLengthMismatch,
            ));
        }

        let unit = normalized(keys, embeddings)?;
        let n = unit.len();
        let mut assignments = vec![Assignment::Noise; n];
        if n < 2 {
            return Ok(assignments);
        }

        let neighbourhoods: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| 1.0 - dot(&unit[i], &unit[j]) <= self.config.eps)
                    .collect()
            })
            .collect();
        let is_core: Vec<bool> = neighbourhoods
            .iter()
            .map(|nb| nb.len() >= self.config.min_samples)
            .collect();

        let mut next_id = 0usize;
        let mut queue = VecDeque::new();

        for start in 0..n {
            if !is_core[start] || !assignments[start].is_noise() {
                continue;
            }

            let id = ClusterId(next_id);
            next_id += 1;
            assignments[start] = Assignment::Member(id);
            queue.push_back(start);

            while let Some(point) = queue.pop_front() {
                if !is_core[point] {
                    continue;
                }
                for &neighbour in &neighbourhoods[point] {
                    if assignments[neighbour].is_noise() {
                        assignments[neighbour] = Assignment::Member(id);
                        queue.push_back(neighbour);
                    }
                }
            }

            debug!(cluster = id.0, seed = %keys[start], "Expanded cluster");
        }

        let noise = assignments.iter().filter(|a| a.is_noise()).count();
        info!(
            keys = n,
            clusters = next_id,
            noise,
            eps = self.config.eps,
            "Density clustering complete"
        );

        Ok(assignments)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Validate vectors and scale them to unit length.
fn normalized(keys: &[CanonicalKey], embeddings: &[Vec<f32>]) -> CgResult<Vec<Vec<f64>>> {
    let dim = embeddings.first().map(|v| v.len()).unwrap_or(0);

    embeddings
        .iter()
        .zip(keys)
        .map(|(v, key)| {
            if v.len() != dim {
                return Err(CausegraphError::data(
                    format!("embedding for '{}' has dimension {}, expected {}", key, v.len(), dim),
                    ErrorCode::DataDimensionMismatch,
                ));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(CausegraphError::invalid_vector(format!(
                    "embedding for '{}' contains non-finite values",
                    key
                )));
            }
            let length = norm(v);
            if length == 0.0 {
                return Err(CausegraphError::invalid_vector(format!(
                    "embedding for '{}' is all zeros",
                    key
                )));
            }
            Ok(v.iter().map(|x| *x as f64 / length).collect())
        })
        .collect()
}
