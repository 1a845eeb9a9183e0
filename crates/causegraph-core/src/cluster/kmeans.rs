//! Exploratory flat clustering.
//!
//! Seeded k-means with an elbow heuristic over the inertia curve. Used to
//! eyeball the thematic structure of a key vocabulary; the merge and graph
//! stages never depend on it.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cosine::{centroid, cosine_similarity, squared_euclidean};
use crate::error::{CausegraphError, CgResult, ErrorCode};
use crate::types::CanonicalKey;

/// Upper bound (exclusive) of the k range scanned by [`inertia_curve`].
pub const MAX_ELBOW_K: usize = 20;

/// Configuration for k-means.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Maximum Lloyd iterations.
    pub max_iterations: usize,
    /// Stop once no centroid moves more than this (squared distance).
    pub tolerance: f64,
    /// RNG seed for k-means++ initialisation.
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// Result of one k-means run.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub k: usize,
    /// Cluster index of each input vector.
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f32>>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeansFit {
    /// Input indices assigned to `cluster`.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Run k-means with k-means++ seeding.
pub fn fit(vectors: &[Vec<f32>], k: usize, config: &KMeansConfig) -> CgResult<KMeansFit> {
    let n = vectors.len();
    if k == 0 || k > n {
        return Err(CausegraphError::Configuration(format!(
            "k must be in 1..={}, got {}",
            n, k
        )));
    }
    let dim = vectors[0].len();
    if vectors.iter().any(|v| v.len() != dim) {
        return Err(CausegraphError::data(
            "vectors have inconsistent dimensions",
            ErrorCode::DataDimensionMismatch,
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = seed_centroids(vectors, k, &mut rng);
    let mut labels = vec![0usize; n];
    let mut iterations = 0;

    for iteration in 0..config.max_iterations.max(1) {
        iterations = iteration + 1;

        for (label, v) in labels.iter_mut().zip(vectors) {
            *label = nearest(v, &centroids);
        }

        let mut shift = 0.0f64;
        for (c, current) in centroids.iter_mut().enumerate() {
            let members = labels.iter().zip(vectors).filter(|(l, _)| **l == c).map(|(_, v)| v.as_slice());
            let mut count = 0usize;
            let updated = centroid(members.inspect(|_| count += 1), dim);
            // Empty clusters keep their previous centroid.
            if count > 0 {
                shift = shift.max(squared_euclidean(current, &updated));
                *current = updated;
            }
        }

        if shift <= config.tolerance {
            break;
        }
    }

    for (label, v) in labels.iter_mut().zip(vectors) {
        *label = nearest(v, &centroids);
    }
    let inertia = labels
        .iter()
        .zip(vectors)
        .map(|(&l, v)| squared_euclidean(v, &centroids[l]))
        .sum();

    debug!(k, iterations, inertia, "k-means fit");

    Ok(KMeansFit {
        k,
        labels,
        centroids,
        inertia,
        iterations,
    })
}

fn seed_centroids(vectors: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = vectors.len();
    let mut centroids = vec![vectors[rng.gen_range(0..n)].clone()];

    while centroids.len() < k {
        let weights: Vec<f64> = vectors
            .iter()
            .map(|v| {
                centroids
                    .iter()
                    .map(|c| squared_euclidean(v, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // All remaining points coincide with a centroid.
            Err(_) => rng.gen_range(0..n),
        };
        centroids.push(vectors[next].clone());
    }

    centroids
}

fn nearest(v: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_euclidean(v, c);
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

/// Inertia for every `k` in `1..min(MAX_ELBOW_K, n)`.
pub fn inertia_curve(vectors: &[Vec<f32>], config: &KMeansConfig) -> CgResult<Vec<(usize, f64)>> {
    let upper = MAX_ELBOW_K.min(vectors.len());
    (1..upper)
        .map(|k| fit(vectors, k, config).map(|f| (k, f.inertia)))
        .collect()
}

/// Elbow of a convex, decreasing curve (Kneedle, sensitivity 1).
///
/// Returns `None` when the curve is too short or flat to have an elbow.
pub fn find_elbow(curve: &[(usize, f64)]) -> Option<usize> {
    if curve.len() < 3 {
        return None;
    }

    let xs: Vec<f64> = curve.iter().map(|(k, _)| *k as f64).collect();
    let ys: Vec<f64> = curve.iter().map(|(_, y)| *y).collect();
    let x_norm = normalize(&xs)?;
    let y_norm = normalize(&ys)?;

    // Convex decreasing: flip y so the elbow becomes a maximum of y - x.
    let diff: Vec<f64> = y_norm
        .iter()
        .zip(&x_norm)
        .map(|(y, x)| (1.0 - y) - x)
        .collect();

    let last = diff.len() - 1;
    let is_max = |i: usize| i > 0 && i < last && diff[i] >= diff[i - 1] && diff[i] >= diff[i + 1];
    let is_min = |i: usize| i > 0 && i < last && diff[i] <= diff[i - 1] && diff[i] <= diff[i + 1];

    let step = x_norm.windows(2).map(|w| w[1] - w[0]).sum::<f64>() / last as f64;
    let first_max = (0..diff.len()).find(|&i| is_max(i))?;

    let mut threshold = f64::NEG_INFINITY;
    let mut threshold_index = first_max;
    for i in first_max..last {
        if x_norm[i] >= 1.0 {
            break;
        }
        if is_max(i) {
            threshold = diff[i] - step.abs();
            threshold_index = i;
        }
        if is_min(i) {
            threshold = 0.0;
        }
        if diff[i + 1] < threshold {
            return Some(curve[threshold_index].0);
        }
    }

    None
}

fn normalize(values: &[f64]) -> Option<Vec<f64>> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range == 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v - min) / range).collect())
}

/// Up to `n` members of `cluster`, most central first (cosine similarity
/// to the member centroid).
pub fn top_members(keys: &[CanonicalKey], vectors: &[Vec<f32>], fit: &KMeansFit, cluster: usize, n: usize) -> Vec<CanonicalKey> {
    let members = fit.members(cluster);
    if members.is_empty() {
        return Vec::new();
    }

    let dim = vectors[members[0]].len();
    let center = centroid(members.iter().map(|&i| vectors[i].as_slice()), dim);

    let mut scored: Vec<(usize, f64)> = members
        .iter()
        .map(|&i| (i, cosine_similarity(&vectors[i], &center)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    scored.into_iter().take(n).map(|(i, _)| keys[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![10.0, 10.1],
            vec![-10.0, 10.0],
            vec![-10.1, 10.0],
        ]
    }

    #[test]
    fn test_fit_separates_blobs() {
        let fit = fit(&blobs(), 3, &KMeansConfig::default()).unwrap();
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[0], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[6], fit.labels[7]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert_ne!(fit.labels[3], fit.labels[6]);
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let config = KMeansConfig::default();
        let a = fit(&blobs(), 2, &config).unwrap();
        let b = fit(&blobs(), 2, &config).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_fit_rejects_bad_k() {
        assert!(fit(&blobs(), 0, &KMeansConfig::default()).is_err());
        assert!(fit(&blobs(), 9, &KMeansConfig::default()).is_err());
    }

    #[test]
    fn test_inertia_curve_range() {
        let curve = inertia_curve(&blobs(), &KMeansConfig::default()).unwrap();
        let ks: Vec<usize> = curve.iter().map(|(k, _)| *k).collect();
        assert_eq!(ks, vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(curve[0].1 > curve[2].1);
    }

    #[test]
    fn test_find_elbow() {
        let curve: Vec<(usize, f64)> = [100.0, 20.0, 15.0, 12.0, 10.0, 9.0]
            .iter()
            .enumerate()
            .map(|(i, y)| (i + 1, *y))
            .collect();
        assert_eq!(find_elbow(&curve), Some(2));
    }

    #[test]
    fn test_find_elbow_on_flat_or_short_curve() {
        assert_eq!(find_elbow(&[(1, 5.0), (2, 5.0), (3, 5.0)]), None);
        assert_eq!(find_elbow(&[(1, 5.0), (2, 1.0)]), None);
    }

    #[test]
    fn test_top_members() {
        let keys: Vec<CanonicalKey> = ["a", "b", "c"].iter().map(|k| CanonicalKey::from(*k)).collect();
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.5], vec![1.0, 1.0]];
        let fit = KMeansFit {
            k: 1,
            labels: vec![0, 0, 0],
            centroids: vec![vec![1.0, 0.5]],
            inertia: 0.0,
            iterations: 1,
        };
        let top = top_members(&keys, &vectors, &fit, 0, 2);
        assert_eq!(top[0].as_str(), "b");
        assert_eq!(top.len(), 2);
    }
}
