//! Vector helpers shared by the clusterers.

/// Euclidean norm, accumulated in f64.
pub fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Cosine similarity. Returns 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Elementwise mean of `vectors`. All vectors must share one dimension.
pub fn centroid<'a, I>(vectors: I, dim: usize) -> Vec<f32>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum = vec![0.0f64; dim];
    let mut count = 0usize;
    for v in vectors {
        for (acc, x) in sum.iter_mut().zip(v) {
            *acc += *x as f64;
        }
        count += 1;
    }
    if count == 0 {
        return vec![0.0; dim];
    }
    sum.into_iter().map(|s| (s / count as f64) as f32).collect()
}

/// Squared Euclidean distance.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum()
}
