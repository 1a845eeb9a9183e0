//! Representative selection for density clusters.

use std::collections::BTreeMap;

use tracing::debug;

use super::cosine::{centroid, cosine_similarity};
use crate::error::{CausegraphError, CgResult, ErrorCode};
use crate::types::{Assignment, CanonicalKey, Cluster, ClusterId, ClusterSet};

/// Pick one representative per non-noise cluster.
///
/// The representative is the member with the highest cosine similarity to
/// the cluster centroid (elementwise mean); ties go to the earliest input
/// index. Noise keys are never members or representatives.
pub fn select_representatives(
    keys: &[CanonicalKey],
    embeddings: &[Vec<f32>],
    assignments: &[Assignment],
) -> CgResult<ClusterSet> {
    if keys.len() != embeddings.len() || keys.len() != assignments.len() {
        return Err(CausegraphError::data(
            format!(
                "{} keys, {} embeddings, {} assignments",
                keys.len(),
                embeddings.len(),
                assignments.len()
            ),
            ErrorCode::DataLengthMismatch,
        ));
    }

    let mut groups: BTreeMap<ClusterId, Vec<usize>> = BTreeMap::new();
    for (index, assignment) in assignments.iter().enumerate() {
        if let Some(id) = assignment.cluster_id() {
            groups.entry(id).or_default().push(index);
        }
    }

    let mut clusters = ClusterSet::new();
    for (id, indices) in groups {
        let dim = embeddings[indices[0]].len();
        let center = centroid(indices.iter().map(|&i| embeddings[i].as_slice()), dim);

        let mut best = indices[0];
        let mut best_score = f64::NEG_INFINITY;
        for &i in &indices {
            let score = cosine_similarity(&embeddings[i], &center);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }

        debug!(
            cluster = id.0,
            representative = %keys[best],
            members = indices.len(),
            "Selected representative"
        );

        clusters.insert(
            id,
            Cluster {
                id,
                representative: keys[best].clone(),
                members: indices.iter().map(|&i| keys[i].clone()).collect(),
            },
        );
    }

    Ok(clusters)
}
