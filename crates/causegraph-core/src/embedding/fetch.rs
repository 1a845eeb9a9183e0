//! Bounded-concurrency embedding fetch with per-key retries.

use backon::Retryable;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{EmbeddingTable, KeyEmbedding};
use crate::error::{CausegraphError, CgResult};
use crate::retry::RetryPolicy;
use crate::traits::Embedder;
use crate::types::CanonicalKey;

/// Configuration for embedding fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum requests in flight.
    pub max_concurrency: usize,
    /// Per-key retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 100,
            retry: RetryPolicy::default(),
        }
    }
}

/// A key that never got a vector.
#[derive(Debug, Clone)]
pub struct FailedKey {
    pub key: CanonicalKey,
    pub error: String,
}

/// Result of a fetch run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Successful vectors, in input key order.
    pub table: EmbeddingTable,
    /// Keys whose retries were exhausted or whose error was permanent.
    pub failed: Vec<FailedKey>,
}

/// Embed every key independently.
///
/// Partial failure never aborts the run: failed keys are reported in
/// [`FetchOutcome::failed`] and simply cannot take part in clustering.
pub async fn fetch_embeddings(
    embedder: &dyn Embedder,
    keys: &[CanonicalKey],
    config: &FetchConfig,
) -> FetchOutcome {
    let mut results: Vec<(usize, CgResult<Vec<f32>>)> = stream::iter(keys.iter().enumerate())
        .map(|(index, key)| async move { (index, embed_with_retry(embedder, key, &config.retry).await) })
        .buffer_unordered(config.max_concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(index, _)| *index);

    let mut outcome = FetchOutcome::default();
    for (index, result) in results {
        let key = &keys[index];
        match result {
            Ok(vector) => {
                outcome.table.insert(KeyEmbedding::new(key.clone(), vector));
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to get embedding");
                outcome.failed.push(FailedKey {
                    key: key.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        requested = keys.len(),
        embedded = outcome.table.len(),
        failed = outcome.failed.len(),
        model = embedder.model_name(),
        "Embedding fetch complete"
    );

    outcome
}

async fn embed_with_retry(embedder: &dyn Embedder, key: &CanonicalKey, policy: &RetryPolicy) -> CgResult<Vec<f32>> {
    let embed_once = move || async move {
        let vector = embedder.embed(key.as_str()).await?;
        if vector.is_empty() {
            return Err(CausegraphError::embedding(format!("empty embedding for '{}'", key)));
        }
        Ok(vector)
    };

    embed_once
        .retry(policy.backoff())
        .when(|e: &CausegraphError| e.is_transient())
        .notify(|err, dur| {
            warn!("Embedding for '{}' failed, retrying in {:?}: {}", key, dur, err);
        })
        .await
}
