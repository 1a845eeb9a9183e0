//! Stage orchestration: vocabulary, embedding, clustering, labeling, assembly.
//!
//! Each stage is callable on its own so the CLI can persist intermediate
//! artifacts between runs; [`Pipeline::build`] runs the synchronous stages
//! end to end over an in-memory snapshot.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cluster::{select_representatives, DensityClusterer};
use crate::config::PipelineConfig;
use crate::embedding::{fetch_embeddings, EmbeddingTable, FetchOutcome};
use crate::error::CgResult;
use crate::graph::{GraphAssembler, KnowledgeGraph};
use crate::keys::key_vocabulary;
use crate::labels::ClusterLabeler;
use crate::merge::MergeMap;
use crate::traits::{Embedder, Llm};
use crate::types::{CanonicalKey, ClusterSet, ClusteredKeys, LabelSet, RelationshipRecord};

/// Clustering stage output.
#[derive(Debug, Clone, Default)]
pub struct ClusterArtifacts {
    /// Every embedded vocabulary key with its assignment.
    pub clustered: ClusteredKeys,
    /// Non-noise clusters with representatives.
    pub clusters: ClusterSet,
    /// Vocabulary keys that had no vector and stay unmerged.
    pub unembedded: Vec<CanonicalKey>,
}

impl ClusterArtifacts {
    /// Rebuild from persisted tables.
    pub fn from_tables(clustered: ClusteredKeys, clusters: ClusterSet) -> Self {
        Self {
            clustered,
            clusters,
            unembedded: Vec::new(),
        }
    }

    pub fn merge_map(&self) -> MergeMap {
        MergeMap::from_clusters(&self.clusters)
    }

    pub fn noise_count(&self) -> usize {
        self.clustered.iter().filter(|row| row.cluster.is_noise()).count()
    }
}

/// End-to-end result of [`Pipeline::build`].
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub vocabulary: Vec<CanonicalKey>,
    pub clusters: ClusterArtifacts,
    pub graph: KnowledgeGraph,
}

/// The pipeline, configured once per run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    clusterer: DensityClusterer,
}

impl Pipeline {
    /// Validate `config` and build the pipeline.
    pub fn new(config: PipelineConfig) -> CgResult<Self> {
        config.validate()?;
        let clusterer = DensityClusterer::new(config.clustering.clone())?;
        Ok(Self { config, clusterer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Distinct short keys of every record, under the configured policy.
    pub fn vocabulary(&self, records: &[RelationshipRecord]) -> Vec<CanonicalKey> {
        key_vocabulary(records, self.config.keys.policy)
    }

    /// Fetch embeddings for `keys` with the configured concurrency and retries.
    pub async fn embed(&self, embedder: &dyn Embedder, keys: &[CanonicalKey]) -> FetchOutcome {
        fetch_embeddings(embedder, keys, &self.config.fetch).await
    }

    /// Cluster the vocabulary keys that have vectors and pick representatives.
    pub fn cluster(&self, vocabulary: &[CanonicalKey], embeddings: &EmbeddingTable) -> CgResult<ClusterArtifacts> {
        let aligned = embeddings.aligned_to(vocabulary);
        if !aligned.missing.is_empty() {
            warn!(
                missing = aligned.missing.len(),
                "Keys without embeddings are left unclustered"
            );
        }

        let assignments = self.clusterer.cluster(&aligned.keys, &aligned.vectors)?;
        let clusters = select_representatives(&aligned.keys, &aligned.vectors, &assignments)?;
        let clustered = ClusteredKeys::from_parts(&aligned.keys, &assignments);

        let artifacts = ClusterArtifacts {
            clustered,
            clusters,
            unembedded: aligned.missing,
        };
        info!(
            keys = artifacts.clustered.len(),
            clusters = artifacts.clusters.len(),
            noise = artifacts.noise_count(),
            "Clustering complete"
        );
        Ok(artifacts)
    }

    /// Name every cluster. Never fails; unlabeled clusters fall back to
    /// generic names at assembly.
    pub async fn label(&self, llm: Arc<dyn Llm>, clusters: &ClusterSet) -> LabelSet {
        ClusterLabeler::new(llm, self.config.labeler.clone()).label(clusters).await
    }

    /// Assemble the graph from records and clustering output.
    pub fn assemble(
        &self,
        records: &[RelationshipRecord],
        artifacts: &ClusterArtifacts,
        labels: &LabelSet,
    ) -> KnowledgeGraph {
        GraphAssembler::new(self.config.keys.policy).assemble(
            records,
            &artifacts.merge_map(),
            &artifacts.clustered,
            labels,
        )
    }

    /// Run vocabulary, clustering and assembly over a snapshot.
    pub fn build(
        &self,
        records: &[RelationshipRecord],
        embeddings: &EmbeddingTable,
        labels: &LabelSet,
    ) -> CgResult<PipelineOutput> {
        let vocabulary = self.vocabulary(records);
        let clusters = self.cluster(&vocabulary, embeddings)?;
        let graph = self.assemble(records, &clusters, labels);
        Ok(PipelineOutput {
            vocabulary,
            clusters,
            graph,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::KeyEmbedding;
    use crate::types::{Assignment, ClusterId, EntityDescriptor, EntityType};

    fn record(cause: (&str, &str), effect: (&str, &str)) -> RelationshipRecord {
        RelationshipRecord::new(
            EntityDescriptor::new(EntityType::Human, cause.0, cause.1),
            "INCREASES",
            EntityDescriptor::new(EntityType::Ai, effect.0, effect.1),
        )
    }

    #[test]
    fn test_unembedded_keys_stay_unclustered() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let records = vec![
            record(("student", "trust"), ("llm", "use")),
            record(("learner", "trust"), ("llm", "use")),
        ];
        let embeddings: EmbeddingTable = vec![
            KeyEmbedding::new("human|student", vec![1.0, 0.0]),
            KeyEmbedding::new("human|learner", vec![0.999, 0.01]),
        ]
        .into_iter()
        .collect();

        let vocabulary = pipeline.vocabulary(&records);
        let artifacts = pipeline.cluster(&vocabulary, &embeddings).unwrap();

        assert_eq!(artifacts.unembedded, vec![CanonicalKey::from("ai|llm")]);
        assert_eq!(artifacts.clustered.len(), 2);
        assert_eq!(artifacts.clustered.get("human|learner"), Some(Assignment::Member(ClusterId(0))));
        assert_eq!(artifacts.noise_count(), 0);
        assert_eq!(artifacts.merge_map().resolve_str("ai|llm").as_str(), "ai|llm");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.clustering.eps = 0.0;
        assert!(Pipeline::new(config).is_err());
    }
}
