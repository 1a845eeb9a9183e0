//! causegraph-core - Core library for causegraph.
//!
//! This crate turns extracted `cause -> relationship -> effect` records into a
//! deduplicated knowledge graph: descriptors are normalized into canonical
//! keys, near-duplicate keys are clustered by embedding similarity and merged
//! onto a representative, and the result is assembled into a labeled graph.
//!
//! # Example
//!
//! ```ignore
//! use causegraph_core::{Pipeline, PipelineConfig, LabelSet};
//! use causegraph_core::import::{read_embeddings, read_records};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let (records, _) = read_records("triplets.jsonl").await?;
//! let (embeddings, _) = read_embeddings("embeddings.jsonl").await?;
//!
//! let output = pipeline.build(&records, &embeddings, &LabelSet::new())?;
//! println!("{} nodes", output.graph.node_count());
//! ```

pub mod cluster;
pub mod config;
pub mod embedding;
pub mod error;
pub mod export;
pub mod graph;
pub mod import;
pub mod keys;
pub mod labels;
pub mod merge;
pub mod pipeline;
pub mod retry;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use cluster::{ClusteringConfig, DensityClusterer};
pub use config::PipelineConfig;
pub use embedding::{fetch_embeddings, EmbeddingTable, FetchConfig, FetchOutcome, KeyEmbedding};
pub use error::{CausegraphError, CgResult, ErrorCode};
pub use graph::{GraphAssembler, KnowledgeGraph};
pub use keys::{key_vocabulary, normalize, KeyPolicy};
pub use labels::{ClusterLabeler, LabelerConfig};
pub use merge::MergeMap;
pub use pipeline::{ClusterArtifacts, Pipeline, PipelineOutput};
pub use retry::RetryPolicy;
pub use traits::{Embedder, EmbedderConfig, GenerationOptions, Llm, LlmConfig, LlmResponse};
pub use types::{
    Assignment, CanonicalKey, Cluster, ClusterId, ClusterLabel, ClusterSet, ClusteredKeys, EntityDescriptor,
    EntityType, KeyGranularity, LabelSet, Message, MessageRole, NetOutcome, RelationshipRecord, SourceRef,
};
