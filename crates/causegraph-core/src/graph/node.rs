//! Graph node types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{CanonicalKey, ClusterId, ClusterLabel, EntityType};

/// Prefix of every cluster node id. Entity keys always start with an
/// entity type, so cluster ids never collide with them.
pub const CLUSTER_NODE_PREFIX: &str = "cluster:";

/// Which cluster a cluster node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterRef {
    /// A density cluster from the clusterer.
    Density(ClusterId),
    /// One of the reserved per-type roots.
    Root(EntityType),
}

impl ClusterRef {
    /// Graph node id: `cluster:<id>` or `cluster:<type>`.
    pub fn node_id(&self) -> String {
        format!("{}{}", CLUSTER_NODE_PREFIX, self)
    }

    /// Label used when none was supplied.
    pub fn fallback_label(&self) -> ClusterLabel {
        match self {
            ClusterRef::Density(id) => ClusterLabel::generic(*id),
            ClusterRef::Root(t) => ClusterLabel::new(t.as_str(), format!("Generic {} cluster", t)),
        }
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterRef::Density(id) => write!(f, "{}", id),
            ClusterRef::Root(t) => write!(f, "{}", t),
        }
    }
}

/// A canonical entity after merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub key: CanonicalKey,
    /// Base type parsed from the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    /// Density cluster of the key, when it is clustered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<ClusterId>,
    /// Raw keys folded into this node.
    pub members: Vec<CanonicalKey>,
}

/// A thematic cluster or type root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub cluster: ClusterRef,
    pub name: String,
    pub description: String,
}

impl ClusterNode {
    pub fn new(cluster: ClusterRef, label: ClusterLabel) -> Self {
        Self {
            cluster,
            name: label.name,
            description: label.description,
        }
    }
}

/// Node weight of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GraphNode {
    Entity(EntityNode),
    Cluster(ClusterNode),
}

impl GraphNode {
    /// Node identity: the entity key or the namespaced cluster id.
    pub fn id(&self) -> String {
        match self {
            GraphNode::Entity(e) => e.key.to_string(),
            GraphNode::Cluster(c) => c.cluster.node_id(),
        }
    }

    pub fn as_entity(&self) -> Option<&EntityNode> {
        match self {
            GraphNode::Entity(e) => Some(e),
            GraphNode::Cluster(_) => None,
        }
    }

    pub fn as_cluster(&self) -> Option<&ClusterNode> {
        match self {
            GraphNode::Cluster(c) => Some(c),
            GraphNode::Entity(_) => None,
        }
    }
}
