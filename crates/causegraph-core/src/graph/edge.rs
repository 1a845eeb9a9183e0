//! Graph edge types.

use serde::{Deserialize, Serialize};

use crate::types::{CanonicalKey, NetOutcome, SourceRef};

/// One causal relationship instance between two entity nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub relationship: String,
    pub net_outcome: NetOutcome,
    /// Unmerged full keys, for display.
    pub cause_full: CanonicalKey,
    pub effect_full: CanonicalKey,
    /// Unmerged short keys, before resolution.
    pub cause_short: CanonicalKey,
    pub effect_short: CanonicalKey,
    pub provenance: SourceRef,
}

/// Edge weight of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GraphEdge {
    Relation(RelationEdge),
    /// Cluster node -> entity node.
    Membership,
}

impl GraphEdge {
    pub fn as_relation(&self) -> Option<&RelationEdge> {
        match self {
            GraphEdge::Relation(r) => Some(r),
            GraphEdge::Membership => None,
        }
    }

    pub fn is_membership(&self) -> bool {
        matches!(self, GraphEdge::Membership)
    }
}
