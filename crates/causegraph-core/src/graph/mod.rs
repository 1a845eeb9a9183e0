//! The causal knowledge graph.
//!
//! A petgraph `DiGraph` (multi-edges allowed) of entity and cluster nodes
//! with an id -> `NodeIndex` index, built by [`GraphAssembler`].

mod assembler;
mod edge;
mod export;
mod node;

pub use assembler::GraphAssembler;
pub use edge::{GraphEdge, RelationEdge};
pub use export::{NodeLinkEdge, NodeLinkGraph, NodeLinkMeta, NodeLinkNode};
pub use node::{ClusterNode, ClusterRef, EntityNode, GraphNode, CLUSTER_NODE_PREFIX};

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

/// The in-memory graph type using petgraph.
pub type CausalGraph = DiGraph<GraphNode, GraphEdge>;

/// Index for O(1) lookups by node id.
pub type NodeIdIndex = HashMap<String, NodeIndex>;

/// Node and edge counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub entity_nodes: usize,
    pub cluster_nodes: usize,
    pub relation_edges: usize,
    pub membership_edges: usize,
}

/// Assembled knowledge graph.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: CausalGraph,
    index: NodeIdIndex,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` unless a node with the same id exists. Returns its index.
    pub(crate) fn upsert_node(&mut self, node: GraphNode) -> NodeIndex {
        let id = node.id();
        if let Some(idx) = self.index.get(&id) {
            return *idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    pub(crate) fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, edge: GraphEdge) {
        self.graph.add_edge(source, target, edge);
    }

    /// Underlying petgraph graph.
    pub fn inner(&self) -> &CausalGraph {
        &self.graph
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All entity nodes, in insertion order.
    pub fn entity_nodes(&self) -> impl Iterator<Item = &EntityNode> {
        self.graph.node_weights().filter_map(GraphNode::as_entity)
    }

    /// All cluster nodes, in insertion order.
    pub fn cluster_nodes(&self) -> impl Iterator<Item = &ClusterNode> {
        self.graph.node_weights().filter_map(GraphNode::as_cluster)
    }

    /// All relation edges as `(source id, target id, edge)`.
    pub fn relation_edges(&self) -> Vec<(String, String, &RelationEdge)> {
        self.graph
            .edge_references()
            .filter_map(|e| {
                e.weight().as_relation().map(|r| {
                    (
                        self.graph[e.source()].id(),
                        self.graph[e.target()].id(),
                        r,
                    )
                })
            })
            .collect()
    }

    /// Edges from `source` to `target`, in insertion order.
    pub fn edges_between(&self, source: &str, target: &str) -> Vec<&GraphEdge> {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_connecting(s, t)
            .map(|e| (e.id(), e.weight()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, w)| w).collect()
    }

    /// Ids of the entity nodes a cluster node has membership edges to.
    pub fn members_of(&self, cluster: ClusterRef) -> Vec<String> {
        let Some(&idx) = self.index.get(&cluster.node_id()) else {
            return Vec::new();
        };
        let mut members: Vec<_> = self
            .graph
            .edges(idx)
            .filter(|e| e.weight().is_membership())
            .map(|e| e.target())
            .collect();
        members.sort();
        members.into_iter().map(|n| self.graph[n].id()).collect()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        for node in self.graph.node_weights() {
            match node {
                GraphNode::Entity(_) => stats.entity_nodes += 1,
                GraphNode::Cluster(_) => stats.cluster_nodes += 1,
            }
        }
        for edge in self.graph.edge_weights() {
            match edge {
                GraphEdge::Relation(_) => stats.relation_edges += 1,
                GraphEdge::Membership => stats.membership_edges += 1,
            }
        }
        stats
    }
}
