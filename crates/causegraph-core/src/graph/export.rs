//! Node-link serialization of the knowledge graph.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use super::{GraphEdge, GraphNode, GraphStats, KnowledgeGraph};

/// Graph-level metadata.
#[derive(Debug, Clone, Serialize)]
pub struct NodeLinkMeta {
    pub generated_at: DateTime<Utc>,
    pub stats: GraphStats,
}

/// A node with its id, flattened with its attributes.
#[derive(Debug, Clone, Serialize)]
pub struct NodeLinkNode<'a> {
    pub id: String,
    #[serde(flatten)]
    pub node: &'a GraphNode,
}

/// An edge with endpoints and a per-pair multi-edge key.
#[derive(Debug, Clone, Serialize)]
pub struct NodeLinkEdge<'a> {
    pub source: String,
    pub target: String,
    /// Index among edges sharing the same `(source, target)` pair.
    pub key: usize,
    #[serde(flatten)]
    pub edge: &'a GraphEdge,
}

/// Node-link document, readable by common graph tooling.
#[derive(Debug, Clone, Serialize)]
pub struct NodeLinkGraph<'a> {
    pub directed: bool,
    pub multigraph: bool,
    pub graph: NodeLinkMeta,
    pub nodes: Vec<NodeLinkNode<'a>>,
    pub edges: Vec<NodeLinkEdge<'a>>,
}

impl KnowledgeGraph {
    /// Borrowing node-link view of the graph.
    pub fn to_node_link(&self) -> NodeLinkGraph<'_> {
        let nodes = self
            .graph
            .node_weights()
            .map(|node| NodeLinkNode { id: node.id(), node })
            .collect();

        let mut pair_counts: HashMap<(usize, usize), usize> = HashMap::new();
        let mut edge_refs: Vec<_> = self.graph.edge_references().collect();
        edge_refs.sort_by_key(|e| e.id());

        let edges = edge_refs
            .into_iter()
            .map(|e| {
                let counter = pair_counts
                    .entry((e.source().index(), e.target().index()))
                    .or_insert(0);
                let key = *counter;
                *counter += 1;
                NodeLinkEdge {
                    source: self.graph[e.source()].id(),
                    target: self.graph[e.target()].id(),
                    key,
                    edge: e.weight(),
                }
            })
            .collect();

        NodeLinkGraph {
            directed: true,
            multigraph: true,
            graph: NodeLinkMeta {
                generated_at: Utc::now(),
                stats: self.stats(),
            },
            nodes,
            edges,
        }
    }

    /// Serialize as pretty-printed node-link JSON.
    pub fn to_json_pretty(&self) -> crate::error::CgResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_node_link())?)
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::GraphAssembler;
    use crate::merge::MergeMap;
    use crate::types::{
        Assignment, CanonicalKey, ClusterId, ClusteredKeys, EntityDescriptor, EntityType, LabelSet,
        RelationshipRecord, SourceRef,
    };

    #[test]
    fn test_node_link_shape() {
        let records = vec![
            RelationshipRecord::new(
                EntityDescriptor::new(EntityType::Human, "", "trust"),
                "INCREASES",
                EntityDescriptor::new(EntityType::Ai, "", "reliance"),
            )
            .with_source(SourceRef::new("p1").with_finding("f1")),
            RelationshipRecord::new(
                EntityDescriptor::new(EntityType::Human, "", "trust"),
                "DECREASES",
                EntityDescriptor::new(EntityType::Ai, "", "reliance"),
            ),
        ];
        let keys = vec![CanonicalKey::from("human>trust"), CanonicalKey::from("ai>reliance")];
        let assignments = ClusteredKeys::from_parts(&keys, &[Assignment::Member(ClusterId(0)), Assignment::Noise]);

        let graph = GraphAssembler::default().assemble(&records, &MergeMap::default(), &assignments, &LabelSet::new());
        let value = serde_json::to_value(graph.to_node_link()).unwrap();

        assert_eq!(value["directed"], true);
        assert_eq!(value["multigraph"], true);
        assert_eq!(value["graph"]["stats"]["relation_edges"], 2);
        assert!(value["graph"]["generated_at"].is_string());

        let nodes = value["nodes"].as_array().unwrap();
        let trust = nodes.iter().find(|n| n["id"] == "human>trust").unwrap();
        assert_eq!(trust["kind"], "entity");
        assert_eq!(trust["cluster_id"], 0);
        assert_eq!(trust["entity_type"], "human");

        let cluster = nodes.iter().find(|n| n["id"] == "cluster:0").unwrap();
        assert_eq!(cluster["kind"], "cluster");
        assert_eq!(cluster["name"], "Cluster 0");

        let root = nodes.iter().find(|n| n["id"] == "cluster:ai").unwrap();
        assert_eq!(root["cluster"], "ai");

        let edges = value["edges"].as_array().unwrap();
        let relations: Vec<_> = edges.iter().filter(|e| e["kind"] == "relation").collect();
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0]["key"], 0);
        assert_eq!(relations[1]["key"], 1);
        assert_eq!(relations[1]["relationship"], "DECREASES");
        assert_eq!(relations[0]["net_outcome"], "undetermined");
        assert_eq!(relations[0]["source"], "human>trust");
        assert_eq!(relations[0]["target"], "ai>reliance");
        assert_eq!(relations[0]["provenance"]["paper_id"], "p1");
        assert_eq!(relations[0]["provenance"]["finding"], "f1");

        let raw = graph.to_json_pretty().unwrap();
        assert_eq!(raw.matches("\"source\"").count(), edges.len());

        assert!(edges
            .iter()
            .any(|e| e["kind"] == "membership" && e["source"] == "cluster:0" && e["target"] == "human>trust"));
    }
}
