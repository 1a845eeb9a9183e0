//! Graph assembly from records, merge map and cluster assignments.

use tracing::{debug, info};

use super::{ClusterNode, ClusterRef, EntityNode, GraphEdge, GraphNode, KnowledgeGraph, RelationEdge};
use crate::keys::KeyPolicy;
use crate::merge::MergeMap;
use crate::types::{CanonicalKey, ClusteredKeys, EntityType, LabelSet, RelationshipRecord};

/// Builds the knowledge graph.
#[derive(Debug, Clone, Default)]
pub struct GraphAssembler {
    policy: KeyPolicy,
}

impl GraphAssembler {
    /// Create an assembler deriving record keys with `policy`.
    ///
    /// Must be the policy the key vocabulary was built with.
    pub fn new(policy: KeyPolicy) -> Self {
        Self { policy }
    }

    /// Assemble the graph.
    ///
    /// 1. One entity node per distinct resolved key, from the clustered
    ///    vocabulary and from both sides of every record.
    /// 2. One relation edge per record, resolved cause -> resolved effect.
    ///    Parallel edges are never collapsed.
    /// 3. One cluster node per cluster id in `assignments` plus the three
    ///    type roots, each with membership edges to its entity nodes.
    pub fn assemble(
        &self,
        records: &[RelationshipRecord],
        merge_map: &MergeMap,
        assignments: &ClusteredKeys,
        labels: &LabelSet,
    ) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();

        for key in assignments.keys() {
            self.add_entity(&mut graph, merge_map, assignments, merge_map.resolve(key));
        }

        for record in records {
            let cause = self.policy.keys(&record.cause);
            let effect = self.policy.keys(&record.effect);

            let source = self.add_entity(&mut graph, merge_map, assignments, merge_map.resolve(&cause.short));
            let target = self.add_entity(&mut graph, merge_map, assignments, merge_map.resolve(&effect.short));

            graph.add_edge(
                source,
                target,
                GraphEdge::Relation(RelationEdge {
                    relationship: record.relationship.clone(),
                    net_outcome: record.net_outcome,
                    cause_full: cause.full,
                    effect_full: effect.full,
                    cause_short: cause.short,
                    effect_short: effect.short,
                    provenance: record.source.clone(),
                }),
            );
        }

        self.add_cluster_nodes(&mut graph, assignments, labels);

        let stats = graph.stats();
        info!(
            entities = stats.entity_nodes,
            clusters = stats.cluster_nodes,
            relations = stats.relation_edges,
            memberships = stats.membership_edges,
            "Graph assembled"
        );

        graph
    }

    fn add_entity(
        &self,
        graph: &mut KnowledgeGraph,
        merge_map: &MergeMap,
        assignments: &ClusteredKeys,
        key: &CanonicalKey,
    ) -> petgraph::graph::NodeIndex {
        if let Some(&idx) = graph.index.get(key.as_str()) {
            return idx;
        }

        let cluster_id = assignments.get(key).and_then(|a| a.cluster_id());
        graph.upsert_node(GraphNode::Entity(EntityNode {
            key: key.clone(),
            entity_type: EntityType::of_key(key),
            cluster_id,
            members: merge_map.members_of(key),
        }))
    }

    fn add_cluster_nodes(&self, graph: &mut KnowledgeGraph, assignments: &ClusteredKeys, labels: &LabelSet) {
        let entities: Vec<_> = graph
            .graph
            .node_indices()
            .filter_map(|idx| graph.graph[idx].as_entity().map(|e| (idx, e.cluster_id, e.entity_type)))
            .collect();

        for id in assignments.cluster_ids() {
            let cluster = ClusterRef::Density(id);
            let label = labels.get(id).cloned().unwrap_or_else(|| cluster.fallback_label());
            let node = graph.upsert_node(GraphNode::Cluster(ClusterNode::new(cluster, label)));

            let mut count = 0;
            for (idx, cluster_id, _) in &entities {
                if *cluster_id == Some(id) {
                    graph.add_edge(node, *idx, GraphEdge::Membership);
                    count += 1;
                }
            }
            debug!(cluster = %cluster.node_id(), members = count, "Added cluster node");
        }

        for entity_type in EntityType::all() {
            let cluster = ClusterRef::Root(entity_type);
            let node = graph.upsert_node(GraphNode::Cluster(ClusterNode::new(cluster, cluster.fallback_label())));

            for (idx, _, t) in &entities {
                if *t == Some(entity_type) {
                    graph.add_edge(node, *idx, GraphEdge::Membership);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Assignment, Cluster, ClusterId, ClusterLabel, ClusterSet, EntityDescriptor, NetOutcome,
        SourceRef,
    };

    fn key(s: &str) -> CanonicalKey {
        CanonicalKey::from(s)
    }

    fn record(cause: (EntityType, &str, &str), rel: &str, effect: (EntityType, &str, &str)) -> RelationshipRecord {
        RelationshipRecord::new(
            EntityDescriptor::new(cause.0, cause.1, cause.2),
            rel,
            EntityDescriptor::new(effect.0, effect.1, effect.2),
        )
    }

    fn fixture() -> (Vec<RelationshipRecord>, MergeMap, ClusteredKeys) {
        let records = vec![
            record((EntityType::Human, "student", "learning"), "INCREASES", (EntityType::Ai, "llm", "tutoring"))
                .with_outcome(NetOutcome::Positive)
                .with_source(SourceRef::new("0:p1").with_finding("f1")),
            record((EntityType::Human, "pupil", "learning"), "INCREASES", (EntityType::Ai, "llm", "tutoring"))
                .with_source(SourceRef::new("1:p2")),
            record((EntityType::Co, "team", ""), "DECREASES", (EntityType::Human, "", "workload")),
        ];

        let mut clusters = ClusterSet::new();
        clusters.insert(
            ClusterId(0),
            Cluster {
                id: ClusterId(0),
                representative: key("human|student"),
                members: vec![key("human|student"), key("human|pupil")],
            },
        );
        let merge_map = MergeMap::from_clusters(&clusters);

        let vocabulary = vec![
            key("human|student"),
            key("ai|llm"),
            key("human|pupil"),
            key("co|team"),
            key("human>workload"),
        ];
        let assignments = ClusteredKeys::from_parts(
            &vocabulary,
            &[
                Assignment::Member(ClusterId(0)),
                Assignment::Noise,
                Assignment::Member(ClusterId(0)),
                Assignment::Noise,
                Assignment::Noise,
            ],
        );

        (records, merge_map, assignments)
    }

    #[test]
    fn test_entity_nodes_are_merged() {
        let (records, merge_map, assignments) = fixture();
        let graph = GraphAssembler::default().assemble(&records, &merge_map, &assignments, &LabelSet::new());

        assert!(graph.contains("human|student"));
        assert!(!graph.contains("human|pupil"));
        assert_eq!(graph.entity_nodes().count(), 4);

        let student = graph.node("human|student").and_then(GraphNode::as_entity).unwrap();
        assert_eq!(student.cluster_id, Some(ClusterId(0)));
        assert_eq!(student.members, vec![key("human|student"), key("human|pupil")]);
        assert_eq!(student.entity_type, Some(EntityType::Human));

        let llm = graph.node("ai|llm").and_then(GraphNode::as_entity).unwrap();
        assert_eq!(llm.cluster_id, None);
        assert_eq!(llm.members, vec![key("ai|llm")]);
    }

    #[test]
    fn test_one_relation_edge_per_record() {
        let (records, merge_map, assignments) = fixture();
        let graph = GraphAssembler::default().assemble(&records, &merge_map, &assignments, &LabelSet::new());

        assert_eq!(graph.stats().relation_edges, records.len());

        let parallel = graph.edges_between("human|student", "ai|llm");
        assert_eq!(parallel.len(), 2);
        let first = parallel[0].as_relation().unwrap();
        assert_eq!(first.cause_full.as_str(), "human|student>learning");
        assert_eq!(first.effect_full.as_str(), "ai|llm>tutoring");
        assert_eq!(first.net_outcome, NetOutcome::Positive);
        assert_eq!(first.provenance.finding.as_deref(), Some("f1"));

        let second = parallel[1].as_relation().unwrap();
        assert_eq!(second.cause_short.as_str(), "human|pupil");
        assert_eq!(second.cause_full.as_str(), "human|pupil>learning");
        assert_eq!(second.net_outcome, NetOutcome::Undetermined);
    }

    #[test]
    fn test_every_record_endpoint_has_a_node() {
        let (mut records, merge_map, assignments) = fixture();
        // Key absent from the vocabulary (e.g. no embedding).
        records.push(record((EntityType::Ai, "agent", ""), "ENABLES", (EntityType::Co, "", "")));

        let graph = GraphAssembler::default().assemble(&records, &merge_map, &assignments, &LabelSet::new());
        let policy = KeyPolicy::default();
        for r in &records {
            for d in [&r.cause, &r.effect] {
                let short = policy.keys(d).short;
                assert!(graph.contains(merge_map.resolve(&short)));
            }
        }
        let agent = graph.node("ai|agent").and_then(GraphNode::as_entity).unwrap();
        assert_eq!(agent.cluster_id, None);
    }

    #[test]
    fn test_cluster_nodes_and_memberships() {
        let (records, merge_map, assignments) = fixture();
        let mut labels = LabelSet::new();
        labels.insert(ClusterId(0), ClusterLabel::new("Learners", "Students and pupils"));

        let graph = GraphAssembler::default().assemble(&records, &merge_map, &assignments, &labels);

        let cluster = graph.node("cluster:0").and_then(GraphNode::as_cluster).unwrap();
        assert_eq!(cluster.name, "Learners");
        assert_eq!(graph.members_of(ClusterRef::Density(ClusterId(0))), vec!["human|student"]);

        let human = graph.node("cluster:human").and_then(GraphNode::as_cluster).unwrap();
        assert_eq!(human.name, "human");
        assert_eq!(human.description, "Generic human cluster");
        assert_eq!(
            graph.members_of(ClusterRef::Root(EntityType::Human)),
            vec!["human|student", "human>workload"]
        );
        assert_eq!(graph.members_of(ClusterRef::Root(EntityType::Co)), vec!["co|team"]);
    }

    #[test]
    fn test_type_roots_exist_when_empty() {
        let graph = GraphAssembler::default().assemble(&[], &MergeMap::default(), &ClusteredKeys::new(), &LabelSet::new());
        assert_eq!(graph.node_count(), 3);
        for t in EntityType::all() {
            assert!(graph.contains(&ClusterRef::Root(t).node_id()));
        }
    }

    #[test]
    fn test_unlabeled_cluster_gets_generic_label() {
        let (records, merge_map, assignments) = fixture();
        let graph = GraphAssembler::default().assemble(&records, &merge_map, &assignments, &LabelSet::new());
        let cluster = graph.node("cluster:0").and_then(GraphNode::as_cluster).unwrap();
        assert_eq!(cluster.name, "Cluster 0");
        assert_eq!(cluster.description, "Generic cluster 0");
    }
}
