//! Merge resolution: clustered key -> representative key.

use std::collections::HashMap;

use crate::types::{CanonicalKey, Cluster, ClusterId, ClusterSet};

/// Two-tier lookup from any key to its canonical form.
///
/// Only clustered keys are stored; every other key resolves to itself.
/// Representatives map to themselves, so resolution is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeMap {
    explicit: HashMap<CanonicalKey, CanonicalKey>,
    clusters: HashMap<CanonicalKey, Cluster>,
}

impl MergeMap {
    /// Build from selector output.
    pub fn from_clusters(clusters: &ClusterSet) -> Self {
        Self::from_iter(clusters.values())
    }

    /// Resolve `key` to its representative, or to itself when unclustered.
    pub fn resolve<'a>(&'a self, key: &'a CanonicalKey) -> &'a CanonicalKey {
        self.explicit.get(key.as_str()).unwrap_or(key)
    }

    /// Resolve a borrowed string key.
    pub fn resolve_str(&self, key: &str) -> CanonicalKey {
        self.explicit
            .get(key)
            .cloned()
            .unwrap_or_else(|| CanonicalKey::from(key))
    }

    /// Cluster id of `key` when it is a representative.
    pub fn cluster_of_representative(&self, key: &str) -> Option<ClusterId> {
        self.clusters.get(key).map(|c| c.id)
    }

    /// Keys folded into `key`: the cluster members for a representative,
    /// otherwise just the key itself.
    pub fn members_of(&self, key: &CanonicalKey) -> Vec<CanonicalKey> {
        match self.clusters.get(key.as_str()) {
            Some(cluster) => cluster.members.clone(),
            None => vec![key.clone()],
        }
    }

    pub fn is_clustered(&self, key: &str) -> bool {
        self.explicit.contains_key(key)
    }

    /// Number of explicitly mapped keys.
    pub fn len(&self) -> usize {
        self.explicit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty()
    }
}

impl<'a> FromIterator<&'a Cluster> for MergeMap {
    fn from_iter<I: IntoIterator<Item = &'a Cluster>>(iter: I) -> Self {
        let mut map = MergeMap::default();
        for cluster in iter {
            for member in &cluster.members {
                map.explicit
                    .insert(member.clone(), cluster.representative.clone());
            }
            map.explicit
                .insert(cluster.representative.clone(), cluster.representative.clone());
            map.clusters
                .insert(cluster.representative.clone(), cluster.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CanonicalKey {
        CanonicalKey::from(s)
    }

    fn clusters() -> ClusterSet {
        let mut set = ClusterSet::new();
        set.insert(
            ClusterId(0),
            Cluster {
                id: ClusterId(0),
                representative: key("human|learner"),
                members: vec![key("human|student"), key("human|learner"), key("human|pupil")],
            },
        );
        set.insert(
            ClusterId(1),
            Cluster {
                id: ClusterId(1),
                representative: key("ai|llm"),
                members: vec![key("ai|llm"), key("ai|chatbot")],
            },
        );
        set
    }

    #[test]
    fn test_members_resolve_to_representative() {
        let map = MergeMap::from_clusters(&clusters());
        assert_eq!(map.resolve(&key("human|student")).as_str(), "human|learner");
        assert_eq!(map.resolve(&key("human|learner")).as_str(), "human|learner");
        assert_eq!(map.resolve_str("ai|chatbot").as_str(), "ai|llm");
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_unclustered_keys_resolve_to_themselves() {
        let map = MergeMap::from_clusters(&clusters());
        let k = key("co|team");
        assert_eq!(map.resolve(&k), &k);
        assert!(!map.is_clustered("co|team"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let map = MergeMap::from_clusters(&clusters());
        for name in ["human|student", "human|pupil", "ai|chatbot", "ai|llm", "co|team"] {
            let k = key(name);
            let once = map.resolve(&k).clone();
            let twice = map.resolve(&once).clone();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_representative_cluster_lookup() {
        let map = MergeMap::from_clusters(&clusters());
        assert_eq!(map.cluster_of_representative("ai|llm"), Some(ClusterId(1)));
        assert_eq!(map.cluster_of_representative("ai|chatbot"), None);
        assert_eq!(map.members_of(&key("ai|llm")), vec![key("ai|llm"), key("ai|chatbot")]);
        assert_eq!(map.members_of(&key("co|team")), vec![key("co|team")]);
    }
}
