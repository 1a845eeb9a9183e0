//! Cluster assignments, clusters and cluster labels.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::CanonicalKey;

/// Non-negative identifier of a density cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub usize);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clusterer output for one key: a cluster id or noise.
///
/// Serialized as the integer id, or `-1` for noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assignment {
    #[default]
    Noise,
    Member(ClusterId),
}

impl Assignment {
    /// Integer label, `-1` for noise.
    pub fn label(&self) -> i64 {
        match self {
            Assignment::Noise => -1,
            Assignment::Member(id) => id.0 as i64,
        }
    }

    pub fn from_label(label: i64) -> Self {
        if label < 0 {
            Assignment::Noise
        } else {
            Assignment::Member(ClusterId(label as usize))
        }
    }

    pub fn cluster_id(&self) -> Option<ClusterId> {
        match self {
            Assignment::Noise => None,
            Assignment::Member(id) => Some(*id),
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, Assignment::Noise)
    }
}

impl Serialize for Assignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.label())
    }
}

impl<'de> Deserialize<'de> for Assignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = i64::deserialize(deserializer)?;
        Ok(Assignment::from_label(label))
    }
}

/// A non-noise cluster with its chosen representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(rename = "cluster")]
    pub id: ClusterId,
    pub representative: CanonicalKey,
    /// Members in input order, representative included.
    pub members: Vec<CanonicalKey>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.iter().any(|m| m.as_str() == key)
    }
}

/// Selector output: clusters keyed by id, iterated in id order.
pub type ClusterSet = BTreeMap<ClusterId, Cluster>;

/// One `(key, cluster)` row of the clustered-keys table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteredKey {
    pub key: CanonicalKey,
    pub cluster: Assignment,
}

/// The clustered key vocabulary, in clusterer input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusteredKeys {
    rows: Vec<ClusteredKey>,
    index: HashMap<CanonicalKey, usize>,
}

impl ClusteredKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip keys with their assignments. Extra entries on either side are
    /// ignored; a repeated key keeps its first assignment.
    pub fn from_parts(keys: &[CanonicalKey], assignments: &[Assignment]) -> Self {
        keys.iter()
            .zip(assignments)
            .map(|(key, cluster)| ClusteredKey {
                key: key.clone(),
                cluster: *cluster,
            })
            .collect()
    }

    pub fn push(&mut self, row: ClusteredKey) {
        if self.index.contains_key(&row.key) {
            return;
        }
        self.index.insert(row.key.clone(), self.rows.len());
        self.rows.push(row);
    }

    /// Assignment of `key`, `None` when the key was never clustered.
    pub fn get(&self, key: &str) -> Option<Assignment> {
        self.index.get(key).map(|&i| self.rows[i].cluster)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CanonicalKey> {
        self.rows.iter().map(|r| &r.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusteredKey> {
        self.rows.iter()
    }

    /// Distinct non-noise cluster ids, ascending.
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        let mut ids: Vec<ClusterId> = self.rows.iter().filter_map(|r| r.cluster.cluster_id()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<ClusteredKey> for ClusteredKeys {
    fn from_iter<I: IntoIterator<Item = ClusteredKey>>(iter: I) -> Self {
        let mut table = ClusteredKeys::new();
        for row in iter {
            table.push(row);
        }
        table
    }
}

/// Human-readable name and description of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLabel {
    pub name: String,
    pub description: String,
}

impl ClusterLabel {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Fallback label for a density cluster.
    pub fn generic(id: ClusterId) -> Self {
        Self::new(format!("Cluster {}", id), format!("Generic cluster {}", id))
    }
}

/// Labels supplied for some subset of cluster ids.
///
/// Absence of an id is never an error; consumers fall back to
/// [`ClusterLabel::generic`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: HashMap<ClusterId, ClusterLabel>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ClusterId, label: ClusterLabel) {
        self.labels.insert(id, label);
    }

    pub fn get(&self, id: ClusterId) -> Option<&ClusterLabel> {
        self.labels.get(&id)
    }

    /// Label for `id`, or the generic fallback.
    pub fn get_or_generic(&self, id: ClusterId) -> ClusterLabel {
        self.get(id).cloned().unwrap_or_else(|| ClusterLabel::generic(id))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn extend(&mut self, other: LabelSet) {
        self.labels.extend(other.labels);
    }

    /// Entries sorted by cluster id.
    pub fn iter_sorted(&self) -> Vec<(ClusterId, &ClusterLabel)> {
        let mut entries: Vec<_> = self.labels.iter().map(|(id, l)| (*id, l)).collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}

impl FromIterator<(ClusterId, ClusterLabel)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (ClusterId, ClusterLabel)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
