//! Key embedding table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::CanonicalKey;

/// One `(key, vector)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEmbedding {
    pub key: CanonicalKey,
    #[serde(rename = "embedding")]
    pub vector: Vec<f32>,
}

impl KeyEmbedding {
    pub fn new(key: impl Into<CanonicalKey>, vector: Vec<f32>) -> Self {
        Self {
            key: key.into(),
            vector,
        }
    }
}

/// Key vectors aligned with a vocabulary, ready for clustering.
#[derive(Debug, Clone, Default)]
pub struct AlignedEmbeddings {
    pub keys: Vec<CanonicalKey>,
    pub vectors: Vec<Vec<f32>>,
    /// Vocabulary keys with no vector; they stay unclustered.
    pub missing: Vec<CanonicalKey>,
}

/// Ordered key -> vector table. The first vector seen for a key wins.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingTable {
    entries: Vec<KeyEmbedding>,
    index: HashMap<CanonicalKey, usize>,
}

impl EmbeddingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present. Returns whether it was added.
    pub fn insert(&mut self, embedding: KeyEmbedding) -> bool {
        if self.index.contains_key(&embedding.key) {
            return false;
        }
        self.index.insert(embedding.key.clone(), self.entries.len());
        self.entries.push(embedding);
        true
    }

    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.index.get(key).map(|&i| self.entries[i].vector.as_slice())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyEmbedding> {
        self.entries.iter()
    }

    /// All keys and vectors in table order.
    pub fn aligned(&self) -> AlignedEmbeddings {
        AlignedEmbeddings {
            keys: self.entries.iter().map(|e| e.key.clone()).collect(),
            vectors: self.entries.iter().map(|e| e.vector.clone()).collect(),
            missing: Vec::new(),
        }
    }

    /// Vectors for `vocabulary`, in vocabulary order.
    pub fn aligned_to(&self, vocabulary: &[CanonicalKey]) -> AlignedEmbeddings {
        let mut aligned = AlignedEmbeddings::default();
        for key in vocabulary {
            match self.get(key) {
                Some(v) => {
                    aligned.keys.push(key.clone());
                    aligned.vectors.push(v.to_vec());
                }
                None => aligned.missing.push(key.clone()),
            }
        }
        aligned
    }
}

impl FromIterator<KeyEmbedding> for EmbeddingTable {
    fn from_iter<I: IntoIterator<Item = KeyEmbedding>>(iter: I) -> Self {
        let mut table = EmbeddingTable::new();
        for e in iter {
            table.insert(e);
        }
        table
    }
}
