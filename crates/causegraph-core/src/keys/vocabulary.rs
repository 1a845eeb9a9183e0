//! Key vocabulary derived from a record set.

use std::collections::HashSet;

use super::KeyPolicy;
use crate::types::{CanonicalKey, KeyGranularity, RelationshipRecord};

/// Distinct short keys of every cause and effect, in first-seen order.
///
/// This is the key list sent to the embedding service; it must be built
/// with the same policy used later when records are resolved.
pub fn key_vocabulary(records: &[RelationshipRecord], policy: KeyPolicy) -> Vec<CanonicalKey> {
    let mut seen = HashSet::new();
    let mut vocabulary = Vec::new();

    for record in records {
        for descriptor in [&record.cause, &record.effect] {
            let key = policy.normalize(descriptor, KeyGranularity::Short);
            if seen.insert(key.clone()) {
                vocabulary.push(key);
            }
        }
    }

    vocabulary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityDescriptor, EntityType};

    #[test]
    fn test_vocabulary_is_distinct_and_ordered() {
        let records = vec![
            RelationshipRecord::new(
                EntityDescriptor::new(EntityType::Human, "student", "learning"),
                "INCREASES",
                EntityDescriptor::new(EntityType::Ai, "llm", "tutoring"),
            ),
            RelationshipRecord::new(
                EntityDescriptor::new(EntityType::Human, "student:medical", "learning"),
                "INCREASES",
                EntityDescriptor::new(EntityType::Ai, "system", "feedback"),
            ),
        ];

        let vocab = key_vocabulary(&records, KeyPolicy::default());
        let keys: Vec<&str> = vocab.iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["human|student", "ai|llm", "ai>feedback"]);
    }

    #[test]
    fn test_vocabulary_follows_policy() {
        let records = vec![RelationshipRecord::new(
            EntityDescriptor::new(EntityType::Human, "user", "trust"),
            "AFFECTS",
            EntityDescriptor::new(EntityType::Ai, "", ""),
        )];

        let flat = key_vocabulary(&records, KeyPolicy::FlattenNoiseSubtypes);
        let tax = key_vocabulary(&records, KeyPolicy::Taxonomic);
        assert_eq!(flat[0].as_str(), "human>trust");
        assert_eq!(tax[0].as_str(), "human|user");
        assert_eq!(flat[1].as_str(), "ai");
    }
}
