//! Descriptor to canonical key derivation.

use serde::{Deserialize, Serialize};

use crate::types::{CanonicalKey, EntityDescriptor, KeyGranularity};

/// Subtypes treated as non-taxonomical noise under
/// [`KeyPolicy::FlattenNoiseSubtypes`].
pub const NOISE_SUBTYPES: [&str; 2] = ["user", "system"];

/// Versioned normalization policy.
///
/// One policy value must be used for every key derived in a run: the keys
/// sent for embedding and the keys resolved through the merge map have to
/// agree, or merge lookups silently miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// `user`/`system` subtypes are suppressed, so `{ai, system, assistance}`
    /// becomes `ai>assistance`.
    #[default]
    FlattenNoiseSubtypes,
    /// Every non-empty subtype is kept as a taxonomy level.
    Taxonomic,
}

/// Short and full keys of one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorKeys {
    pub short: CanonicalKey,
    pub full: CanonicalKey,
}

impl KeyPolicy {
    /// Derive the key of `descriptor` at `granularity`. Pure and total.
    pub fn normalize(&self, descriptor: &EntityDescriptor, granularity: KeyGranularity) -> CanonicalKey {
        let entity_type = descriptor.entity_type.as_str();
        let subtype = self.effective_subtype(&descriptor.subtype);
        let feature = descriptor.feature.as_str();
        let full = granularity == KeyGranularity::Full;

        let raw = match (subtype.is_empty(), feature.is_empty()) {
            (true, true) => entity_type.to_string(),
            (true, false) if full => format!("{}>{}", entity_type, feature),
            (true, false) => format!("{}>{}", entity_type, head(feature)),
            (false, true) if full => format!("{}|{}", entity_type, subtype),
            (false, _) if full => format!("{}|{}>{}", entity_type, subtype, feature),
            (false, _) => format!("{}|{}", entity_type, head(subtype)),
        };

        CanonicalKey::new(sanitize(&raw))
    }

    /// Derive both granularities at once.
    pub fn keys(&self, descriptor: &EntityDescriptor) -> DescriptorKeys {
        DescriptorKeys {
            short: self.normalize(descriptor, KeyGranularity::Short),
            full: self.normalize(descriptor, KeyGranularity::Full),
        }
    }

    fn effective_subtype<'a>(&self, subtype: &'a str) -> &'a str {
        match self {
            KeyPolicy::FlattenNoiseSubtypes if NOISE_SUBTYPES.contains(&subtype) => "",
            _ => subtype,
        }
    }
}

/// Normalize with the default policy.
pub fn normalize(descriptor: &EntityDescriptor, granularity: KeyGranularity) -> CanonicalKey {
    KeyPolicy::default().normalize(descriptor, granularity)
}

fn head(value: &str) -> &str {
    value.split(':').next().unwrap_or(value)
}

fn sanitize(raw: &str) -> String {
    raw.replace(['-', ' '], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityType;

    fn d(t: EntityType, s: &str, f: &str) -> EntityDescriptor {
        EntityDescriptor::new(t, s, f)
    }

    fn both(desc: &EntityDescriptor) -> (String, String) {
        let keys = KeyPolicy::default().keys(desc);
        (keys.short.into_inner(), keys.full.into_inner())
    }

    #[test]
    fn test_type_only() {
        assert_eq!(both(&d(EntityType::Co, "", "")), ("co".into(), "co".into()));
    }

    #[test]
    fn test_feature_only_uses_feature_head() {
        let (short, full) = both(&d(EntityType::Human, "", "trust:calibrated"));
        assert_eq!(short, "human>trust");
        assert_eq!(full, "human>trust:calibrated");
    }

    #[test]
    fn test_subtype_only_uses_subtype_head() {
        let (short, full) = both(&d(EntityType::Human, "student:medical", ""));
        assert_eq!(short, "human|student");
        assert_eq!(full, "human|student:medical");
    }

    #[test]
    fn test_subtype_and_feature() {
        let (short, full) = both(&d(EntityType::Ai, "llm", "tutoring"));
        assert_eq!(short, "ai|llm");
        assert_eq!(full, "ai|llm>tutoring");
    }

    #[test]
    fn test_noise_subtype_flattened() {
        let desc = d(EntityType::Ai, "system", "assistance");
        assert_eq!(normalize(&desc, KeyGranularity::Full).as_str(), "ai>assistance");
        assert_eq!(normalize(&desc, KeyGranularity::Short).as_str(), "ai>assistance");

        let user = d(EntityType::Human, "user", "");
        assert_eq!(normalize(&user, KeyGranularity::Full).as_str(), "human");
    }

    #[test]
    fn test_noise_subtype_kept_under_taxonomic_policy() {
        let desc = d(EntityType::Ai, "system", "assistance");
        let key = KeyPolicy::Taxonomic.normalize(&desc, KeyGranularity::Full);
        assert_eq!(key.as_str(), "ai|system>assistance");
    }

    #[test]
    fn test_noise_subtype_match_is_exact() {
        let desc = d(EntityType::Human, "users", "trust");
        assert_eq!(normalize(&desc, KeyGranularity::Full).as_str(), "human|users>trust");
    }

    #[test]
    fn test_sanitization() {
        let desc = d(EntityType::Human, "high-school student", "self efficacy");
        assert_eq!(normalize(&desc, KeyGranularity::Full).as_str(), "human|high_school_student>self_efficacy");
        assert_eq!(normalize(&desc, KeyGranularity::Short).as_str(), "human|high_school_student");
    }

    #[test]
    fn test_perception_feature_preserved() {
        let desc = d(EntityType::Human, "", "#ai-competence");
        assert_eq!(normalize(&desc, KeyGranularity::Short).as_str(), "human>#ai_competence");
    }

    #[test]
    fn test_deterministic() {
        let desc = d(EntityType::Human, "student:medical", "learning:long-term");
        for granularity in [KeyGranularity::Short, KeyGranularity::Full] {
            assert_eq!(normalize(&desc, granularity), normalize(&desc, granularity));
        }
    }

    #[test]
    fn test_short_key_is_coarsening_of_full_key() {
        let cases = [
            d(EntityType::Human, "", ""),
            d(EntityType::Human, "", "trust:calibrated:high"),
            d(EntityType::Ai, "agent:autonomous", ""),
            d(EntityType::Co, "team:hybrid", "performance:speed"),
            d(EntityType::Ai, "system", "assistance:writing"),
        ];

        for desc in &cases {
            let (short, full) = both(desc);
            // Short key is the full key cut at the first ':' (feature-only
            // keys) or at the end of the first subtype segment.
            let cut = if full.contains('|') {
                full.find([':', '>']).unwrap_or(full.len())
            } else {
                full.find(':').unwrap_or(full.len())
            };
            assert_eq!(short, &full[..cut], "descriptor {:?}", desc);
        }
    }
}
