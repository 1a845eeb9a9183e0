//! Entity descriptors produced by the upstream triplet extractor.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{CausegraphError, CgResult};

/// Base type of an entity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EntityType {
    Human,
    Ai,
    Co,
}

impl EntityType {
    /// All entity types in root order.
    pub fn all() -> impl Iterator<Item = EntityType> {
        EntityType::iter()
    }

    /// Lowercase name, also the bare key for a descriptor with no detail.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Human => "human",
            EntityType::Ai => "ai",
            EntityType::Co => "co",
        }
    }

    /// Base type encoded in a canonical key (text before the first `|` or `>`).
    pub fn of_key(key: &str) -> Option<EntityType> {
        let head = key.split(['|', '>']).next().unwrap_or(key);
        head.parse().ok()
    }
}

/// Structured `{type, subtype, feature}` descriptor of a cause or effect.
///
/// Empty `subtype`/`feature` are valid and mean "not specified".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityDescriptor {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub feature: String,
}

impl EntityDescriptor {
    /// Create a descriptor, trimming surrounding whitespace.
    pub fn new(
        entity_type: EntityType,
        subtype: impl Into<String>,
        feature: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            subtype: subtype.into().trim().to_string(),
            feature: feature.into().trim().to_string(),
        }
    }

    /// A perception/belief feature is marked with a leading `#`.
    pub fn is_perception(&self) -> bool {
        self.feature.starts_with('#')
    }
}

/// Loosely-typed descriptor as it appears in input rows.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDescriptor {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub feature: Option<String>,
}

impl TryFrom<RawDescriptor> for EntityDescriptor {
    type Error = CausegraphError;

    fn try_from(raw: RawDescriptor) -> CgResult<Self> {
        let type_str = raw
            .entity_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CausegraphError::malformed("descriptor has no type"))?;

        let entity_type: EntityType = type_str
            .parse()
            .map_err(|_| CausegraphError::malformed(format!("unknown entity type '{}'", type_str)))?;

        Ok(EntityDescriptor::new(
            entity_type,
            raw.subtype.unwrap_or_default(),
            raw.feature.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(t: Option<&str>, s: Option<&str>, f: Option<&str>) -> RawDescriptor {
        RawDescriptor {
            entity_type: t.map(String::from),
            subtype: s.map(String::from),
            feature: f.map(String::from),
        }
    }

    #[test]
    fn test_entity_type_parse_case_insensitive() {
        assert_eq!("Human".parse::<EntityType>().unwrap(), EntityType::Human);
        assert_eq!("AI".parse::<EntityType>().unwrap(), EntityType::Ai);
        assert_eq!(EntityType::Co.to_string(), "co");
        assert!("robot".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_type_of_key() {
        assert_eq!(EntityType::of_key("human|student"), Some(EntityType::Human));
        assert_eq!(EntityType::of_key("ai>assistance"), Some(EntityType::Ai));
        assert_eq!(EntityType::of_key("co"), Some(EntityType::Co));
        assert_eq!(EntityType::of_key("robot>arm"), None);
    }

    #[test]
    fn test_raw_descriptor_nulls_become_empty() {
        let d = EntityDescriptor::try_from(raw(Some(" ai "), None, Some(" tutoring "))).unwrap();
        assert_eq!(d.entity_type, EntityType::Ai);
        assert_eq!(d.subtype, "");
        assert_eq!(d.feature, "tutoring");
    }

    #[test]
    fn test_raw_descriptor_rejects_unknown_type() {
        assert!(EntityDescriptor::try_from(raw(Some("robot"), None, None)).is_err());
        assert!(EntityDescriptor::try_from(raw(None, Some("x"), None)).is_err());
        assert!(EntityDescriptor::try_from(raw(Some("  "), None, None)).is_err());
    }

    #[test]
    fn test_perception_feature_kept_verbatim() {
        let d = EntityDescriptor::new(EntityType::Human, "", "#trust");
        assert!(d.is_perception());
        assert_eq!(d.feature, "#trust");
    }
}
