//! Causal relationship records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::EntityDescriptor;

/// Net direction of a causal effect.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NetOutcome {
    Positive,
    Negative,
    Neutral,
    #[default]
    Undetermined,
}

/// Provenance of a record. Every field is optional; unresolved ids only
/// reduce displayable context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finding: Option<String>,
}

impl SourceRef {
    pub fn new(paper_id: impl Into<String>) -> Self {
        Self {
            paper_id: Some(paper_id.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.paper_title = Some(title.into());
        self
    }

    pub fn with_finding(mut self, finding: impl Into<String>) -> Self {
        self.finding = Some(finding.into());
        self
    }
}

/// One extracted `cause -> relationship -> effect` instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub cause: EntityDescriptor,
    pub relationship: String,
    pub effect: EntityDescriptor,
    #[serde(default)]
    pub net_outcome: NetOutcome,
    #[serde(default)]
    pub source: SourceRef,
}

impl RelationshipRecord {
    pub fn new(
        cause: EntityDescriptor,
        relationship: impl Into<String>,
        effect: EntityDescriptor,
    ) -> Self {
        Self {
            cause,
            relationship: relationship.into(),
            effect,
            net_outcome: NetOutcome::default(),
            source: SourceRef::default(),
        }
    }

    pub fn with_outcome(mut self, outcome: NetOutcome) -> Self {
        self.net_outcome = outcome;
        self
    }

    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = source;
        self
    }
}
