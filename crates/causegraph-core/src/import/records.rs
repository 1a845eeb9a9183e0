//! Relationship record import.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncBufRead;
use tracing::info;

use super::{import_jsonl, open_input, require_rows, ImportStats};
use crate::error::{CausegraphError, CgResult};
use crate::types::{EntityDescriptor, NetOutcome, RawDescriptor, RelationshipRecord, SourceRef};

/// A record line as written by the extraction stage.
///
/// `cause` and `effect` arrive either as nested objects or as JSON encoded
/// strings (tabular exports store them that way).
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "paper-id")]
    pub paper_id: Option<Value>,
    #[serde(default)]
    pub paper_title: Option<String>,
    #[serde(default)]
    pub finding: Option<String>,
    pub cause: Value,
    #[serde(alias = "relation")]
    pub relationship: Option<String>,
    pub effect: Value,
    #[serde(default)]
    pub net_outcome: Option<String>,
}

impl TryFrom<RawRecord> for RelationshipRecord {
    type Error = CausegraphError;

    fn try_from(raw: RawRecord) -> CgResult<Self> {
        let cause = descriptor(raw.cause).map_err(|e| CausegraphError::malformed(format!("cause: {}", e)))?;
        let effect = descriptor(raw.effect).map_err(|e| CausegraphError::malformed(format!("effect: {}", e)))?;

        let relationship = raw
            .relationship
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| CausegraphError::malformed("record has no relationship"))?;

        let net_outcome = match raw.net_outcome.as_deref().map(str::trim) {
            None | Some("") => NetOutcome::default(),
            Some(s) => s
                .parse()
                .map_err(|_| CausegraphError::malformed(format!("unknown net_outcome '{}'", s)))?,
        };

        let source = SourceRef {
            paper_id: raw.paper_id.and_then(scalar_string),
            paper_title: raw.paper_title.filter(|t| !t.is_empty()),
            finding: raw.finding.filter(|f| !f.is_empty()),
        };

        Ok(RelationshipRecord::new(cause, relationship, effect)
            .with_outcome(net_outcome)
            .with_source(source))
    }
}

fn descriptor(value: Value) -> CgResult<EntityDescriptor> {
    let raw: RawDescriptor = match value {
        Value::String(s) => serde_json::from_str(&s)
            .map_err(|e| CausegraphError::malformed(format!("descriptor is not valid JSON: {}", e)))?,
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| CausegraphError::malformed(format!("invalid descriptor: {}", e)))?,
        Value::Null => return Err(CausegraphError::malformed("descriptor is missing")),
        other => {
            return Err(CausegraphError::malformed(format!(
                "descriptor must be an object, got {}",
                other
            )))
        }
    };
    EntityDescriptor::try_from(raw)
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse records from any JSONL source.
pub async fn records_from_reader<R>(reader: R) -> CgResult<(Vec<RelationshipRecord>, ImportStats)>
where
    R: AsyncBufRead + Unpin,
{
    import_jsonl(reader, |raw: RawRecord| RelationshipRecord::try_from(raw).map(Some)).await
}

/// Read the record artifact. Missing or empty input is fatal.
pub async fn read_records(path: impl AsRef<Path>) -> CgResult<(Vec<RelationshipRecord>, ImportStats)> {
    let path = path.as_ref();
    let (records, stats) = records_from_reader(open_input(path).await?).await?;
    require_rows(&records, path)?;
    info!(
        path = %path.display(),
        imported = stats.imported,
        skipped = stats.skipped,
        "Loaded relationship records"
    );
    Ok((records, stats))
}
