//! Key embedding import.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncBufRead;
use tracing::info;

use super::{import_jsonl, open_input, ImportStats};
use crate::embedding::{EmbeddingTable, KeyEmbedding};
use crate::error::{CausegraphError, CgResult};

#[derive(Debug, Deserialize)]
struct RawEmbedding {
    key: String,
    embedding: Value,
}

/// Decode an embedding cell.
///
/// Accepts a list of numbers, a list wrapping a single list, or either of
/// those encoded as a JSON string.
pub fn decode_vector(value: Value) -> CgResult<Vec<f32>> {
    decode(value, true)
}

fn decode(value: Value, allow_string: bool) -> CgResult<Vec<f32>> {
    match value {
        Value::String(s) if allow_string => {
            let inner: Value = serde_json::from_str(&s)
                .map_err(|e| CausegraphError::invalid_vector(format!("embedding string is not JSON: {}", e)))?;
            decode(inner, false)
        }
        Value::Array(mut items) => {
            if items.len() == 1 && items[0].is_array() {
                return decode(items.remove(0), false);
            }
            if items.is_empty() {
                return Err(CausegraphError::invalid_vector("embedding is empty"));
            }
            items
                .iter()
                .map(|v| {
                    v.as_f64()
                        .map(|x| x as f32)
                        .ok_or_else(|| CausegraphError::invalid_vector(format!("non-numeric component {}", v)))
                })
                .collect()
        }
        other => Err(CausegraphError::invalid_vector(format!(
            "unsupported embedding value {}",
            other
        ))),
    }
}

/// Parse an embedding table from any JSONL source. Later duplicates of a
/// key are skipped.
pub async fn embeddings_from_reader<R>(reader: R) -> CgResult<(EmbeddingTable, ImportStats)>
where
    R: AsyncBufRead + Unpin,
{
    let mut table = EmbeddingTable::new();
    let (_, stats) = import_jsonl(reader, |raw: RawEmbedding| {
        let key = raw.key.trim();
        if key.is_empty() {
            return Err(CausegraphError::malformed("embedding row has an empty key"));
        }
        let vector = decode_vector(raw.embedding)?;
        Ok(table.insert(KeyEmbedding::new(key, vector)).then_some(()))
    })
    .await?;
    Ok((table, stats))
}

/// Read the embedding artifact. Missing or empty input is fatal.
pub async fn read_embeddings(path: impl AsRef<Path>) -> CgResult<(EmbeddingTable, ImportStats)> {
    let path = path.as_ref();
    let (table, stats) = embeddings_from_reader(open_input(path).await?).await?;
    if table.is_empty() {
        return Err(CausegraphError::empty_input(format!(
            "{} contains no usable embeddings",
            path.display()
        )));
    }
    info!(
        path = %path.display(),
        keys = table.len(),
        skipped = stats.skipped,
        "Loaded key embeddings"
    );
    Ok((table, stats))
}
