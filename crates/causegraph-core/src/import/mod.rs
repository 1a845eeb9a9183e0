//! Readers for the pipeline's input artifacts.
//!
//! Every JSONL reader streams line by line. Malformed lines are logged,
//! counted in [`ImportStats`] and skipped; they never abort an import.
//! A missing file, or one that yields nothing usable, is a
//! [`CausegraphError::MissingInput`] since no later stage can run without it.
//!
//! # Example
//!
//! ```ignore
//! use causegraph_core::import::read_records;
//!
//! let (records, stats) = read_records("data/triplets/triplets.jsonl").await?;
//! println!("Imported {}/{}", stats.imported, stats.total);
//! ```

mod embeddings;
mod key_list;
mod labels;
mod records;
mod tables;

pub use embeddings::{decode_vector, embeddings_from_reader, read_embeddings};
pub use key_list::read_key_list;
pub use labels::read_labels;
pub use records::{read_records, records_from_reader, RawRecord};
pub use tables::{read_clustered_keys, read_clusters};

use std::path::Path;

use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::error::{CausegraphError, CgResult};

/// Statistics from an import operation.
#[derive(Debug, Default, Clone)]
pub struct ImportStats {
    /// Non-empty lines processed.
    pub total: u64,
    /// Rows kept.
    pub imported: u64,
    /// Rows dropped (malformed or duplicate).
    pub skipped: u64,
    /// One message per dropped row.
    pub errors: Vec<String>,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if every line was kept.
    pub fn is_success(&self) -> bool {
        self.skipped == 0
    }

    fn skip(&mut self, line: u64, reason: impl std::fmt::Display) {
        warn!("Skipping line {}: {}", line, reason);
        self.skipped += 1;
        self.errors.push(format!("line {}: {}", line, reason));
    }
}

/// Open an input artifact, mapping a missing file to `MissingInput`.
pub(crate) async fn open_input(path: &Path) -> CgResult<BufReader<File>> {
    match File::open(path).await {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CausegraphError::missing_input(format!(
            "{} does not exist",
            path.display()
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Stream JSONL rows of `T`, converting each with `convert`.
///
/// Rows that fail to parse or convert are skipped. `convert` returning
/// `Ok(None)` also skips the row without counting it as an error.
pub(crate) async fn import_jsonl<R, T, U, F>(mut reader: R, mut convert: F) -> CgResult<(Vec<U>, ImportStats)>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
    F: FnMut(T) -> CgResult<Option<U>>,
{
    let mut stats = ImportStats::new();
    let mut rows = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0u64;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                stats.total += 1;
                stats.skip(line_no, format!("invalid UTF-8: {}", e));
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        stats.total += 1;

        let parsed = match serde_json::from_str::<T>(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                stats.skip(line_no, format!("parse error: {}", e));
                continue;
            }
        };

        match convert(parsed) {
            Ok(Some(row)) => {
                rows.push(row);
                stats.imported += 1;
            }
            Ok(None) => stats.skipped += 1,
            Err(e) => stats.skip(line_no, e),
        }
    }

    Ok((rows, stats))
}

/// Fail with `MissingInput` when an artifact produced no rows.
pub(crate) fn require_rows<T>(rows: &[T], path: &Path) -> CgResult<()> {
    if rows.is_empty() {
        return Err(CausegraphError::empty_input(format!(
            "{} contains no usable rows",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, Deserialize)]
    struct Row {
        id: u32,
    }

    #[tokio::test]
    async fn test_import_skips_blank_and_malformed_lines() {
        let jsonl = "{\"id\":1}\n\nnot json\n{\"id\":2}\n{\"id\":3}\n";
        let reader = BufReader::new(Cursor::new(jsonl));

        let (rows, stats) = import_jsonl(reader, |row: Row| {
            if row.id == 3 {
                Err(CausegraphError::malformed("three is rejected"))
            } else {
                Ok(Some(row.id))
            }
        })
        .await
        .unwrap();

        assert_eq!(rows, vec![1, 2]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.imported, 2);
        assert_eq!(stats.skipped, 2);
        assert!(stats.errors[0].starts_with("line 3: parse error"));
        assert!(stats.errors[1].contains("three is rejected"));
        assert!(!stats.is_success());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let mut bytes = b"{\"id\":1}\n".to_vec();
        bytes.extend_from_slice(b"{\"id\":\xff}\n");
        bytes.extend_from_slice(b"{\"id\":2}");
        let reader = BufReader::new(Cursor::new(bytes));

        let (rows, stats) = import_jsonl(reader, |row: Row| Ok(Some(row.id))).await.unwrap();

        assert_eq!(rows, vec![1, 2]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.skipped, 1);
        assert!(stats.errors[0].starts_with("line 2: invalid UTF-8"));
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_input(&dir.path().join("absent.jsonl")).await.unwrap_err();
        assert!(matches!(err, CausegraphError::MissingInput { .. }));
        assert!(err.is_fatal());
    }
}
