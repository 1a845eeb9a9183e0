//! Writers for the pipeline's output artifacts.
//!
//! Tables are JSON Lines (one object per line); the label table and the
//! graph are single JSON documents.
//!
//! # Example
//!
//! ```ignore
//! use causegraph_core::export::{write_clustered_keys, ArtifactLayout};
//!
//! let layout = ArtifactLayout::new("data/graph");
//! let stats = write_clustered_keys(layout.clustered_keys(), &clustered).await?;
//! println!("Exported {} rows", stats.exported);
//! ```

mod tables;

pub use tables::{
    write_clustered_keys, write_clusters, write_embeddings, write_graph, write_key_list, write_labels,
};

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::CgResult;

/// Statistics from an export operation.
#[derive(Debug, Default, Clone)]
pub struct ExportStats {
    /// Rows processed.
    pub total: u64,
    /// Rows written.
    pub exported: u64,
    /// Error messages for rows that could not be serialized.
    pub errors: Vec<String>,
}

impl ExportStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if export completed without errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.total == self.exported
    }
}

/// File names of every artifact under one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_list(&self) -> PathBuf {
        self.dir.join("keys.txt")
    }

    pub fn embeddings(&self) -> PathBuf {
        self.dir.join("embeddings.jsonl")
    }

    pub fn clustered_keys(&self) -> PathBuf {
        self.dir.join("clustered_keys.jsonl")
    }

    pub fn merged_keys(&self) -> PathBuf {
        self.dir.join("merged_keys.jsonl")
    }

    pub fn labels(&self) -> PathBuf {
        self.dir.join("cluster_labels.json")
    }

    pub fn graph(&self) -> PathBuf {
        self.dir.join("graph.json")
    }
}

/// Write serializable rows as JSON Lines.
///
/// A row that fails to serialize is recorded in the stats and skipped;
/// I/O errors abort the export.
pub async fn export_jsonl<W, T, I>(rows: I, writer: W) -> CgResult<ExportStats>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut stats = ExportStats::new();
    let mut writer = BufWriter::new(writer);

    for row in rows {
        stats.total += 1;
        match serde_json::to_string(&row) {
            Ok(json) => {
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                stats.exported += 1;
            }
            Err(e) => {
                stats.errors.push(format!("Serialization error at row {}: {}", stats.total, e));
            }
        }
    }

    writer.flush().await?;
    Ok(stats)
}
