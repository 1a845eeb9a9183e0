//! Path-based artifact writers.

use std::path::Path;

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{export_jsonl, ExportStats};
use crate::embedding::EmbeddingTable;
use crate::error::CgResult;
use crate::graph::KnowledgeGraph;
use crate::labels::LabelRecord;
use crate::types::{CanonicalKey, ClusterSet, ClusteredKeys};

async fn create(path: &Path) -> CgResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    Ok(File::create(path).await?)
}

async fn write_all(path: &Path, content: &[u8]) -> CgResult<()> {
    let mut file = create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    Ok(())
}

/// Write one key per line.
pub async fn write_key_list(path: impl AsRef<Path>, keys: &[CanonicalKey]) -> CgResult<()> {
    let path = path.as_ref();
    let mut content = String::new();
    for key in keys {
        content.push_str(key);
        content.push('\n');
    }
    write_all(path, content.as_bytes()).await?;
    info!(path = %path.display(), keys = keys.len(), "Wrote key list");
    Ok(())
}

/// Write `{"key", "embedding"}` rows in table order.
pub async fn write_embeddings(path: impl AsRef<Path>, table: &EmbeddingTable) -> CgResult<ExportStats> {
    let path = path.as_ref();
    let stats = export_jsonl(table.iter(), create(path).await?).await?;
    info!(path = %path.display(), rows = stats.exported, "Wrote embeddings");
    Ok(stats)
}

/// Write `{"key", "cluster"}` rows, `-1` for noise.
pub async fn write_clustered_keys(path: impl AsRef<Path>, clustered: &ClusteredKeys) -> CgResult<ExportStats> {
    let path = path.as_ref();
    let stats = export_jsonl(clustered.iter(), create(path).await?).await?;
    info!(path = %path.display(), rows = stats.exported, "Wrote clustered keys");
    Ok(stats)
}

/// Write `{"cluster", "representative", "members"}` rows in id order.
pub async fn write_clusters(path: impl AsRef<Path>, clusters: &ClusterSet) -> CgResult<ExportStats> {
    let path = path.as_ref();
    let stats = export_jsonl(clusters.values(), create(path).await?).await?;
    info!(path = %path.display(), clusters = stats.exported, "Wrote merged keys");
    Ok(stats)
}

/// Write the label table as a JSON array.
pub async fn write_labels(path: impl AsRef<Path>, records: &[LabelRecord]) -> CgResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(records)?;
    write_all(path, json.as_bytes()).await?;
    info!(path = %path.display(), labels = records.len(), "Wrote cluster labels");
    Ok(())
}

/// Write the node-link graph document.
pub async fn write_graph(path: impl AsRef<Path>, graph: &KnowledgeGraph) -> CgResult<()> {
    let path = path.as_ref();
    let json = graph.to_json_pretty()?;
    write_all(path, json.as_bytes()).await?;
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Wrote graph"
    );
    Ok(())
}
