//! Re-reading the clustering stage's own output tables.

use std::path::Path;

use super::{import_jsonl, open_input, require_rows};
use crate::error::CgResult;
use crate::types::{Cluster, ClusterSet, ClusteredKey, ClusteredKeys};

/// Read `clustered_keys.jsonl`.
pub async fn read_clustered_keys(path: impl AsRef<Path>) -> CgResult<ClusteredKeys> {
    let path = path.as_ref();
    let (rows, _) = import_jsonl(open_input(path).await?, |row: ClusteredKey| Ok(Some(row))).await?;
    require_rows(&rows, path)?;
    Ok(rows.into_iter().collect())
}

/// Read `merged_keys.jsonl`. An empty table is valid: nothing was clustered.
pub async fn read_clusters(path: impl AsRef<Path>) -> CgResult<ClusterSet> {
    let (rows, _) = import_jsonl(open_input(path.as_ref()).await?, |row: Cluster| Ok(Some(row))).await?;
    Ok(rows.into_iter().map(|c| (c.id, c)).collect())
}
