//! Cluster label import.

use std::path::Path;

use tokio::io::AsyncReadExt;

use super::open_input;
use crate::error::{CausegraphError, CgResult};
use crate::labels::LabelRecord;
use crate::types::LabelSet;

/// Read a labels artifact (a JSON array of [`LabelRecord`]).
pub async fn read_labels(path: impl AsRef<Path>) -> CgResult<LabelSet> {
    let path = path.as_ref();
    let mut content = String::new();
    open_input(path).await?.read_to_string(&mut content).await?;

    let records: Vec<LabelRecord> = serde_json::from_str(&content)
        .map_err(|e| CausegraphError::parse(format!("{}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), labels = records.len(), "Loaded cluster labels");
    Ok(LabelSet::from(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClusterId;

    #[tokio::test]
    async fn test_read_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(
            &path,
            r#"[{"cluster_id": 3, "name": "Learners", "description": "Students", "member_count": 2, "members": ["human|student", "human|learner"]},
                {"cluster_id": 0, "name": "Models", "description": "LLMs"}]"#,
        )
        .unwrap();

        let labels = read_labels(&path).await.unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get(ClusterId(3)).unwrap().name, "Learners");
        assert_eq!(labels.get(ClusterId(0)).unwrap().description, "LLMs");
    }

    #[tokio::test]
    async fn test_read_labels_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, "{not an array").unwrap();
        assert!(read_labels(&path).await.is_err());
    }
}
