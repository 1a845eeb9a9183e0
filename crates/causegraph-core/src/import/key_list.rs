//! Plain-text key list, one key per line.

use std::collections::HashSet;
use std::path::Path;

use tokio::io::AsyncBufReadExt;

use super::{open_input, require_rows};
use crate::error::CgResult;
use crate::types::CanonicalKey;

/// Read distinct keys in file order. Blank lines are ignored.
pub async fn read_key_list(path: impl AsRef<Path>) -> CgResult<Vec<CanonicalKey>> {
    let path = path.as_ref();
    let mut lines = open_input(path).await?.lines();
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let key = line.trim();
        if !key.is_empty() && seen.insert(key.to_string()) {
            keys.push(CanonicalKey::from(key));
        }
    }

    require_rows(&keys, path)?;
    Ok(keys)
}
