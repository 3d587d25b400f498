// SPDX-License-Identifier: MIT
//! Whole-store snapshot persistence.
//!
//! Written atomically: tmp file → rename, so an interrupted save never
//! leaves a torn snapshot behind.

use std::path::Path;

use anyhow::{Context as _, Result};
use tokio::fs;

use super::{codec, Taskmaster};

/// Load the store from `path`. A missing file is an empty store, not an
/// error; a corrupt one is surfaced so the operator notices before the
/// daemon overwrites it.
pub async fn load(path: &Path) -> Result<Taskmaster> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Taskmaster::new());
        }
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };
    let doc: codec::StoreDoc =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(Taskmaster::from_lists(codec::decode(doc)))
}

/// Overwrite the snapshot at `path` with the store's current contents.
pub async fn save(path: &Path, taskmaster: &Taskmaster) -> Result<()> {
    let doc = codec::encode(&taskmaster.snapshot().await);
    let json = serde_json::to_string_pretty(&doc).context("encode task snapshot")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .await
        .with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename {} into place", tmp_path.display()))?;
    Ok(())
}
