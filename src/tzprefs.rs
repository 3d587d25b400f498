//! Per-owner timezone preferences.
//!
//! A JSON object of owner ids (decimal strings) to IANA zone names, loaded
//! once at startup and rewritten atomically on change. The read contract is
//! deliberately soft: an absent or unrecognized zone name means "no
//! timezone set", never a hard failure.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono_tz::Tz;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::taskmaster::OwnerId;

pub struct TzPrefs {
    path: PathBuf,
    prefs: Mutex<BTreeMap<String, String>>,
}

impl TzPrefs {
    /// Load preferences from `path`; a missing file is an empty table.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let prefs = match fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        Ok(Self {
            path,
            prefs: Mutex::new(prefs),
        })
    }

    /// The owner's zone, if a valid preference exists.
    pub async fn get(&self, owner: OwnerId) -> Option<Tz> {
        let prefs = self.prefs.lock().await;
        let name = prefs.get(&owner.to_string())?;
        match name.parse() {
            Ok(tz) => Some(tz),
            Err(_) => {
                debug!(owner, %name, "stored timezone name no longer parses; treating as unset");
                None
            }
        }
    }

    /// The owner's stored zone name, valid or not.
    pub async fn zone_name(&self, owner: OwnerId) -> Option<String> {
        self.prefs.lock().await.get(&owner.to_string()).cloned()
    }

    /// Record a preference and rewrite the file (tmp → rename).
    pub async fn set(&self, owner: OwnerId, tz: Tz) -> Result<()> {
        let mut prefs = self.prefs.lock().await;
        prefs.insert(owner.to_string(), tz.name().to_string());

        let json = serde_json::to_string_pretty(&*prefs).context("encode timezone preferences")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("rename {} into place", tmp_path.display()))?;
        Ok(())
    }
}
