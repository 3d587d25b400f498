//! Snapshot wire format — the task store as a JSON document.
//!
//! An object keyed by owner ids as decimal strings, each an array of
//! `{ "when": <ISO-8601 UTC>, "message": <string>, "interval"?: <name> }`.
//! Presence of `interval` is the single discriminant between a recurring
//! and a one-shot task.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::task::{Interval, Task, TaskKind};
use super::OwnerId;

/// One task on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDoc {
    pub when: DateTime<Utc>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
}

/// The whole store on the wire. BTreeMap keeps snapshot key order stable
/// across saves so unchanged stores serialize byte-identically.
pub type StoreDoc = BTreeMap<String, Vec<TaskDoc>>;

pub fn encode(lists: &HashMap<OwnerId, Vec<Task>>) -> StoreDoc {
    lists
        .iter()
        .map(|(owner, tasks)| {
            let docs = tasks
                .iter()
                .map(|task| TaskDoc {
                    when: task.when,
                    message: task.message.clone(),
                    interval: match task.kind {
                        TaskKind::Once => None,
                        TaskKind::Recurring { interval } => Some(interval),
                    },
                })
                .collect();
            (owner.to_string(), docs)
        })
        .collect()
}

pub fn decode(doc: StoreDoc) -> HashMap<OwnerId, Vec<Task>> {
    let mut lists = HashMap::new();
    for (key, docs) in doc {
        let owner: OwnerId = match key.parse() {
            Ok(owner) => owner,
            Err(_) => {
                warn!(%key, "skipping snapshot entry with non-numeric owner id");
                continue;
            }
        };
        let tasks: Vec<Task> = docs
            .into_iter()
            .map(|doc| match doc.interval {
                Some(interval) => Task::recurring(doc.when, doc.message, interval),
                None => Task::once(doc.when, doc.message),
            })
            .collect();
        if !tasks.is_empty() {
            lists.insert(owner, tasks);
        }
    }
    lists
}
