//! Taskmaster — per-owner task lists and the tick-driven sweep.
//!
//! The whole store sits behind one async mutex: command mutations and the
//! periodic sweep are mutually exclusive, so a command can never observe a
//! half-finished sweep.

pub mod codec;
pub mod persist;
pub mod task;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::TaskError;
use task::Task;

/// Owner identity — the opaque integer task lists and timezone preferences
/// are keyed by.
pub type OwnerId = u64;

/// The task store. Per-owner lists keep insertion order; sorting for
/// display is the caller's job.
pub struct Taskmaster {
    lists: Mutex<HashMap<OwnerId, Vec<Task>>>,
}

impl Taskmaster {
    pub fn new() -> Self {
        Self {
            lists: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn from_lists(lists: HashMap<OwnerId, Vec<Task>>) -> Self {
        Self {
            lists: Mutex::new(lists),
        }
    }

    /// Append a task to its owner's list, creating the list if absent.
    /// No dedup, no sort.
    pub async fn add_task(&self, owner: OwnerId, task: Task) {
        let mut lists = self.lists.lock().await;
        lists.entry(owner).or_default().push(task);
    }

    /// Snapshot of an owner's list in stored order; `None` when the owner
    /// has no tasks.
    pub async fn tasks_for(&self, owner: OwnerId) -> Option<Vec<Task>> {
        self.lists.lock().await.get(&owner).cloned()
    }

    /// Remove by 1-based position in the fire-time-sorted view of the
    /// owner's list. Out of range leaves the store untouched.
    pub async fn remove_task(
        &self,
        owner: OwnerId,
        display_index: usize,
    ) -> Result<Task, TaskError> {
        let mut lists = self.lists.lock().await;
        let out_of_range = TaskError::IndexOutOfRange {
            index: display_index,
        };

        let tasks = lists.get_mut(&owner).ok_or(out_of_range.clone())?;
        if display_index == 0 || display_index > tasks.len() {
            return Err(out_of_range);
        }

        // Map the display position back to the stored position. The sort is
        // stable, so equal fire times keep their stored order.
        let mut order: Vec<usize> = (0..tasks.len()).collect();
        order.sort_by_key(|&i| tasks[i].when);
        let removed = tasks.remove(order[display_index - 1]);

        if tasks.is_empty() {
            lists.remove(&owner);
        }
        Ok(removed)
    }

    /// One sweep: tick every task of every owner against `now`, evict the
    /// dead, drop emptied owners. Returns fired messages per owner in
    /// stored order, only for owners that had at least one firing.
    pub async fn update(&self, now: DateTime<Utc>) -> HashMap<OwnerId, Vec<String>> {
        let mut lists = self.lists.lock().await;
        let mut fired: HashMap<OwnerId, Vec<String>> = HashMap::new();

        for (owner, tasks) in lists.iter_mut() {
            let mut messages = Vec::new();
            for task in tasks.iter_mut() {
                if let Some(message) = task.tick(now) {
                    messages.push(message);
                }
            }
            // Stable filter over the sweep's snapshot — survivors keep
            // their relative order no matter how many neighbors died.
            tasks.retain(|task| !task.kill);
            if !messages.is_empty() {
                debug!(owner, count = messages.len(), "tasks fired");
                fired.insert(*owner, messages);
            }
        }

        lists.retain(|_, tasks| !tasks.is_empty());
        fired
    }

    /// Clone of the full store, for encoding a snapshot.
    pub async fn snapshot(&self) -> HashMap<OwnerId, Vec<Task>> {
        self.lists.lock().await.clone()
    }

    /// Total live tasks across all owners.
    pub async fn task_count(&self) -> usize {
        self.lists.lock().await.values().map(Vec::len).sum()
    }
}

impl Default for Taskmaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::task::Interval;
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn update_before_due_fires_nothing_and_mutates_nothing() {
        let tm = Taskmaster::new();
        tm.add_task(1, Task::once(utc(2024, 6, 1, 9), "a")).await;
        tm.add_task(1, Task::recurring(utc(2024, 6, 2, 9), "b", Interval::Daily))
            .await;
        let before = tm.snapshot().await;

        let fired = tm.update(utc(2024, 5, 31, 23)).await;
        assert!(fired.is_empty());
        assert_eq!(tm.snapshot().await, before);
    }

    #[tokio::test]
    async fn update_fires_in_stored_order_and_evicts_dead() {
        let tm = Taskmaster::new();
        // Stored out of time order on purpose: firing order follows
        // storage, not fire time.
        tm.add_task(1, Task::once(utc(2024, 6, 1, 12), "later")).await;
        tm.add_task(1, Task::once(utc(2024, 6, 1, 9), "earlier")).await;
        tm.add_task(1, Task::recurring(utc(2024, 6, 1, 10), "repeat", Interval::Daily))
            .await;

        let fired = tm.update(utc(2024, 6, 1, 12)).await;
        assert_eq!(
            fired[&1],
            vec!["later".to_string(), "earlier".to_string(), "repeat".to_string()]
        );

        // Both one-shots died in the same sweep; the recurring survives.
        let tasks = tm.tasks_for(1).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].message, "repeat");
        assert_eq!(tasks[0].when, utc(2024, 6, 2, 10));
    }

    #[tokio::test]
    async fn emptied_owner_is_dropped() {
        let tm = Taskmaster::new();
        tm.add_task(1, Task::once(utc(2024, 6, 1, 9), "only")).await;
        tm.update(utc(2024, 6, 1, 9)).await;
        assert!(tm.tasks_for(1).await.is_none());
        assert_eq!(tm.task_count().await, 0);
    }

    #[tokio::test]
    async fn update_returns_only_owners_that_fired() {
        let tm = Taskmaster::new();
        tm.add_task(1, Task::once(utc(2024, 6, 1, 9), "due")).await;
        tm.add_task(2, Task::once(utc(2024, 6, 2, 9), "not yet")).await;

        let fired = tm.update(utc(2024, 6, 1, 10)).await;
        assert!(fired.contains_key(&1));
        assert!(!fired.contains_key(&2));
        assert!(tm.tasks_for(2).await.is_some());
    }

    #[tokio::test]
    async fn remove_uses_time_sorted_display_index() {
        let tm = Taskmaster::new();
        tm.add_task(1, Task::once(utc(2024, 6, 1, 12), "noon")).await;
        tm.add_task(1, Task::once(utc(2024, 6, 1, 9), "morning")).await;

        // Display position 1 is the earliest fire time, not the first
        // stored entry.
        let removed = tm.remove_task(1, 1).await.unwrap();
        assert_eq!(removed.message, "morning");

        let left = tm.tasks_for(1).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, "noon");
    }

    #[tokio::test]
    async fn remove_out_of_range_leaves_store_unchanged() {
        let tm = Taskmaster::new();
        tm.add_task(1, Task::once(utc(2024, 6, 1, 9), "only")).await;
        let before = tm.snapshot().await;

        let err = tm.remove_task(1, 2).await.unwrap_err();
        assert_eq!(err, TaskError::IndexOutOfRange { index: 2 });
        let err = tm.remove_task(1, 0).await.unwrap_err();
        assert_eq!(err, TaskError::IndexOutOfRange { index: 0 });
        let err = tm.remove_task(99, 1).await.unwrap_err();
        assert_eq!(err, TaskError::IndexOutOfRange { index: 1 });

        assert_eq!(tm.snapshot().await, before);
    }

    #[tokio::test]
    async fn remove_last_task_drops_owner() {
        let tm = Taskmaster::new();
        tm.add_task(1, Task::once(utc(2024, 6, 1, 9), "only")).await;
        tm.remove_task(1, 1).await.unwrap();
        assert!(tm.tasks_for(1).await.is_none());
    }
}
