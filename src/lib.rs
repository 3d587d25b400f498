//! chimed — always-on reminder scheduling daemon.
//!
//! Free-text shorthand ("in 1h 30m change laundry") becomes a concrete
//! fire instant; tasks live in a per-owner store that a once-per-second
//! sweep evaluates, firing, retiring, or rescheduling them. The whole
//! store persists as an atomic JSON snapshot after every mutation.

pub mod alerts;
pub mod commands;
pub mod config;
pub mod error;
pub mod taskmaster;
pub mod ticker;
pub mod timeparse;
pub mod tzprefs;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use alerts::{LogNotify, Notify, WebhookNotify};
use config::DaemonConfig;
use taskmaster::{persist, Taskmaster};
use tzprefs::TzPrefs;

/// Shared application state handed to the command layer and the tick driver.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub taskmaster: Arc<Taskmaster>,
    pub tzprefs: Arc<TzPrefs>,
    /// Where fired task messages are delivered.
    pub notifier: Arc<dyn Notify>,
}

impl AppContext {
    /// Load persisted state from the data dir and wire the alert sink.
    pub async fn init(config: DaemonConfig) -> Result<Self> {
        let taskmaster = persist::load(&config.store_path()).await?;
        let tzprefs = TzPrefs::load(config.tzprefs_path()).await?;
        let notifier: Arc<dyn Notify> = match &config.webhook_url {
            Some(url) => Arc::new(WebhookNotify::new(url.clone())),
            None => Arc::new(LogNotify),
        };
        info!(tasks = taskmaster.task_count().await, "task store loaded");

        Ok(Self {
            config: Arc::new(config),
            taskmaster: Arc::new(taskmaster),
            tzprefs: Arc::new(tzprefs),
            notifier,
        })
    }
}
