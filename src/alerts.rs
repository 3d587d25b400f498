// SPDX-License-Identifier: MIT
//! Alert delivery — where fired task messages go.
//!
//! The scheduler does not care how alerts reach their owner; it hands each
//! fired message to a [`Notify`] sink. Delivery failure never un-fires a
//! task — the store has already mutated by the time delivery starts.

use async_trait::async_trait;
use tracing::info;

use crate::taskmaster::OwnerId;

/// Render a fired task message as the alert text shown to the owner.
pub fn alert_text(message: &str) -> String {
    format!("Task time reached:\n{message}")
}

/// A delivery sink for fired task messages.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn deliver(&self, owner: OwnerId, alert: &str) -> anyhow::Result<()>;
}

/// Writes alerts to the log. The default sink, and the fallback when no
/// webhook is configured.
pub struct LogNotify;

#[async_trait]
impl Notify for LogNotify {
    async fn deliver(&self, owner: OwnerId, alert: &str) -> anyhow::Result<()> {
        info!(owner, alert, "task fired");
        Ok(())
    }
}

/// POSTs `{"owner": <id>, "alert": <text>}` to a configured URL.
pub struct WebhookNotify {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotify {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notify for WebhookNotify {
    async fn deliver(&self, owner: OwnerId, alert: &str) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&serde_json::json!({ "owner": owner, "alert": alert }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_text_prefixes_the_message() {
        assert_eq!(alert_text("water plants"), "Task time reached:\nwater plants");
    }
}
