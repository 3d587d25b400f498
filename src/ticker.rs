// SPDX-License-Identifier: MIT
//! The clock driver — periodic sweeps over the task store.
//!
//! One sweep per tick, strictly sequential: a new tick never starts before
//! the previous sweep's mutations and persistence have completed. Firing is
//! decided by the store; this loop only delivers and resaves.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::alerts::alert_text;
use crate::taskmaster::persist;
use crate::AppContext;

/// Run the scheduler loop forever.
pub async fn run(ctx: AppContext) {
    let mut ticker = interval(Duration::from_secs(ctx.config.tick_secs));
    // A stalled sweep must not be followed by a burst of make-up ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(tick_secs = ctx.config.tick_secs, "scheduler loop started");

    loop {
        ticker.tick().await;
        sweep(&ctx).await;
    }
}

/// One sweep: evaluate every task against the current instant, deliver
/// whatever fired, and resave the snapshot if the store mutated.
///
/// Delivery failure is logged and swallowed — the task already fired and
/// its state already moved; re-firing on a flaky sink would double-remind.
pub async fn sweep(ctx: &AppContext) {
    let fired = ctx.taskmaster.update(Utc::now()).await;
    if fired.is_empty() {
        return;
    }

    for (owner, messages) in &fired {
        for message in messages {
            if let Err(e) = ctx.notifier.deliver(*owner, &alert_text(message)).await {
                warn!(owner, err = %e, "alert delivery failed");
            }
        }
    }

    if let Err(e) = persist::save(&ctx.config.store_path(), &ctx.taskmaster).await {
        error!(err = %e, "failed to save task snapshot after sweep");
    }
}
