//! Command layer — create/list/remove/timezone/now.
//!
//! Each command returns the text shown to the issuing owner. Parse and
//! resolve failures abort with no store mutation; removal failures leave
//! the store untouched.

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;

use crate::error::TaskError;
use crate::taskmaster::task::{Task, TaskKind};
use crate::taskmaster::{persist, OwnerId};
use crate::timeparse;
use crate::AppContext;

/// Display format for fire instants, e.g. `09:00:00AM, Jun 01 (Sat), 2024`.
pub const TIME_FORMAT: &str = "%I:%M:%S%p, %b %d (%a), %Y";

const TZ_GUIDE: &str = "A valid time zone is something like `America/Chicago`. \
    Abbreviations like EST are best avoided: they don't track daylight saving \
    time and one abbreviation can cover several zones.";

/// Parse an entry, resolve it in the owner's zone, store the task, persist.
pub async fn create(ctx: &AppContext, owner: OwnerId, tokens: &[String]) -> Result<String> {
    let parsed = timeparse::parse(tokens)?;
    let tz = ctx
        .tzprefs
        .get(owner)
        .await
        .ok_or(TaskError::NoTimezoneSet)?;
    let now = Utc::now().with_timezone(&tz);

    // Recurring entries anchor their first firing with absolute semantics.
    let local_when = parsed.spec.resolve(&now, parsed.mode)?;
    let when = local_when.with_timezone(&Utc);

    let task = match parsed.interval {
        Some(interval) => Task::recurring(when, parsed.message.clone(), interval),
        None => Task::once(when, parsed.message.clone()),
    };
    ctx.taskmaster.add_task(owner, task).await;
    persist::save(&ctx.config.store_path(), &ctx.taskmaster).await?;

    Ok(format!(
        "Event successfully added.\nDate: {}\nMessage: {}",
        local_when.format(TIME_FORMAT),
        parsed.message
    ))
}

/// The owner's tasks sorted by fire time, 1-based, rendered in their zone.
/// The printed position is the display index `remove` takes.
pub async fn list(ctx: &AppContext, owner: OwnerId) -> Result<String> {
    let tz = ctx
        .tzprefs
        .get(owner)
        .await
        .ok_or(TaskError::NoTimezoneSet)?;
    let mut tasks = match ctx.taskmaster.tasks_for(owner).await {
        Some(tasks) => tasks,
        None => return Ok("You have no tasks scheduled.".to_string()),
    };
    tasks.sort_by_key(|task| task.when);

    let lines: Vec<String> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let when = task.when.with_timezone(&tz).format(TIME_FORMAT);
            match task.kind {
                TaskKind::Once => format!("{}. On {when}: {}", i + 1, task.message),
                TaskKind::Recurring { interval } => {
                    format!("{}. On {when}; reschedule {interval}: {}", i + 1, task.message)
                }
            }
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Remove by 1-based position in the sorted view `list` prints.
pub async fn remove(ctx: &AppContext, owner: OwnerId, display_index: usize) -> Result<String> {
    let removed = ctx.taskmaster.remove_task(owner, display_index).await?;
    persist::save(&ctx.config.store_path(), &ctx.taskmaster).await?;
    Ok(format!("Removed the task `{}`.", removed.message))
}

/// With no argument, report the stored preference; with one, validate and
/// store it. An unrecognized zone name is reported, never stored.
pub async fn timezone(ctx: &AppContext, owner: OwnerId, zone: Option<&str>) -> Result<String> {
    match zone {
        None => Ok(match ctx.tzprefs.zone_name(owner).await {
            Some(name) => format!("You are currently using `{name}` time."),
            None => format!("Use this command to set your time zone. {TZ_GUIDE}"),
        }),
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => {
                ctx.tzprefs.set(owner, tz).await?;
                Ok(format!("Successfully set your timezone to `{}`.", tz.name()))
            }
            Err(_) => Ok(format!("`{name}` is not a valid time zone. {TZ_GUIDE}")),
        },
    }
}

/// The current time in the owner's zone.
pub async fn now(ctx: &AppContext, owner: OwnerId) -> Result<String> {
    let tz = ctx
        .tzprefs
        .get(owner)
        .await
        .ok_or(TaskError::NoTimezoneSet)?;
    let now = Utc::now().with_timezone(&tz);
    Ok(format!(
        "`{}` time is currently {}.",
        tz.name(),
        now.format(TIME_FORMAT)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaemonConfig;

    async fn test_ctx(dir: &std::path::Path) -> AppContext {
        let config = DaemonConfig {
            data_dir: dir.to_path_buf(),
            log: "info".to_string(),
            log_format: "pretty".to_string(),
            tick_secs: 1,
            webhook_url: None,
        };
        AppContext::init(config).await.unwrap()
    }

    fn toks(entry: &str) -> Vec<String> {
        entry.split_whitespace().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn create_requires_a_timezone_preference() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).await;

        let err = create(&ctx, 1, &toks("in 1h laundry")).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TaskError>(),
            Some(&TaskError::NoTimezoneSet)
        );
        // Nothing was stored and nothing was persisted.
        assert_eq!(ctx.taskmaster.task_count().await, 0);
        assert!(!ctx.config.store_path().exists());
    }

    #[tokio::test]
    async fn create_stores_and_persists_a_task() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).await;
        timezone(&ctx, 1, Some("America/Chicago")).await.unwrap();

        let reply = create(&ctx, 1, &toks("in 1h 30m change laundry"))
            .await
            .unwrap();
        assert!(reply.starts_with("Event successfully added."));
        assert!(reply.ends_with("Message: change laundry"));
        assert_eq!(ctx.taskmaster.task_count().await, 1);
        assert!(ctx.config.store_path().exists());
    }

    #[tokio::test]
    async fn parse_errors_do_not_touch_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).await;
        timezone(&ctx, 1, Some("UTC")).await.unwrap();

        let err = create(&ctx, 1, &toks("soon laundry")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TaskError>(),
            Some(TaskError::MissingReference { .. })
        ));
        assert_eq!(ctx.taskmaster.task_count().await, 0);
    }

    #[tokio::test]
    async fn list_sorts_by_fire_time_and_remove_uses_that_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).await;
        timezone(&ctx, 1, Some("UTC")).await.unwrap();

        create(&ctx, 1, &toks("in 2h second")).await.unwrap();
        create(&ctx, 1, &toks("in 1h first")).await.unwrap();

        let listing = list(&ctx, 1).await.unwrap();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. "));
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));

        let reply = remove(&ctx, 1, 1).await.unwrap();
        assert_eq!(reply, "Removed the task `first`.");
        let listing = list(&ctx, 1).await.unwrap();
        assert!(listing.ends_with("second"));
    }

    #[tokio::test]
    async fn remove_out_of_range_reports_and_preserves() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).await;
        timezone(&ctx, 1, Some("UTC")).await.unwrap();
        create(&ctx, 1, &toks("in 1h only")).await.unwrap();

        let err = remove(&ctx, 1, 2).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TaskError>(),
            Some(&TaskError::IndexOutOfRange { index: 2 })
        );
        assert_eq!(ctx.taskmaster.task_count().await, 1);
    }

    #[tokio::test]
    async fn timezone_set_validates_the_name() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).await;

        let reply = timezone(&ctx, 1, Some("Middle/Nowhere")).await.unwrap();
        assert!(reply.starts_with("`Middle/Nowhere` is not a valid time zone."));
        assert_eq!(ctx.tzprefs.get(1).await, None);

        let reply = timezone(&ctx, 1, Some("Europe/Berlin")).await.unwrap();
        assert_eq!(reply, "Successfully set your timezone to `Europe/Berlin`.");
        let reply = timezone(&ctx, 1, None).await.unwrap();
        assert_eq!(reply, "You are currently using `Europe/Berlin` time.");
    }

    #[tokio::test]
    async fn now_reports_in_the_owner_zone() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).await;
        timezone(&ctx, 1, Some("UTC")).await.unwrap();

        let reply = now(&ctx, 1).await.unwrap();
        assert!(reply.starts_with("`UTC` time is currently"));
    }
}
