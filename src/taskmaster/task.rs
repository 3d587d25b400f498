// SPDX-License-Identifier: MIT
//! Task entities — the persisted unit of scheduled work.
//!
//! A one-shot task dies when it fires; a recurring task advances its fire
//! instant by one interval step instead. Recurrence steps never catch up:
//! however far in the past `when` sits, one tick moves it by exactly one
//! interval.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::timeparse::spec::days_in_month;

/// How often a recurring task re-fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Yearly => "yearly",
            Interval::Monthly => "monthly",
            Interval::Weekly => "weekly",
            Interval::Daily => "daily",
            Interval::Hourly => "hourly",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-shot vs recurring, decided once at decode/create time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Once,
    Recurring { interval: Interval },
}

/// A scheduled reminder. The owner identity is the store key, not a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Fire instant, UTC.
    pub when: DateTime<Utc>,
    /// Text returned to the owner when the task fires.
    pub message: String,
    /// Set when the task is done; the next sweep evicts it.
    pub kill: bool,
    pub kind: TaskKind,
}

impl Task {
    pub fn once(when: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            when,
            message: message.into(),
            kill: false,
            kind: TaskKind::Once,
        }
    }

    pub fn recurring(when: DateTime<Utc>, message: impl Into<String>, interval: Interval) -> Self {
        Self {
            when,
            message: message.into(),
            kill: false,
            kind: TaskKind::Recurring { interval },
        }
    }

    /// Evaluate against `now`. Returns the message when due; a one-shot
    /// marks itself dead, a recurring task advances `when` by one interval
    /// step. Not due means no mutation at all.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<String> {
        if now < self.when {
            return None;
        }
        match self.kind {
            TaskKind::Once => self.kill = true,
            TaskKind::Recurring { interval } => match advance(self.when, interval) {
                Some(next) => self.when = next,
                None => {
                    // An unrepresentable advance would re-fire every tick;
                    // retire the task instead of wedging the sweep.
                    warn!(when = %self.when, %interval, "could not advance recurring task; retiring it");
                    self.kill = true;
                }
            },
        }
        Some(self.message.clone())
    }

    /// Mark done regardless of due-ness.
    pub fn cancel(&mut self) {
        self.kill = true;
    }
}

/// One interval step past `when`. Yearly and monthly steps clamp the day
/// into the target month (Feb 29 → Feb 28, Jan 31 → Feb 28/29).
fn advance(when: DateTime<Utc>, interval: Interval) -> Option<DateTime<Utc>> {
    match interval {
        Interval::Yearly => clamped_ymd(when, when.year() + 1, when.month()),
        Interval::Monthly => {
            let (year, month) = if when.month() == 12 {
                (when.year() + 1, 1)
            } else {
                (when.year(), when.month() + 1)
            };
            clamped_ymd(when, year, month)
        }
        Interval::Weekly => Some(when + Duration::days(7)),
        Interval::Daily => Some(when + Duration::days(1)),
        Interval::Hourly => Some(when + Duration::hours(1)),
    }
}

fn clamped_ymd(when: DateTime<Utc>, year: i32, month: u32) -> Option<DateTime<Utc>> {
    let day = u32::try_from(days_in_month(year, month))
        .map(|dim| when.day().min(dim))
        .ok()?;
    // Move through day 1 so the intermediate date is always valid.
    when.with_day(1)?
        .with_year(year)?
        .with_month(month)?
        .with_day(day)
}
