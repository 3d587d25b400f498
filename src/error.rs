//! User-facing task errors.
//!
//! Every variant renders as the sentence shown to the person who issued the
//! command. Nothing here is fatal to the daemon: parse/resolve errors abort
//! the creating command with no store mutation, removal errors leave the
//! store untouched, and the sweep never aborts on a single bad task.

/// Errors surfaced to the command issuer as plain text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// First token is not a recognized reference or interval keyword.
    #[error("The entry `{entry}` had an invalid reference point `{reference}`. Must be one of `in`, `on`, or `at`.")]
    MissingReference { entry: String, reference: String },

    /// A time-part token carried a unit suffix outside the known set.
    #[error("The time part `{part}` had an invalid unit. Must be one of `yr`, `mo`, `wkd`, `d`, `h`, `m`, or `s`.")]
    UnrecognizedUnit { part: String },

    /// No time-bearing token appeared before the message boundary.
    #[error("The entry `{entry}` did not specify a time.")]
    NoTimeSpecified { entry: String },

    /// Colon-time token with an empty or unreadable minute part.
    #[error("Couldn't get a minute value from the time part `{part}`.")]
    InvalidMinuteValue { part: String },

    /// A numeric portion of a time part failed to read as a number.
    #[error("Couldn't read a number from the time part `{part}`.")]
    InvalidTimePart { part: String },

    /// Recurring entry that never named an interval to repeat at.
    #[error("The entry `{entry}` did not specify a recurrence interval. Must be one of `year`, `month`, `week`, `day`, or `hour`.")]
    MissingInterval { entry: String },

    /// Resolution attempted for an owner with no timezone preference.
    #[error("You haven't set a timezone preference yet.")]
    NoTimezoneSet,

    /// Removal requested with a display index outside `1..=count`.
    #[error("There is no task at position `{index}`.")]
    IndexOutOfRange { index: usize },

    /// The resolved field set names an instant that does not exist.
    #[error("The resolved time `{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}` does not exist on the calendar.")]
    InvalidDate {
        year: i64,
        month: i64,
        day: i64,
        hour: i64,
        minute: i64,
        second: i64,
    },
}
