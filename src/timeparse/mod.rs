//! Time-expression parsing — free-text shorthand into a partial time spec.
//!
//! An entry looks like `in 1h 30m change laundry` or
//! `every mon 9:00 standup notes`: a reference keyword, any number of time
//! parts, then everything else is the reminder message. Classification is
//! greedy and first-match-wins; the first token that matches nothing ends
//! the scan and starts the message.

pub mod spec;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TaskError;
use crate::taskmaster::task::Interval;
pub use spec::{Field, RefMode, TimeSpec};

/// Three-letter weekday names, index 0 = Monday.
const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
const WEEKDAYS_FULL: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Three-letter month names. A matching token stores its 0-based table
/// index as the month field.
const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const MONTHS_FULL: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Amount+unit time part: digits/colons followed by a trailing unit,
/// anywhere in the token ("1h", "30m", "9pm").
static TIME_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d:]+)([a-zA-Z]+)").expect("time-part pattern is valid"));

/// Result of parsing one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub spec: TimeSpec,
    pub mode: RefMode,
    /// Set only when `mode` is [`RefMode::Recurring`].
    pub interval: Option<Interval>,
    /// Free text after the last time-bearing token; may be empty.
    pub message: String,
}

/// Parse an ordered token sequence into a time spec, reference mode,
/// optional recurrence interval, and message.
pub fn parse(tokens: &[String]) -> Result<Parsed, TaskError> {
    let entry = tokens.join(" ");
    let Some((first, rest)) = tokens.split_first() else {
        return Err(TaskError::MissingReference {
            entry,
            reference: String::new(),
        });
    };

    let reference = first.to_lowercase();
    let (mode, mut interval) = match reference.as_str() {
        "in" => (RefMode::Relative, None),
        "on" | "at" => (RefMode::Absolute, None),
        "each" | "every" | "per" => (RefMode::Recurring, None),
        "yearly" => (RefMode::Recurring, Some(Interval::Yearly)),
        "monthly" => (RefMode::Recurring, Some(Interval::Monthly)),
        "weekly" => (RefMode::Recurring, Some(Interval::Weekly)),
        "daily" => (RefMode::Recurring, Some(Interval::Daily)),
        "hourly" => (RefMode::Recurring, Some(Interval::Hourly)),
        _ => return Err(TaskError::MissingReference { entry, reference }),
    };

    let mut spec = TimeSpec::default();
    let mut boundary = rest.len();
    for (i, token) in rest.iter().enumerate() {
        if !classify(&token.to_lowercase(), &mut spec, &mut interval)? {
            boundary = i;
            break;
        }
    }

    if !spec.has_data() {
        return Err(TaskError::NoTimeSpecified { entry });
    }
    if mode == RefMode::Recurring && interval.is_none() {
        return Err(TaskError::MissingInterval { entry });
    }

    Ok(Parsed {
        spec,
        mode,
        // Interval words can appear under any reference ("at day ..."), but
        // only a recurring entry carries one out.
        interval: if mode == RefMode::Recurring { interval } else { None },
        message: rest[boundary..].join(" "),
    })
}

/// Classify one lowercased token. Returns `Ok(false)` when the token is not
/// time-bearing, which ends the scan.
fn classify(
    token: &str,
    spec: &mut TimeSpec,
    interval: &mut Option<Interval>,
) -> Result<bool, TaskError> {
    match token {
        "year" => {
            *interval = Some(Interval::Yearly);
            return Ok(true);
        }
        "month" => {
            *interval = Some(Interval::Monthly);
            return Ok(true);
        }
        "week" => {
            *interval = Some(Interval::Weekly);
            return Ok(true);
        }
        "day" => {
            *interval = Some(Interval::Daily);
            return Ok(true);
        }
        "hour" => {
            *interval = Some(Interval::Hourly);
            return Ok(true);
        }
        _ => {}
    }

    // Ordinal day ("1st", "22nd"). Only an all-digit prefix counts, so
    // words like "august" fall through to the month table.
    if let Some(prefix) = ["st", "nd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
    {
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            spec.set(Field::Day, parse_num(prefix, token)?);
            return Ok(true);
        }
    }

    if let Some(ix) = table_index(token, &MONTHS, &MONTHS_FULL) {
        spec.set(Field::Month, ix as i64);
        return Ok(true);
    }
    if let Some(ix) = table_index(token, &WEEKDAYS, &WEEKDAYS_FULL) {
        spec.set(Field::Weekday, ix as i64);
        return Ok(true);
    }

    // Exactly four digits is a year.
    if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) {
        spec.set(Field::Year, parse_num(token, token)?);
        return Ok(true);
    }

    if token.contains(':') {
        parse_colon_time(token, spec)?;
        return Ok(true);
    }

    if let Some(caps) = TIME_PART.captures(token) {
        process_time_part(&caps[1], &caps[2], spec)?;
        return Ok(true);
    }

    Ok(false)
}

fn table_index(token: &str, short: &[&str], full: &[&str]) -> Option<usize> {
    short
        .iter()
        .position(|name| *name == token)
        .or_else(|| full.iter().position(|name| *name == token))
}

/// Colon-time token ("9:25", ":30", "9:25pm"). An `am`/`pm` suffix attached
/// to the same token is detached before splitting on the first colon.
fn parse_colon_time(token: &str, spec: &mut TimeSpec) -> Result<(), TaskError> {
    let (body, pm) = if let Some(body) = token.strip_suffix("pm") {
        (body, true)
    } else if let Some(body) = token.strip_suffix("am") {
        (body, false)
    } else {
        (token, false)
    };

    let Some((hour_part, minute_part)) = body.split_once(':') else {
        // Unreachable for tokens routed here, but keep the parse total.
        return Err(TaskError::InvalidTimePart {
            part: token.to_string(),
        });
    };
    if minute_part.is_empty() {
        return Err(TaskError::InvalidMinuteValue {
            part: token.to_string(),
        });
    }
    let minute: i64 = minute_part.parse().map_err(|_| TaskError::InvalidMinuteValue {
        part: token.to_string(),
    })?;
    if !hour_part.is_empty() {
        let hour = parse_num(hour_part, token)?;
        spec.set(Field::Hour, hour + if pm { 12 } else { 0 });
    }
    spec.set(Field::Minute, minute);
    Ok(())
}

/// Amount+unit dispatch: `yr`/`mo`/`wkd`/`d`/`h`/`m`/`s`, plus `am`/`pm`
/// marking a bare hour.
fn process_time_part(num: &str, unit: &str, spec: &mut TimeSpec) -> Result<(), TaskError> {
    let field = match unit {
        "yr" => Field::Year,
        "mo" => Field::Month,
        "wkd" => Field::Weekday,
        "d" => Field::Day,
        "h" => Field::Hour,
        "am" | "pm" => {
            let hour = parse_num(num, &format!("{num}{unit}"))?;
            spec.set(Field::Hour, hour + if unit == "pm" { 12 } else { 0 });
            return Ok(());
        }
        "m" => Field::Minute,
        "s" => Field::Second,
        _ => {
            return Err(TaskError::UnrecognizedUnit {
                part: format!("{num}{unit}"),
            })
        }
    };
    spec.set(field, parse_num(num, &format!("{num}{unit}"))?);
    Ok(())
}

fn parse_num(digits: &str, part: &str) -> Result<i64, TaskError> {
    digits.parse().map_err(|_| TaskError::InvalidTimePart {
        part: part.to_string(),
    })
}
