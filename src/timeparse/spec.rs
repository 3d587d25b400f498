//! Partial time specifications and their resolution to concrete instants.
//!
//! A [`TimeSpec`] is a bag of optional calendar fields filled in by the
//! parser. [`TimeSpec::resolve`] turns it into a concrete timestamp in the
//! caller's zone: seed unset fields from "now", apply the weekday offset,
//! normalize overflowed units lowest-first, then apply at most one
//! past-time corrective step.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Timelike};
use tracing::debug;

use crate::error::TaskError;

/// Which calendar field a parsed token writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Month,
    Weekday,
    Day,
    Hour,
    Minute,
    Second,
}

/// How a parsed entry anchors its time fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMode {
    /// "on" / "at" — set fields are literal calendar values.
    Absolute,
    /// "in" — set fields are offsets added to now's values.
    Relative,
    /// "each" / "every" / "per" or a bare interval name. The initial fire
    /// instant resolves with Absolute semantics.
    Recurring,
}

/// A bag of optional calendar fields. `weekday` is 0 = Monday .. 6 = Sunday.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSpec {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub weekday: Option<i64>,
    pub day: Option<i64>,
    pub hour: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<i64>,
}

impl TimeSpec {
    /// True when at least one field has been set. An all-unset spec cannot
    /// produce a task.
    pub fn has_data(&self) -> bool {
        self.year.is_some()
            || self.month.is_some()
            || self.weekday.is_some()
            || self.day.is_some()
            || self.hour.is_some()
            || self.minute.is_some()
            || self.second.is_some()
    }

    /// Write `value` into `field`. A later token overwriting an earlier one
    /// of the same kind silently wins; the overwrite is traced so the
    /// behavior stays observable.
    pub fn set(&mut self, field: Field, value: i64) {
        let slot = match field {
            Field::Year => &mut self.year,
            Field::Month => &mut self.month,
            Field::Weekday => &mut self.weekday,
            Field::Day => &mut self.day,
            Field::Hour => &mut self.hour,
            Field::Minute => &mut self.minute,
            Field::Second => &mut self.second,
        };
        if let Some(old) = slot.replace(value) {
            if old != value {
                debug!(field = ?field, old, new = value, "later token overwrote time field");
            }
        }
    }

    /// Resolve against `now`, producing an instant in `now`'s timezone.
    /// The caller converts to UTC before storing.
    pub fn resolve<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        mode: RefMode,
    ) -> Result<DateTime<Tz>, TaskError> {
        let (mut yr, mut mo, mut d, mut h, mut m, mut s) = match mode {
            RefMode::Relative => (
                self.year.map_or(i64::from(now.year()), |v| v + i64::from(now.year())),
                self.month.map_or(i64::from(now.month()), |v| v + i64::from(now.month())),
                self.day.map_or(i64::from(now.day()), |v| v + i64::from(now.day())),
                self.hour.map_or(i64::from(now.hour()), |v| v + i64::from(now.hour())),
                self.minute.map_or(i64::from(now.minute()), |v| v + i64::from(now.minute())),
                self.second.map_or(i64::from(now.second()), |v| v + i64::from(now.second())),
            ),
            RefMode::Absolute | RefMode::Recurring => (
                self.year.unwrap_or(i64::from(now.year())),
                self.month.unwrap_or(i64::from(now.month())),
                self.day.unwrap_or(i64::from(now.day())),
                self.hour.unwrap_or(i64::from(now.hour())),
                self.minute.unwrap_or(i64::from(now.minute())),
                self.second.unwrap_or(0),
            ),
        };

        if let Some(wd) = self.weekday {
            d += (wd - i64::from(now.weekday().num_days_from_monday())).rem_euclid(7);
        }

        // Normalize overflowed units lowest-first. The day→month step uses
        // the length of now's original month, not the carried-into month.
        let dim = days_in_month(now.year(), now.month());
        m += s.div_euclid(60);
        s = s.rem_euclid(60);
        h += m.div_euclid(60);
        m = m.rem_euclid(60);
        d += h.div_euclid(24);
        h = h.rem_euclid(24);
        // Days and months are 1-based: shift down before the divmod, back up after.
        mo += (d - 1).div_euclid(dim);
        d = (d - 1).rem_euclid(dim) + 1;
        yr += (mo - 1).div_euclid(12);
        mo = (mo - 1).rem_euclid(12) + 1;

        let candidate = build(&now.timezone(), yr, mo, d, h, m, s)?;
        if candidate < *now {
            // The candidate already passed. Bump the smallest unit the entry
            // left open, first match wins, and rebuild once.
            if self.month.is_some() && self.year.is_none() {
                yr += 1;
            } else if self.weekday.is_some() && self.month.is_none() {
                d += 7;
            } else if self.day.is_some() && self.month.is_none() {
                mo += 1;
            } else if self.hour.is_some() && self.day.is_none() {
                d += 1;
            } else if self.minute.is_some() && self.hour.is_none() {
                h += 1;
            } else if self.second.is_some() && self.minute.is_none() {
                m += 1;
            } else {
                return Ok(candidate);
            }
            return build(&now.timezone(), yr, mo, d, h, m, s);
        }
        Ok(candidate)
    }
}

/// Length of `month` in `year`, in days.
pub(crate) fn days_in_month(year: i32, month: u32) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
    }
}

/// Construct a zoned datetime from resolved fields.
///
/// Fields that name a nonexistent instant (February 31st, hour 24 from a
/// corrective bump) are an error, never a panic. A local time skipped by a
/// spring-forward gap shifts one hour later; an ambiguous fall-back time
/// takes the earlier offset.
fn build<Tz: TimeZone>(
    tz: &Tz,
    yr: i64,
    mo: i64,
    d: i64,
    h: i64,
    m: i64,
    s: i64,
) -> Result<DateTime<Tz>, TaskError> {
    let invalid = || TaskError::InvalidDate {
        year: yr,
        month: mo,
        day: d,
        hour: h,
        minute: m,
        second: s,
    };

    let year = i32::try_from(yr).map_err(|_| invalid())?;
    let month = u32::try_from(mo).map_err(|_| invalid())?;
    let day = u32::try_from(d).map_err(|_| invalid())?;
    let hour = u32::try_from(h).map_err(|_| invalid())?;
    let minute = u32::try_from(m).map_err(|_| invalid())?;
    let second = u32::try_from(s).map_err(|_| invalid())?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(invalid)?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Ok(t),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .ok_or_else(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn absolute_past_hour_rolls_to_next_day() {
        let spec = TimeSpec {
            hour: Some(14),
            ..TimeSpec::default()
        };
        let now = utc(2024, 3, 2, 15, 0, 0);
        let resolved = spec.resolve(&now, RefMode::Absolute).unwrap();
        assert_eq!(resolved, utc(2024, 3, 3, 14, 0, 0));
    }

    #[test]
    fn relative_fields_offset_from_now() {
        let spec = TimeSpec {
            day: Some(1),
            hour: Some(2),
            ..TimeSpec::default()
        };
        let now = utc(2024, 3, 2, 10, 0, 0);
        let resolved = spec.resolve(&now, RefMode::Relative).unwrap();
        assert_eq!(resolved, utc(2024, 3, 3, 12, 0, 0));
    }

    #[test]
    fn relative_minutes_carry_into_hours() {
        let spec = TimeSpec {
            minute: Some(65),
            ..TimeSpec::default()
        };
        let now = utc(2024, 3, 2, 10, 30, 0);
        let resolved = spec.resolve(&now, RefMode::Relative).unwrap();
        // 30 + 65 minutes = 1h35m past 10:00; seconds seed from now under Relative.
        assert_eq!(resolved, utc(2024, 3, 2, 11, 35, 0));
    }

    #[test]
    fn weekday_lands_on_next_matching_day() {
        // 2024-03-02 is a Saturday; weekday 0 = Monday.
        let spec = TimeSpec {
            weekday: Some(0),
            hour: Some(9),
            minute: Some(0),
            ..TimeSpec::default()
        };
        let now = utc(2024, 3, 2, 15, 0, 0);
        let resolved = spec.resolve(&now, RefMode::Absolute).unwrap();
        assert_eq!(resolved, utc(2024, 3, 4, 9, 0, 0));
    }

    #[test]
    fn same_weekday_earlier_hour_jumps_a_week() {
        // 2024-03-04 is a Monday. Asking for Monday 09:00 at Monday 15:00
        // bumps the day by seven.
        let spec = TimeSpec {
            weekday: Some(0),
            hour: Some(9),
            minute: Some(0),
            ..TimeSpec::default()
        };
        let now = utc(2024, 3, 4, 15, 0, 0);
        let resolved = spec.resolve(&now, RefMode::Absolute).unwrap();
        assert_eq!(resolved, utc(2024, 3, 11, 9, 0, 0));
    }

    #[test]
    fn month_zero_wraps_to_prior_december_then_corrects_year() {
        // The parser stores month names as 0-based table indices, so "jan"
        // arrives as month 0. The 1-based months→years carry wraps that to
        // December of the prior year; the past-time pass then adds a year.
        let spec = TimeSpec {
            month: Some(0),
            day: Some(5),
            hour: Some(9),
            minute: Some(0),
            ..TimeSpec::default()
        };
        let now = utc(2024, 3, 2, 12, 0, 0);
        let resolved = spec.resolve(&now, RefMode::Absolute).unwrap();
        assert_eq!(resolved, utc(2024, 12, 5, 9, 0, 0));
    }

    #[test]
    fn past_month_without_year_bumps_year() {
        let spec = TimeSpec {
            month: Some(2),
            day: Some(1),
            hour: Some(8),
            minute: Some(0),
            ..TimeSpec::default()
        };
        let now = utc(2024, 6, 15, 12, 0, 0);
        let resolved = spec.resolve(&now, RefMode::Absolute).unwrap();
        assert_eq!(resolved, utc(2025, 2, 1, 8, 0, 0));
    }

    #[test]
    fn absolute_seconds_default_to_zero() {
        let spec = TimeSpec {
            hour: Some(23),
            ..TimeSpec::default()
        };
        let now = utc(2024, 3, 2, 10, 30, 45);
        let resolved = spec.resolve(&now, RefMode::Absolute).unwrap();
        assert_eq!(resolved.second(), 0);
        assert_eq!(resolved.minute(), 30);
    }

    #[test]
    fn nonexistent_date_is_an_error_not_a_panic() {
        // Day 31 scanned while "now" sits in a 31-day month survives the
        // carry untouched, then lands in February.
        let spec = TimeSpec {
            month: Some(2),
            day: Some(31),
            ..TimeSpec::default()
        };
        let now = utc(2024, 1, 10, 0, 0, 0);
        let err = spec.resolve(&now, RefMode::Absolute).unwrap_err();
        assert!(matches!(err, TaskError::InvalidDate { .. }));
    }

    #[test]
    fn overwrite_is_last_token_wins() {
        let mut spec = TimeSpec::default();
        spec.set(Field::Year, 2024);
        spec.set(Field::Year, 2025);
        assert_eq!(spec.year, Some(2025));
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }
}
