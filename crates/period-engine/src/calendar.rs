//! Calendar arithmetic for period comparison.
//!
//! Pure helpers for truncating a date to the start or end of a calendar
//! level, advancing by whole calendar units, and numbering weeks inside a
//! month, quarter or year. Nothing here touches a clock or holds state; the
//! caller supplies every date.
//!
//! # Conventions
//!
//! - Level starts are at 00:00:00.000, level ends at 23:59:59.999.
//! - A quarter is always three months; quarter arithmetic is month arithmetic.
//! - Month arithmetic clamps the day of month (Jan 31 + 1 month = Feb 28/29).
//! - Weeks require a minimum of 7 days in the first week: week 1 of a unit
//!   begins on the first week-start day on or after the unit's first day.
//!   Days before that belong to week 0, the leading partial week.

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ComparisonError, Result};

/// Number of days a week needs inside a unit before it counts as week 1.
pub const MIN_DAYS_IN_FIRST_WEEK: i64 = 7;

/// A calendar level, ordered finer to coarser (`Day < Week < ... < Year`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarLevel {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl CalendarLevel {
    /// Every level, finer to coarser.
    pub const ALL: [CalendarLevel; 5] = [
        CalendarLevel::Day,
        CalendarLevel::Week,
        CalendarLevel::Month,
        CalendarLevel::Quarter,
        CalendarLevel::Year,
    ];

    /// `true` when `self` spans more time than `other`.
    pub fn is_coarser_than(self, other: CalendarLevel) -> bool {
        self > other
    }

    /// Lowercase name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            CalendarLevel::Day => "day",
            CalendarLevel::Week => "week",
            CalendarLevel::Month => "month",
            CalendarLevel::Quarter => "quarter",
            CalendarLevel::Year => "year",
        }
    }
}

impl fmt::Display for CalendarLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Configurable week start ─────────────────────────────────────────────────

/// Which day begins a week for truncation and week numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStartDay {
    /// ISO 8601 standard (Monday = day 0 of the week).
    #[default]
    Monday,
    /// US/Canada convention (Sunday = day 0 of the week).
    Sunday,
}

/// Week boundary rules shared by every week computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeekConfig {
    pub week_start: WeekStartDay,
}

impl WeekConfig {
    /// Weeks beginning on `week_start`.
    pub fn new(week_start: WeekStartDay) -> Self {
        Self { week_start }
    }

    /// How many days `weekday` is from the week-start day (0..=6).
    pub fn days_from_week_start(&self, weekday: Weekday) -> i64 {
        match self.week_start {
            WeekStartDay::Monday => weekday.num_days_from_monday() as i64,
            WeekStartDay::Sunday => weekday.num_days_from_sunday() as i64,
        }
    }
}

// ── Day boundaries ──────────────────────────────────────────────────────────

/// 00:00:00.000 on `date`.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// 23:59:59.999 on `date`.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| start_of_day(date))
}

// ── Month helpers ───────────────────────────────────────────────────────────

/// Number of days in `month` (1-12) of `year`.
///
/// Falls back to 31 outside chrono's supported range.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

/// Number of days in `year`.
pub fn days_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31).map_or(365, |last| last.ordinal())
}

/// First month (1, 4, 7 or 10) of the quarter containing `month`.
pub fn quarter_start_month(month: u32) -> u32 {
    ((month - 1) / 3) * 3 + 1
}

/// Build a date, clamping `day` to the length of the target month.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    let day = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| out_of_range(format_args!("{year:04}-{month:02}-{day:02}")))
}

/// Shift a date by a signed number of days.
pub fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or_else(|| out_of_range(format_args!("{date} shifted by {days} days")))
}

pub(crate) fn out_of_range(what: impl fmt::Display) -> ComparisonError {
    ComparisonError::DateOutOfRange(what.to_string())
}

// ── Truncation ──────────────────────────────────────────────────────────────

/// First day of the `level` unit containing `date`.
///
/// # Errors
///
/// [`ComparisonError::DateOutOfRange`] when the start falls outside chrono's
/// supported range.
pub fn level_start_date(
    date: NaiveDate,
    level: CalendarLevel,
    week: WeekConfig,
) -> Result<NaiveDate> {
    match level {
        CalendarLevel::Day => Ok(date),
        CalendarLevel::Week => shift_days(date, -week.days_from_week_start(date.weekday())),
        CalendarLevel::Month => clamped_date(date.year(), date.month(), 1),
        CalendarLevel::Quarter => clamped_date(date.year(), quarter_start_month(date.month()), 1),
        CalendarLevel::Year => clamped_date(date.year(), 1, 1),
    }
}

/// Last day of the `level` unit containing `date`.
///
/// # Errors
///
/// [`ComparisonError::DateOutOfRange`] when the end falls outside chrono's
/// supported range.
pub fn level_end_date(
    date: NaiveDate,
    level: CalendarLevel,
    week: WeekConfig,
) -> Result<NaiveDate> {
    match level {
        CalendarLevel::Day => Ok(date),
        CalendarLevel::Week => shift_days(date, 6 - week.days_from_week_start(date.weekday())),
        CalendarLevel::Month => clamped_date(date.year(), date.month(), 31),
        CalendarLevel::Quarter => {
            clamped_date(date.year(), quarter_start_month(date.month()) + 2, 31)
        }
        CalendarLevel::Year => clamped_date(date.year(), 12, 31),
    }
}

/// Truncate to 00:00:00.000 on the first day of the `level` unit.
///
/// # Errors
///
/// See [`level_start_date`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use period_engine::calendar::{truncate_to_level_start, CalendarLevel, WeekConfig};
///
/// let t = NaiveDate::from_ymd_opt(2024, 5, 15)
///     .unwrap()
///     .and_hms_opt(13, 45, 0)
///     .unwrap();
/// let start = truncate_to_level_start(t, CalendarLevel::Quarter, WeekConfig::default())?;
/// assert_eq!(start.to_string(), "2024-04-01 00:00:00");
/// # Ok::<(), period_engine::ComparisonError>(())
/// ```
pub fn truncate_to_level_start(
    datetime: NaiveDateTime,
    level: CalendarLevel,
    week: WeekConfig,
) -> Result<NaiveDateTime> {
    level_start_date(datetime.date(), level, week).map(start_of_day)
}

/// Truncate to 23:59:59.999 on the last day of the `level` unit.
///
/// # Errors
///
/// See [`level_end_date`].
pub fn truncate_to_level_end(
    datetime: NaiveDateTime,
    level: CalendarLevel,
    week: WeekConfig,
) -> Result<NaiveDateTime> {
    level_end_date(datetime.date(), level, week).map(end_of_day)
}

// ── Advance ─────────────────────────────────────────────────────────────────

/// Add `amount` calendar units (negative moves backward).
///
/// Month, quarter and year steps clamp the day of month; the time of day is
/// preserved.
///
/// # Errors
///
/// [`ComparisonError::DateOutOfRange`] when the result leaves chrono's range.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use period_engine::calendar::{advance, CalendarLevel};
///
/// let jan31 = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let next = advance(jan31, CalendarLevel::Month, 1)?;
/// assert_eq!(next.date(), NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
/// # Ok::<(), period_engine::ComparisonError>(())
/// ```
pub fn advance(
    datetime: NaiveDateTime,
    level: CalendarLevel,
    amount: i32,
) -> Result<NaiveDateTime> {
    match level {
        CalendarLevel::Day => shift_datetime_days(datetime, amount as i64),
        CalendarLevel::Week => shift_datetime_days(datetime, amount as i64 * 7),
        CalendarLevel::Month => shift_months(datetime, amount),
        CalendarLevel::Quarter => {
            let months = amount
                .checked_mul(3)
                .ok_or_else(|| out_of_range(format_args!("{amount} quarters")))?;
            advance(datetime, CalendarLevel::Month, months)
        }
        CalendarLevel::Year => {
            let months = amount
                .checked_mul(12)
                .ok_or_else(|| out_of_range(format_args!("{amount} years")))?;
            shift_months(datetime, months)
        }
    }
}

fn shift_datetime_days(datetime: NaiveDateTime, days: i64) -> Result<NaiveDateTime> {
    shift_days(datetime.date(), days).map(|d| d.and_time(datetime.time()))
}

fn shift_months(datetime: NaiveDateTime, months: i32) -> Result<NaiveDateTime> {
    let step = Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
        datetime.checked_add_months(step)
    } else {
        datetime.checked_sub_months(step)
    };
    shifted.ok_or_else(|| {
        out_of_range(format_args!("{datetime} shifted by {months} months"))
    })
}

// ── Week numbering ──────────────────────────────────────────────────────────

/// Zero-based day index of `date` inside its `level` unit, and the unit length.
fn unit_position(date: NaiveDate, level: CalendarLevel, week: WeekConfig) -> (i64, i64) {
    match level {
        CalendarLevel::Day => (0, 1),
        CalendarLevel::Week => (week.days_from_week_start(date.weekday()), 7),
        CalendarLevel::Month => (
            date.day0() as i64,
            days_in_month(date.year(), date.month()) as i64,
        ),
        CalendarLevel::Quarter => {
            let first = quarter_start_month(date.month());
            let before: u32 = (first..date.month())
                .map(|m| days_in_month(date.year(), m))
                .sum();
            let length: u32 = (first..first + 3)
                .map(|m| days_in_month(date.year(), m))
                .sum();
            ((before + date.day0()) as i64, length as i64)
        }
        CalendarLevel::Year => {
            (date.ordinal0() as i64, days_in_year(date.year()) as i64)
        }
    }
}

/// Days from the unit's first day to the start of its week 1.
fn first_full_week_offset(date: NaiveDate, level: CalendarLevel, week: WeekConfig) -> i64 {
    let (index, _) = unit_position(date, level, week);
    let unit_start_dow = (week.days_from_week_start(date.weekday()) - index).rem_euclid(7);
    (MIN_DAYS_IN_FIRST_WEEK - unit_start_dow) % 7
}

/// Week ordinal of `date` inside its `level` unit; 0 for the leading partial week.
pub fn week_of_unit(date: NaiveDate, level: CalendarLevel, week: WeekConfig) -> u32 {
    let (index, _) = unit_position(date, level, week);
    let offset = first_full_week_offset(date, level, week);
    if index < offset {
        0
    } else {
        ((index - offset) / 7 + 1) as u32
    }
}

/// Number of numbered (full-start) weeks whose first day lies inside the unit.
pub fn weeks_in_unit(date: NaiveDate, level: CalendarLevel, week: WeekConfig) -> u32 {
    let (_, length) = unit_position(date, level, week);
    let offset = first_full_week_offset(date, level, week);
    if offset >= length {
        0
    } else {
        ((length - 1 - offset) / 7 + 1) as u32
    }
}

/// Week ordinal of `date` inside its month.
pub fn week_of_month(date: NaiveDate, week: WeekConfig) -> u32 {
    week_of_unit(date, CalendarLevel::Month, week)
}

/// Week ordinal of `date` inside its quarter.
pub fn week_of_quarter(date: NaiveDate, week: WeekConfig) -> u32 {
    week_of_unit(date, CalendarLevel::Quarter, week)
}

/// Week ordinal of `date` inside its year.
pub fn week_of_year(date: NaiveDate, week: WeekConfig) -> u32 {
    week_of_unit(date, CalendarLevel::Year, week)
}

/// First day of week `ordinal` inside the unit starting at `unit_start`.
///
/// Ordinal 0 yields the start of the leading partial week, which lies before
/// `unit_start` unless the unit begins on a week-start day.
pub fn nth_week_start(
    unit_start: NaiveDate,
    level: CalendarLevel,
    ordinal: u32,
    week: WeekConfig,
) -> Result<NaiveDate> {
    let offset = first_full_week_offset(unit_start, level, week);
    shift_days(unit_start, offset + 7 * (ordinal as i64 - 1))
}
