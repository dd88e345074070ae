//! Interval projection: the "same relative window" inside every period.
//!
//! A to-date or same-unit comparison must compare a partial current period
//! against an equally partial older period. The reference window is computed
//! once around the reference date; each older period then gets the
//! structurally equivalent window.
//!
//! Calendar units project by calendar coordinates (month of year, month of
//! quarter, day of month; days clamped to the target month). Weeks project by
//! week ordinal and day of week, since day offsets drift across months of
//! different lengths. A week ordinal the target unit does not have makes the
//! period unprojectable: [`IntervalProjector::project`] returns `Ok(None)`
//! and the caller skips that period.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::calendar::{
    advance, clamped_date, end_of_day, level_end_date, level_start_date, nth_week_start,
    shift_days, start_of_day, week_of_month, week_of_quarter, CalendarLevel, WeekConfig,
};
use crate::config::EngineOptions;
use crate::error::{ComparisonError, Result};
use crate::granularity::Modifier;
use crate::interval::IntervalSpec;
use crate::period::{DateRange, PeriodRange};

/// Week coordinates of the reference date, taken once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekInfo {
    pub month: u32,
    pub week_of_month: u32,
    pub week_of_quarter: u32,
    /// Days from the configured week start (0..=6).
    pub day_of_week: i64,
}

impl WeekInfo {
    /// Snapshot the week coordinates of `date`.
    pub fn of(date: NaiveDate, week: WeekConfig) -> Self {
        Self {
            month: date.month(),
            week_of_month: week_of_month(date, week),
            week_of_quarter: week_of_quarter(date, week),
            day_of_week: week.days_from_week_start(date.weekday()),
        }
    }
}

/// The window around the reference date that older periods are matched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceWindow {
    /// The reference point after applying interval inclusivity.
    pub anchor: NaiveDate,
    pub range: DateRange,
    pub week_info: WeekInfo,
}

/// Maps the reference window onto each resolved period.
#[derive(Debug, Clone)]
pub struct IntervalProjector {
    week: WeekConfig,
    force_range_start_after_period: bool,
}

impl IntervalProjector {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            week: options.week_config(),
            force_range_start_after_period: options.force_range_start_after_period,
        }
    }

    /// The current window for `reference`, or `None` when `spec` does not slice.
    ///
    /// `*ToDate` runs from the start of the unit to the anchor day; `Same*`
    /// covers the whole unit. A non-inclusive interval anchors on the previous
    /// day (`*ToDate`) or the previous unit (`Same*`).
    ///
    /// # Errors
    ///
    /// [`ComparisonError::DateOutOfRange`] when the anchor or its unit leaves
    /// the representable calendar.
    pub fn reference_window(
        &self,
        reference: NaiveDate,
        spec: &IntervalSpec,
    ) -> Result<Option<ReferenceWindow>> {
        let Some(unit) = spec.mode.slicing_level() else {
            return Ok(None);
        };
        let anchor = match (spec.inclusive, spec.mode.modifier()) {
            (true, _) => reference,
            (false, Modifier::SameDate) => advance(start_of_day(reference), unit, -1)?.date(),
            (false, _) => shift_days(reference, -1)?,
        };
        let range = self.unit_window(anchor, unit, spec.mode.modifier())?;
        Ok(Some(ReferenceWindow {
            anchor,
            range,
            week_info: WeekInfo::of(anchor, self.week),
        }))
    }

    /// Project the reference window into `period`.
    ///
    /// Returns the whole period when `spec` does not slice, and `Ok(None)`
    /// when the period has no equivalent window.
    ///
    /// # Errors
    ///
    /// [`ComparisonError::InvalidSpec`] when the slicing unit is coarser than
    /// the period level.
    pub fn project(
        &self,
        period: &PeriodRange,
        reference: &ReferenceWindow,
        spec: &IntervalSpec,
    ) -> Result<Option<DateRange>> {
        let Some(unit) = spec.mode.slicing_level() else {
            return Ok(Some(period.range()));
        };
        if period.is_unbounded() {
            return Ok(Some(reference.range));
        }
        let Some(level) = period.level else {
            debug!(index = period.index, "custom period has no calendar level to project into");
            return Ok(None);
        };
        if unit.is_coarser_than(level) {
            return Err(ComparisonError::InvalidSpec(format!(
                "cannot slice {level} periods by {}",
                spec.mode
            )));
        }

        let period_start = period.start.date();
        if period_start > reference.anchor {
            // Happens when a non-inclusive reference on the first day of a unit
            // anchors in the previous unit.
            debug!(
                index = period.index,
                anchor = %reference.anchor,
                "period starts after the reference point"
            );
            return Ok(None);
        }
        let anchor = if unit == CalendarLevel::Week || level == CalendarLevel::Week {
            self.week_anchor(period_start, level, &reference.week_info)?
        } else {
            Some(calendar_anchor(period_start, level, reference.anchor)?)
        };
        let Some(anchor) = anchor else {
            debug!(
                index = period.index,
                week_of_month = reference.week_info.week_of_month,
                week_of_quarter = reference.week_info.week_of_quarter,
                "period has no matching week; skipping"
            );
            return Ok(None);
        };

        let window = self.unit_window(anchor, unit, spec.mode.modifier())?;
        let start = if self.force_range_start_after_period {
            window.start.max(period.start)
        } else {
            window.start
        };
        let projected = DateRange::new(start, window.end.min(period.end));
        if projected.is_none() {
            debug!(index = period.index, %anchor, "projected window falls outside period");
        }
        Ok(projected)
    }

    /// Project into every period, keeping positions aligned with `periods`.
    ///
    /// # Errors
    ///
    /// The first error of [`project`](Self::project).
    pub fn project_all(
        &self,
        periods: &[PeriodRange],
        reference: &ReferenceWindow,
        spec: &IntervalSpec,
    ) -> Result<Vec<Option<DateRange>>> {
        periods
            .iter()
            .map(|period| self.project(period, reference, spec))
            .collect()
    }

    fn unit_window(
        &self,
        anchor: NaiveDate,
        unit: CalendarLevel,
        modifier: Modifier,
    ) -> Result<DateRange> {
        let start = level_start_date(anchor, unit, self.week)?;
        let end = match modifier {
            Modifier::SameDate => level_end_date(anchor, unit, self.week)?,
            Modifier::ToDate | Modifier::None => anchor,
        };
        Ok(DateRange {
            start: start_of_day(start),
            end: end_of_day(end),
        })
    }

    /// Same week ordinal and day of week inside the target period.
    fn week_anchor(
        &self,
        period_start: NaiveDate,
        level: CalendarLevel,
        info: &WeekInfo,
    ) -> Result<Option<NaiveDate>> {
        let (unit_start, unit_level, ordinal) = match level {
            CalendarLevel::Day => return Ok(Some(period_start)),
            CalendarLevel::Week => return shift_days(period_start, info.day_of_week).map(Some),
            CalendarLevel::Month => (period_start, CalendarLevel::Month, info.week_of_month),
            CalendarLevel::Quarter => {
                (period_start, CalendarLevel::Quarter, info.week_of_quarter)
            }
            CalendarLevel::Year => (
                clamped_date(period_start.year(), info.month, 1)?,
                CalendarLevel::Month,
                info.week_of_month,
            ),
        };
        let week_start = nth_week_start(unit_start, unit_level, ordinal, self.week)?;
        if ordinal > 0 && week_start > level_end_date(unit_start, unit_level, self.week)? {
            return Ok(None);
        }
        shift_days(week_start, info.day_of_week).map(Some)
    }
}

/// Same calendar coordinates inside the target period, day clamped.
fn calendar_anchor(
    period_start: NaiveDate,
    level: CalendarLevel,
    anchor: NaiveDate,
) -> Result<NaiveDate> {
    let year = period_start.year();
    match level {
        CalendarLevel::Year => clamped_date(year, anchor.month(), anchor.day()),
        CalendarLevel::Quarter => clamped_date(
            year,
            period_start.month() + (anchor.month() - 1) % 3,
            anchor.day(),
        ),
        CalendarLevel::Month => clamped_date(year, period_start.month(), anchor.day()),
        CalendarLevel::Week | CalendarLevel::Day => Ok(period_start),
    }
}
