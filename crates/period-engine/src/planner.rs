//! Grouping plans: native calendar truncation or a derived calendar-part column.
//!
//! Query layers can usually truncate to a level and extract the common
//! calendar parts (month of year, day of week). Parts such as "week of
//! quarter" have no native extraction and are synthesized by the caller from
//! the [`CalendarPartExpression`] returned here.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::{
    days_in_month, quarter_start_month, week_of_month, week_of_quarter, week_of_year,
    CalendarLevel, WeekConfig,
};
use crate::error::{ComparisonError, Result};
use crate::granularity::BaseUnit;

/// An integer position of a finer level inside a coarser one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPart {
    DayOfWeek,
    DayOfMonth,
    DayOfQuarter,
    DayOfYear,
    WeekOfMonth,
    WeekOfQuarter,
    WeekOfYear,
    MonthOfQuarter,
    MonthOfYear,
    QuarterOfYear,
}

impl CalendarPart {
    /// The part locating `child` within `parent`; `None` unless `child` is
    /// strictly finer than `parent`.
    pub fn of(child: CalendarLevel, parent: CalendarLevel) -> Option<Self> {
        use CalendarLevel::*;
        let part = match (parent, child) {
            (Year, Quarter) => Self::QuarterOfYear,
            (Year, Month) => Self::MonthOfYear,
            (Year, Week) => Self::WeekOfYear,
            (Year, Day) => Self::DayOfYear,
            (Quarter, Month) => Self::MonthOfQuarter,
            (Quarter, Week) => Self::WeekOfQuarter,
            (Quarter, Day) => Self::DayOfQuarter,
            (Month, Week) => Self::WeekOfMonth,
            (Month, Day) => Self::DayOfMonth,
            (Week, Day) => Self::DayOfWeek,
            _ => return None,
        };
        Some(part)
    }

    /// Whether a query layer can extract this part without a derived column.
    pub fn is_native(self) -> bool {
        matches!(
            self,
            Self::QuarterOfYear
                | Self::MonthOfYear
                | Self::WeekOfYear
                | Self::WeekOfMonth
                | Self::DayOfMonth
                | Self::DayOfWeek
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DayOfWeek => "day_of_week",
            Self::DayOfMonth => "day_of_month",
            Self::DayOfQuarter => "day_of_quarter",
            Self::DayOfYear => "day_of_year",
            Self::WeekOfMonth => "week_of_month",
            Self::WeekOfQuarter => "week_of_quarter",
            Self::WeekOfYear => "week_of_year",
            Self::MonthOfQuarter => "month_of_quarter",
            Self::MonthOfYear => "month_of_year",
            Self::QuarterOfYear => "quarter_of_year",
        }
    }

    /// The 1-based value of this part for `date`. Week parts use week 0 for
    /// the leading partial week.
    pub fn evaluate(self, date: NaiveDate, week: WeekConfig) -> u32 {
        match self {
            Self::DayOfWeek => week.days_from_week_start(date.weekday()) as u32 + 1,
            Self::DayOfMonth => date.day(),
            Self::DayOfQuarter => {
                let first = quarter_start_month(date.month());
                (first..date.month())
                    .map(|month| days_in_month(date.year(), month))
                    .sum::<u32>()
                    + date.day()
            }
            Self::DayOfYear => date.ordinal(),
            Self::WeekOfMonth => week_of_month(date, week),
            Self::WeekOfQuarter => week_of_quarter(date, week),
            Self::WeekOfYear => week_of_year(date, week),
            Self::MonthOfQuarter => (date.month() - 1) % 3 + 1,
            Self::MonthOfYear => date.month(),
            Self::QuarterOfYear => (date.month() - 1) / 3 + 1,
        }
    }
}

impl fmt::Display for CalendarPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar-part column the caller must materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarPartExpression {
    pub part: CalendarPart,
    /// The level the part is counted within.
    pub anchor: CalendarLevel,
}

impl CalendarPartExpression {
    /// Column name of the part, e.g. `week_of_quarter`.
    pub fn name(&self) -> &'static str {
        self.part.as_str()
    }
}

/// How result rows are bucketed. Both fields empty means no bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingPlan {
    /// Truncate natively to this level.
    pub native_level: Option<CalendarLevel>,
    /// Or group by this synthesized column.
    pub derived_expression: Option<CalendarPartExpression>,
}

impl GroupingPlan {
    pub fn native(level: CalendarLevel) -> Self {
        Self {
            native_level: Some(level),
            derived_expression: None,
        }
    }

    /// A single bucket per period.
    pub fn ungrouped() -> Self {
        Self {
            native_level: None,
            derived_expression: None,
        }
    }

    pub fn derived(expression: CalendarPartExpression) -> Self {
        Self {
            native_level: None,
            derived_expression: Some(expression),
        }
    }

    /// True unless a derived column is needed.
    pub fn is_native(&self) -> bool {
        self.derived_expression.is_none()
    }

    pub fn is_ungrouped(&self) -> bool {
        self.native_level.is_none() && self.derived_expression.is_none()
    }
}

/// Decides native truncation against derived calendar-part grouping.
///
/// # Examples
///
/// ```
/// use period_engine::{BaseUnit, CalendarLevel, CalendarPart, GranularityPlanner};
///
/// let plan = GranularityPlanner
///     .plan(BaseUnit::Quarter, CalendarLevel::Quarter, CalendarLevel::Week)
///     .unwrap();
/// assert_eq!(plan.derived_expression.map(|e| e.part), Some(CalendarPart::WeekOfQuarter));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GranularityPlanner;

impl GranularityPlanner {
    /// Decide how result buckets of `granularity` are grouped.
    ///
    /// Buckets are positions within the finer of `period_level` and
    /// `context_level`, so the same bucket lines up across periods. A
    /// granularity of `All` yields an ungrouped plan.
    ///
    /// # Errors
    ///
    /// [`ComparisonError::InvalidGranularity`] when `granularity` is coarser
    /// than `context_level`.
    pub fn plan(
        &self,
        period_level: BaseUnit,
        context_level: CalendarLevel,
        granularity: impl Into<BaseUnit>,
    ) -> Result<GroupingPlan> {
        let Some(granularity) = granularity.into().calendar_level() else {
            return Ok(GroupingPlan::ungrouped());
        };
        if granularity.is_coarser_than(context_level) {
            return Err(ComparisonError::InvalidGranularity(format!(
                "{granularity} buckets cannot be grouped within {context_level}"
            )));
        }
        let anchor = match period_level.calendar_level() {
            Some(level) => level.min(context_level),
            None => return Ok(GroupingPlan::native(granularity)),
        };
        let Some(part) = CalendarPart::of(granularity, anchor) else {
            return Ok(GroupingPlan::native(granularity));
        };
        if part.is_native() {
            return Ok(GroupingPlan::native(granularity));
        }
        debug!(%part, %anchor, "grouping needs a derived calendar part");
        Ok(GroupingPlan::derived(CalendarPartExpression { part, anchor }))
    }

    /// Whether the result needs an explicit bucket dimension.
    ///
    /// True when buckets are finer than the context, or when several periods
    /// are overlaid in one series and must stay distinguishable. Unbucketed
    /// (`All`) results need one only for an overlay.
    pub fn is_date_series_required(
        &self,
        granularity: impl Into<BaseUnit>,
        context_level: CalendarLevel,
        overlay_periods: bool,
    ) -> bool {
        match granularity.into().calendar_level() {
            Some(level) => level != context_level || overlay_periods,
            None => overlay_periods,
        }
    }
}
