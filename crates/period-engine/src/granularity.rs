//! Slicing units and comparison modes.
//!
//! [`Granularity`] is a base unit plus at most one modifier. The fields are
//! private so that meaningless combinations (a modifier on `All`, `DayToDate`,
//! `SameYear`) cannot be built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarLevel;
use crate::error::{ComparisonError, Result};

/// A calendar unit, or `All` for "no periodic slicing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseUnit {
    All,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl BaseUnit {
    /// The calendar level, or `None` for [`BaseUnit::All`].
    pub fn calendar_level(self) -> Option<CalendarLevel> {
        match self {
            BaseUnit::All => None,
            BaseUnit::Day => Some(CalendarLevel::Day),
            BaseUnit::Week => Some(CalendarLevel::Week),
            BaseUnit::Month => Some(CalendarLevel::Month),
            BaseUnit::Quarter => Some(CalendarLevel::Quarter),
            BaseUnit::Year => Some(CalendarLevel::Year),
        }
    }
}

impl From<CalendarLevel> for BaseUnit {
    fn from(level: CalendarLevel) -> Self {
        match level {
            CalendarLevel::Day => BaseUnit::Day,
            CalendarLevel::Week => BaseUnit::Week,
            CalendarLevel::Month => BaseUnit::Month,
            CalendarLevel::Quarter => BaseUnit::Quarter,
            CalendarLevel::Year => BaseUnit::Year,
        }
    }
}

/// How the unit slices a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// Plain unit: buckets only, no sub-window.
    #[default]
    None,
    /// From the start of the unit up to the reference point.
    ToDate,
    /// Exactly the one unit containing the reference point.
    SameDate,
}

/// A slicing mode such as `month_to_date` or `same_week`.
///
/// Serialized by name. Only the named constants and the checked
/// constructors can build one.
///
/// # Examples
///
/// ```
/// use period_engine::{CalendarLevel, Granularity};
///
/// let mode: Granularity = "quarter_to_date".parse()?;
/// assert_eq!(mode, Granularity::QUARTER_TO_DATE);
/// assert_eq!(mode.slicing_level(), Some(CalendarLevel::Quarter));
/// assert!("year_to_month".parse::<Granularity>().is_err());
/// # Ok::<(), period_engine::ComparisonError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Granularity {
    base: BaseUnit,
    modifier: Modifier,
}

impl Granularity {
    pub const ALL: Granularity = Granularity::plain(BaseUnit::All);
    pub const YEAR_TO_DATE: Granularity = Granularity::raw(BaseUnit::Year, Modifier::ToDate);
    pub const QUARTER_TO_DATE: Granularity = Granularity::raw(BaseUnit::Quarter, Modifier::ToDate);
    pub const MONTH_TO_DATE: Granularity = Granularity::raw(BaseUnit::Month, Modifier::ToDate);
    pub const WEEK_TO_DATE: Granularity = Granularity::raw(BaseUnit::Week, Modifier::ToDate);
    pub const SAME_DAY: Granularity = Granularity::raw(BaseUnit::Day, Modifier::SameDate);
    pub const SAME_WEEK: Granularity = Granularity::raw(BaseUnit::Week, Modifier::SameDate);
    pub const SAME_MONTH: Granularity = Granularity::raw(BaseUnit::Month, Modifier::SameDate);
    pub const SAME_QUARTER: Granularity = Granularity::raw(BaseUnit::Quarter, Modifier::SameDate);

    const fn raw(base: BaseUnit, modifier: Modifier) -> Self {
        Self { base, modifier }
    }

    /// A unit without modifier.
    pub const fn plain(base: BaseUnit) -> Self {
        Self::raw(base, Modifier::None)
    }

    /// `{Year,Quarter,Month,Week}ToDate`.
    ///
    /// # Errors
    ///
    /// [`ComparisonError::InvalidGranularity`] for [`CalendarLevel::Day`].
    pub fn to_date(level: CalendarLevel) -> Result<Self> {
        if level == CalendarLevel::Day {
            return Err(ComparisonError::InvalidGranularity(
                "to-date slicing needs a unit coarser than a day".to_string(),
            ));
        }
        Ok(Self::raw(level.into(), Modifier::ToDate))
    }

    /// `Same{Day,Week,Month,Quarter}`.
    ///
    /// # Errors
    ///
    /// [`ComparisonError::InvalidGranularity`] for [`CalendarLevel::Year`].
    pub fn same(level: CalendarLevel) -> Result<Self> {
        if level == CalendarLevel::Year {
            return Err(ComparisonError::InvalidGranularity(
                "same-date slicing needs a unit finer than a year".to_string(),
            ));
        }
        Ok(Self::raw(level.into(), Modifier::SameDate))
    }

    pub fn base(&self) -> BaseUnit {
        self.base
    }

    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    /// No periodic slicing at all.
    pub fn is_all(&self) -> bool {
        self.base == BaseUnit::All
    }

    pub fn is_to_date(&self) -> bool {
        self.modifier == Modifier::ToDate
    }

    pub fn is_same_date(&self) -> bool {
        self.modifier == Modifier::SameDate
    }

    /// The unit whose sub-window is projected into each period, if this mode
    /// slices at all.
    pub fn slicing_level(&self) -> Option<CalendarLevel> {
        match self.modifier {
            Modifier::None => None,
            Modifier::ToDate | Modifier::SameDate => self.base.calendar_level(),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.base.calendar_level() {
            Some(level) => level.as_str(),
            None => "all",
        };
        match self.modifier {
            Modifier::None => f.write_str(unit),
            Modifier::ToDate => write!(f, "{unit}_to_date"),
            Modifier::SameDate => write!(f, "same_{unit}"),
        }
    }
}

impl FromStr for Granularity {
    type Err = ComparisonError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = |name: &str| -> Result<CalendarLevel> {
            CalendarLevel::ALL
                .into_iter()
                .find(|level| level.as_str() == name)
                .ok_or_else(|| {
                    ComparisonError::InvalidGranularity(format!("unknown unit '{name}'"))
                })
        };
        if s == "all" {
            Ok(Granularity::ALL)
        } else if let Some(name) = s.strip_suffix("_to_date") {
            Granularity::to_date(unit(name)?)
        } else if let Some(name) = s.strip_prefix("same_") {
            Granularity::same(unit(name)?)
        } else {
            Ok(Granularity::plain(unit(s)?.into()))
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = ComparisonError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Granularity> for String {
    fn from(granularity: Granularity) -> Self {
        granularity.to_string()
    }
}

/// What the comparison displays. Only the number of materialized periods
/// depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOption {
    #[default]
    Value,
    Change,
    Percent,
    ChangeAndValue,
    PercentAndValue,
}

impl ComparisonOption {
    /// Whether a prior baseline period is needed to compute a difference.
    pub fn needs_baseline(self) -> bool {
        self != ComparisonOption::Value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_modes() {
        assert_eq!(Granularity::QUARTER_TO_DATE.base(), BaseUnit::Quarter);
        assert!(Granularity::QUARTER_TO_DATE.is_to_date());
        assert!(Granularity::SAME_WEEK.is_same_date());
        assert!(Granularity::ALL.is_all());
        assert_eq!(Granularity::ALL.slicing_level(), None);
    }

    #[test]
    fn test_checked_constructors() {
        assert_eq!(
            Granularity::to_date(CalendarLevel::Year).unwrap(),
            Granularity::YEAR_TO_DATE
        );
        assert_eq!(
            Granularity::same(CalendarLevel::Day).unwrap(),
            Granularity::SAME_DAY
        );
        assert!(Granularity::to_date(CalendarLevel::Day).is_err());
        let err = Granularity::same(CalendarLevel::Year).unwrap_err();
        assert!(err.to_string().contains("Invalid granularity"), "got: {err}");
    }

    #[test]
    fn test_plain_unit_does_not_slice() {
        let month = Granularity::plain(BaseUnit::Month);
        assert_eq!(month.slicing_level(), None);
        assert_eq!(
            Granularity::MONTH_TO_DATE.slicing_level(),
            Some(CalendarLevel::Month)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Granularity::YEAR_TO_DATE.to_string(), "year_to_date");
        assert_eq!(Granularity::SAME_DAY.to_string(), "same_day");
        assert_eq!(Granularity::ALL.to_string(), "all");
    }

    #[test]
    fn test_parse_round_trips_display() {
        for mode in [
            Granularity::ALL,
            Granularity::WEEK_TO_DATE,
            Granularity::SAME_QUARTER,
            Granularity::plain(BaseUnit::Day),
        ] {
            assert_eq!(mode.to_string().parse::<Granularity>().unwrap(), mode);
        }
        assert!("same_year".parse::<Granularity>().is_err());
        assert!("fortnight".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_deserialize_rejects_meaningless_mode() {
        let ok: Granularity = serde_json::from_str("\"month_to_date\"").unwrap();
        assert_eq!(ok, Granularity::MONTH_TO_DATE);
        assert!(serde_json::from_str::<Granularity>("\"day_to_date\"").is_err());
    }

    #[test]
    fn test_baseline_requirement() {
        assert!(!ComparisonOption::Value.needs_baseline());
        assert!(ComparisonOption::Change.needs_baseline());
        assert!(ComparisonOption::PercentAndValue.needs_baseline());
    }
}
