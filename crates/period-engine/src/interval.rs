//! How each period is sliced for a single comparison point.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarLevel;
use crate::error::{ComparisonError, Result};
use crate::granularity::{BaseUnit, Granularity};

/// Where the reference point of the interval comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndDatePolicy {
    /// Use the period's own reference end date.
    pub use_derived_end_date: bool,
    pub explicit_end_date: Option<NaiveDate>,
}

impl Default for EndDatePolicy {
    fn default() -> Self {
        Self::derived()
    }
}

impl EndDatePolicy {
    pub fn derived() -> Self {
        Self {
            use_derived_end_date: true,
            explicit_end_date: None,
        }
    }

    /// Slice against `date` instead of the period's reference end.
    pub fn explicit(date: NaiveDate) -> Self {
        Self {
            use_derived_end_date: false,
            explicit_end_date: Some(date),
        }
    }

    /// The reference date to slice against.
    ///
    /// # Errors
    ///
    /// [`ComparisonError::InvalidSpec`] when the policy asks for an explicit
    /// date that was never supplied.
    pub fn effective_end(&self, derived: NaiveDate) -> Result<NaiveDate> {
        if self.use_derived_end_date {
            return Ok(derived);
        }
        self.explicit_end_date.ok_or_else(|| {
            ComparisonError::InvalidSpec("explicit end date policy without a date".to_string())
        })
    }
}

/// How each period is sliced and how its results are bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSpec {
    /// Bucket size of the resulting series; `All` for no bucket dimension.
    pub granularity: BaseUnit,
    /// Slicing mode (`All`, a plain unit, `*ToDate` or `Same*`).
    pub mode: Granularity,
    /// Level at which result buckets are grouped.
    pub context_level: CalendarLevel,
    /// Whether the reference day (or unit) itself belongs to the window.
    #[serde(default = "default_inclusive")]
    pub inclusive: bool,
    #[serde(default)]
    pub end_date: EndDatePolicy,
}

fn default_inclusive() -> bool {
    true
}

impl IntervalSpec {
    /// Inclusive, with the end date derived from the period.
    pub fn new(
        granularity: impl Into<BaseUnit>,
        mode: Granularity,
        context_level: CalendarLevel,
    ) -> Self {
        Self {
            granularity: granularity.into(),
            mode,
            context_level,
            inclusive: true,
            end_date: EndDatePolicy::derived(),
        }
    }

    pub fn with_inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    pub fn with_end_date(mut self, end_date: EndDatePolicy) -> Self {
        self.end_date = end_date;
        self
    }

    /// The bucket level, or `None` when results are not bucketed.
    pub fn bucket_level(&self) -> Option<CalendarLevel> {
        self.granularity.calendar_level()
    }

    /// Whether this interval projects a sub-window into each period.
    pub fn slices(&self) -> bool {
        self.mode.slicing_level().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_end_date_policy() {
        let derived = d(2024, 5, 15);
        assert_eq!(EndDatePolicy::derived().effective_end(derived).unwrap(), derived);
        assert_eq!(
            EndDatePolicy::explicit(d(2024, 3, 1)).effective_end(derived).unwrap(),
            d(2024, 3, 1)
        );
        let missing = EndDatePolicy {
            use_derived_end_date: false,
            explicit_end_date: None,
        };
        assert!(matches!(
            missing.effective_end(derived),
            Err(ComparisonError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_slices_only_with_modifier() {
        let sliced = IntervalSpec::new(
            CalendarLevel::Day,
            Granularity::QUARTER_TO_DATE,
            CalendarLevel::Quarter,
        );
        assert!(sliced.slices());
        let bucketed =
            IntervalSpec::new(CalendarLevel::Week, Granularity::ALL, CalendarLevel::Quarter);
        assert!(!bucketed.slices());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"granularity":"day","mode":"same_week","context_level":"month"}"#;
        let spec: IntervalSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.mode, Granularity::SAME_WEEK);
        assert!(spec.inclusive);
        assert!(spec.end_date.use_derived_end_date);
        assert_eq!(spec.bucket_level(), Some(CalendarLevel::Day));
    }

    #[test]
    fn test_unbucketed_granularity() {
        let json = r#"{"granularity":"all","mode":"month_to_date","context_level":"month"}"#;
        let spec: IntervalSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.granularity, BaseUnit::All);
        assert_eq!(spec.bucket_level(), None);
        assert!(spec.slices());
    }
}
