//! Declarative period specifications and resolved period ranges.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{end_of_day, start_of_day, CalendarLevel};
use crate::error::{ComparisonError, Result};
use crate::granularity::{BaseUnit, ComparisonOption};

/// Hard upper bound on `repeat_count`, enforced at construction.
pub const MAX_REPEAT_COUNT: u32 = 366;

// ── DateRange ───────────────────────────────────────────────────────────────

/// A closed date-time window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// `None` when `start > end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Whole days from 00:00 of `start` through 23:59:59.999 of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        Self::new(start_of_day(start), end_of_day(end))
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }

    /// The overlap of both ranges, or `None` when they are disjoint.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        DateRange::new(self.start.max(other.start), self.end.min(other.end))
    }
}

// ── Standard periods ────────────────────────────────────────────────────────

/// A recurring period walked backward from a reference end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStandardPeriod")]
pub struct StandardPeriod {
    level: BaseUnit,
    repeat_count: u32,
    inclusive: bool,
    to_date: bool,
    reference_end: NaiveDate,
}

impl StandardPeriod {
    /// Start a spec with no older periods, inclusive and complete.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use period_engine::{BaseUnit, StandardPeriod};
    ///
    /// let reference = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    /// let period = StandardPeriod::builder(BaseUnit::Month, reference)
    ///     .repeat_count(11)
    ///     .build()?;
    /// assert_eq!(period.repeat_count(), 11);
    /// assert!(StandardPeriod::builder(BaseUnit::Day, reference)
    ///     .repeat_count(1_000)
    ///     .build()
    ///     .is_err());
    /// # Ok::<(), period_engine::ComparisonError>(())
    /// ```
    pub fn builder(level: BaseUnit, reference_end: NaiveDate) -> StandardPeriodBuilder {
        StandardPeriodBuilder {
            level,
            reference_end,
            repeat_count: 0,
            inclusive: true,
            to_date: false,
        }
    }

    pub fn level(&self) -> BaseUnit {
        self.level
    }

    /// Number of periods before the current one.
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    /// Whether the current (reference) period is part of the comparison.
    pub fn inclusive(&self) -> bool {
        self.inclusive
    }

    /// Whether the current period ends at the reference date instead of the
    /// end of its calendar unit.
    pub fn to_date(&self) -> bool {
        self.to_date
    }

    /// The date the walk starts from.
    pub fn reference_end(&self) -> NaiveDate {
        self.reference_end
    }

    /// `repeat_count + (inclusive ? 1 : 0) + (baseline ? 1 : 0)`.
    pub fn period_count(&self, option: ComparisonOption) -> usize {
        self.repeat_count as usize
            + usize::from(self.inclusive)
            + usize::from(option.needs_baseline())
    }
}

/// Builder returned by [`StandardPeriod::builder`].
#[derive(Debug, Clone)]
pub struct StandardPeriodBuilder {
    level: BaseUnit,
    reference_end: NaiveDate,
    repeat_count: u32,
    inclusive: bool,
    to_date: bool,
}

impl StandardPeriodBuilder {
    pub fn repeat_count(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    pub fn to_date(mut self, to_date: bool) -> Self {
        self.to_date = to_date;
        self
    }

    /// # Errors
    ///
    /// Returns [`ComparisonError::RepeatCountTooLarge`] above [`MAX_REPEAT_COUNT`].
    pub fn build(self) -> Result<StandardPeriod> {
        if self.repeat_count > MAX_REPEAT_COUNT {
            return Err(ComparisonError::RepeatCountTooLarge {
                requested: self.repeat_count,
                max: MAX_REPEAT_COUNT,
            });
        }
        Ok(StandardPeriod {
            level: self.level,
            repeat_count: self.repeat_count,
            inclusive: self.inclusive,
            to_date: self.to_date,
            reference_end: self.reference_end,
        })
    }
}

#[derive(Deserialize)]
struct RawStandardPeriod {
    level: BaseUnit,
    #[serde(default)]
    repeat_count: u32,
    #[serde(default = "default_inclusive")]
    inclusive: bool,
    #[serde(default)]
    to_date: bool,
    reference_end: NaiveDate,
}

fn default_inclusive() -> bool {
    true
}

impl TryFrom<RawStandardPeriod> for StandardPeriod {
    type Error = ComparisonError;

    fn try_from(raw: RawStandardPeriod) -> Result<Self> {
        StandardPeriod::builder(raw.level, raw.reference_end)
            .repeat_count(raw.repeat_count)
            .inclusive(raw.inclusive)
            .to_date(raw.to_date)
            .build()
    }
}

// ── Custom periods ──────────────────────────────────────────────────────────

/// One user-supplied range. Missing or inverted bounds are tolerated here
/// and dropped at resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRange {
    pub label: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl CustomRange {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// Both bounds present and `start <= end`.
    pub fn is_valid(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start <= end)
    }
}

/// The comparison's period model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeriodSpec {
    Standard(StandardPeriod),
    Custom { ranges: Vec<CustomRange> },
}

impl PeriodSpec {
    pub fn custom(ranges: Vec<CustomRange>) -> Self {
        PeriodSpec::Custom { ranges }
    }

    /// The calendar level of a Standard spec; `None` for Custom or `All`.
    pub fn calendar_level(&self) -> Option<CalendarLevel> {
        match self {
            PeriodSpec::Standard(standard) => standard.level.calendar_level(),
            PeriodSpec::Custom { .. } => None,
        }
    }
}

// ── Resolved ranges ─────────────────────────────────────────────────────────

/// One resolved period. Standard periods are indexed newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodRange {
    pub index: usize,
    pub label: Option<String>,
    /// Calendar level of a Standard period; `None` for Custom and unbounded ranges.
    pub level: Option<CalendarLevel>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodRange {
    /// The single open-ended period of a level-`All` comparison.
    pub fn unbounded(index: usize) -> Self {
        Self {
            index,
            label: None,
            level: None,
            start: NaiveDateTime::MIN,
            end: NaiveDateTime::MAX,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start == NaiveDateTime::MIN && self.end == NaiveDateTime::MAX
    }

    /// The period as a plain [`DateRange`].
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.range().contains(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let p = StandardPeriod::builder(BaseUnit::Quarter, d(2024, 5, 15))
            .build()
            .unwrap();
        assert_eq!(p.repeat_count(), 0);
        assert!(p.inclusive());
        assert!(!p.to_date());
        assert_eq!(p.period_count(ComparisonOption::Value), 1);
    }

    #[test]
    fn test_builder_rejects_excessive_repeat_count() {
        let err = StandardPeriod::builder(BaseUnit::Day, d(2024, 5, 15))
            .repeat_count(MAX_REPEAT_COUNT + 1)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ComparisonError::RepeatCountTooLarge {
                requested: 367,
                max: 366
            }
        );
    }

    #[test]
    fn test_period_count_formula() {
        let p = StandardPeriod::builder(BaseUnit::Month, d(2024, 5, 15))
            .repeat_count(3)
            .inclusive(false)
            .build()
            .unwrap();
        assert_eq!(p.period_count(ComparisonOption::Value), 3);
        assert_eq!(p.period_count(ComparisonOption::Percent), 4);
    }

    #[test]
    fn test_custom_range_validity() {
        assert!(CustomRange::new("jan", d(2023, 1, 1), d(2023, 1, 31)).is_valid());
        assert!(CustomRange::new("one day", d(2023, 1, 1), d(2023, 1, 1)).is_valid());
        assert!(!CustomRange::new("inverted", d(2023, 4, 10), d(2023, 4, 1)).is_valid());
        let open = CustomRange {
            label: "open".to_string(),
            start: Some(d(2023, 1, 1)),
            end: None,
        };
        assert!(!open.is_valid());
    }

    #[test]
    fn test_date_range_intersection() {
        let a = DateRange::from_dates(d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        let b = DateRange::from_dates(d(2024, 3, 1), d(2024, 4, 30)).unwrap();
        let both = a.intersect(&b).unwrap();
        assert_eq!(both, DateRange::from_dates(d(2024, 3, 1), d(2024, 3, 31)).unwrap());
        let c = DateRange::from_dates(d(2024, 5, 1), d(2024, 5, 2)).unwrap();
        assert!(a.intersect(&c).is_none());
        assert!(DateRange::from_dates(d(2024, 2, 1), d(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_unbounded_range() {
        let all = PeriodRange::unbounded(0);
        assert!(all.is_unbounded());
        assert!(all.contains(start_of_day(d(1970, 1, 1))));
    }

    #[test]
    fn test_deserialize_standard_spec_validates() {
        let json = r#"{
            "kind": "standard",
            "level": "quarter",
            "repeat_count": 3,
            "reference_end": "2024-05-15"
        }"#;
        let spec: PeriodSpec = serde_json::from_str(json).unwrap();
        match &spec {
            PeriodSpec::Standard(p) => {
                assert_eq!(p.level(), BaseUnit::Quarter);
                assert!(p.inclusive());
            }
            PeriodSpec::Custom { .. } => panic!("expected standard spec"),
        }
        assert_eq!(spec.calendar_level(), Some(CalendarLevel::Quarter));

        let too_many = r#"{
            "kind": "standard",
            "level": "day",
            "repeat_count": 1000,
            "reference_end": "2024-05-15"
        }"#;
        assert!(serde_json::from_str::<PeriodSpec>(too_many).is_err());
    }

    #[test]
    fn test_deserialize_custom_spec() {
        let json = r#"{"kind": "custom", "ranges": [
            {"label": "jan", "start": "2023-01-01", "end": "2023-01-31"},
            {"label": "open", "start": null, "end": "2023-02-01"}
        ]}"#;
        let spec: PeriodSpec = serde_json::from_str(json).unwrap();
        match spec {
            PeriodSpec::Custom { ranges } => {
                assert_eq!(ranges.len(), 2);
                assert!(ranges[0].is_valid());
                assert!(!ranges[1].is_valid());
            }
            PeriodSpec::Standard(_) => panic!("expected custom spec"),
        }
    }
}
