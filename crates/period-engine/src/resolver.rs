//! Period resolution: from a [`PeriodSpec`] to concrete, ordered period ranges.
//!
//! Standard periods are walked backward from the reference end date one
//! calendar unit at a time, newest first. Custom periods are validated and
//! sorted by start.

use tracing::{debug, trace};

use crate::calendar::{
    advance, end_of_day, shift_days, start_of_day, truncate_to_level_end,
    truncate_to_level_start, CalendarLevel, WeekConfig,
};
use crate::config::EngineOptions;
use crate::error::Result;
use crate::granularity::ComparisonOption;
use crate::period::{CustomRange, PeriodRange, PeriodSpec, StandardPeriod};

/// Turns a [`PeriodSpec`] into concrete ranges.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use period_engine::{
///     BaseUnit, ComparisonOption, EngineOptions, PeriodResolver, PeriodSpec, StandardPeriod,
/// };
///
/// let reference = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
/// let spec = PeriodSpec::Standard(
///     StandardPeriod::builder(BaseUnit::Quarter, reference)
///         .repeat_count(3)
///         .build()?,
/// );
/// let ranges = PeriodResolver::new(&EngineOptions::default())
///     .resolve(&spec, ComparisonOption::Value)?;
/// assert_eq!(ranges.len(), 4);
/// assert_eq!(ranges[3].start.to_string(), "2023-07-01 00:00:00");
/// # Ok::<(), period_engine::ComparisonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PeriodResolver {
    week: WeekConfig,
    align_weeks: bool,
}

impl PeriodResolver {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            week: options.week_config(),
            align_weeks: false,
        }
    }

    /// Round Standard periods coarser than a week outward to whole weeks.
    pub fn with_week_alignment(mut self, align_weeks: bool) -> Self {
        self.align_weeks = align_weeks;
        self
    }

    /// Resolve `spec` into its ordered period ranges.
    ///
    /// # Errors
    ///
    /// Only [`ComparisonError::DateOutOfRange`](crate::ComparisonError::DateOutOfRange)
    /// when the walk leaves the representable calendar. Invalid custom ranges
    /// are dropped, not reported.
    pub fn resolve(
        &self,
        spec: &PeriodSpec,
        option: ComparisonOption,
    ) -> Result<Vec<PeriodRange>> {
        match spec {
            PeriodSpec::Standard(standard) => self.resolve_standard(standard, option),
            PeriodSpec::Custom { ranges } => Ok(resolve_custom(ranges)),
        }
    }

    fn resolve_standard(
        &self,
        standard: &StandardPeriod,
        option: ComparisonOption,
    ) -> Result<Vec<PeriodRange>> {
        let Some(level) = standard.level().calendar_level() else {
            debug!("level `all` resolves to one unbounded period");
            return Ok(vec![PeriodRange::unbounded(0)]);
        };

        let count = standard.period_count(option);
        let reference = start_of_day(standard.reference_end());
        let current = truncate_to_level_start(reference, level, self.week)?;
        let skip = usize::from(!standard.inclusive());
        let partial_current = standard.inclusive() && standard.to_date();

        let mut ranges = Vec::with_capacity(count);
        for index in 0..count {
            let steps = (index + skip) as i32;
            let shifted = advance(current, level, -steps)?;
            let start = truncate_to_level_start(shifted, level, self.week)?;
            let end = if index == 0 && partial_current {
                end_of_day(standard.reference_end())
            } else {
                truncate_to_level_end(start, level, self.week)?
            };
            trace!(index, %start, %end, "resolved period");
            ranges.push(PeriodRange {
                index,
                label: None,
                level: Some(level),
                start,
                end,
            });
        }

        if self.align_weeks && level.is_coarser_than(CalendarLevel::Week) {
            ranges = align_to_weeks(ranges, self.week, partial_current)?;
        }

        debug!(
            level = %level,
            count = ranges.len(),
            reference = %standard.reference_end(),
            "resolved standard periods"
        );
        Ok(ranges)
    }
}

fn resolve_custom(ranges: &[CustomRange]) -> Vec<PeriodRange> {
    let mut valid: Vec<(&CustomRange, _, _)> = ranges
        .iter()
        .filter_map(|range| match (range.start, range.end) {
            (Some(start), Some(end)) if start <= end => Some((range, start, end)),
            _ => {
                debug!(label = %range.label, "dropping invalid custom range");
                None
            }
        })
        .collect();
    valid.sort_by_key(|(_, start, _)| *start);

    valid
        .into_iter()
        .enumerate()
        .map(|(index, (range, start, end))| PeriodRange {
            index,
            label: Some(range.label.clone()),
            level: None,
            start: start_of_day(start),
            end: end_of_day(end),
        })
        .collect()
}

/// Round newest-first periods outward to whole weeks without overlap.
///
/// Starts round back to the week start. Ends round forward to the week end,
/// but an older period never reaches past the day before its newer
/// neighbour's rounded start. With `keep_current_end`, the newest period's
/// end (a to-date reference point) is left as is.
pub fn align_to_weeks(
    ranges: Vec<PeriodRange>,
    week: WeekConfig,
    keep_current_end: bool,
) -> Result<Vec<PeriodRange>> {
    let mut aligned: Vec<PeriodRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        let start = truncate_to_level_start(range.start, CalendarLevel::Week, week)?;
        let end = match aligned.last() {
            None if keep_current_end => range.end,
            None => truncate_to_level_end(range.end, CalendarLevel::Week, week)?,
            Some(newer) => {
                let cap = end_of_day(shift_days(newer.start.date(), -1)?);
                truncate_to_level_end(range.end, CalendarLevel::Week, week)?.min(cap)
            }
        };
        aligned.push(PeriodRange { start, end, ..range });
    }
    Ok(aligned)
}
