//! The request pipeline: validate, resolve, project, build.
//!
//! [`ComparisonEngine::plan`] is the entry point a query layer calls once per
//! comparison. Validation failures mean the comparison should be suppressed;
//! periods without an equivalent window are dropped and reported in
//! [`ComparisonPlan::skipped`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calendar::CalendarLevel;
use crate::condition::{ConditionBuilder, PredicateTree};
use crate::config::EngineOptions;
use crate::error::{ComparisonError, Result};
use crate::granularity::{BaseUnit, ComparisonOption};
use crate::interval::IntervalSpec;
use crate::period::{CustomRange, DateRange, PeriodRange, PeriodSpec};
use crate::planner::{GranularityPlanner, GroupingPlan};
use crate::projector::{IntervalProjector, ReferenceWindow};
use crate::resolver::PeriodResolver;

/// One period-over-period comparison as the query layer sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    /// Date column the predicate filters on.
    pub column: String,
    pub period: PeriodSpec,
    #[serde(default)]
    pub interval: Option<IntervalSpec>,
    #[serde(default)]
    pub option: ComparisonOption,
    /// Several periods share one series and must stay distinguishable.
    #[serde(default)]
    pub overlay_periods: bool,
}

impl ComparisonRequest {
    pub fn new(column: impl Into<String>, period: PeriodSpec) -> Self {
        Self {
            column: column.into(),
            period,
            interval: None,
            option: ComparisonOption::Value,
            overlay_periods: false,
        }
    }

    pub fn with_interval(mut self, interval: IntervalSpec) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_option(mut self, option: ComparisonOption) -> Self {
        self.option = option;
        self
    }

    pub fn with_overlay_periods(mut self, overlay_periods: bool) -> Self {
        self.overlay_periods = overlay_periods;
        self
    }
}

/// A resolved period and the window applied inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparedPeriod {
    pub period: PeriodRange,
    /// `None` when the interval does not slice; the whole period applies.
    pub window: Option<DateRange>,
}

/// Everything a query layer needs to run the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonPlan {
    pub periods: Vec<ComparedPeriod>,
    /// Indices of periods dropped because they had no equivalent window.
    pub skipped: Vec<usize>,
    pub reference: Option<ReferenceWindow>,
    pub predicate: PredicateTree,
    /// `None` without an interval.
    pub grouping: Option<GroupingPlan>,
    pub date_series_required: bool,
}

/// Plans comparisons under one set of [`EngineOptions`].
#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    options: EngineOptions,
}

impl ComparisonEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Check that `period` and `interval` describe a comparison that can be
    /// planned.
    ///
    /// # Errors
    ///
    /// - [`ComparisonError::RepeatCountTooLarge`] above the configured maximum.
    /// - [`ComparisonError::InvalidSpec`] for an empty or fully invalid custom
    ///   list, inconsistent levels, slicing of custom periods, or an explicit
    ///   end-date policy without a date.
    pub fn validate(&self, period: &PeriodSpec, interval: Option<&IntervalSpec>) -> Result<()> {
        let period_level = match period {
            PeriodSpec::Standard(standard) => {
                let max = self.options.effective_max_repeat_count();
                if standard.repeat_count() > max {
                    return Err(ComparisonError::RepeatCountTooLarge {
                        requested: standard.repeat_count(),
                        max,
                    });
                }
                standard.level().calendar_level()
            }
            PeriodSpec::Custom { ranges } => {
                if ranges.is_empty() {
                    return Err(invalid("custom period list is empty"));
                }
                if !ranges.iter().any(CustomRange::is_valid) {
                    return Err(invalid("no custom range has both bounds in order"));
                }
                None
            }
        };

        let Some(interval) = interval else {
            return Ok(());
        };
        if let Some(bucket) = interval.bucket_level() {
            if bucket.is_coarser_than(interval.context_level) {
                return Err(invalid(format!(
                    "granularity {bucket} is coarser than context {}",
                    interval.context_level
                )));
            }
        }
        if let Some(level) = period_level {
            if interval.context_level.is_coarser_than(level) {
                return Err(invalid(format!(
                    "context {} is coarser than {level} periods",
                    interval.context_level
                )));
            }
            if let Some(unit) = interval.mode.slicing_level() {
                if unit.is_coarser_than(level) {
                    return Err(invalid(format!(
                        "{} cannot slice {level} periods",
                        interval.mode
                    )));
                }
            }
        }
        if interval.slices() && matches!(period, PeriodSpec::Custom { .. }) {
            return Err(invalid("custom periods cannot be sliced"));
        }
        let end_date = &interval.end_date;
        if !end_date.use_derived_end_date && end_date.explicit_end_date.is_none() {
            return Err(invalid("explicit end date policy without a date"));
        }
        Ok(())
    }

    /// Validate and plan one comparison request.
    ///
    /// # Errors
    ///
    /// Any error of [`validate`](Self::validate), and
    /// [`ComparisonError::DateOutOfRange`] when a period or window leaves the
    /// supported calendar.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use period_engine::{
    ///     BaseUnit, CalendarLevel, ComparisonEngine, ComparisonRequest, Granularity,
    ///     IntervalSpec, PeriodSpec, StandardPeriod,
    /// };
    ///
    /// let reference = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    /// let period = StandardPeriod::builder(BaseUnit::Quarter, reference)
    ///     .repeat_count(1)
    ///     .to_date(true)
    ///     .build()?;
    /// let interval = IntervalSpec::new(
    ///     CalendarLevel::Day,
    ///     Granularity::QUARTER_TO_DATE,
    ///     CalendarLevel::Quarter,
    /// );
    /// let request = ComparisonRequest::new("order_date", PeriodSpec::Standard(period))
    ///     .with_interval(interval);
    ///
    /// let plan = ComparisonEngine::default().plan(&request)?;
    /// assert_eq!(plan.periods.len(), 2);
    /// assert!(plan.skipped.is_empty());
    /// let previous = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
    /// assert_eq!(plan.periods[1].window.map(|w| w.end.date()), Some(previous));
    /// # Ok::<(), period_engine::ComparisonError>(())
    /// ```
    pub fn plan(&self, request: &ComparisonRequest) -> Result<ComparisonPlan> {
        let interval = request.interval.as_ref();
        self.validate(&request.period, interval)?;

        let period_level = request.period.calendar_level();
        let align_weeks = interval.is_some_and(|interval| {
            interval.bucket_level() == Some(CalendarLevel::Week)
                && period_level.is_some_and(|level| level.is_coarser_than(CalendarLevel::Week))
                && !interval.slices()
        });
        let periods = PeriodResolver::new(&self.options)
            .with_week_alignment(align_weeks)
            .resolve(&request.period, request.option)?;

        let sliced = match interval.filter(|interval| interval.slices()) {
            Some(interval) => {
                let derived = derived_end(&request.period)
                    .ok_or_else(|| invalid("sliced comparison needs a reference end date"))?;
                let reference_date = interval.end_date.effective_end(derived)?;
                let projector = IntervalProjector::new(&self.options);
                match projector.reference_window(reference_date, interval)? {
                    Some(reference) => {
                        let windows = projector.project_all(&periods, &reference, interval)?;
                        Some((reference, windows))
                    }
                    None => None,
                }
            }
            None => None,
        };

        let builder = ConditionBuilder::new(request.column.as_str());
        let windows = sliced.as_ref().map(|(_, windows)| windows.as_slice());
        let predicate = builder.build(&periods, windows);

        let (reference, periods, skipped) = match sliced {
            Some((reference, windows)) => {
                let mut kept = Vec::with_capacity(periods.len());
                let mut skipped = Vec::new();
                for (period, window) in periods.into_iter().zip(windows) {
                    match window {
                        Some(window) => kept.push(ComparedPeriod {
                            period,
                            window: Some(window),
                        }),
                        None => skipped.push(period.index),
                    }
                }
                (Some(reference), kept, skipped)
            }
            None => {
                let kept = periods
                    .into_iter()
                    .map(|period| ComparedPeriod { period, window: None })
                    .collect();
                (None, kept, Vec::new())
            }
        };

        let planner = GranularityPlanner;
        let grouping = interval
            .map(|interval| {
                let base = match &request.period {
                    PeriodSpec::Standard(standard) => standard.level(),
                    PeriodSpec::Custom { .. } => BaseUnit::from(interval.context_level),
                };
                planner.plan(base, interval.context_level, interval.granularity)
            })
            .transpose()?;
        let date_series_required = interval.is_some_and(|interval| {
            planner.is_date_series_required(
                interval.granularity,
                interval.context_level,
                request.overlay_periods,
            )
        });

        if !skipped.is_empty() {
            info!(skipped = ?skipped, "periods without an equivalent window were dropped");
        }
        debug!(
            column = %request.column,
            periods = periods.len(),
            %predicate,
            "planned comparison"
        );

        Ok(ComparisonPlan {
            periods,
            skipped,
            reference,
            predicate,
            grouping,
            date_series_required,
        })
    }
}

fn invalid(message: impl Into<String>) -> ComparisonError {
    ComparisonError::InvalidSpec(message.into())
}

fn derived_end(period: &PeriodSpec) -> Option<NaiveDate> {
    match period {
        PeriodSpec::Standard(standard) => Some(standard.reference_end()),
        PeriodSpec::Custom { .. } => None,
    }
}
