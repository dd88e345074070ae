//! # period-engine
//!
//! Deterministic date resolution for period-over-period analytics.
//!
//! Given a declarative period specification, an optional interval rule and a
//! reference date, the engine computes the comparable periods ("this quarter
//! and the three before it"), the equivalent partial window inside each of
//! them ("quarter to date"), a filter predicate over a date column, and how
//! result buckets should be grouped.
//!
//! ## Modules
//!
//! - [`calendar`]: Truncation, advancing and week numbering at each calendar level
//! - [`granularity`]: Slicing modes (`month_to_date`, `same_week`, ...) and comparison options
//! - [`period`]: Standard and custom period specs, resolved ranges
//! - [`interval`]: Per-comparison slicing rules and end-date policy
//! - [`resolver`]: Period spec → ordered period ranges
//! - [`projector`]: Reference window → equivalent window in every period
//! - [`planner`]: Native truncation vs. derived calendar-part grouping
//! - [`condition`]: Predicate trees over a date column
//! - [`comparison`]: The validate / resolve / project / build pipeline
//! - [`config`]: Engine options
//! - [`error`]: Error types

pub mod calendar;
pub mod comparison;
pub mod condition;
pub mod config;
pub mod error;
pub mod granularity;
pub mod interval;
pub mod period;
pub mod planner;
pub mod projector;
pub mod resolver;

pub use calendar::{CalendarLevel, WeekConfig, WeekStartDay};
pub use comparison::{ComparedPeriod, ComparisonEngine, ComparisonPlan, ComparisonRequest};
pub use condition::{ConditionBuilder, PredicateTree};
pub use config::EngineOptions;
pub use error::ComparisonError;
pub use granularity::{BaseUnit, ComparisonOption, Granularity, Modifier};
pub use interval::{EndDatePolicy, IntervalSpec};
pub use period::{CustomRange, DateRange, PeriodRange, PeriodSpec, StandardPeriod, MAX_REPEAT_COUNT};
pub use planner::{CalendarPart, CalendarPartExpression, GranularityPlanner, GroupingPlan};
pub use projector::{IntervalProjector, ReferenceWindow, WeekInfo};
pub use resolver::PeriodResolver;
