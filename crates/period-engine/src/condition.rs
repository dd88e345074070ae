//! Filter predicates over a date column.
//!
//! The builder emits one branch per usable period and always returns a
//! trimmed tree: no nested `And`/`Or` of the same kind, no constant children,
//! no single-child nodes. Zero usable periods trim to `Const(false)`.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::period::{DateRange, PeriodRange};

/// A boolean filter over one date column.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use period_engine::{DateRange, PredicateTree};
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
/// let q1 = DateRange::from_dates(d(1, 1), d(3, 31)).unwrap();
/// let february = DateRange::from_dates(d(2, 1), d(2, 29)).unwrap();
/// let tree = PredicateTree::And(vec![
///     PredicateTree::between("order_date", q1),
///     PredicateTree::between("order_date", february),
/// ])
/// .trim();
/// assert_eq!(tree, PredicateTree::between("order_date", february));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateTree {
    /// `column BETWEEN start AND end`, both bounds inclusive.
    Between {
        column: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    And(Vec<PredicateTree>),
    Or(Vec<PredicateTree>),
    Const(bool),
}

impl PredicateTree {
    pub fn between(column: impl Into<String>, range: DateRange) -> Self {
        Self::Between {
            column: column.into(),
            start: range.start,
            end: range.end,
        }
    }

    /// Whether this tree matches nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::Const(false)
    }

    /// Normalize the tree bottom-up.
    pub fn trim(self) -> Self {
        match self {
            Self::Between { start, end, .. } if start > end => Self::Const(false),
            Self::And(children) => trim_and(children),
            Self::Or(children) => trim_or(children),
            leaf => leaf,
        }
    }

    /// Evaluate against a single value of the filtered column.
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        match self {
            Self::Between { start, end, .. } => *start <= at && at <= *end,
            Self::And(children) => children.iter().all(|child| child.matches(at)),
            Self::Or(children) => children.iter().any(|child| child.matches(at)),
            Self::Const(value) => *value,
        }
    }
}

fn trim_or(children: Vec<PredicateTree>) -> PredicateTree {
    let mut kept = Vec::with_capacity(children.len());
    for child in children {
        match child.trim() {
            PredicateTree::Const(true) => return PredicateTree::Const(true),
            PredicateTree::Const(false) => {}
            PredicateTree::Or(nested) => kept.extend(nested),
            other => kept.push(other),
        }
    }
    collapse(kept, PredicateTree::Or, false)
}

fn trim_and(children: Vec<PredicateTree>) -> PredicateTree {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child.trim() {
            PredicateTree::Const(false) => return PredicateTree::Const(false),
            PredicateTree::Const(true) => {}
            PredicateTree::And(nested) => flat.extend(nested),
            other => flat.push(other),
        }
    }

    // Same-column ranges under AND reduce to their intersection.
    let mut kept: Vec<PredicateTree> = Vec::with_capacity(flat.len());
    for child in flat {
        let (column, start, end) = match child {
            PredicateTree::Between { column, start, end } => (column, start, end),
            other => {
                kept.push(other);
                continue;
            }
        };
        let existing = kept.iter_mut().find_map(|k| match k {
            PredicateTree::Between {
                column: c,
                start: s,
                end: e,
            } if *c == column => Some((s, e)),
            _ => None,
        });
        match existing {
            Some((s, e)) => {
                *s = (*s).max(start);
                *e = (*e).min(end);
                if *s > *e {
                    return PredicateTree::Const(false);
                }
            }
            None => kept.push(PredicateTree::Between { column, start, end }),
        }
    }
    collapse(kept, PredicateTree::And, true)
}

fn collapse(
    mut kept: Vec<PredicateTree>,
    node: fn(Vec<PredicateTree>) -> PredicateTree,
    identity: bool,
) -> PredicateTree {
    match kept.len() {
        0 => PredicateTree::Const(identity),
        1 => kept.pop().unwrap_or(PredicateTree::Const(identity)),
        _ => node(kept),
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[PredicateTree], op: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

impl fmt::Display for PredicateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Between { column, start, end } => {
                write!(f, "{column} BETWEEN '{start}' AND '{end}'")
            }
            Self::And(children) => write_joined(f, children, "AND"),
            Self::Or(children) => write_joined(f, children, "OR"),
            Self::Const(true) => f.write_str("TRUE"),
            Self::Const(false) => f.write_str("FALSE"),
        }
    }
}

/// Builds the comparison filter for one date column.
#[derive(Debug, Clone)]
pub struct ConditionBuilder {
    column: String,
}

impl ConditionBuilder {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// `OR` of one branch per period.
    ///
    /// With `windows`, each branch is the period range intersected with the
    /// projected window at the same position; periods whose window is `None`
    /// are left out. An unbounded period contributes an always-true branch.
    pub fn build(
        &self,
        periods: &[PeriodRange],
        windows: Option<&[Option<DateRange>]>,
    ) -> PredicateTree {
        let branches: Vec<PredicateTree> = periods
            .iter()
            .enumerate()
            .filter_map(|(i, period)| {
                let whole = if period.is_unbounded() {
                    PredicateTree::Const(true)
                } else {
                    PredicateTree::between(self.column.as_str(), period.range())
                };
                match windows {
                    None => Some(whole),
                    Some(windows) => windows
                        .get(i)
                        .copied()
                        .flatten()
                        .map(|window| {
                            PredicateTree::And(vec![
                                whole,
                                PredicateTree::between(self.column.as_str(), window),
                            ])
                        }),
                }
            })
            .collect();
        debug!(column = %self.column, branches = branches.len(), "built comparison predicate");
        PredicateTree::Or(branches).trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{end_of_day, start_of_day, CalendarLevel};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::from_dates(start, end).unwrap()
    }

    fn quarter(index: usize, start: NaiveDate, end: NaiveDate) -> PeriodRange {
        PeriodRange {
            index,
            label: None,
            level: Some(CalendarLevel::Quarter),
            start: start_of_day(start),
            end: end_of_day(end),
        }
    }

    fn between(start: NaiveDate, end: NaiveDate) -> PredicateTree {
        PredicateTree::between("order_date", range(start, end))
    }

    #[test]
    fn test_unsliced_periods_or_of_ranges() {
        let periods = vec![
            quarter(0, d(2024, 4, 1), d(2024, 6, 30)),
            quarter(1, d(2024, 1, 1), d(2024, 3, 31)),
        ];
        let tree = ConditionBuilder::new("order_date").build(&periods, None);
        assert_eq!(
            tree,
            PredicateTree::Or(vec![
                between(d(2024, 4, 1), d(2024, 6, 30)),
                between(d(2024, 1, 1), d(2024, 3, 31)),
            ])
        );
    }

    #[test]
    fn test_sliced_periods_skip_unprojectable() {
        let periods = vec![
            quarter(0, d(2024, 4, 1), d(2024, 5, 15)),
            quarter(1, d(2024, 1, 1), d(2024, 3, 31)),
            quarter(2, d(2023, 10, 1), d(2023, 12, 31)),
        ];
        let windows = vec![
            Some(range(d(2024, 4, 1), d(2024, 5, 15))),
            None,
            Some(range(d(2023, 10, 1), d(2023, 11, 15))),
        ];
        let tree = ConditionBuilder::new("order_date").build(&periods, Some(windows.as_slice()));
        assert_eq!(
            tree,
            PredicateTree::Or(vec![
                between(d(2024, 4, 1), d(2024, 5, 15)),
                between(d(2023, 10, 1), d(2023, 11, 15)),
            ])
        );
        assert!(!tree.matches(start_of_day(d(2024, 2, 1))));
        assert!(tree.matches(start_of_day(d(2023, 11, 15))));
    }

    #[test]
    fn test_no_usable_ranges_matches_nothing() {
        let periods = vec![quarter(0, d(2024, 1, 1), d(2024, 3, 31))];
        let tree = ConditionBuilder::new("order_date").build(&periods, Some(&[None][..]));
        assert!(tree.is_empty());
        assert!(!tree.matches(start_of_day(d(2024, 2, 1))));
        assert!(ConditionBuilder::new("order_date").build(&[], None).is_empty());
    }

    #[test]
    fn test_unbounded_period_matches_everything() {
        let tree = ConditionBuilder::new("order_date").build(&[PeriodRange::unbounded(0)], None);
        assert_eq!(tree, PredicateTree::Const(true));

        let window = range(d(2024, 4, 1), d(2024, 5, 15));
        let sliced = ConditionBuilder::new("order_date")
            .build(&[PeriodRange::unbounded(0)], Some(&[Some(window)][..]));
        assert_eq!(sliced, PredicateTree::between("order_date", window));
    }

    #[test]
    fn test_trim_flattens_and_folds() {
        let a = between(d(2024, 1, 1), d(2024, 1, 31));
        let b = between(d(2024, 3, 1), d(2024, 3, 31));
        let tree = PredicateTree::Or(vec![
            PredicateTree::Const(false),
            PredicateTree::Or(vec![a.clone(), PredicateTree::And(vec![b.clone()])]),
            PredicateTree::And(vec![]),
        ]);
        // An empty AND is true, which absorbs the whole OR.
        assert_eq!(tree.trim(), PredicateTree::Const(true));

        let tree = PredicateTree::Or(vec![
            PredicateTree::Const(false),
            PredicateTree::Or(vec![a.clone(), PredicateTree::And(vec![b.clone()])]),
        ]);
        assert_eq!(tree.trim(), PredicateTree::Or(vec![a, b]));
        assert_eq!(PredicateTree::Or(vec![]).trim(), PredicateTree::Const(false));
    }

    #[test]
    fn test_trim_intersects_same_column() {
        let tree = PredicateTree::And(vec![
            between(d(2024, 1, 1), d(2024, 3, 31)),
            PredicateTree::And(vec![between(d(2024, 2, 1), d(2024, 6, 30))]),
        ]);
        assert_eq!(tree.trim(), between(d(2024, 2, 1), d(2024, 3, 31)));

        let disjoint = PredicateTree::And(vec![
            between(d(2024, 1, 1), d(2024, 1, 31)),
            between(d(2024, 3, 1), d(2024, 3, 31)),
        ]);
        assert_eq!(disjoint.trim(), PredicateTree::Const(false));
    }

    #[test]
    fn test_trim_keeps_other_columns() {
        let other = PredicateTree::between("ship_date", range(d(2024, 2, 1), d(2024, 2, 29)));
        let tree = PredicateTree::And(vec![between(d(2024, 1, 1), d(2024, 3, 31)), other.clone()]);
        assert_eq!(
            tree.trim(),
            PredicateTree::And(vec![between(d(2024, 1, 1), d(2024, 3, 31)), other])
        );
    }

    #[test]
    fn test_display() {
        let tree = PredicateTree::Or(vec![
            between(d(2024, 1, 1), d(2024, 1, 1)),
            PredicateTree::Const(false),
        ]);
        assert_eq!(
            tree.to_string(),
            "(order_date BETWEEN '2024-01-01 00:00:00' AND '2024-01-01 23:59:59.999' OR FALSE)"
        );
    }
}
