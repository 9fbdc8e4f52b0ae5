use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::debug;

use crate::error::ReportError;
use crate::models::{CategoryAmounts, ExpenseRecord, Property};
use crate::period::YearMonth;

/// How a property's history collapses into display rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMode {
    /// Every month, newest first.
    #[default]
    All,
    /// The three most recent months, verbatim.
    T3,
    /// One summed row over the twelve most recent months.
    T12,
}

impl WindowMode {
    /// Maximum number of months taken per property.
    pub fn months(&self) -> Option<usize> {
        match self {
            Self::All => None,
            Self::T3 => Some(3),
            Self::T12 => Some(12),
        }
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "All",
            Self::T3 => "T3",
            Self::T12 => "T12",
        })
    }
}

impl FromStr for WindowMode {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "t3" => Ok(Self::T3),
            "t12" => Ok(Self::T12),
            other => Err(ReportError::Validation(format!(
                "unknown window mode '{other}' (expected all, t3 or t12)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPeriod {
    Month(YearMonth),
    /// Synthetic sum over `months` months ending at `latest`.
    Total { months: usize, latest: YearMonth },
}

impl RowPeriod {
    pub fn month(&self) -> Option<YearMonth> {
        match self {
            Self::Month(ym) => Some(*ym),
            Self::Total { .. } => None,
        }
    }

    pub fn is_total(&self) -> bool {
        matches!(self, Self::Total { .. })
    }

    /// `3/2024` for a month, `12-month total to 3/2024` for a total.
    pub fn label(&self) -> String {
        match self {
            Self::Month(ym) => ym.label(),
            Self::Total { months, latest } => {
                format!("{months}-month total to {}", latest.label())
            }
        }
    }
}

/// A display row: either one raw month or a T12 period total.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub property: Arc<Property>,
    pub period: RowPeriod,
    pub expenses: CategoryAmounts,
}

impl AggregatedRow {
    fn from_record(record: &ExpenseRecord) -> Self {
        Self {
            property: Arc::clone(&record.property),
            period: RowPeriod::Month(record.period),
            expenses: record.expenses,
        }
    }
}

/// Group by property, newest month first. Groups come back in ascending
/// property id order.
fn group_by_property(records: &[ExpenseRecord]) -> BTreeMap<i64, Vec<&ExpenseRecord>> {
    let mut groups: BTreeMap<i64, Vec<&ExpenseRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.property_id()).or_default().push(record);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| b.period.cmp(&a.period));
    }
    groups
}

/// The raw months each property contributes under `mode`, newest first,
/// without summing. T12 yields the twelve constituent months.
pub fn select(records: &[ExpenseRecord], mode: WindowMode) -> Vec<ExpenseRecord> {
    let take = mode.months().unwrap_or(usize::MAX);
    group_by_property(records)
        .into_values()
        .flat_map(|group| group.into_iter().take(take).cloned().collect::<Vec<_>>())
        .collect()
}

pub fn aggregate(records: &[ExpenseRecord], mode: WindowMode) -> Vec<AggregatedRow> {
    let groups = group_by_property(records);
    debug!(
        "aggregating {} records across {} properties ({mode})",
        records.len(),
        groups.len()
    );

    let mut rows = Vec::new();
    for group in groups.into_values() {
        match mode {
            WindowMode::All | WindowMode::T3 => {
                let take = mode.months().unwrap_or(group.len());
                rows.extend(group.iter().take(take).map(|r| AggregatedRow::from_record(r)));
            }
            WindowMode::T12 => {
                let window = &group[..group.len().min(12)];
                let Some(newest) = window.first() else {
                    continue;
                };
                let expenses = window
                    .iter()
                    .fold(CategoryAmounts::default(), |acc, r| acc + r.expenses);
                rows.push(AggregatedRow {
                    property: Arc::clone(&newest.property),
                    period: RowPeriod::Total {
                        months: window.len(),
                        latest: newest.period,
                    },
                    expenses,
                });
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn property(id: i64) -> Arc<Property> {
        let mut p = Property::new(id, format!("Property {id}"));
        p.unit_count = Some(100);
        Arc::new(p)
    }

    fn record(p: &Arc<Property>, year: i32, month: u32, payroll: f64) -> ExpenseRecord {
        ExpenseRecord::new(
            Arc::clone(p),
            YearMonth::new(year, month).unwrap(),
            CategoryAmounts::default().with(Category::Payroll, payroll),
        )
    }

    fn history(p: &Arc<Property>, months: u32) -> Vec<ExpenseRecord> {
        (0..months)
            .map(|i| {
                let year = 2022 + (i / 12) as i32;
                record(p, year, i % 12 + 1, 100.0 + i as f64)
            })
            .collect()
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("T12".parse::<WindowMode>().unwrap(), WindowMode::T12);
        assert_eq!(" all ".parse::<WindowMode>().unwrap(), WindowMode::All);
        assert!("t6".parse::<WindowMode>().is_err());
    }

    #[test]
    fn test_all_sorts_newest_first() {
        let p = property(1);
        let records = vec![record(&p, 2024, 1, 1.0), record(&p, 2024, 3, 3.0), record(&p, 2023, 12, 0.5)];
        let rows = aggregate(&records, WindowMode::All);
        let months: Vec<_> = rows.iter().filter_map(|r| r.period.month()).collect();
        assert_eq!(
            months,
            vec![
                YearMonth::new(2024, 3).unwrap(),
                YearMonth::new(2024, 1).unwrap(),
                YearMonth::new(2023, 12).unwrap()
            ]
        );
    }

    #[test]
    fn test_t3_takes_three_most_recent_without_padding() {
        let p = property(1);
        let q = property(2);
        let mut records = history(&p, 8);
        records.extend(history(&q, 2));
        let rows = aggregate(&records, WindowMode::T3);
        assert_eq!(rows.iter().filter(|r| r.property.id == 1).count(), 3);
        assert_eq!(rows.iter().filter(|r| r.property.id == 2).count(), 2);
        assert_eq!(rows[0].period.month(), YearMonth::new(2022, 8));
    }

    #[test]
    fn test_t12_sums_twelve_most_recent() {
        let p = property(1);
        let records = history(&p, 15);
        let rows = aggregate(&records, WindowMode::T12);
        assert_eq!(rows.len(), 1);
        // months 4..=15 of the history carry payroll 103..=114
        let expected: f64 = (3..15).map(|i| 100.0 + i as f64).sum();
        assert_eq!(rows[0].expenses.get(Category::Payroll), expected);
        assert_eq!(
            rows[0].period,
            RowPeriod::Total {
                months: 12,
                latest: YearMonth::new(2023, 3).unwrap()
            }
        );
    }

    #[test]
    fn test_t12_short_history_sums_what_exists() {
        let p = property(1);
        let records = vec![record(&p, 2024, 1, 1000.0), record(&p, 2024, 2, 1100.0), record(&p, 2024, 3, 1200.0)];
        let rows = aggregate(&records, WindowMode::T12);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].expenses.get(Category::Payroll), 3300.0);
        assert!(rows[0].period.is_total());
        assert_eq!(rows[0].period.label(), "3-month total to 3/2024");
        assert_eq!(rows[0].property.id, 1);
    }

    #[test]
    fn test_does_not_mutate_input() {
        let p = property(1);
        let records = history(&p, 4);
        let before = records.clone();
        let _ = aggregate(&records, WindowMode::T12);
        assert_eq!(records, before);
    }

    #[test]
    fn test_select_keeps_constituent_months() {
        let p = property(1);
        let records = history(&p, 14);
        assert_eq!(select(&records, WindowMode::T12).len(), 12);
        assert_eq!(select(&records, WindowMode::T3).len(), 3);
        assert_eq!(select(&records, WindowMode::All).len(), 14);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[], WindowMode::T12).is_empty());
    }
}
