//! Per-unit rescaling.
//!
//! Every place that divides by a property's unit count goes through
//! [`unit_divisor`]: a missing, zero or negative unit count divides by 1.

use log::debug;

use crate::models::Property;
use crate::window::AggregatedRow;

pub fn unit_divisor(unit_count: Option<i64>) -> f64 {
    match unit_count {
        Some(n) if n > 0 => n as f64,
        _ => 1.0,
    }
}

pub fn per_unit(amount: f64, property: &Property) -> f64 {
    amount / unit_divisor(property.unit_count)
}

/// Rescale category amounts to a per-unit basis. Runs after aggregation, so a
/// T12 total is divided once. Periods are never touched.
pub fn normalize(rows: &[AggregatedRow], per_unit: bool) -> Vec<AggregatedRow> {
    if !per_unit {
        return rows.to_vec();
    }
    debug!("normalizing {} rows per unit", rows.len());
    rows.iter()
        .map(|row| {
            let divisor = unit_divisor(row.property.unit_count);
            AggregatedRow {
                expenses: row.expenses.map(|v| v / divisor),
                ..row.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{Category, CategoryAmounts};
    use crate::period::YearMonth;
    use crate::window::RowPeriod;

    fn row(units: Option<i64>, payroll: f64) -> AggregatedRow {
        let mut p = Property::new(1, "Maple");
        p.unit_count = units;
        AggregatedRow {
            property: Arc::new(p),
            period: RowPeriod::Month(YearMonth::new(2024, 3).unwrap()),
            expenses: CategoryAmounts::default().with(Category::Payroll, payroll),
        }
    }

    #[test]
    fn test_divisor_guards_missing_and_non_positive() {
        assert_eq!(unit_divisor(Some(100)), 100.0);
        assert_eq!(unit_divisor(Some(0)), 1.0);
        assert_eq!(unit_divisor(Some(-4)), 1.0);
        assert_eq!(unit_divisor(None), 1.0);
    }

    #[test]
    fn test_pass_through_when_disabled() {
        let rows = vec![row(Some(100), 3300.0)];
        assert_eq!(normalize(&rows, false), rows);
    }

    #[test]
    fn test_divides_amounts_not_periods() {
        let rows = vec![row(Some(100), 3300.0)];
        let out = normalize(&rows, true);
        assert_eq!(out[0].expenses.get(Category::Payroll), 33.0);
        assert_eq!(out[0].period, rows[0].period);
    }

    #[test]
    fn test_zero_units_never_produce_infinity() {
        let out = normalize(&[row(Some(0), 500.0), row(None, 250.0)], true);
        assert_eq!(out[0].expenses.get(Category::Payroll), 500.0);
        assert_eq!(out[1].expenses.get(Category::Payroll), 250.0);
        assert!(out.iter().all(|r| r.expenses.iter().all(|(_, v)| v.is_finite())));
    }
}
