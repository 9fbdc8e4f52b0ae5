//! Size-weighted per-unit averages.
//!
//! Always computed on monthly records (post-filter, pre-window) and always
//! weighted by average square footage per unit, whatever the active window
//! mode or per-unit toggle.

use std::collections::BTreeMap;

use log::debug;

use crate::models::{Category, ExpenseRecord, Property};
use crate::normalize::per_unit;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedAverages {
    values: BTreeMap<Category, f64>,
    total_weight: f64,
}

impl WeightedAverages {
    pub fn get(&self, category: Category) -> f64 {
        self.values.get(&category).copied().unwrap_or(0.0)
    }

    /// Rounded to the nearest whole currency unit.
    pub fn rounded(&self, category: Category) -> f64 {
        self.get(category).round()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }
}

fn weight(property: &Property) -> f64 {
    match property.avg_sqft_per_unit {
        Some(w) if w.is_finite() && w > 0.0 => w,
        _ => 0.0,
    }
}

pub fn weighted_average(records: &[ExpenseRecord]) -> WeightedAverages {
    let mut sums: BTreeMap<Category, f64> = BTreeMap::new();
    let mut total_weight = 0.0;

    for record in records {
        let w = weight(&record.property);
        total_weight += w;
        for (category, amount) in record.expenses.iter() {
            *sums.entry(category).or_insert(0.0) += per_unit(amount, &record.property) * w;
        }
    }

    let values = Category::ALL
        .into_iter()
        .map(|c| {
            let avg = if total_weight > 0.0 {
                sums.get(&c).copied().unwrap_or(0.0) / total_weight
            } else {
                0.0
            };
            (c, avg)
        })
        .collect();
    debug!("weighted averages over {} records, total weight {total_weight}", records.len());

    WeightedAverages {
        values,
        total_weight,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::CategoryAmounts;
    use crate::period::YearMonth;

    fn property(id: i64, units: Option<i64>, sqft: Option<f64>) -> Arc<Property> {
        let mut p = Property::new(id, format!("P{id}"));
        p.unit_count = units;
        p.avg_sqft_per_unit = sqft;
        Arc::new(p)
    }

    fn record(p: &Arc<Property>, month: u32, payroll: f64) -> ExpenseRecord {
        ExpenseRecord::new(
            Arc::clone(p),
            YearMonth::new(2024, month).unwrap(),
            CategoryAmounts::default().with(Category::Payroll, payroll),
        )
    }

    #[test]
    fn test_two_property_weighting() {
        // per-unit payroll 2 at 500 sqft, 4 at 1500 sqft
        let a = property(1, Some(100), Some(500.0));
        let b = property(2, Some(50), Some(1500.0));
        let avgs = weighted_average(&[record(&a, 1, 200.0), record(&b, 1, 200.0)]);
        assert!((avgs.get(Category::Payroll) - 3.5).abs() < 1e-9);
        assert_eq!(avgs.rounded(Category::Payroll), 4.0);
        assert_eq!(avgs.total_weight(), 2000.0);
    }

    #[test]
    fn test_single_property_equals_simple_per_unit_value() {
        let a = property(1, Some(100), Some(900.0));
        let avgs = weighted_average(&[record(&a, 1, 3300.0)]);
        assert!((avgs.get(Category::Payroll) - 33.0).abs() < 1e-9);
        assert_eq!(avgs.get(Category::Taxes), 0.0);
    }

    #[test]
    fn test_zero_weight_yields_zero() {
        let a = property(1, Some(10), None);
        let b = property(2, Some(10), Some(0.0));
        let avgs = weighted_average(&[record(&a, 1, 100.0), record(&b, 1, 100.0)]);
        assert_eq!(avgs.get(Category::Payroll), 0.0);
        assert!(weighted_average(&[]).iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_missing_units_divide_by_one() {
        let a = property(1, None, Some(800.0));
        let avgs = weighted_average(&[record(&a, 1, 120.0), record(&a, 2, 80.0)]);
        assert!((avgs.get(Category::Payroll) - 100.0).abs() < 1e-9);
    }
}
