use comfy_table::{Cell, CellAlignment, Table};

use crate::fmt::{two_places, whole_money};
use crate::models::{Category, ExpenseRecord};
use crate::stats::WeightedAverages;
use crate::window::AggregatedRow;

/// Rows shown by [`render_preview`] before the table is cut off.
pub const PREVIEW_ROWS: usize = 100;

fn amount_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn header(first: &[&'static str]) -> Vec<&'static str> {
    let mut header = first.to_vec();
    header.extend(Category::ALL.iter().map(|c| c.label()));
    header
}

pub fn render_rows(rows: &[AggregatedRow]) -> String {
    let mut table = Table::new();
    table.set_header(header(&["Name", "Period"]));
    for row in rows {
        let mut cells = vec![Cell::new(&row.property.name), Cell::new(row.period.label())];
        cells.extend(row.expenses.iter().map(|(_, v)| amount_cell(two_places(v))));
        table.add_row(cells);
    }
    table.to_string()
}

/// The first [`PREVIEW_ROWS`] records as whole dollars, with a note when
/// more were left out.
pub fn render_preview(records: &[ExpenseRecord]) -> String {
    let mut table = Table::new();
    table.set_header(header(&["Property", "Date"]));
    for record in records.iter().take(PREVIEW_ROWS) {
        let mut cells = vec![Cell::new(&record.property.name), Cell::new(record.period.label())];
        cells.extend(record.expenses.iter().map(|(_, v)| amount_cell(whole_money(v))));
        table.add_row(cells);
    }
    let mut out = table.to_string();
    if records.len() > PREVIEW_ROWS {
        out.push_str(&format!(
            "\nShowing first {PREVIEW_ROWS} rows of {}",
            records.len()
        ));
    }
    out
}

pub fn render_averages(averages: &WeightedAverages) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Weighted Avg / Unit"]);
    for (category, _) in averages.iter() {
        table.add_row(vec![
            Cell::new(category.label()),
            amount_cell(whole_money(averages.rounded(category))),
        ]);
    }
    format!("Weighted Averages\n{table}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{CategoryAmounts, Property};
    use crate::period::YearMonth;
    use crate::stats::weighted_average;
    use crate::window::RowPeriod;

    fn records(n: u32) -> Vec<ExpenseRecord> {
        let mut p = Property::new(1, "Oak Ridge");
        p.unit_count = Some(10);
        p.avg_sqft_per_unit = Some(800.0);
        let p = Arc::new(p);
        (0..n)
            .map(|i| {
                ExpenseRecord::new(
                    Arc::clone(&p),
                    YearMonth::new(2000 + (i / 12) as i32, i % 12 + 1).unwrap(),
                    CategoryAmounts::default().with(Category::Payroll, 1234.56),
                )
            })
            .collect()
    }

    #[test]
    fn test_render_rows_two_places() {
        let ym = YearMonth::new(2024, 3).unwrap();
        let row = AggregatedRow {
            property: Arc::new(Property::new(1, "Oak Ridge")),
            period: RowPeriod::Total { months: 12, latest: ym },
            expenses: CategoryAmounts::default().with(Category::Payroll, 33.0),
        };
        let out = render_rows(&[row]);
        assert!(out.contains("Oak Ridge"));
        assert!(out.contains("12-month total to 3/2024"));
        assert!(out.contains("33.00"));
        assert!(out.contains("Mgmt Fees"));
    }

    #[test]
    fn test_render_preview_caps_rows() {
        let out = render_preview(&records(150));
        assert!(out.contains("$1,235"));
        assert!(out.contains("Showing first 100 rows of 150"));
        // 100 data rows -> the 101st month (5/2008) is not shown
        assert!(out.contains("4/2008"));
        assert!(!out.contains("5/2008"));
    }

    #[test]
    fn test_render_preview_short_has_no_note() {
        let out = render_preview(&records(3));
        assert!(!out.contains("Showing first"));
    }

    #[test]
    fn test_render_averages() {
        let out = render_averages(&weighted_average(&records(2)));
        assert!(out.starts_with("Weighted Averages"));
        assert!(out.contains("Payroll"));
        // 1234.56 / 10 units
        assert!(out.contains("$123"));
    }
}
