use super::require_rows;
use crate::error::{ReportError, Result};
use crate::models::Category;
use crate::window::AggregatedRow;

fn whole(value: f64) -> String {
    // `+ 0.0` folds -0 into 0
    format!("{:.0}", value.round() + 0.0)
}

/// One line per aggregated row: name, period label, then each category
/// rounded to whole units.
pub fn render_csv(rows: &[AggregatedRow]) -> Result<Vec<u8>> {
    require_rows(rows)?;
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Name", "Period"];
    header.extend(Category::ALL.iter().map(|c| c.label()));
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.property.name.clone(), row.period.label()];
        record.extend(row.expenses.iter().map(|(_, v)| whole(v)));
        wtr.write_record(&record)?;
    }

    wtr.into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{CategoryAmounts, Property};
    use crate::period::YearMonth;
    use crate::window::RowPeriod;

    fn row(name: &str, period: RowPeriod, payroll: f64) -> AggregatedRow {
        AggregatedRow {
            property: Arc::new(Property::new(1, name)),
            period,
            expenses: CategoryAmounts::default().with(Category::Payroll, payroll),
        }
    }

    #[test]
    fn test_render_csv_rounds_and_quotes() {
        let ym = YearMonth::new(2024, 3).unwrap();
        let rows = vec![
            row("Oak, Ridge", RowPeriod::Month(ym), 1234.5),
            row("Elm", RowPeriod::Total { months: 12, latest: ym }, -0.4),
        ];
        let text = String::from_utf8(render_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Name,Period,Payroll,Admin,Marketing,Repairs & Maint.,Turnover,Utilities,Taxes,Insurance,Mgmt Fees"
        );
        assert_eq!(lines[1], "\"Oak, Ridge\",3/2024,1235,0,0,0,0,0,0,0,0");
        assert_eq!(lines[2], "Elm,12-month total to 3/2024,0,0,0,0,0,0,0,0,0");
    }

    #[test]
    fn test_render_csv_empty_is_rejected() {
        assert!(matches!(render_csv(&[]), Err(ReportError::EmptyExport)));
    }
}
