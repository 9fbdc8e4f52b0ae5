use std::collections::HashSet;
use std::sync::Arc;

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use super::{require_rows, FMT_DATE, FMT_DOLLARS, FMT_INTEGER};
use crate::error::Result;
use crate::models::{Category, Property};
use crate::period::YearMonth;
use crate::pivot::Pivot;
use crate::window::{AggregatedRow, RowPeriod};

/// Excel's limit on worksheet name length.
pub const MAX_SHEET_NAME: usize = 31;

const OVERVIEW: &str = "Overview";
const CONSOLIDATED: &str = "Consolidated";
const OVERVIEW_HEADERS: [&str; 7] = [
    "Name",
    "Type",
    "City",
    "State",
    "Units",
    "Vintage Year",
    "Avg SqFt Per Unit",
];

fn clean_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    tidy(&replaced)
}

/// Excel refuses names that start or end with an apostrophe.
fn tidy(name: &str) -> String {
    let trimmed = name.trim_matches(|c: char| c == '\'' || c.is_whitespace());
    if trimmed.is_empty() {
        "Property".to_string()
    } else {
        trimmed.to_string()
    }
}

/// First `max` characters, tidied again since the cut can expose an
/// apostrophe.
fn truncate(name: &str, max: usize) -> String {
    tidy(&name.chars().take(max).collect::<String>())
}

/// Worksheet names for `names`, in order: cleaned, cut to the first 31
/// characters, and suffixed ` (2)`, ` (3)`... when a name is already taken
/// (case-insensitively, as Excel compares them). `reserved` names count as
/// taken from the start.
pub fn sheet_names<'a>(names: impl IntoIterator<Item = &'a str>, reserved: &[&str]) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.iter().map(|r| r.to_lowercase()).collect();
    let mut out = Vec::new();
    for name in names {
        let base = truncate(&clean_sheet_name(name), MAX_SHEET_NAME);
        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({n})");
            candidate = format!(
                "{}{suffix}",
                truncate(&base, MAX_SHEET_NAME - suffix.chars().count())
            );
            n += 1;
        }
        taken.insert(candidate.to_lowercase());
        out.push(candidate);
    }
    out
}

fn distinct_properties(rows: &[AggregatedRow]) -> Vec<Arc<Property>> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|r| seen.insert(r.property.id))
        .map(|r| Arc::clone(&r.property))
        .collect()
}

fn write_header(ws: &mut Worksheet, headers: &[&str], bold: &Format) -> Result<()> {
    for (col, h) in headers.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *h, bold)?;
    }
    Ok(())
}

fn write_opt_string(ws: &mut Worksheet, row: u32, col: u16, value: Option<&str>) -> Result<()> {
    if let Some(v) = value {
        ws.write_string(row, col, v)?;
    }
    Ok(())
}

fn write_overview(ws: &mut Worksheet, properties: &[Arc<Property>], bold: &Format) -> Result<()> {
    let integer = Format::new().set_num_format(FMT_INTEGER);
    ws.set_name(OVERVIEW)?;
    write_header(ws, &OVERVIEW_HEADERS, bold)?;
    for (i, p) in properties.iter().enumerate() {
        let row = i as u32 + 1;
        let (city, state) = p.city_state();
        ws.write_string(row, 0, &p.name)?;
        write_opt_string(ws, row, 1, p.property_type.as_deref())?;
        write_opt_string(ws, row, 2, city.as_deref())?;
        write_opt_string(ws, row, 3, state.as_deref())?;
        if let Some(units) = p.unit_count {
            ws.write_number_with_format(row, 4, units as f64, &integer)?;
        }
        if let Some(year) = p.vintage_year {
            ws.write_number_with_format(row, 5, year, &integer)?;
        }
        if let Some(sqft) = p.avg_sqft_per_unit {
            ws.write_number_with_format(row, 6, sqft, &integer)?;
        }
    }
    ws.set_column_width(0, 32)?;
    Ok(())
}

/// The first of the month as an Excel date, or `None` outside the years
/// Excel can show (1900..=9999). Callers write the `m/yyyy` label instead.
pub(super) fn excel_month(ym: YearMonth) -> Option<ExcelDateTime> {
    let year = u16::try_from(ym.year).ok().filter(|y| (1900..=9999).contains(y))?;
    ExcelDateTime::from_ymd(year, ym.month as u8, 1).ok()
}

fn write_property_sheet(
    ws: &mut Worksheet,
    name: &str,
    rows: &[&AggregatedRow],
    bold: &Format,
) -> Result<()> {
    let date = Format::new().set_num_format(FMT_DATE);
    let dollars = Format::new().set_num_format(FMT_DOLLARS);
    ws.set_name(name)?;

    let mut headers = vec!["Date"];
    headers.extend(Category::ALL.iter().map(|c| c.label()));
    write_header(ws, &headers, bold)?;

    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        match r.period {
            RowPeriod::Month(ym) => match excel_month(ym) {
                Some(month) => {
                    ws.write_datetime_with_format(row, 0, &month, &date)?;
                }
                None => {
                    ws.write_string(row, 0, ym.label())?;
                }
            },
            RowPeriod::Total { .. } => {
                ws.write_string(row, 0, r.period.label())?;
            }
        }
        for (col, (_, amount)) in r.expenses.iter().enumerate() {
            ws.write_number_with_format(row, col as u16 + 1, amount, &dollars)?;
        }
    }
    ws.set_column_width(0, 24)?;
    Ok(())
}

fn write_consolidated(ws: &mut Worksheet, pivot: &Pivot, bold: &Format) -> Result<()> {
    let two_places = Format::new().set_num_format("0.00");
    ws.set_name(CONSOLIDATED)?;
    let header = pivot.header();
    let header: Vec<&str> = header.iter().map(String::as_str).collect();
    write_header(ws, &header, bold)?;
    for (i, line) in pivot.rows.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, &line.property.name)?;
        ws.write_string(row, 1, line.category.label())?;
        for (j, value) in line.values.iter().enumerate() {
            if let Some(v) = value {
                let rounded = (v * 100.0).round() / 100.0;
                ws.write_number_with_format(row, j as u16 + 2, rounded, &two_places)?;
            }
        }
    }
    ws.set_column_width(0, 32)?;
    Ok(())
}

/// Overview, one detail sheet per property (in the order the properties first
/// appear in `rows`), then the consolidated pivot.
pub fn render_workbook(rows: &[AggregatedRow], pivot: &Pivot) -> Result<Vec<u8>> {
    require_rows(rows)?;
    let bold = Format::new().set_bold();
    let properties = distinct_properties(rows);
    let names = sheet_names(
        properties.iter().map(|p| p.name.as_str()),
        &[OVERVIEW, CONSOLIDATED],
    );

    let mut workbook = Workbook::new();
    write_overview(workbook.add_worksheet(), &properties, &bold)?;
    for (property, name) in properties.iter().zip(&names) {
        let own: Vec<&AggregatedRow> = rows.iter().filter(|r| r.property.id == property.id).collect();
        write_property_sheet(workbook.add_worksheet(), name, &own, &bold)?;
    }
    write_consolidated(workbook.add_worksheet(), pivot, &bold)?;

    Ok(workbook.save_to_buffer()?)
}
