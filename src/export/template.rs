use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use log::{debug, warn};
use rust_xlsxwriter::{Format, Table, TableColumn, TableStyle, Workbook, Worksheet};

use super::workbook::excel_month;
use super::{require_rows, TemplateSpec, DATA_HEADERS, FMT_DATE, FMT_INTEGER, FMT_WHOLE_DOLLARS};
use crate::error::{ReportError, Result};
use crate::models::ExpenseRecord;

/// Top-left corner of the template's table header.
struct Anchor {
    header_row: u32,
    first_col: u16,
}

/// calamine hands table column names back XML-escaped (`&amp;`).
fn column_name(raw: &str) -> String {
    match quick_xml::escape::unescape(raw) {
        Ok(name) => name.trim().to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

fn mismatch(msg: String) -> ReportError {
    warn!("template rejected: {msg}");
    ReportError::TemplateMismatch(msg)
}

/// Copy the values and formulas of a template sheet. Cells for which `skip`
/// returns true are left out.
fn copy_cells(
    ws: &mut Worksheet,
    values: &Range<Data>,
    formulas: &Range<String>,
    skip: impl Fn(u32, u32) -> bool,
) -> Result<()> {
    let date = Format::new().set_num_format(FMT_DATE);

    if let Some((r0, c0)) = values.start() {
        for (r, c, cell) in values.used_cells() {
            let (row, col) = (r0 + r as u32, c0 + c as u32);
            if skip(row, col) {
                continue;
            }
            let col = col as u16;
            match cell {
                Data::Int(i) => {
                    ws.write_number(row, col, *i as f64)?;
                }
                Data::Float(f) => {
                    ws.write_number(row, col, *f)?;
                }
                Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                    ws.write_string(row, col, s)?;
                }
                Data::Bool(b) => {
                    ws.write_boolean(row, col, *b)?;
                }
                Data::DateTime(dt) => {
                    ws.write_number_with_format(row, col, dt.as_f64(), &date)?;
                }
                Data::Error(_) | Data::Empty => {}
            }
        }
    }

    if let Some((r0, c0)) = formulas.start() {
        for (r, c, formula) in formulas.used_cells() {
            let (row, col) = (r0 + r as u32, c0 + c as u32);
            if formula.is_empty() || skip(row, col) {
                continue;
            }
            ws.write_formula(row, col as u16, formula.as_str())?;
        }
    }
    Ok(())
}

fn write_opt_text(ws: &mut Worksheet, row: u32, col: u16, value: Option<&str>, fmt: &Format) -> Result<()> {
    match value {
        Some(v) => ws.write_string_with_format(row, col, v, fmt)?,
        None => ws.write_blank(row, col, fmt)?,
    };
    Ok(())
}

fn write_opt_number(ws: &mut Worksheet, row: u32, col: u16, value: Option<f64>, fmt: &Format) -> Result<()> {
    match value {
        Some(v) => ws.write_number_with_format(row, col, v, fmt)?,
        None => ws.write_blank(row, col, fmt)?,
    };
    Ok(())
}

fn write_data_table(
    ws: &mut Worksheet,
    table_name: &str,
    anchor: &Anchor,
    records: &[ExpenseRecord],
) -> Result<()> {
    let text = Format::new();
    let integer = Format::new().set_num_format(FMT_INTEGER);
    let date = Format::new().set_num_format(FMT_DATE);
    let money = Format::new().set_num_format(FMT_WHOLE_DOLLARS);
    let c0 = anchor.first_col;

    for (i, record) in records.iter().enumerate() {
        let row = anchor.header_row + 1 + i as u32;
        let p = &record.property;
        let (city, state) = p.city_state();
        ws.write_string_with_format(row, c0, &p.name, &text)?;
        write_opt_text(ws, row, c0 + 1, p.property_type.as_deref(), &text)?;
        write_opt_text(ws, row, c0 + 2, city.as_deref(), &text)?;
        write_opt_text(ws, row, c0 + 3, state.as_deref(), &text)?;
        write_opt_number(ws, row, c0 + 4, p.unit_count.map(|u| u as f64), &integer)?;
        write_opt_number(ws, row, c0 + 5, p.vintage_year.map(f64::from), &integer)?;
        write_opt_number(ws, row, c0 + 6, p.avg_sqft_per_unit, &integer)?;
        match excel_month(record.period) {
            Some(month) => ws.write_datetime_with_format(row, c0 + 7, &month, &date)?,
            None => ws.write_string_with_format(row, c0 + 7, record.period.label(), &text)?,
        };
        for (j, (_, amount)) in record.expenses.iter().enumerate() {
            ws.write_number_with_format(row, c0 + 8 + j as u16, amount, &money)?;
        }
    }

    let columns: Vec<TableColumn> = DATA_HEADERS
        .iter()
        .map(|h| TableColumn::new().set_header(*h))
        .collect();
    let table = Table::new()
        .set_name(table_name)
        .set_style(TableStyle::Medium2)
        .set_columns(&columns);
    let last_row = anchor.header_row + records.len() as u32;
    let last_col = c0 + DATA_HEADERS.len() as u16 - 1;
    ws.add_table(anchor.header_row, c0, last_row, last_col, &table)?;

    ws.set_column_width(c0, 30)?;
    ws.set_column_width(c0 + 7, 12)?;
    Ok(())
}

/// Pour `records` into the template's data table and return the finished
/// workbook. Sheets other than the data sheet keep their values and formulas
/// in their original order; the data sheet keeps whatever sits above the
/// table. Formulas that reference the table by name see the new rows.
pub fn render_templated(template: &[u8], spec: &TemplateSpec, records: &[ExpenseRecord]) -> Result<Vec<u8>> {
    require_rows(records)?;
    let mut source: Xlsx<_> = open_workbook_from_rs(Cursor::new(template))?;
    let sheets = source.sheet_names();
    if !sheets.iter().any(|s| s == &spec.sheet) {
        return Err(mismatch(format!("template has no sheet '{}'", spec.sheet)));
    }

    source.load_tables()?;
    let on_sheet = source
        .table_names_in_sheet(&spec.sheet)
        .iter()
        .any(|name| **name == spec.table);
    if !on_sheet {
        return Err(mismatch(format!(
            "sheet '{}' has no table named '{}'",
            spec.sheet, spec.table
        )));
    }
    let table = source.table_by_name(&spec.table)?;
    let columns: Vec<String> = table.columns().iter().map(|c| column_name(c)).collect();
    if columns != DATA_HEADERS {
        return Err(mismatch(format!(
            "table '{}' has columns [{}], expected [{}]",
            spec.table,
            columns.join(", "),
            DATA_HEADERS.join(", ")
        )));
    }
    let anchor = table
        .data()
        .start()
        .map(|(r, c)| Anchor {
            header_row: r.saturating_sub(1),
            first_col: c as u16,
        })
        .unwrap_or(Anchor {
            header_row: 0,
            first_col: 0,
        });

    let mut workbook = Workbook::new();
    for name in &sheets {
        let values = source.worksheet_range(name)?;
        let formulas = source.worksheet_formula(name)?;
        let ws = workbook.add_worksheet();
        ws.set_name(name)?;
        if name == &spec.sheet {
            let header_row = anchor.header_row;
            copy_cells(ws, &values, &formulas, |row, _| row >= header_row)?;
            write_data_table(ws, &spec.table, &anchor, records)?;
        } else {
            copy_cells(ws, &values, &formulas, |_, _| false)?;
        }
    }
    debug!(
        "filled '{}' with {} rows across {} sheets",
        spec.table,
        records.len(),
        sheets.len()
    );

    Ok(workbook.save_to_buffer()?)
}
