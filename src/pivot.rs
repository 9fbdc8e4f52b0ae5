use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use log::debug;

use crate::models::{Category, ExpenseRecord, Property};
use crate::normalize::per_unit;
use crate::period;

/// One `(property, category)` line of the pivot: a per-unit value per date
/// column, `None` where the property has no record for that month.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub property: Arc<Property>,
    pub category: Category,
    pub values: Vec<Option<f64>>,
}

impl PivotRow {
    pub fn formatted(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| v.map(|x| format!("{x:.2}")).unwrap_or_default())
            .collect()
    }
}

/// Property x category x date matrix of per-unit costs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivot {
    pub dates: Vec<String>,
    pub rows: Vec<PivotRow>,
}

impl Pivot {
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["Property".to_string(), "Category".to_string()];
        header.extend(self.dates.iter().cloned());
        header
    }

    /// Header plus every row, values at two decimals, blanks as empty strings.
    pub fn to_table(&self) -> Vec<Vec<String>> {
        let mut table = vec![self.header()];
        for row in &self.rows {
            let mut line = vec![row.property.name.clone(), row.category.label().to_string()];
            line.extend(row.formatted());
            table.push(line);
        }
        table
    }

    pub fn value(&self, property_id: i64, category: Category, date: &str) -> Option<f64> {
        let col = self.dates.iter().position(|d| d == date)?;
        self.rows
            .iter()
            .find(|r| r.property.id == property_id && r.category == category)?
            .values[col]
    }
}

pub fn date_label(record: &ExpenseRecord) -> String {
    record.period.label()
}

/// Reshape records into a pivot. Amounts are divided by each property's unit
/// count. Date columns are the distinct labels sorted chronologically; rows
/// are ordered by property name, then category order.
pub fn build_pivot<F>(records: &[ExpenseRecord], date_label_of: F) -> Pivot
where
    F: Fn(&ExpenseRecord) -> String,
{
    let labels: Vec<String> = records.iter().map(&date_label_of).collect();

    let mut dates: Vec<String> = labels
        .iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .cloned()
        .collect();
    dates.sort();
    period::sort_labels(&mut dates);
    let column: HashMap<String, usize> = dates.iter().enumerate().map(|(i, d)| (d.clone(), i)).collect();

    let mut properties: BTreeMap<(String, i64), Arc<Property>> = BTreeMap::new();
    let mut cells: HashMap<(i64, Category), Vec<Option<f64>>> = HashMap::new();
    for (record, label) in records.iter().zip(&labels) {
        let property = &record.property;
        properties
            .entry((property.name.clone(), property.id))
            .or_insert_with(|| Arc::clone(property));
        let col = column[label];
        for (category, amount) in record.expenses.iter() {
            let values = cells
                .entry((property.id, category))
                .or_insert_with(|| vec![None; dates.len()]);
            values[col] = Some(per_unit(amount, property));
        }
    }

    let mut rows = Vec::with_capacity(cells.len());
    for property in properties.into_values() {
        for category in Category::ALL {
            if let Some(values) = cells.remove(&(property.id, category)) {
                rows.push(PivotRow {
                    property: Arc::clone(&property),
                    category,
                    values,
                });
            }
        }
    }
    debug!("pivot: {} rows x {} dates", rows.len(), dates.len());

    Pivot { dates, rows }
}
