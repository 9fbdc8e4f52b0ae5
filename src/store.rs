use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use log::info;
use rusqlite::Connection;

use crate::error::{FetchError, Result};
use crate::models::{Category, CategoryAmounts, ExpenseRecord, Property};
use crate::period::YearMonth;

/// Source of expense records joined with their properties. A fetch either
/// returns the complete record set or fails; callers never see a partial set.
pub trait RecordStore {
    fn query(&self) -> Result<Vec<ExpenseRecord>>;
}

/// Fixed record set, for callers that already hold the data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ExpenseRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<ExpenseRecord>) -> Self {
        Self { records }
    }
}

impl RecordStore for MemoryStore {
    fn query(&self) -> Result<Vec<ExpenseRecord>> {
        check_unique(&self.records)?;
        Ok(self.records.clone())
    }
}

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    property_type TEXT,
    location TEXT,
    number_of_units INTEGER,
    vintage_year INTEGER,
    avg_sqft_per_unit REAL
);

CREATE TABLE IF NOT EXISTS monthly_expenses (
    id INTEGER PRIMARY KEY,
    property_id INTEGER NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    payroll REAL,
    admin REAL,
    marketing REAL,
    repairs_maintenance REAL,
    turnover REAL,
    utilities REAL,
    taxes REAL,
    insurance REAL,
    management_fees REAL,
    UNIQUE (property_id, year, month),
    FOREIGN KEY (property_id) REFERENCES properties(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn add_property(&self, p: &Property) -> Result<()> {
        self.conn.execute(
            "INSERT INTO properties (id, name, property_type, location, number_of_units, vintage_year, avg_sqft_per_unit) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                p.id,
                p.name,
                p.property_type,
                p.location,
                p.unit_count,
                p.vintage_year,
                p.avg_sqft_per_unit
            ],
        )?;
        Ok(())
    }

    pub fn add_expenses(&self, property_id: i64, period: YearMonth, amounts: &CategoryAmounts) -> Result<()> {
        let columns: Vec<&str> = Category::ALL.iter().map(|c| c.key()).collect();
        let placeholders: Vec<String> = (4..4 + columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO monthly_expenses (property_id, year, month, {}) VALUES (?1, ?2, ?3, {})",
            columns.join(", "),
            placeholders.join(", ")
        );
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
            Box::new(property_id),
            Box::new(period.year),
            Box::new(period.month),
        ];
        for (_, amount) in amounts.iter() {
            values.push(Box::new(amount));
        }
        let params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        self.conn.execute(&sql, params.as_slice())?;
        Ok(())
    }

    fn load_properties(&self) -> Result<HashMap<i64, Arc<Property>>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, property_type, location, number_of_units, vintage_year, avg_sqft_per_unit \
             FROM properties",
        )?;
        let properties = stmt
            .query_map([], |row| {
                Ok(Property {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    property_type: row.get(2)?,
                    location: row.get(3)?,
                    unit_count: row.get(4)?,
                    vintage_year: row.get(5)?,
                    avg_sqft_per_unit: row.get(6)?,
                })
            })?
            .map(|p| p.map(|p| (p.id, Arc::new(p))))
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(properties)
    }
}

impl RecordStore for SqliteStore {
    fn query(&self) -> Result<Vec<ExpenseRecord>> {
        let properties = self.load_properties()?;

        let sql = format!(
            "SELECT property_id, year, month, {} FROM monthly_expenses ORDER BY property_id, year, month",
            Category::ALL.map(|c| c.key()).join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raw: Vec<(i64, i32, i64, [Option<f64>; 9])> = stmt
            .query_map([], |row| {
                let mut amounts = [None; 9];
                for (i, slot) in amounts.iter_mut().enumerate() {
                    *slot = row.get(3 + i)?;
                }
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, amounts))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(raw.len());
        for (property_id, year, month, amounts) in raw {
            let property = properties.get(&property_id).ok_or_else(|| {
                FetchError::Malformed(format!("expense row references unknown property {property_id}"))
            })?;
            let period = u32::try_from(month)
                .ok()
                .and_then(|m| YearMonth::new(year, m))
                .ok_or_else(|| {
                    FetchError::Malformed(format!("property {property_id} has month {month} in {year}"))
                })?;
            records.push(ExpenseRecord::new(
                Arc::clone(property),
                period,
                CategoryAmounts::from_nullable(amounts),
            ));
        }
        info!(
            "fetched {} expense records for {} properties",
            records.len(),
            properties.len()
        );
        Ok(records)
    }
}

fn check_unique(records: &[ExpenseRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    for r in records {
        if !seen.insert((r.property_id(), r.period)) {
            return Err(FetchError::Malformed(format!(
                "duplicate record for property {} in {}",
                r.property_id(),
                r.period
            ))
            .into());
        }
    }
    Ok(())
}
