use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::error::{ReportError, Result};
use crate::models::ExpenseRecord;
use crate::period::YearMonth;

/// Inclusive bounds on a property's unit count. A missing unit count is
/// compared as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRange {
    pub min: i64,
    pub max: i64,
}

impl Default for UnitRange {
    fn default() -> Self {
        Self { min: 0, max: i64::MAX }
    }
}

impl UnitRange {
    pub fn contains(&self, units: i64) -> bool {
        units >= self.min && units <= self.max
    }
}

/// Facet selections. An empty set leaves its facet unconstrained; facets are
/// combined with AND, values inside one facet with OR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub states: BTreeSet<String>,
    /// Only meaningful with exactly one selected state.
    pub cities: BTreeSet<String>,
    pub property_types: BTreeSet<String>,
    pub decades: BTreeSet<i32>,
    pub units: UnitRange,
    /// Inclusive month bounds; either may be set alone.
    pub from: Option<YearMonth>,
    pub to: Option<YearMonth>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.states.insert(state.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.cities.insert(city.into());
        self
    }

    pub fn property_type(mut self, property_type: impl Into<String>) -> Self {
        self.property_types.insert(property_type.into());
        self
    }

    pub fn decade(mut self, decade: i32) -> Self {
        self.decades.insert(decade);
        self
    }

    pub fn units(mut self, min: i64, max: i64) -> Self {
        self.units = UnitRange { min, max };
        self
    }

    pub fn months(mut self, from: YearMonth, to: YearMonth) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Reject criteria that cannot describe a real selection. `facets` is the
    /// option set derived from the records being filtered.
    pub fn validate(&self, facets: &Facets) -> Result<()> {
        let fail = |reason: String| {
            warn!("rejecting filter: {reason}");
            Err(ReportError::Validation(reason))
        };

        if self.units.min > self.units.max {
            return fail(format!(
                "unit range min {} exceeds max {}",
                self.units.min, self.units.max
            ));
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return fail(format!("date range starts {from} after it ends {to}"));
            }
        }
        if !self.cities.is_empty() {
            let mut states = self.states.iter();
            let (Some(state), None) = (states.next(), states.next()) else {
                return fail("city selection requires exactly one selected state".into());
            };
            let known = facets.cities_in(state);
            if let Some(city) = self.cities.iter().find(|c| !known.contains(*c)) {
                return fail(format!("no city '{city}' in state '{state}'"));
            }
        }
        if let Some(state) = self.states.iter().find(|s| !facets.states.contains(*s)) {
            return fail(format!("unknown state '{state}'"));
        }
        Ok(())
    }

    pub fn matches(&self, record: &ExpenseRecord) -> bool {
        let property = &record.property;
        let (city, state) = property.city_state();

        if !self.states.is_empty() && !state.is_some_and(|s| self.states.contains(&s)) {
            return false;
        }
        if !self.cities.is_empty() && !city.is_some_and(|c| self.cities.contains(&c)) {
            return false;
        }
        if !self.property_types.is_empty()
            && !property
                .property_type
                .as_ref()
                .is_some_and(|t| self.property_types.contains(t))
        {
            return false;
        }
        if !self.decades.is_empty() && !property.decade().is_some_and(|d| self.decades.contains(&d)) {
            return false;
        }
        if !self.units.contains(property.unit_count.unwrap_or(0)) {
            return false;
        }
        if self.from.is_some_and(|from| record.period < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.period > to) {
            return false;
        }
        true
    }
}

/// Keep the records matching `criteria`. Pure and idempotent.
pub fn filter(records: &[ExpenseRecord], criteria: &FilterCriteria) -> Vec<ExpenseRecord> {
    let kept: Vec<ExpenseRecord> = records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect();
    debug!("filter kept {} of {} records", kept.len(), records.len());
    kept
}

/// The distinct values each facet can take across a record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    pub states: BTreeSet<String>,
    pub cities_by_state: BTreeMap<String, BTreeSet<String>>,
    pub property_types: BTreeSet<String>,
    pub decades: BTreeSet<i32>,
    pub months: BTreeSet<YearMonth>,
}

impl Facets {
    pub fn from_records(records: &[ExpenseRecord]) -> Self {
        let mut facets = Self::default();
        for record in records {
            let property = &record.property;
            if let (city, Some(state)) = property.city_state() {
                let cities = facets.cities_by_state.entry(state.clone()).or_default();
                if let Some(city) = city {
                    cities.insert(city);
                }
                facets.states.insert(state);
            }
            if let Some(t) = &property.property_type {
                facets.property_types.insert(t.clone());
            }
            if let Some(decade) = property.decade() {
                facets.decades.insert(decade);
            }
            facets.months.insert(record.period);
        }
        facets
    }

    pub fn cities_in(&self, state: &str) -> BTreeSet<String> {
        self.cities_by_state.get(state).cloned().unwrap_or_default()
    }

    /// First and last month present, the natural default date range.
    pub fn month_span(&self) -> Option<(YearMonth, YearMonth)> {
        Some((*self.months.first()?, *self.months.last()?))
    }
}
