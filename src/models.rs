use std::ops::{Add, AddAssign};
use std::sync::Arc;

use crate::period::YearMonth;

/// The nine expense categories, in the order every table, pivot and export
/// presents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Payroll,
    Admin,
    Marketing,
    RepairsMaintenance,
    Turnover,
    Utilities,
    Taxes,
    Insurance,
    ManagementFees,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Payroll,
        Category::Admin,
        Category::Marketing,
        Category::RepairsMaintenance,
        Category::Turnover,
        Category::Utilities,
        Category::Taxes,
        Category::Insurance,
        Category::ManagementFees,
    ];

    /// Column name in the record store.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Payroll => "payroll",
            Self::Admin => "admin",
            Self::Marketing => "marketing",
            Self::RepairsMaintenance => "repairs_maintenance",
            Self::Turnover => "turnover",
            Self::Utilities => "utilities",
            Self::Taxes => "taxes",
            Self::Insurance => "insurance",
            Self::ManagementFees => "management_fees",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Payroll => "Payroll",
            Self::Admin => "Admin",
            Self::Marketing => "Marketing",
            Self::RepairsMaintenance => "Repairs & Maint.",
            Self::Turnover => "Turnover",
            Self::Utilities => "Utilities",
            Self::Taxes => "Taxes",
            Self::Insurance => "Insurance",
            Self::ManagementFees => "Mgmt Fees",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One amount per category, indexed by [`Category`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryAmounts([f64; 9]);

impl CategoryAmounts {
    pub fn get(&self, category: Category) -> f64 {
        self.0[category.index()]
    }

    pub fn set(&mut self, category: Category, value: f64) {
        self.0[category.index()] = value;
    }

    pub fn with(mut self, category: Category, value: f64) -> Self {
        self.set(category, value);
        self
    }

    /// Build from nullable store values; a missing amount counts as zero.
    pub fn from_nullable(values: [Option<f64>; 9]) -> Self {
        Self(values.map(|v| v.unwrap_or(0.0)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self(self.0.map(f))
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl Add for CategoryAmounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for CategoryAmounts {
    fn add_assign(&mut self, rhs: Self) {
        for (lhs, r) in self.0.iter_mut().zip(rhs.0) {
            *lhs += r;
        }
    }
}

/// Static attributes of a property. Owned by the record store; shared by
/// every record of the property for the whole reporting session.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: i64,
    pub name: String,
    pub property_type: Option<String>,
    /// Free text, `"City, State"`.
    pub location: Option<String>,
    pub unit_count: Option<i64>,
    pub vintage_year: Option<i32>,
    pub avg_sqft_per_unit: Option<f64>,
}

impl Property {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            property_type: None,
            location: None,
            unit_count: None,
            vintage_year: None,
            avg_sqft_per_unit: None,
        }
    }

    /// Split `location` on the first comma into `(city, state)`, both trimmed.
    /// Either side is `None` when blank.
    pub fn city_state(&self) -> (Option<String>, Option<String>) {
        let Some(loc) = self.location.as_deref() else {
            return (None, None);
        };
        let (city, state) = match loc.split_once(',') {
            Some((c, s)) => (c, s),
            None => (loc, ""),
        };
        let non_blank = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        (non_blank(city), non_blank(state))
    }

    pub fn city(&self) -> Option<String> {
        self.city_state().0
    }

    pub fn state(&self) -> Option<String> {
        self.city_state().1
    }

    /// Vintage decade bucket, e.g. 1987 -> 1980.
    pub fn decade(&self) -> Option<i32> {
        self.vintage_year.map(|y| y.div_euclid(10) * 10)
    }
}

/// One property-month of expenses joined with its property.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRecord {
    pub property: Arc<Property>,
    pub period: YearMonth,
    pub expenses: CategoryAmounts,
}

impl ExpenseRecord {
    pub fn new(property: Arc<Property>, period: YearMonth, expenses: CategoryAmounts) -> Self {
        Self {
            property,
            period,
            expenses,
        }
    }

    pub fn property_id(&self) -> i64 {
        self.property.id
    }

    pub fn year(&self) -> i32 {
        self.period.year
    }

    pub fn month(&self) -> u32 {
        self.period.month
    }

    pub fn amount(&self, category: Category) -> f64 {
        self.expenses.get(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_is_fixed() {
        let keys: Vec<&str> = Category::ALL.iter().map(|c| c.key()).collect();
        assert_eq!(
            keys,
            vec![
                "payroll",
                "admin",
                "marketing",
                "repairs_maintenance",
                "turnover",
                "utilities",
                "taxes",
                "insurance",
                "management_fees"
            ]
        );
        assert_eq!(Category::from_key("turnover"), Some(Category::Turnover));
        assert_eq!(Category::from_key("rent"), None);
    }

    #[test]
    fn test_amounts_from_nullable_treats_null_as_zero() {
        let mut raw = [Some(1.0); 9];
        raw[2] = None;
        let amounts = CategoryAmounts::from_nullable(raw);
        assert_eq!(amounts.get(Category::Marketing), 0.0);
        assert_eq!(amounts.total(), 8.0);
    }

    #[test]
    fn test_amounts_add() {
        let a = CategoryAmounts::default().with(Category::Payroll, 1000.0);
        let b = CategoryAmounts::default()
            .with(Category::Payroll, 1100.0)
            .with(Category::Taxes, 5.0);
        let sum = a + b;
        assert_eq!(sum.get(Category::Payroll), 2100.0);
        assert_eq!(sum.get(Category::Taxes), 5.0);
    }

    #[test]
    fn test_city_state_splits_on_first_comma() {
        let mut p = Property::new(1, "Oak Ridge");
        p.location = Some(" Austin ,  TX ".into());
        assert_eq!(p.city_state(), (Some("Austin".into()), Some("TX".into())));

        p.location = Some("Kansas City, MO, USA".into());
        assert_eq!(p.state().as_deref(), Some("MO, USA"));

        p.location = Some("Nowhere".into());
        assert_eq!(p.city_state(), (Some("Nowhere".into()), None));

        p.location = None;
        assert_eq!(p.city_state(), (None, None));
    }

    #[test]
    fn test_decade_bucket() {
        let mut p = Property::new(1, "Elm");
        p.vintage_year = Some(1987);
        assert_eq!(p.decade(), Some(1980));
        p.vintage_year = Some(2000);
        assert_eq!(p.decade(), Some(2000));
        p.vintage_year = None;
        assert_eq!(p.decade(), None);
    }
}
