use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// A calendar month. Ordering is chronological: year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Returns `None` unless `month` is 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Pivot column label: `"<month>/<year>"`, month not zero-padded.
    pub fn label(&self) -> String {
        format!("{}/{}", self.month, self.year)
    }

    /// Parse a `"<month>/<year>"` label back into a month.
    pub fn from_label(label: &str) -> Option<Self> {
        static LABEL: OnceLock<Regex> = OnceLock::new();
        let re = LABEL.get_or_init(|| {
            Regex::new(r"^\s*(\d{1,2})\s*/\s*(-?\d{1,4})\s*$").expect("static label pattern")
        });
        let caps = re.captures(label)?;
        let month: u32 = caps[1].parse().ok()?;
        let year: i32 = caps[2].parse().ok()?;
        Self::new(year, month)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Short display form used in previews, e.g. `Jan 2024`.
    pub fn short_name(&self) -> String {
        self.first_day()
            .map(|d| d.format("%b %Y").to_string())
            .unwrap_or_else(|| self.label())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Sort labels chronologically. Labels that do not parse keep their relative
/// order after every parsed label.
pub fn sort_labels(labels: &mut [String]) {
    labels.sort_by_key(|l| match YearMonth::from_label(l) {
        Some(ym) => (0, ym),
        None => (1, YearMonth { year: i32::MAX, month: 12 }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_months() {
        assert!(YearMonth::new(2024, 0).is_none());
        assert!(YearMonth::new(2024, 13).is_none());
        assert!(YearMonth::new(2024, 12).is_some());
    }

    #[test]
    fn test_label_round_trip() {
        let ym = YearMonth::new(2023, 9).unwrap();
        assert_eq!(ym.label(), "9/2023");
        assert_eq!(YearMonth::from_label("9/2023"), Some(ym));
        assert_eq!(YearMonth::from_label("13/2023"), None);
        assert_eq!(YearMonth::from_label("2023-09"), None);
    }

    #[test]
    fn test_sort_labels_is_chronological_not_lexicographic() {
        let mut labels = vec![
            "12/2023".to_string(),
            "9/2023".to_string(),
            "1/2024".to_string(),
            "10/2022".to_string(),
        ];
        sort_labels(&mut labels);
        assert_eq!(labels, vec!["10/2022", "9/2023", "12/2023", "1/2024"]);
    }

    #[test]
    fn test_short_name() {
        assert_eq!(YearMonth::new(2024, 1).unwrap().short_name(), "Jan 2024");
    }

    #[test]
    fn test_ordering_is_year_then_month() {
        let a = YearMonth::new(2023, 12).unwrap();
        let b = YearMonth::new(2024, 1).unwrap();
        assert!(a < b);
        assert_eq!(b.to_string(), "2024-01");
    }
}
