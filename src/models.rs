use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Month, NaiveDate};

use crate::error::SpendError;

/// Alias that collects expense rows no other alias matches.
pub const UNKNOWN_ALIAS: &str = "Unknown";

/// One row of an imported bank export.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub balance: Option<f64>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }

    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(self.date)
    }
}

/// Calendar month used to group rows. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("?")
    }
}

/// Renders as `2017:March`, the legend label used for month groups.
impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.year, self.month_name())
    }
}

impl FromStr for MonthKey {
    type Err = SpendError;

    /// Accepts `2017:March`, `2017:mar` or `2017-03`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SpendError::UnknownMonth(s.to_string());
        let (year, month) = s.trim().split_once([':', '-']).ok_or_else(bad)?;
        let year: i32 = year.trim().parse().map_err(|_| bad())?;
        let month = month.trim();
        let month = match month.parse::<u32>() {
            Ok(m) if (1..=12).contains(&m) => m,
            Ok(_) => return Err(bad()),
            Err(_) => month.parse::<Month>().map_err(|_| bad())?.number_from_month(),
        };
        Ok(Self::new(year, month))
    }
}

/// Summed expense magnitude for one alias in one month.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTotal {
    pub alias: String,
    pub total: f64,
}

/// Per-month category breakdown, months in chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryReport {
    pub months: Vec<MonthCategories>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthCategories {
    pub month: MonthKey,
    pub totals: Vec<AliasTotal>,
}

impl MonthCategories {
    pub fn total_for(&self, alias: &str) -> Option<f64> {
        self.totals
            .iter()
            .find(|t| t.alias == alias)
            .map(|t| t.total)
    }
}

impl CategoryReport {
    pub fn month(&self, key: MonthKey) -> Option<&MonthCategories> {
        self.months.iter().find(|m| m.month == key)
    }
}
