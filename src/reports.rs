use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{MonthKey, Transaction};

// ---------------------------------------------------------------------------
// Income / expense totals
// ---------------------------------------------------------------------------

/// Absolute sums of the income and expense partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub income: f64,
    pub expense: f64,
}

impl Totals {
    /// Income minus expense; negative when more went out than came in.
    pub fn difference(&self) -> f64 {
        self.income - self.expense
    }
}

pub fn total_in_out<'a>(rows: impl IntoIterator<Item = &'a Transaction>) -> Totals {
    let mut totals = Totals::default();
    for row in rows {
        if row.is_income() {
            totals.income += row.amount;
        } else if row.is_expense() {
            totals.expense += row.amount;
        }
    }
    totals.income = totals.income.abs();
    totals.expense = totals.expense.abs();
    totals
}

// ---------------------------------------------------------------------------
// Per month
// ---------------------------------------------------------------------------

pub fn totals_by_month(rows: &[Transaction]) -> Vec<(MonthKey, Totals)> {
    let mut months: BTreeMap<MonthKey, Vec<&Transaction>> = BTreeMap::new();
    for row in rows {
        months.entry(row.month()).or_default().push(row);
    }
    months
        .into_iter()
        .map(|(month, rows)| (month, total_in_out(rows)))
        .collect()
}

// ---------------------------------------------------------------------------
// Per day
// ---------------------------------------------------------------------------

/// Expenses summed per date. Magnitudes by default; signed sums when
/// `overall` is set.
pub fn totals_by_day(rows: &[Transaction], overall: bool, descending: bool) -> Vec<(NaiveDate, f64)> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.is_expense()) {
        let amount = if overall { row.amount } else { row.amount.abs() };
        *days.entry(row.date).or_default() += amount;
    }
    let mut result: Vec<(NaiveDate, f64)> = days.into_iter().collect();
    if descending {
        result.reverse();
    }
    result
}

/// Spacing in days between x-axis ticks for a chart spanning the rows.
pub fn day_interval(rows: &[Transaction]) -> i64 {
    let (Some(first), Some(last)) = (
        rows.iter().map(|r| r.date).min(),
        rows.iter().map(|r| r.date).max(),
    ) else {
        return 1;
    };
    if rows.len() < 2 {
        return 1;
    }
    let span = (last - first).num_days();
    if span > 20 {
        span / 20
    } else {
        span
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Rows newest first whose description contains `query` (ignoring case), or
/// whose date (rendered with `date_format`) or amount contains it literally.
pub fn search<'a>(rows: &'a [Transaction], query: &str, date_format: &str) -> Vec<&'a Transaction> {
    let query = query.trim();
    let needle = query.to_lowercase();
    let mut hits: Vec<&Transaction> = rows
        .iter()
        .filter(|r| {
            query.is_empty()
                || r.description.to_lowercase().contains(&needle)
                || r.date.format(date_format).to_string().contains(query)
                || format!("{:.2}", r.amount).contains(query)
        })
        .collect();
    hits.sort_by(|a, b| b.date.cmp(&a.date));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(date: &str, description: &str, amount: f64) -> Transaction {
        Transaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            amount,
            balance: None,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            txn("2017-03-05", "Rent", -500.0),
            txn("2017-03-10", "Salary", 3000.0),
            txn("2017-03-10", "Transaction 170310 Cafe", -4.5),
            txn("2017-04-02", "Transaction 170402 SUBWAY", -8.0),
            txn("2017-04-28", "Salary", 3100.0),
            txn("2017-04-29", "Zero fee", 0.0),
        ]
    }

    #[test]
    fn test_total_in_out_scenario() {
        let rows = vec![txn("2017-03-05", "Rent", -500.0), txn("2017-03-10", "Salary", 3000.0)];
        let totals = total_in_out(&rows);
        assert_eq!(totals.income, 3000.0);
        assert_eq!(totals.expense, 500.0);
        assert_eq!(totals.difference(), 2500.0);
    }

    #[test]
    fn test_total_in_out_ignores_zero_rows() {
        let totals = total_in_out(&sample());
        assert_eq!(totals.income, 6100.0);
        assert_eq!(totals.expense, 512.5);
        assert_eq!(total_in_out(&[]), Totals::default());
    }

    #[test]
    fn test_totals_by_month() {
        let months = totals_by_month(&sample());
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].0, MonthKey::new(2017, 3));
        assert_eq!(months[0].1, Totals { income: 3000.0, expense: 504.5 });
        assert_eq!(months[1].1, Totals { income: 3100.0, expense: 8.0 });
    }

    #[test]
    fn test_totals_by_day_magnitudes() {
        let days = totals_by_day(&sample(), false, false);
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert_eq!(
            days,
            vec![(d("2017-03-05"), 500.0), (d("2017-03-10"), 4.5), (d("2017-04-02"), 8.0)]
        );
    }

    #[test]
    fn test_totals_by_day_overall_and_descending() {
        let days = totals_by_day(&sample(), true, true);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].1, -8.0);
        assert_eq!(days[2].1, -500.0);
        assert!(days[0].0 > days[2].0);
    }

    #[test]
    fn test_day_interval() {
        assert_eq!(day_interval(&sample()), 2);
        assert_eq!(day_interval(&sample()[..3]), 5);
        assert_eq!(day_interval(&sample()[..1]), 1);
        assert_eq!(day_interval(&[]), 1);
    }

    #[test]
    fn test_search() {
        let rows = sample();
        let hits = search(&rows, "salary", "%Y-%m-%d");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].amount, 3100.0);

        assert_eq!(search(&rows, "2017-04", "%Y-%m-%d").len(), 3);
        assert_eq!(search(&rows, "-4.50", "%Y-%m-%d").len(), 1);
        assert_eq!(search(&rows, "04/2017", "%d/%m/%Y").len(), 3);
        assert_eq!(search(&rows, "", "%Y-%m-%d").len(), rows.len());
        assert!(search(&rows, "nothing like this", "%Y-%m-%d").is_empty());
    }
}
