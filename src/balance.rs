use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::{Result, SpendError};
use crate::models::Transaction;

/// A day whose closing balance is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub date: NaiveDate,
    pub balance: f64,
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Net amount per day, oldest first.
pub fn daily_net(rows: &[Transaction]) -> Vec<(NaiveDate, f64)> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows {
        *days.entry(row.date).or_default() += row.amount;
    }
    days.into_iter().collect()
}

/// Rebuild the closing balance of every day from one anchor.
///
/// `daily` must be sorted by date and contain the anchor's day. Walking
/// backward, each earlier day is the anchor minus the net flow of the days
/// between it and the anchor; later days add their flows instead.
pub fn reconstruct(daily: &[(NaiveDate, f64)], anchor: Anchor) -> Result<Vec<(NaiveDate, f64)>> {
    let k = daily
        .iter()
        .position(|(date, _)| *date == anchor.date)
        .ok_or_else(|| SpendError::Other(format!("Anchor date {} is not in the series", anchor.date)))?;

    // suffix[i] = sum of daily[i..]
    let mut suffix = vec![0.0; daily.len() + 1];
    for i in (0..daily.len()).rev() {
        suffix[i] = suffix[i + 1] + daily[i].1;
    }

    let series = daily
        .iter()
        .enumerate()
        .map(|(i, (date, _))| {
            let balance = if i < k {
                anchor.balance - (suffix[i + 1] - suffix[k + 1])
            } else if i > k {
                anchor.balance + (suffix[k + 1] - suffix[i + 1])
            } else {
                anchor.balance
            };
            (*date, cents(balance))
        })
        .collect();
    Ok(series)
}

/// Closing balance per day for the imported rows.
///
/// When every row carries a balance the recorded values are used (the last
/// row of a day wins). Otherwise the most recent row with a balance anchors a
/// reconstruction. Without any recorded balance the series is empty.
pub fn daily_balances(rows: &[Transaction]) -> Result<Vec<(NaiveDate, f64)>> {
    if rows.iter().all(|r| r.balance.is_some()) {
        let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for row in rows {
            if let Some(balance) = row.balance {
                days.insert(row.date, balance);
            }
        }
        return Ok(days.into_iter().collect());
    }

    let mut sorted: Vec<&Transaction> = rows.iter().collect();
    sorted.sort_by_key(|r| r.date);
    let anchor = sorted.iter().rev().find_map(|r| {
        r.balance.map(|balance| Anchor {
            date: r.date,
            balance,
        })
    });
    let Some(anchor) = anchor else {
        warn!("No row carries a balance; cannot reconstruct daily balances");
        return Ok(Vec::new());
    };

    debug!(date = %anchor.date, balance = anchor.balance, "Reconstructing balances from anchor");
    reconstruct(&daily_net(rows), anchor)
}
