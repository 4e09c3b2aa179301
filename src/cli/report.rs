use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::load_session;
use crate::error::Result;
use crate::fmt::amount;
use crate::models::{MonthKey, UNKNOWN_ALIAS};

fn money_cell(value: f64) -> Cell {
    Cell::new(amount(value)).set_alignment(CellAlignment::Right)
}

fn signed_cell(value: f64) -> Cell {
    let text = amount(value);
    let text = if value < 0.0 { text.red() } else { text.green() };
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn overview(dir: Option<&str>) -> Result<()> {
    let session = load_session(dir)?;
    let totals = session.total_in_out();
    let rows = session.rows();

    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Income".green().bold()), money_cell(totals.income)]);
    table.add_row(vec![Cell::new("Expenses".red().bold()), money_cell(totals.expense)]);
    table.add_row(vec![Cell::new("Difference".bold()), signed_cell(totals.difference())]);

    let first = rows.iter().map(|r| r.date).min();
    let last = rows.iter().map(|r| r.date).max();
    match (first, last) {
        (Some(first), Some(last)) => println!("Overview {first} .. {last} ({} rows)\n{table}", rows.len()),
        _ => println!("Overview (no rows)\n{table}"),
    }
    Ok(())
}

pub fn monthly(dir: Option<&str>) -> Result<()> {
    let session = load_session(dir)?;

    let mut table = Table::new();
    table.set_header(vec!["Month", "Income", "Expenses", "Difference"]);
    for (month, totals) in session.totals_by_month() {
        table.add_row(vec![
            Cell::new(month),
            money_cell(totals.income),
            money_cell(totals.expense),
            signed_cell(totals.difference()),
        ]);
    }
    println!("Monthly totals\n{table}");
    Ok(())
}

/// One row per alias, one column per month.
pub fn categories(dir: Option<&str>) -> Result<()> {
    let session = load_session(dir)?;
    let report = session.category_report();

    let mut header = vec![Cell::new("Category")];
    header.extend(report.months.iter().map(|m| Cell::new(m.month)));
    let mut table = Table::new();
    table.set_header(header);

    let aliases: Vec<&str> = report
        .months
        .first()
        .map(|m| m.totals.iter().map(|t| t.alias.as_str()).collect())
        .unwrap_or_default();
    for alias in aliases {
        let label = if alias == UNKNOWN_ALIAS {
            Cell::new(alias.yellow())
        } else {
            Cell::new(alias)
        };
        let mut row = vec![label];
        row.extend(
            report
                .months
                .iter()
                .map(|m| money_cell(m.total_for(alias).unwrap_or_default())),
        );
        table.add_row(row);
    }
    println!("Expenses by category\n{table}");
    Ok(())
}

pub fn daily(dir: Option<&str>, overall: bool, descending: bool) -> Result<()> {
    let session = load_session(dir)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Expenses"]);
    for (date, total) in session.totals_by_day(overall, descending) {
        table.add_row(vec![Cell::new(date), money_cell(total)]);
    }
    println!(
        "Daily expenses (axis tick every {} day(s))\n{table}",
        session.day_interval()
    );
    Ok(())
}

pub fn balance(dir: Option<&str>) -> Result<()> {
    let session = load_session(dir)?;
    let series = session.daily_balances()?;
    if series.is_empty() {
        println!("No balance column values found; cannot compute daily balances.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Balance"]);
    for (date, balance) in series {
        table.add_row(vec![Cell::new(date), signed_cell(balance)]);
    }
    println!("Daily balance\n{table}");
    Ok(())
}

pub fn detail(dir: Option<&str>, month: &str, alias: &str) -> Result<()> {
    let month: MonthKey = month.parse()?;
    let session = load_session(dir)?;
    let rows = session.categorized_rows(month, alias)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.date.format(session.date_format())),
            Cell::new(&row.description),
            money_cell(row.amount),
        ]);
    }
    let total = session
        .category_report()
        .month(month)
        .and_then(|m| m.total_for(alias))
        .unwrap_or(0.0);
    table.add_row(vec![Cell::new(""), Cell::new("Total".bold()), money_cell(total)]);
    println!("{alias} in {month}\n{table}");
    Ok(())
}
