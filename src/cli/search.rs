use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::load_session;
use crate::error::Result;
use crate::fmt::amount;

pub fn run(dir: Option<&str>, query: Option<&str>) -> Result<()> {
    let session = load_session(dir)?;
    let hits = session.search(query.unwrap_or_default());
    if hits.is_empty() {
        println!("No matching transactions.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Balance"]);
    for row in &hits {
        let value = amount(row.amount);
        let value = if row.is_expense() { value.red() } else { value.green() };
        table.add_row(vec![
            Cell::new(row.date.format(session.date_format())),
            Cell::new(&row.description),
            Cell::new(value).set_alignment(CellAlignment::Right),
            Cell::new(row.balance.map(amount).unwrap_or_default()).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{} transaction(s)\n{table}", hits.len());
    Ok(())
}
