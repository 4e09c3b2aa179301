use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::ImportOptions;
use crate::error::Result;
use crate::fmt::amount;
use crate::importer::resolve_settings;
use crate::models::UNKNOWN_ALIAS;
use crate::session::Session;
use crate::settings::{load_settings, save_settings, shellexpand_path, ImportProfile};

/// The stored profile with any command line overrides applied.
fn apply_options(mut profile: ImportProfile, options: &ImportOptions) -> ImportProfile {
    if let Some(file_type) = options.file_type {
        profile.file_type = file_type;
    }
    if let Some(format) = &options.date_format {
        profile.date_format = format.clone();
    }
    let columns = &mut profile.columns;
    columns.date = options.date_col.unwrap_or(columns.date);
    columns.description = options.description_col.unwrap_or(columns.description);
    columns.amount = options.amount_col.unwrap_or(columns.amount);
    columns.balance = options.balance_col.unwrap_or(columns.balance);
    if options.delimiter.is_some() {
        profile.delimiter = options.delimiter;
    }
    if options.no_header {
        profile.has_header = Some(false);
    }
    profile
}

pub fn run(directory: &str, options: &ImportOptions) -> Result<()> {
    let dir = shellexpand_path(directory);
    let mut session = Session::open(&dir)?;
    let profile = apply_options(session.store().profile().cloned().unwrap_or_default(), options);
    session.import(resolve_settings(&dir, &profile)?)?;

    let mut settings = load_settings();
    settings.last_import_dir = Some(dir.to_string_lossy().into_owned());
    save_settings(&settings)?;

    print_summary(&session);
    Ok(())
}

fn print_summary(session: &Session) {
    let files = session.settings().map(|s| s.import_files.len()).unwrap_or(0);
    let months = session.category_report().months.len();
    println!(
        "{} rows imported from {files} file(s) covering {months} month(s)",
        session.rows().len()
    );

    let totals = session.total_in_out();
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Income".green()), Cell::new(amount(totals.income))]);
    table.add_row(vec![Cell::new("Expenses".red()), Cell::new(amount(totals.expense))]);
    table.add_row(vec![Cell::new("Difference".bold()), Cell::new(amount(totals.difference()))]);
    println!("{table}");

    let unknown = session.store().unknown_entries().len();
    if unknown > 0 {
        println!(
            "{}",
            format!("{unknown} description(s) matched no category; see `spendlens categories unknown`")
                .yellow()
        );
    } else {
        println!("Every expense matched a category other than {UNKNOWN_ALIAS}.");
    }
}
