pub mod categories;
pub mod import;
pub mod report;
pub mod search;
pub mod sniff;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::error::{Result, SpendError};
use crate::importer::resolve_settings;
use crate::session::Session;
use crate::settings::{load_settings, shellexpand_path, FileType, Settings};

#[derive(Parser)]
#[command(
    name = "spendlens",
    version,
    about = "Categorize and summarize bank account exports."
)]
pub struct Cli {
    /// Import directory (default: the last one imported)
    #[arg(long, global = true)]
    pub dir: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect an import directory: files, delimiter, header and a preview.
    Sniff {
        /// Directory holding the bank exports
        #[arg(value_name = "DIR")]
        directory: String,
        /// csv or xls
        #[arg(long = "file-type")]
        file_type: Option<FileType>,
    },
    /// Import a directory of exports and classify the expenses.
    Import {
        /// Directory holding the bank exports
        #[arg(value_name = "DIR")]
        directory: String,
        #[command(flatten)]
        options: ImportOptions,
    },
    /// Print aggregated reports for the imported rows.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Manage category aliases and keywords.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Search transactions by description, date or amount.
    Search {
        /// Text to look for; lists every row when omitted
        query: Option<String>,
    },
}

/// Overrides for the import profile stored with the definitions.
#[derive(clap::Args, Debug, Default)]
pub struct ImportOptions {
    /// csv or xls
    #[arg(long = "file-type")]
    pub file_type: Option<FileType>,
    /// chrono format of the date column, e.g. %d-%m-%Y
    #[arg(long = "date-format")]
    pub date_format: Option<String>,
    /// Zero-based index of the date column
    #[arg(long = "date-col")]
    pub date_col: Option<usize>,
    /// Zero-based index of the description column
    #[arg(long = "description-col")]
    pub description_col: Option<usize>,
    /// Zero-based index of the amount column
    #[arg(long = "amount-col")]
    pub amount_col: Option<usize>,
    /// Zero-based index of the balance column
    #[arg(long = "balance-col")]
    pub balance_col: Option<usize>,
    /// Field delimiter, kept for this directory (detected when never given)
    #[arg(long)]
    pub delimiter: Option<char>,
    /// The files have no header row; kept for this directory
    #[arg(long = "no-header")]
    pub no_header: bool,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Total income, expenses and their difference.
    Overview,
    /// Income and expenses per month.
    Monthly,
    /// Expense totals per category and month.
    Categories,
    /// Expenses per day.
    Daily {
        /// Signed sums instead of magnitudes
        #[arg(long)]
        overall: bool,
        /// Newest day first
        #[arg(long)]
        desc: bool,
    },
    /// Closing balance per day.
    Balance,
    /// Rows behind one category total.
    Detail {
        /// Month, e.g. 2017:March or 2017-03
        month: String,
        /// Category alias (Unknown for unmatched rows)
        alias: String,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List aliases and their keywords.
    List,
    /// List descriptions no alias matches.
    Unknown,
    /// Add an alias with no keywords.
    Add { alias: String },
    /// Rename an alias.
    Rename { alias: String, new_name: String },
    /// Delete an alias and its keywords.
    Delete { alias: String },
    /// Add a keyword to an alias.
    AddKeyword { alias: String, keyword: String },
    /// Replace a keyword of an alias.
    RenameKeyword {
        alias: String,
        keyword: String,
        new_keyword: String,
    },
    /// Remove a keyword from an alias.
    DeleteKeyword { alias: String, keyword: String },
}

/// The import directory to work on: `--dir`, else the remembered one.
pub(crate) fn resolve_dir(dir: Option<&str>, settings: &Settings) -> Result<PathBuf> {
    dir.or(settings.last_import_dir.as_deref())
        .map(shellexpand_path)
        .ok_or(SpendError::NoImportDir)
}

/// Open the remembered (or given) import directory and run the pipeline
/// with the profile stored there.
pub(crate) fn load_session(dir: Option<&str>) -> Result<Session> {
    let settings = load_settings();
    let dir = resolve_dir(dir, &settings)?;
    debug!(dir = %dir.display(), "Loading session");
    let mut session = Session::open(&dir)?;
    let profile = session.store().profile().cloned().unwrap_or_default();
    session.import(resolve_settings(&dir, &profile)?)?;
    Ok(session)
}
