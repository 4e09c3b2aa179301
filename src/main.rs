mod balance;
mod classifier;
mod cli;
mod definitions;
mod error;
mod fmt;
mod importer;
mod models;
mod reports;
mod session;
mod settings;

use clap::Parser;
use tracing_subscriber::{fmt as log_fmt, prelude::*, EnvFilter};

use cli::{CategoriesCommands, Cli, Commands, ReportCommands};

fn main() {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(log_fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .init();

    let dir = cli.dir.as_deref();
    let result = match cli.command {
        Commands::Sniff {
            directory,
            file_type,
        } => cli::sniff::run(&directory, file_type),
        Commands::Import { directory, options } => cli::import::run(&directory, &options),
        Commands::Report { command } => match command {
            ReportCommands::Overview => cli::report::overview(dir),
            ReportCommands::Monthly => cli::report::monthly(dir),
            ReportCommands::Categories => cli::report::categories(dir),
            ReportCommands::Daily { overall, desc } => cli::report::daily(dir, overall, desc),
            ReportCommands::Balance => cli::report::balance(dir),
            ReportCommands::Detail { month, alias } => cli::report::detail(dir, &month, &alias),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::List => cli::categories::list(dir),
            CategoriesCommands::Unknown => cli::categories::unknown(dir),
            command => match cli::categories::to_edit(command) {
                Some(edit) => cli::categories::edit(dir, edit),
                None => Ok(()),
            },
        },
        Commands::Search { query } => cli::search::run(dir, query.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
