use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{load_session, CategoriesCommands};
use crate::definitions::CategoryEdit;
use crate::error::Result;

pub fn list(dir: Option<&str>) -> Result<()> {
    let session = load_session(dir)?;
    let store = session.store();
    if store.categories().is_empty() {
        println!("No categories defined. Add one with `spendlens categories add <alias>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Alias", "Keywords"]);
    for alias in store.aliases(false, true) {
        let keywords = store.keywords(alias);
        let keywords = if keywords.is_empty() {
            Cell::new("(none)".dimmed())
        } else {
            Cell::new(keywords.join(", "))
        };
        table.add_row(vec![Cell::new(alias), keywords]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn unknown(dir: Option<&str>) -> Result<()> {
    let session = load_session(dir)?;
    let entries = session.store().unknown_entries();
    if entries.is_empty() {
        println!("Every expense matches a category.");
        return Ok(());
    }
    println!("Unmatched descriptions ({}):", entries.len());
    for entry in entries {
        println!("  {entry}");
    }
    Ok(())
}

/// Map a `categories` subcommand onto a definitions edit. Read-only
/// subcommands have none.
pub(crate) fn to_edit(command: CategoriesCommands) -> Option<CategoryEdit> {
    let edit = match command {
        CategoriesCommands::List | CategoriesCommands::Unknown => return None,
        CategoriesCommands::Add { alias } => CategoryEdit::AddAlias { alias },
        CategoriesCommands::Rename { alias, new_name } => CategoryEdit::RenameAlias { alias, new_name },
        CategoriesCommands::Delete { alias } => CategoryEdit::DeleteAlias { alias },
        CategoriesCommands::AddKeyword { alias, keyword } => CategoryEdit::AddKeyword { alias, keyword },
        CategoriesCommands::RenameKeyword {
            alias,
            keyword,
            new_keyword,
        } => CategoryEdit::RenameKeyword {
            alias,
            keyword,
            new_keyword,
        },
        CategoriesCommands::DeleteKeyword { alias, keyword } => CategoryEdit::DeleteKeyword { alias, keyword },
    };
    Some(edit)
}

fn describe(edit: &CategoryEdit) -> String {
    match edit {
        CategoryEdit::AddAlias { alias } => format!("Added category: {alias}"),
        CategoryEdit::RenameAlias { alias, new_name } => format!("Renamed category {alias} to {new_name}"),
        CategoryEdit::DeleteAlias { alias } => format!("Deleted category: {alias}"),
        CategoryEdit::AddKeyword { alias, keyword } => format!("Added keyword '{keyword}' to {alias}"),
        CategoryEdit::RenameKeyword {
            alias,
            keyword,
            new_keyword,
        } => format!("Renamed keyword '{keyword}' of {alias} to '{new_keyword}'"),
        CategoryEdit::DeleteKeyword { alias, keyword } => format!("Deleted keyword '{keyword}' from {alias}"),
    }
}

pub fn edit(dir: Option<&str>, edit: CategoryEdit) -> Result<()> {
    let mut session = load_session(dir)?;
    let message = describe(&edit);
    session.edit(edit)?;
    println!("{message}");
    println!(
        "{} description(s) still unmatched",
        session.store().unknown_entries().len()
    );
    Ok(())
}
