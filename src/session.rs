use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::balance;
use crate::classifier::{self, classify};
use crate::definitions::{CategoryEdit, DefinitionsStore};
use crate::error::Result;
use crate::importer::{collect_import_files, import_files};
use crate::models::{CategoryReport, MonthKey, Transaction};
use crate::reports::{self, Totals};
use crate::settings::{ImportSettings, DEFINITIONS_FILE};

/// Import -> classify -> aggregate for one directory of exports.
///
/// Transactions live only in memory; every import rebuilds them and the
/// category report from scratch. The definitions store is the only state
/// written to disk.
pub struct Session {
    store: DefinitionsStore,
    settings: Option<ImportSettings>,
    rows: Vec<Transaction>,
    report: CategoryReport,
}

impl Session {
    /// Load the category definitions kept in `import_dir`.
    pub fn open(import_dir: &Path) -> Result<Self> {
        Ok(Self::with_store(DefinitionsStore::load(
            import_dir.join(DEFINITIONS_FILE),
        )?))
    }

    pub fn with_store(store: DefinitionsStore) -> Self {
        Self {
            store,
            settings: None,
            rows: Vec::new(),
            report: CategoryReport::default(),
        }
    }

    /// Read the exports, then classify them. On failure the previous rows,
    /// report and definitions are left as they were.
    pub fn import(&mut self, mut settings: ImportSettings) -> Result<()> {
        if settings.import_files.is_empty() {
            settings.import_files = collect_import_files(&settings.import_dir, settings.file_type)?;
        }
        let rows = import_files(&settings)?;

        if settings.definitions_path() != self.store.path() {
            self.store = DefinitionsStore::load(settings.definitions_path())?;
        }
        self.rows = rows;
        self.recalculate()?;
        self.store.save_profile(settings.profile())?;
        self.settings = Some(settings);
        Ok(())
    }

    /// Re-run classification and persist any newly unmatched descriptions.
    fn recalculate(&mut self) -> Result<()> {
        let result = classify(&self.rows, self.store.categories())?;
        let added = self
            .store
            .merge_unknown(result.uncategorized.iter().map(String::as_str));
        self.store.save()?;
        info!(
            categories = self.store.categories().len(),
            months = result.report.months.len(),
            new_unknown = added,
            "Categories calculated"
        );
        self.report = result.report;
        Ok(())
    }

    /// Change the definitions, save them and rebuild the Unknown list from
    /// the current rows.
    pub fn edit(&mut self, edit: CategoryEdit) -> Result<()> {
        self.store.apply(edit)?;
        self.store.save()?;
        self.store.clear_unknown();
        self.recalculate()
    }

    pub fn store(&self) -> &DefinitionsStore {
        &self.store
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn settings(&self) -> Option<&ImportSettings> {
        self.settings.as_ref()
    }

    pub fn date_format(&self) -> &str {
        self.settings
            .as_ref()
            .map(|s| s.date_format.as_str())
            .unwrap_or("%Y-%m-%d")
    }

    pub fn category_report(&self) -> &CategoryReport {
        &self.report
    }

    pub fn total_in_out(&self) -> Totals {
        reports::total_in_out(&self.rows)
    }

    pub fn totals_by_month(&self) -> Vec<(MonthKey, Totals)> {
        reports::totals_by_month(&self.rows)
    }

    pub fn totals_by_day(&self, overall: bool, descending: bool) -> Vec<(NaiveDate, f64)> {
        reports::totals_by_day(&self.rows, overall, descending)
    }

    pub fn daily_balances(&self) -> Result<Vec<(NaiveDate, f64)>> {
        balance::daily_balances(&self.rows)
    }

    pub fn categorized_rows(&self, month: MonthKey, alias: &str) -> Result<Vec<&Transaction>> {
        classifier::categorized_rows(&self.rows, self.store.categories(), month, alias)
    }

    pub fn search(&self, query: &str) -> Vec<&Transaction> {
        reports::search(&self.rows, query, self.date_format())
    }

    pub fn day_interval(&self) -> i64 {
        reports::day_interval(&self.rows)
    }
}
