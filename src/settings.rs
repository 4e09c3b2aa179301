use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpendError};

/// Name of the category definitions file kept inside each import directory.
pub const DEFINITIONS_FILE: &str = "category_definitions.json";

/// Date formats offered for import files, tried in order when sniffing.
pub const AVAILABLE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%m-%d-%Y", "%Y-%d-%m"];

// ---------------------------------------------------------------------------
// Import settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Csv,
    Xls,
}

impl FileType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xls => "xls",
        }
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::Csv => &["csv"],
            Self::Xls => &["xls", "xlsx", "xlsm", "ods"],
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions().iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FileType {
    type Err = SpendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xls" | "xlsx" => Ok(Self::Xls),
            other => Err(SpendError::Settings(format!("Unknown file type: {other}"))),
        }
    }
}

/// Zero-based column positions of the four logical columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub date: usize,
    pub description: usize,
    pub amount: usize,
    pub balance: usize,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: 0,
            description: 1,
            amount: 2,
            balance: 3,
        }
    }
}

/// The part of the import settings remembered in the definitions file, so
/// reopening the same directory does not require choosing them again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProfile {
    #[serde(default)]
    pub file_type: FileType,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub columns: ColumnMapping,
    /// Field delimiter; detected from the files when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    /// Whether the files start with a header row; detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_header: Option<bool>,
}

fn default_date_format() -> String {
    AVAILABLE_DATE_FORMATS[0].to_string()
}

impl Default for ImportProfile {
    fn default() -> Self {
        Self {
            file_type: FileType::default(),
            date_format: default_date_format(),
            columns: ColumnMapping::default(),
            delimiter: None,
            has_header: None,
        }
    }
}

pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| SpendError::Settings(format!("Delimiter must be a single ASCII character: {delimiter:?}")))
}

/// Everything the importer needs to read one directory of exports.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    pub import_dir: PathBuf,
    pub file_type: FileType,
    pub date_format: String,
    pub columns: ColumnMapping,
    pub delimiter: u8,
    pub has_header: bool,
    /// Delimiter and header flag as stored in the profile; `None` when detected.
    pub pinned_delimiter: Option<char>,
    pub pinned_header: Option<bool>,
    /// Files to read; filled by sniffing the import directory.
    pub import_files: Vec<PathBuf>,
}

impl ImportSettings {
    pub fn new(import_dir: impl Into<PathBuf>) -> Self {
        Self {
            import_dir: import_dir.into(),
            file_type: FileType::Csv,
            date_format: default_date_format(),
            columns: ColumnMapping::default(),
            delimiter: b',',
            has_header: true,
            pinned_delimiter: None,
            pinned_header: None,
            import_files: Vec::new(),
        }
    }

    /// Take over the profile. Pinned delimiter and header flag are applied
    /// directly; the rest of the resolution happens in the importer.
    pub fn with_profile(mut self, profile: &ImportProfile) -> Result<Self> {
        self.file_type = profile.file_type;
        self.date_format = profile.date_format.clone();
        self.columns = profile.columns;
        self.pinned_delimiter = profile.delimiter;
        self.pinned_header = profile.has_header;
        if let Some(delimiter) = profile.delimiter {
            self.delimiter = delimiter_byte(delimiter)?;
        }
        if let Some(has_header) = profile.has_header {
            self.has_header = has_header;
        }
        Ok(self)
    }

    pub fn profile(&self) -> ImportProfile {
        ImportProfile {
            file_type: self.file_type,
            date_format: self.date_format.clone(),
            columns: self.columns,
            delimiter: self.pinned_delimiter,
            has_header: self.pinned_header,
        }
    }

    pub fn definitions_path(&self) -> PathBuf {
        self.import_dir.join(DEFINITIONS_FILE)
    }
}

// ---------------------------------------------------------------------------
// App settings (~/.config/spendlens/settings.json)
// ---------------------------------------------------------------------------

/// App-wide state. Per-directory import choices live in the definitions
/// file of that directory instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub last_import_dir: Option<String>,
}

pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("SPENDLENS_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("spendlens")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "Ignoring unreadable settings: {e}");
            Settings::default()
        })
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(config_dir())?;
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| SpendError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> PathBuf {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1));
        }
    }
    std::fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path))
}
