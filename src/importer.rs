use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{Result, SpendError};
use crate::models::Transaction;
use crate::settings::{ColumnMapping, FileType, ImportProfile, ImportSettings, AVAILABLE_DATE_FORMATS};

const DELIMITER_CANDIDATES: &[u8] = b",;\t|";
const SNIFF_LINES: usize = 20;
const PREVIEW_ROWS: usize = 10;

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

/// Parse a locale-formatted decimal. Blank input is a missing value.
///
/// When both `,` and `.` appear, whichever comes last is the decimal
/// separator. A single lone `,` is a decimal comma, several are thousands
/// separators. `(12.50)` is negative.
pub fn parse_amount(raw: &str) -> Result<Option<f64>> {
    let fail = || SpendError::ConversionFailed {
        value: raw.to_string(),
    };
    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '"' | '\'' | '$' | '€' | '£'))
        .collect();
    if s.is_empty() {
        return Ok(None);
    }

    let parenthesized = s.len() > 2 && s.starts_with('(') && s.ends_with(')');
    if parenthesized {
        s = s[1..s.len() - 1].to_string();
    }

    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches(',').count() == 1 => s.replace(',', "."),
        (Some(_), None) => s.replace(',', ""),
        _ => s,
    };

    let value: f64 = normalized.parse().map_err(|_| fail())?;
    if !value.is_finite() {
        return Err(fail());
    }
    Ok(Some(if parenthesized { -value } else { value }))
}

pub fn parse_date(raw: &str, format: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), format).map_err(|_| {
        SpendError::Other(format!(
            "Parsing to date format {format} failed for value: {raw:?}"
        ))
    })
}

/// Excel stores dates as days since 1899-12-30 (accounting for the 1900 leap
/// year bug). Serials outside the calendar give `None`.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = chrono::Duration::try_days(serial as i64)?;
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(days)
}

fn looks_like_date(field: &str) -> bool {
    AVAILABLE_DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(field.trim(), fmt).is_ok())
}

fn looks_like_amount(field: &str) -> bool {
    matches!(parse_amount(field), Ok(Some(_)))
}

// ---------------------------------------------------------------------------
// Sniffing
// ---------------------------------------------------------------------------

/// What a look at an import directory revealed.
#[derive(Debug, Clone, PartialEq)]
pub struct SniffResult {
    pub files: Vec<PathBuf>,
    pub delimiter: u8,
    pub has_header: bool,
    pub header: Vec<String>,
    pub preview: Vec<Vec<String>>,
}

/// Files in `dir` with an extension of `file_type`, sorted by name.
pub fn collect_import_files(dir: &Path, file_type: FileType) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && file_type.matches(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Inspect the import directory. Every file is assumed to share the layout
/// of the first one.
pub fn sniff_import_dir(dir: &Path, file_type: FileType) -> Result<SniffResult> {
    let files = collect_import_files(dir, file_type)?;
    let mut result = SniffResult {
        files,
        delimiter: b',',
        has_header: true,
        header: Vec::new(),
        preview: Vec::new(),
    };
    let Some(sample_file) = result.files.first().cloned() else {
        return Ok(result);
    };

    let rows = match file_type {
        FileType::Csv => {
            let content = std::fs::read_to_string(&sample_file)
                .map_err(|e| SpendError::import(&sample_file, e.into()))?;
            result.delimiter = detect_delimiter(&content);
            read_raw_rows(content.as_bytes(), result.delimiter, PREVIEW_ROWS + 1)
                .map_err(|e| SpendError::import(&sample_file, e))?
        }
        FileType::Xls => read_spreadsheet_preview(&sample_file, PREVIEW_ROWS + 1)
            .map_err(|e| SpendError::import(&sample_file, e))?,
    };

    result.has_header = detect_header(&rows);
    let mut rows = rows.into_iter();
    if result.has_header {
        result.header = rows.next().unwrap_or_default();
    }
    result.preview = rows.take(PREVIEW_ROWS).collect();
    debug!(
        file = %sample_file.display(),
        delimiter = %(result.delimiter as char).escape_default(),
        has_header = result.has_header,
        "Sniffed import layout"
    );
    Ok(result)
}

/// Import settings for `dir` under `profile`. A delimiter or header flag
/// the profile leaves open is detected from the first file.
pub fn resolve_settings(dir: &Path, profile: &ImportProfile) -> Result<ImportSettings> {
    let mut settings = ImportSettings::new(dir).with_profile(profile)?;
    let detect_delimiter = settings.file_type == FileType::Csv && profile.delimiter.is_none();
    if detect_delimiter || profile.has_header.is_none() {
        let sniffed = sniff_import_dir(dir, settings.file_type)?;
        if detect_delimiter {
            settings.delimiter = sniffed.delimiter;
        }
        if profile.has_header.is_none() {
            settings.has_header = sniffed.has_header;
        }
        settings.import_files = sniffed.files;
    }
    Ok(settings)
}

fn read_raw_rows(data: &[u8], delimiter: u8, limit: usize) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
        if rows.len() >= limit {
            break;
        }
    }
    Ok(rows)
}

/// Pick the delimiter that splits the opening lines into the same number of
/// fields most consistently. Ties go to the candidate yielding more fields.
pub fn detect_delimiter(sample: &str) -> u8 {
    let sample: String = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let mut best = (b',', 0usize, 0usize);
    for &candidate in DELIMITER_CANDIDATES {
        let Ok(rows) = read_raw_rows(sample.as_bytes(), candidate, SNIFF_LINES) else {
            continue;
        };
        let Some(first) = rows.first() else { continue };
        let width = first.len();
        if width < 2 {
            continue;
        }
        let consistent = rows.iter().filter(|r| r.len() == width).count();
        if (consistent, width) > (best.1, best.2) {
            best = (candidate, consistent, width);
        }
    }
    best.0
}

/// A first row with no date and no number in it, followed by one that has
/// either, is a header.
pub fn detect_header(rows: &[Vec<String>]) -> bool {
    let typed = |row: &Vec<String>| row.iter().any(|f| looks_like_date(f) || looks_like_amount(f));
    match rows {
        [] => false,
        [only] => !typed(only),
        [first, second, ..] => !typed(first) && typed(second),
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Read every configured file and concatenate the rows in file order.
/// The first failing file aborts the import.
pub fn import_files(settings: &ImportSettings) -> Result<Vec<Transaction>> {
    if settings.import_files.is_empty() {
        return Err(SpendError::import(
            &settings.import_dir,
            SpendError::Other(format!("No .{} files found", settings.file_type)),
        ));
    }

    let mut rows = Vec::new();
    for path in &settings.import_files {
        let parsed = match settings.file_type {
            FileType::Csv => read_csv(path, settings),
            FileType::Xls => read_spreadsheet(path, settings),
        }
        .map_err(|e| SpendError::import(path, e))?;
        debug!(file = %path.display(), rows = parsed.len(), "Imported file");
        rows.extend(parsed);
    }
    info!(
        files = settings.import_files.len(),
        rows = rows.len(),
        "Import finished"
    );
    Ok(rows)
}

fn row_to_transaction(
    field: impl Fn(usize) -> String,
    columns: &ColumnMapping,
    date_format: &str,
) -> Result<Transaction> {
    let date = parse_date(&field(columns.date), date_format)?;
    let amount_raw = field(columns.amount);
    let amount = parse_amount(&amount_raw)?.ok_or(SpendError::ConversionFailed { value: amount_raw })?;
    Ok(Transaction {
        date,
        description: field(columns.description).trim().to_string(),
        amount,
        balance: parse_amount(&field(columns.balance))?,
    })
}

fn read_csv(path: &Path, settings: &ImportSettings) -> Result<Vec<Transaction>> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(settings.delimiter)
        .has_headers(settings.has_header)
        .flexible(true)
        .from_reader(BufReader::new(file));

    if settings.has_header && rdr.headers()?.iter().all(|h| h.trim().is_empty()) {
        return Err(SpendError::Other("Header missing".to_string()));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let field = |idx: usize| record.get(idx).unwrap_or("").to_string();
        rows.push(row_to_transaction(field, &settings.columns, &settings.date_format)?);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Spreadsheets (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xls")]
fn first_sheet(path: &Path) -> Result<calamine::Range<calamine::Data>> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| SpendError::Other(format!("Failed to open spreadsheet: {e}")))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SpendError::Other("Spreadsheet has no worksheets".to_string()))?
        .map_err(|e| SpendError::Other(format!("Failed to read worksheet: {e}")))
}

#[cfg(feature = "xls")]
fn cell_text(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(feature = "xls")]
fn cell_date(cell: &calamine::Data, date_format: &str) -> Result<NaiveDate> {
    use calamine::Data;
    let serial = match cell {
        Data::DateTime(dt) => Some(dt.as_f64()),
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        _ => None,
    };
    if let Some(serial) = serial {
        return excel_serial_to_date(serial)
            .ok_or_else(|| SpendError::Other(format!("Invalid spreadsheet date: {serial}")));
    }
    if let Data::DateTimeIso(s) = cell {
        let day = s.split('T').next().unwrap_or(s);
        return parse_date(day, "%Y-%m-%d");
    }
    parse_date(&cell_text(cell), date_format)
}

#[cfg(feature = "xls")]
fn cell_amount(cell: &calamine::Data) -> Result<Option<f64>> {
    use calamine::Data;
    match cell {
        Data::Float(f) => Ok(Some(*f)),
        Data::Int(i) => Ok(Some(*i as f64)),
        Data::Empty => Ok(None),
        other => parse_amount(&cell_text(other)),
    }
}

#[cfg(feature = "xls")]
fn read_spreadsheet(path: &Path, settings: &ImportSettings) -> Result<Vec<Transaction>> {
    let range = first_sheet(path)?;
    let cols = &settings.columns;
    let mut rows_iter = range.rows();
    if settings.has_header && rows_iter.next().is_none() {
        return Err(SpendError::Other("Header missing".to_string()));
    }

    let empty = calamine::Data::Empty;
    let mut rows = Vec::new();
    for row in rows_iter {
        if row.iter().all(|c| cell_text(c).is_empty()) {
            continue;
        }
        let cell = |idx: usize| row.get(idx).unwrap_or(&empty);
        let amount_cell = cell(cols.amount);
        let amount = cell_amount(amount_cell)?.ok_or_else(|| SpendError::ConversionFailed {
            value: cell_text(amount_cell),
        })?;
        rows.push(Transaction {
            date: cell_date(cell(cols.date), &settings.date_format)?,
            description: cell_text(cell(cols.description)),
            amount,
            balance: cell_amount(cell(cols.balance))?,
        });
    }
    Ok(rows)
}

#[cfg(feature = "xls")]
fn read_spreadsheet_preview(path: &Path, limit: usize) -> Result<Vec<Vec<String>>> {
    let range = first_sheet(path)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .take(limit)
        .collect())
}

#[cfg(not(feature = "xls"))]
fn read_spreadsheet(_path: &Path, _settings: &ImportSettings) -> Result<Vec<Transaction>> {
    Err(SpendError::Other(
        "Spreadsheet support was not compiled in (enable the `xls` feature)".to_string(),
    ))
}

#[cfg(not(feature = "xls"))]
fn read_spreadsheet_preview(_path: &Path, _limit: usize) -> Result<Vec<Vec<String>>> {
    Err(SpendError::Other(
        "Spreadsheet support was not compiled in (enable the `xls` feature)".to_string(),
    ))
}
