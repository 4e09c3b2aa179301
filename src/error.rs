use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpendError {
    #[error("Import error occurred with file {}: {cause}", path.display())]
    ImportFailed {
        path: PathBuf,
        #[source]
        cause: Box<SpendError>,
    },

    #[error("Could not convert value to a number: {value:?}")]
    ConversionFailed { value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Unknown category alias: {0}")]
    UnknownAlias(String),

    #[error("Unknown month: {0} (expected e.g. 2017:March)")]
    UnknownMonth(String),

    #[error("No import directory given; pass --dir or run `spendlens import <dir>` first")]
    NoImportDir,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl SpendError {
    /// Wrap an error raised while reading `path` into an import failure.
    /// Errors that already name a file are passed through unchanged.
    pub fn import(path: impl Into<PathBuf>, cause: SpendError) -> Self {
        match cause {
            Self::ImportFailed { .. } => cause,
            cause => Self::ImportFailed {
                path: path.into(),
                cause: Box::new(cause),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SpendError>;
