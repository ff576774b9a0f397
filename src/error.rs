use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A required header is missing from a Source; the Source is skipped as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("source '{source_name}': required column '{column}' not found in header")]
pub struct ColumnResolutionError {
    pub source_name: String,
    pub column: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error(transparent)]
    Columns(#[from] ColumnResolutionError),
    #[error("sheet could not be read: {0}")]
    Unreadable(String),
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("registry query failed: {0}")]
    Transport(#[from] sqlx::Error),
    #[error("registry lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("registry lookup failed: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("not a valid file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open spreadsheet {}: {source}", path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("failed to serialise spreadsheet row: {0}")]
    Row(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse YAML config {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}
