//! Error and warning types for ingestion and configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while ingesting walker output.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input path does not exist.
    #[error("Path {path} does not exist")]
    InputNotFound { path: PathBuf },

    /// A CSV file lacks required columns.
    #[error("{path} is missing required columns: {}", missing.join(", "))]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed in a way that cannot be skipped per row.
    #[error("CSV error in {path}: {message}")]
    Csv { path: PathBuf, message: String },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IngestError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::InputNotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Invalid configuration, raised when a config value is constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Age boundary list is empty.
    #[error("Age boundaries must not be empty")]
    EmptyAgeBoundaries,

    /// Age boundary list is not strictly ascending.
    #[error("Age boundaries must be strictly ascending, got {boundaries:?}")]
    UnsortedAgeBoundaries { boundaries: Vec<u64> },

    /// Threshold is negative or not a number.
    #[error("Threshold must be a non-negative number, got {value}")]
    InvalidThreshold { value: f64 },

    /// Other invalid setting.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    /// Create a generic configuration error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Kind of ingest warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Text field contained bytes that are not valid UTF-8; they were replaced.
    Decode,
    /// A required field could not be parsed; the row was skipped.
    InvalidField,
    /// A file lacked required columns and was skipped.
    SchemaMismatch,
    /// An input directory contained no matching files.
    NoInputFiles,
}

/// Non-fatal warning encountered during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestWarning {
    /// File the warning refers to.
    pub path: PathBuf,
    /// 1-based line in the file, when known.
    pub line: Option<u64>,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl IngestWarning {
    /// Create a new ingest warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            line: None,
            message: message.into(),
            kind,
        }
    }

    /// Attach a line number.
    pub fn at_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    /// Create a decode warning for a row whose text was repaired.
    pub fn decode(path: impl Into<PathBuf>, line: u64) -> Self {
        Self::new(path, "Replaced undecodable bytes", WarningKind::Decode).at_line(line)
    }

    /// Create a warning for a row skipped because of a bad field.
    pub fn invalid_field(path: impl Into<PathBuf>, line: u64, field: &str, value: &str) -> Self {
        Self::new(
            path,
            format!("Invalid value {value:?} for {field}"),
            WarningKind::InvalidField,
        )
        .at_line(line)
    }
}

impl std::fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.path.display(), line, self.message),
            None => write!(f, "{}: {}", self.path.display(), self.message),
        }
    }
}
