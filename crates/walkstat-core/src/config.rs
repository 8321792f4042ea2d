//! Ingestion configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for reading walker output.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct IngestConfig {
    /// CSV file, or directory of CSV files, to read.
    pub input: PathBuf,

    /// File name pattern selecting inputs inside a directory.
    #[builder(default = "default_file_pattern()")]
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Number of threads for parsing (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Abort the whole ingest when one file lacks required columns.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub strict_schema: bool,

    /// Maximum number of warnings kept per ingest; the rest are counted only.
    #[builder(default = "1000")]
    #[serde(default = "default_max_warnings")]
    pub max_warnings: usize,
}

fn default_file_pattern() -> String {
    "*.csv".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_warnings() -> usize {
    1000
}

impl IngestConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.input {
            Some(ref input) if input.as_os_str().is_empty() => {
                return Err("Input path cannot be empty".to_string());
            }
            None => return Err("Input path is required".to_string()),
            _ => {}
        }
        if let Some(ref pattern) = self.file_pattern {
            if pattern.trim().is_empty() {
                return Err("File pattern cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl IngestConfig {
    /// Create a new ingest config builder.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Create a config reading `input` with defaults.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            file_pattern: default_file_pattern(),
            threads: 0,
            strict_schema: true,
            max_warnings: default_max_warnings(),
        }
    }
}
