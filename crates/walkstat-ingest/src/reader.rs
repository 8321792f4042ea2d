//! Parallel CSV reader producing one unified inventory.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use globset::{Glob, GlobMatcher};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use walkstat_core::{
    ConfigError, IngestConfig, IngestError, IngestStats, IngestWarning, Inventory, WarningKind,
};

use crate::schema::{ColumnMap, Row};

/// Reads walker CSV output into an [`Inventory`].
#[derive(Debug, Default)]
pub struct CsvIngestor;

impl CsvIngestor {
    /// Create a new ingestor.
    pub fn new() -> Self {
        Self
    }

    /// Ingest the file or directory named by `config.input`.
    pub fn ingest(&self, config: &IngestConfig) -> Result<Inventory, IngestError> {
        let start = Instant::now();

        if !config.input.exists() {
            return Err(IngestError::InputNotFound {
                path: config.input.clone(),
            });
        }

        let files = self.discover_inputs(config)?;
        info!(input = %config.input.display(), files = files.len(), "Discovered CSV input");

        let mut inventory = if files.is_empty() {
            let mut inventory = Inventory::default();
            inventory.warnings.push(IngestWarning::new(
                &config.input,
                format!("No files matching {} found", config.file_pattern),
                WarningKind::NoInputFiles,
            ));
            inventory
        } else if config.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build()
                .map_err(|e| ConfigError::invalid(format!("Cannot build thread pool: {e}")))?;
            pool.install(|| self.read_all(&files, config))?
        } else {
            self.read_all(&files, config)?
        };

        if inventory.warnings.len() > config.max_warnings {
            let suppressed = inventory.warnings.len() - config.max_warnings;
            inventory.warnings.truncate(config.max_warnings);
            inventory.stats.warnings_suppressed += suppressed as u64;
        }
        inventory.stats.duration = start.elapsed();

        info!(
            rows = inventory.stats.rows_kept,
            dropped_empty = inventory.stats.empty_rollups_dropped,
            malformed = inventory.stats.malformed_rows,
            elapsed_ms = inventory.stats.duration.as_millis() as u64,
            "Ingest complete"
        );

        Ok(inventory)
    }

    /// Resolve the input path to the list of CSV files to read.
    fn discover_inputs(&self, config: &IngestConfig) -> Result<Vec<PathBuf>, IngestError> {
        if config.input.is_file() {
            return Ok(vec![config.input.clone()]);
        }

        let matcher = compile_pattern(&config.file_pattern)?;
        let entries =
            std::fs::read_dir(&config.input).map_err(|e| IngestError::io(&config.input, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| IngestError::io(&config.input, e))?;
            let path = entry.path();
            if path.is_file() && matcher.is_match(entry.file_name()) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read every file in parallel and concatenate in file order.
    fn read_all(&self, files: &[PathBuf], config: &IngestConfig) -> Result<Inventory, IngestError> {
        let results: Vec<Result<Inventory, IngestError>> = files
            .par_iter()
            .map(|path| read_file(path, config.max_warnings))
            .collect();

        let mut inventory = Inventory::default();
        for (path, result) in files.iter().zip(results) {
            match result {
                Ok(part) => inventory.merge(part),
                Err(err @ IngestError::SchemaMismatch { .. }) if !config.strict_schema => {
                    warn!(path = %path.display(), error = %err, "Skipping file");
                    inventory.warnings.push(IngestWarning::new(
                        path,
                        err.to_string(),
                        WarningKind::SchemaMismatch,
                    ));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(inventory)
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher, IngestError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| ConfigError::invalid(format!("Invalid file pattern {pattern:?}: {e}")).into())
}

/// Read one CSV file into an inventory of its own.
fn read_file(path: &Path, max_warnings: usize) -> Result<Inventory, IngestError> {
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    let bytes_read = file.metadata().map(|m| m.len()).unwrap_or(0);
    info!(path = %path.display(), bytes = bytes_read, "Reading");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .byte_headers()
        .map_err(|e| csv_error(path, e))?
        .clone();
    let columns = ColumnMap::from_headers(path, &headers)?;

    let mut stats = IngestStats {
        files_read: 1,
        bytes_read,
        ..IngestStats::default()
    };
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for result in reader.byte_records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    return Err(csv_error(path, e));
                }
                stats.rows_read += 1;
                stats.malformed_rows += 1;
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                debug!(path = %path.display(), line, error = %e, "Skipping unreadable record");
                let warning =
                    IngestWarning::new(path, e.to_string(), WarningKind::InvalidField).at_line(line);
                push_capped(&mut warnings, &mut stats, max_warnings, warning);
                continue;
            }
        };
        stats.rows_read += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        match columns.parse(&record) {
            Ok(Row::Kept { record, repaired }) => {
                if repaired {
                    let warning = IngestWarning::decode(path, line);
                    push_capped(&mut warnings, &mut stats, max_warnings, warning);
                }
                stats.rows_kept += 1;
                records.push(record);
            }
            Ok(Row::EmptyRollup) => stats.empty_rollups_dropped += 1,
            Err(field_error) => {
                stats.malformed_rows += 1;
                debug!(
                    path = %path.display(),
                    line,
                    field = field_error.field,
                    value = %field_error.value,
                    "Skipping malformed row"
                );
                let warning =
                    IngestWarning::invalid_field(path, line, field_error.field, &field_error.value);
                push_capped(&mut warnings, &mut stats, max_warnings, warning);
            }
        }
    }

    let mut inventory = Inventory::new(records);
    inventory.sources.push(path.to_path_buf());
    inventory.stats = stats;
    inventory.warnings = warnings;
    Ok(inventory)
}

fn push_capped(
    warnings: &mut Vec<IngestWarning>,
    stats: &mut IngestStats,
    max_warnings: usize,
    warning: IngestWarning,
) {
    if warnings.len() < max_warnings {
        warnings.push(warning);
    } else {
        stats.warnings_suppressed += 1;
    }
}

fn csv_error(path: &Path, err: csv::Error) -> IngestError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => IngestError::io(path, source),
        _ => IngestError::Csv {
            path: path.to_path_buf(),
            message,
        },
    }
}
