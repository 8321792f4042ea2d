//! The ingested relation and its statistics.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestWarning;
use crate::record::InventoryRecord;

/// Summary statistics for one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of CSV files read.
    pub files_read: u64,
    /// Total bytes of CSV input.
    pub bytes_read: u64,
    /// Data rows seen, including dropped ones.
    pub rows_read: u64,
    /// Rows kept in the inventory.
    pub rows_kept: u64,
    /// Directory rows dropped because their file count was not positive.
    pub empty_rollups_dropped: u64,
    /// Rows skipped because a required field could not be parsed.
    pub malformed_rows: u64,
    /// Warnings beyond the configured cap that were only counted.
    pub warnings_suppressed: u64,
    /// Wall time spent reading.
    pub duration: Duration,
}

impl IngestStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another file's stats into these.
    pub fn merge(&mut self, other: &IngestStats) {
        self.files_read += other.files_read;
        self.bytes_read += other.bytes_read;
        self.rows_read += other.rows_read;
        self.rows_kept += other.rows_kept;
        self.empty_rollups_dropped += other.empty_rollups_dropped;
        self.malformed_rows += other.malformed_rows;
        self.warnings_suppressed += other.warnings_suppressed;
    }
}

/// All rows of one corpus snapshot, read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// File and directory rows, in input order.
    pub records: Vec<InventoryRecord>,

    /// CSV files the rows came from.
    pub sources: Vec<PathBuf>,

    /// When this inventory was built.
    pub ingested_at: DateTime<Utc>,

    /// Ingest statistics.
    pub stats: IngestStats,

    /// Warnings encountered during ingest.
    pub warnings: Vec<IngestWarning>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Inventory {
    /// Create an inventory from already-normalized records.
    pub fn new(records: Vec<InventoryRecord>) -> Self {
        let stats = IngestStats {
            rows_read: records.len() as u64,
            rows_kept: records.len() as u64,
            ..IngestStats::default()
        };
        Self {
            records,
            sources: Vec::new(),
            ingested_at: Utc::now(),
            stats,
            warnings: Vec::new(),
        }
    }

    /// Append another inventory's rows, sources, stats and warnings.
    pub fn merge(&mut self, other: Inventory) {
        self.records.extend(other.records);
        self.sources.extend(other.sources);
        self.stats.merge(&other.stats);
        self.warnings.extend(other.warnings);
    }

    /// Plain file rows.
    pub fn files(&self) -> impl Iterator<Item = &InventoryRecord> {
        self.records.iter().filter(|r| r.is_file())
    }

    /// Directory rows carrying a usable rollup.
    pub fn directories(&self) -> impl Iterator<Item = &InventoryRecord> {
        self.records.iter().filter(|r| r.is_dir())
    }

    /// Whole-corpus bytes: rollup sums over all directory rows.
    pub fn corpus_bytes(&self) -> u64 {
        self.directories().map(|r| r.dir_size_sum()).sum()
    }

    /// Sum of sizes over plain file rows.
    pub fn file_bytes(&self) -> u64 {
        self.files().map(|r| r.size_bytes).sum()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the inventory holds no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if there were any warnings during ingest.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
