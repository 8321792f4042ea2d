//! Snapshot store: the directory rollups of one ingest, persisted as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use walkstat_core::{IngestStats, Inventory, InventoryRecord};

/// Default store file name.
pub const DEFAULT_STORE: &str = "hotspots.json";

/// Default hotspot report name when the store name cannot be reused.
const DEFAULT_REPORT: &str = "hotspots.csv";

/// Errors reading or writing a snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store file does not exist.
    #[error("Path {path} does not exist")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store content is not a valid snapshot.
    #[error("Invalid snapshot {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_path_buf(),
            },
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Directory rollups of one corpus, ordered by subtree size descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was written.
    pub created_at: DateTime<Utc>,
    /// CSV files the snapshot was built from.
    pub sources: Vec<PathBuf>,
    /// Statistics of the ingest that produced it.
    pub stats: IngestStats,
    /// Directory rollup rows.
    pub rollups: Vec<InventoryRecord>,
}

impl Snapshot {
    /// Build a snapshot from the rollup rows of an inventory.
    pub fn from_inventory(inventory: &Inventory) -> Self {
        let mut rollups: Vec<InventoryRecord> = inventory.directories().cloned().collect();
        rollups.sort_by(|a, b| b.dir_size_sum().cmp(&a.dir_size_sum()));
        Self {
            created_at: Utc::now(),
            sources: inventory.sources.clone(),
            stats: inventory.stats.clone(),
            rollups,
        }
    }

    /// Whole-corpus bytes over all stored rollups.
    pub fn corpus_bytes(&self) -> u64 {
        self.rollups.iter().map(|r| r.dir_size_sum()).sum()
    }

    /// Turn the snapshot back into an inventory of rollup rows.
    pub fn into_inventory(self) -> Inventory {
        let mut inventory = Inventory::new(self.rollups);
        inventory.sources = self.sources;
        inventory.ingested_at = self.created_at;
        inventory
    }

    /// Write the snapshot to `path`, replacing any previous store.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|source| StoreError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(|e| StoreError::io(path, e))?;
        info!(path = %path.display(), rollups = self.rollups.len(), "Wrote snapshot");
        Ok(())
    }

    /// Load a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Hotspot report path next to a store: `x.json` becomes `x.csv`,
    /// anything else falls back to `hotspots.csv`.
    pub fn report_path_for(store: &Path) -> PathBuf {
        match store.extension() {
            Some(ext) if ext == "json" => store.with_extension("csv"),
            _ => PathBuf::from(DEFAULT_REPORT),
        }
    }
}
