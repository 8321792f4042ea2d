//! CSV ingestion for walkstat.
//!
//! This crate reads the output of a parallel directory walker (one CSV
//! row per file or directory) into an [`Inventory`].
//!
//! # Overview
//!
//! - **One file or a directory** of CSV files, unioned into one relation
//! - **Parallel parsing** of independent files via rayon
//! - **Permissive decoding**: undecodable bytes are replaced, malformed rows
//!   are skipped with a warning, and the rest of the file is kept
//! - **Explicit row kinds** assigned at ingestion; empty rollups are dropped
//!
//! # Example
//!
//! ```rust,no_run
//! use walkstat_ingest::{CsvIngestor, IngestConfig};
//!
//! let config = IngestConfig::new("/path/to/walk-output");
//! let inventory = CsvIngestor::new().ingest(&config).unwrap();
//!
//! println!("Rows: {}", inventory.len());
//! println!("Corpus bytes: {}", inventory.corpus_bytes());
//! ```
//!
//! # Snapshot store
//!
//! The directory rollups of an inventory can be persisted and reloaded
//! for hotspot reports without re-reading the CSV input:
//!
//! ```rust,no_run
//! use walkstat_ingest::{CsvIngestor, IngestConfig, Snapshot};
//!
//! let inventory = CsvIngestor::new().ingest(&IngestConfig::new("walk.csv")).unwrap();
//! Snapshot::from_inventory(&inventory).save("hotspots.json").unwrap();
//!
//! let snapshot = Snapshot::load("hotspots.json").unwrap();
//! println!("{} rollups", snapshot.rollups.len());
//! ```

mod reader;
mod schema;
mod store;

pub use reader::CsvIngestor;
pub use store::{DEFAULT_STORE, Snapshot, StoreError};

// Re-export core types for convenience
pub use walkstat_core::{
    IngestConfig, IngestError, IngestStats, IngestWarning, Inventory, InventoryRecord, RowKind,
    Timestamps, WarningKind,
};
