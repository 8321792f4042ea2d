//! Core types for walkstat.
//!
//! This crate provides the data structures shared by ingestion and the
//! analyzers: inventory records with an explicit row kind, the ingested
//! inventory container, ingestion configuration, and error types.

mod config;
mod error;
mod inventory;
mod record;
pub mod units;

pub use config::{IngestConfig, IngestConfigBuilder};
pub use error::{ConfigError, IngestError, IngestWarning, WarningKind};
pub use inventory::{IngestStats, Inventory};
pub use record::{InventoryRecord, RowKind, Timestamps, WalkerMeta, extension_of};
