//! Report derivations for walkstat.
//!
//! Every analyzer reads a shared, read-only [`Inventory`] and is
//! independent of the others:
//!
//! - **Hotspots** - directory rollups above a size threshold, with owner
//!   names, ages in days, and summary totals
//! - **Age histogram** - cumulative "not accessed for more than N days"
//!   byte totals
//! - **File types** - bytes per extension and share of the total
//! - **Duplicates** - files sharing stem, modification time and size in
//!   different paths
//!
//! # Hotspots
//!
//! ```rust,ignore
//! use walkstat_analyze::{HotspotConfig, HotspotExtractor, SystemOwnerResolver};
//!
//! let extractor = HotspotExtractor::with_config(HotspotConfig::default());
//! let resolver = SystemOwnerResolver::new();
//! let report = extractor.extract(&inventory, &resolver);
//!
//! println!("{} hotspots, {} bytes", report.summary.hotspot_count, report.summary.total_bytes);
//! for (days, bytes) in report.summary.aged.iter() {
//!     println!("{bytes} bytes not accessed for {days} days");
//! }
//! ```
//!
//! # Duplicates
//!
//! ```rust,ignore
//! use walkstat_analyze::DuplicateFinder;
//!
//! let report = DuplicateFinder::new().find_duplicates(&inventory);
//! println!("Extra/duplicate data: {} bytes", report.extra_bytes);
//! ```

pub mod age;
mod duplicates;
mod filetypes;
mod hotspots;
mod owner;

pub use age::{AgeBoundaries, AgeHistogram, days_between, format_age};
pub use duplicates::{DuplicateCluster, DuplicateConfig, DuplicateConfigBuilder, DuplicateFinder, DuplicateReport};
pub use filetypes::{FileTypeAggregator, FileTypeReport, FileTypeRow};
pub use hotspots::{
    HotspotConfig, HotspotConfigBuilder, HotspotExtractor, HotspotReport, HotspotRow, HotspotSummary,
};
pub use owner::{CachingOwnerResolver, OwnerResolver, StaticOwnerResolver, SystemOwnerResolver};

// Re-export core types
pub use walkstat_core::{ConfigError, Inventory, InventoryRecord, RowKind, Timestamps};
