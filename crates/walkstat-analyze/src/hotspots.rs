//! Storage hotspot extraction.
//!
//! A hotspot is a directory whose subtree rollup meets a size threshold.
//! Rows are produced lazily in inventory order, so a caller can stream
//! them to a writer while accumulating the summary.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use walkstat_core::units::{GIB, MIB, TIB};
use walkstat_core::{Inventory, InventoryRecord};

use crate::age::{AgeBoundaries, AgeHistogram, days_between};
use crate::owner::OwnerResolver;

/// Configuration for hotspot extraction.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct HotspotConfig {
    /// Minimum subtree size in GiB for a directory to be a hotspot.
    #[builder(default = "10.0")]
    pub threshold_gib: f64,

    /// Cohort boundaries for the "not accessed for N days" totals.
    #[builder(default)]
    pub age_boundaries: AgeBoundaries,

    /// Reference time for age calculations (default: now).
    #[builder(default = "Utc::now()")]
    pub reference_time: DateTime<Utc>,
}

impl HotspotConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(threshold) = self.threshold_gib {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(format!(
                    "Threshold must be a non-negative number, got {threshold}"
                ));
            }
        }
        Ok(())
    }
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            threshold_gib: 10.0,
            age_boundaries: AgeBoundaries::default(),
            reference_time: Utc::now(),
        }
    }
}

impl HotspotConfig {
    /// Create a new config builder.
    pub fn builder() -> HotspotConfigBuilder {
        HotspotConfigBuilder::default()
    }
}

/// One hotspot directory, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotRow {
    /// Directory path.
    pub folder: PathBuf,
    /// Owner name, or numeric id when unknown.
    pub user: String,
    /// Group name, or numeric id when unknown.
    pub group: String,
    /// Whole days since last access.
    #[serde(rename = "days_acc")]
    pub days_accessed: u64,
    /// Whole days since last modification.
    #[serde(rename = "days_mod")]
    pub days_modified: u64,
    #[serde(rename = "fileCount")]
    pub file_count: u64,
    #[serde(rename = "dirSizeSum")]
    pub dir_size_sum: u64,
    #[serde(rename = "TiB")]
    pub tib: u64,
    #[serde(rename = "GiB")]
    pub gib: u64,
    /// Average file size in MiB.
    #[serde(rename = "MiBAvg")]
    pub mib_avg: u64,
}

impl HotspotRow {
    fn from_record<R: OwnerResolver + ?Sized>(
        record: &InventoryRecord,
        resolver: &R,
        reference: DateTime<Utc>,
    ) -> Self {
        let dir_size_sum = record.dir_size_sum();
        let file_count = record.file_count();
        Self {
            folder: record.path.clone(),
            user: resolver.user(record.owner_id),
            group: resolver.group(record.group_id),
            days_accessed: days_between(reference, record.timestamps.accessed),
            days_modified: days_between(reference, record.timestamps.modified),
            file_count,
            dir_size_sum,
            tib: dir_size_sum / TIB,
            gib: dir_size_sum / GIB,
            mib_avg: if file_count > 0 {
                dir_size_sum / MIB / file_count
            } else {
                0
            },
        }
    }
}

/// Totals accumulated over a hotspot run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotSummary {
    /// Bytes over every rollup in the corpus, hotspot or not.
    pub corpus_bytes: u64,
    /// Number of hotspot directories.
    pub hotspot_count: u64,
    /// Bytes over hotspot directories.
    pub total_bytes: u64,
    /// Hotspot bytes not accessed for more than each boundary.
    pub aged: AgeHistogram,
}

impl HotspotSummary {
    /// Create an empty summary.
    pub fn new(boundaries: AgeBoundaries, corpus_bytes: u64) -> Self {
        Self {
            corpus_bytes,
            hotspot_count: 0,
            total_bytes: 0,
            aged: AgeHistogram::new(boundaries),
        }
    }

    /// Account for one hotspot row.
    pub fn record(&mut self, row: &HotspotRow) {
        self.hotspot_count += 1;
        self.total_bytes += row.dir_size_sum;
        self.aged.record(row.days_accessed, row.dir_size_sum);
    }

    /// Share of the corpus held by hotspots.
    pub fn hotspot_share(&self) -> f64 {
        if self.corpus_bytes > 0 {
            self.total_bytes as f64 / self.corpus_bytes as f64
        } else {
            0.0
        }
    }
}

/// Materialized hotspot rows plus their summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotReport {
    /// Hotspot rows in inventory order.
    pub rows: Vec<HotspotRow>,
    /// Run totals.
    pub summary: HotspotSummary,
}

/// Hotspot extractor.
pub struct HotspotExtractor {
    config: HotspotConfig,
}

impl HotspotExtractor {
    /// Create a new extractor with default config.
    pub fn new() -> Self {
        Self {
            config: HotspotConfig::default(),
        }
    }

    /// Create a new extractor with custom config.
    pub fn with_config(config: HotspotConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &HotspotConfig {
        &self.config
    }

    /// Check if a row qualifies as a hotspot.
    pub fn is_hotspot(&self, record: &InventoryRecord) -> bool {
        record.is_dir() && record.dir_size_sum() as f64 >= self.config.threshold_gib * GIB as f64
    }

    /// Lazily yield hotspot rows in inventory order.
    pub fn hotspots<'a, R: OwnerResolver + ?Sized>(
        &'a self,
        inventory: &'a Inventory,
        resolver: &'a R,
    ) -> impl Iterator<Item = HotspotRow> + 'a {
        let reference = self.config.reference_time;
        inventory
            .directories()
            .filter(move |record| self.is_hotspot(record))
            .map(move |record| HotspotRow::from_record(record, resolver, reference))
    }

    /// Empty summary seeded with the corpus total of `inventory`.
    pub fn summary(&self, inventory: &Inventory) -> HotspotSummary {
        HotspotSummary::new(self.config.age_boundaries.clone(), inventory.corpus_bytes())
    }

    /// Collect every hotspot row and the summary.
    pub fn extract<R: OwnerResolver + ?Sized>(&self, inventory: &Inventory, resolver: &R) -> HotspotReport {
        let mut summary = self.summary(inventory);
        let rows: Vec<HotspotRow> = self
            .hotspots(inventory, resolver)
            .inspect(|row| summary.record(row))
            .collect();

        debug!(
            threshold_gib = self.config.threshold_gib,
            hotspots = summary.hotspot_count,
            bytes = summary.total_bytes,
            "Extracted hotspots"
        );

        HotspotReport { rows, summary }
    }
}

impl Default for HotspotExtractor {
    fn default() -> Self {
        Self::new()
    }
}
