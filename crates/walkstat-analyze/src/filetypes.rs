//! Bytes per file extension.

use std::collections::HashMap;

use compact_str::CompactString;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use walkstat_core::Inventory;

/// Bytes and file count for one extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTypeRow {
    /// Extension without the dot; empty for files without one.
    pub extension: CompactString,
    /// Total bytes of files with this extension.
    pub bytes: u64,
    /// Number of files with this extension.
    pub files: u64,
    /// Fraction of the reported total.
    pub share: f64,
}

/// Per-extension totals, largest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileTypeReport {
    pub rows: Vec<FileTypeRow>,
    /// Sum of bytes over every row.
    pub total_bytes: u64,
    /// Sum of files over every row.
    pub total_files: u64,
}

impl FileTypeReport {
    /// Find the row for an extension.
    pub fn get(&self, extension: &str) -> Option<&FileTypeRow> {
        self.rows.iter().find(|row| row.extension == extension)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

type Totals = HashMap<CompactString, (u64, u64)>;

/// Groups non-empty files by extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTypeAggregator;

impl FileTypeAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate the file rows of `inventory`.
    pub fn aggregate(&self, inventory: &Inventory) -> FileTypeReport {
        let totals = inventory
            .records
            .par_iter()
            .filter(|record| record.is_file() && record.size_bytes > 0)
            .fold(Totals::new, |mut acc, record| {
                let entry = acc.entry(record.extension.clone()).or_default();
                entry.0 += record.size_bytes;
                entry.1 += 1;
                acc
            })
            .reduce(Totals::new, merge_totals);

        let total_bytes: u64 = totals.values().map(|(bytes, _)| bytes).sum();
        let total_files: u64 = totals.values().map(|(_, files)| files).sum();

        let rows = totals
            .into_iter()
            .map(|(extension, (bytes, files))| FileTypeRow {
                extension,
                bytes,
                files,
                share: if total_bytes > 0 {
                    bytes as f64 / total_bytes as f64
                } else {
                    0.0
                },
            })
            .sorted_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.extension.cmp(&b.extension)))
            .collect();

        FileTypeReport {
            rows,
            total_bytes,
            total_files,
        }
    }
}

fn merge_totals(mut left: Totals, right: Totals) -> Totals {
    for (extension, (bytes, files)) in right {
        let entry = left.entry(extension).or_default();
        entry.0 += bytes;
        entry.1 += files;
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkstat_core::{InventoryRecord, Timestamps};

    fn inventory() -> Inventory {
        let ts = Timestamps::uniform(0);
        Inventory::new(vec![
            InventoryRecord::file("/a/x.bam", 600, ts),
            InventoryRecord::file("/a/y.bam", 200, ts),
            InventoryRecord::file("/a/z.txt", 200, ts),
            InventoryRecord::file("/a/empty.txt", 0, ts),
            InventoryRecord::file("/a/README", 100, ts),
            InventoryRecord::directory("/a", 5, 1100, ts),
        ])
    }

    #[test]
    fn test_aggregate_groups_and_orders() {
        let report = FileTypeAggregator::new().aggregate(&inventory());

        let order: Vec<&str> = report.rows.iter().map(|r| r.extension.as_str()).collect();
        assert_eq!(order, vec!["bam", "txt", ""]);
        assert_eq!(report.total_bytes, 1100);

        let bam = report.get("bam").unwrap();
        assert_eq!(bam.bytes, 800);
        assert_eq!(bam.files, 2);

        // Zero-byte files are not counted.
        assert_eq!(report.get("txt").unwrap().files, 1);
    }

    #[test]
    fn test_shares_sum_to_one() {
        let report = FileTypeAggregator::new().aggregate(&inventory());
        let sum: f64 = report.rows.iter().map(|r| r.share).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ties_break_on_extension() {
        let ts = Timestamps::uniform(0);
        let inventory = Inventory::new(vec![
            InventoryRecord::file("/b.zip", 10, ts),
            InventoryRecord::file("/a.gz", 10, ts),
        ]);
        let report = FileTypeAggregator::new().aggregate(&inventory);
        assert_eq!(report.rows[0].extension, "gz");
        assert_eq!(report.rows[1].extension, "zip");
    }

    #[test]
    fn test_empty_inventory() {
        let report = FileTypeAggregator::new().aggregate(&Inventory::default());
        assert!(report.is_empty());
        assert_eq!(report.total_bytes, 0);
    }
}
