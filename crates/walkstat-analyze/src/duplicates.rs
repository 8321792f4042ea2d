//! Duplicate detection from inventory metadata.
//!
//! No file content is read. Two files are considered copies of each other
//! when they share the same stem (leaf name without its last extension),
//! the same modification time and the same size, in different paths.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use derive_builder::Builder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use walkstat_core::units::MIB;
use walkstat_core::{Inventory, InventoryRecord};

/// Configuration for duplicate detection.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct DuplicateConfig {
    /// Files must be strictly larger than this to be considered.
    #[builder(default = "MIB")]
    pub min_size: u64,

    /// Paths containing any of these substrings are skipped.
    #[builder(default = "default_excludes()")]
    pub exclude_patterns: Vec<String>,

    /// Maximum number of clusters to return (0 = unlimited).
    #[builder(default = "0")]
    pub max_groups: usize,
}

fn default_excludes() -> Vec<String> {
    vec!["/miniconda3/".to_string(), "/miniconda2/".to_string()]
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_size: MIB,
            exclude_patterns: default_excludes(),
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }

    fn accepts(&self, record: &InventoryRecord) -> bool {
        if !record.is_file() || record.size_bytes <= self.min_size {
            return false;
        }
        let path = record.path.to_string_lossy();
        !self
            .exclude_patterns
            .iter()
            .any(|pattern| path.contains(pattern.as_str()))
    }
}

/// Files sharing stem, modification time and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    /// Shared file stem.
    pub stem: String,
    /// Shared modification time (seconds since the epoch).
    pub modified: i64,
    /// Size of each file in bytes.
    pub size: u64,
    /// Distinct paths of every copy, sorted.
    pub paths: Vec<PathBuf>,
}

impl DuplicateCluster {
    /// Number of copies.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Bytes held beyond the first copy.
    pub fn extra_bytes(&self) -> u64 {
        self.size * self.paths.len().saturating_sub(1) as u64
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Clusters, most copies first.
    pub clusters: Vec<DuplicateCluster>,

    /// Bytes that could be reclaimed by keeping one copy of each cluster.
    pub extra_bytes: u64,

    /// Files that passed the size and path filters.
    pub files_analyzed: u64,

    /// Files that belong to a cluster.
    pub files_with_duplicates: u64,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.clusters.is_empty()
    }
}

type Key = (String, i64, u64);
type Groups = HashMap<Key, BTreeSet<PathBuf>>;

/// Duplicate finder.
pub struct DuplicateFinder {
    config: DuplicateConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with default config.
    pub fn new() -> Self {
        Self {
            config: DuplicateConfig::default(),
        }
    }

    /// Create a new duplicate finder with custom config.
    pub fn with_config(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// Find duplicate clusters among the file rows of `inventory`.
    pub fn find_duplicates(&self, inventory: &Inventory) -> DuplicateReport {
        let (groups, files_analyzed) = inventory
            .records
            .par_iter()
            .filter(|record| self.config.accepts(record))
            .fold(
                || (Groups::new(), 0u64),
                |(mut groups, count), record| {
                    let key = (record.file_stem(), record.timestamps.modified, record.size_bytes);
                    groups.entry(key).or_default().insert(record.path.clone());
                    (groups, count + 1)
                },
            )
            .reduce(|| (Groups::new(), 0), |(left, a), (right, b)| (merge_groups(left, right), a + b));

        let mut clusters: Vec<DuplicateCluster> = groups
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|((stem, modified, size), paths)| DuplicateCluster {
                stem,
                modified,
                size,
                paths: paths.into_iter().collect(),
            })
            .collect();

        clusters.sort_by(|a, b| {
            b.count()
                .cmp(&a.count())
                .then_with(|| a.stem.cmp(&b.stem))
                .then_with(|| a.modified.cmp(&b.modified))
                .then_with(|| a.size.cmp(&b.size))
        });

        if self.config.max_groups > 0 {
            clusters.truncate(self.config.max_groups);
        }

        let extra_bytes = clusters.iter().map(DuplicateCluster::extra_bytes).sum();
        let files_with_duplicates = clusters.iter().map(|c| c.count() as u64).sum();

        debug!(
            files_analyzed,
            clusters = clusters.len(),
            extra_bytes,
            "Duplicate analysis finished"
        );

        DuplicateReport {
            clusters,
            extra_bytes,
            files_analyzed,
            files_with_duplicates,
        }
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_groups(mut left: Groups, right: Groups) -> Groups {
    for (key, paths) in right {
        left.entry(key).or_default().extend(paths);
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkstat_core::Timestamps;

    fn file(path: &str, size: u64, mtime: i64) -> InventoryRecord {
        InventoryRecord::file(path, size, Timestamps::new(0, mtime))
    }

    #[test]
    fn test_find_duplicates() {
        let size = 5 * MIB;
        let inventory = Inventory::new(vec![
            file("/b/data.tar", size, 100),
            file("/a/data.tar", size, 100),
            file("/c/data.tar", size, 101),
            file("/d/other.tar", size, 100),
        ]);

        let report = DuplicateFinder::new().find_duplicates(&inventory);
        assert_eq!(report.clusters.len(), 1);

        let cluster = &report.clusters[0];
        assert_eq!(cluster.stem, "data");
        assert_eq!(cluster.count(), 2);
        assert_eq!(cluster.paths, vec![PathBuf::from("/a/data.tar"), PathBuf::from("/b/data.tar")]);
        assert_eq!(report.extra_bytes, size);
        assert_eq!(report.files_analyzed, 4);
    }

    #[test]
    fn test_stem_ignores_extension() {
        let size = 2 * MIB;
        let inventory = Inventory::new(vec![file("/a/run.log", size, 7), file("/b/run.txt", size, 7)]);
        let report = DuplicateFinder::new().find_duplicates(&inventory);
        assert_eq!(report.clusters.len(), 1);
        assert_eq!(report.clusters[0].stem, "run");
    }

    #[test]
    fn test_size_floor_is_exclusive() {
        let inventory = Inventory::new(vec![file("/a/x.bin", MIB, 1), file("/b/x.bin", MIB, 1)]);
        let report = DuplicateFinder::new().find_duplicates(&inventory);
        assert!(!report.has_duplicates());
        assert_eq!(report.files_analyzed, 0);
    }

    #[test]
    fn test_excluded_paths() {
        let size = 3 * MIB;
        let inventory = Inventory::new(vec![
            file("/home/u/miniconda3/pkgs/lib.so", size, 1),
            file("/home/v/miniconda3/pkgs/lib.so", size, 1),
            file("/home/w/miniconda2/pkgs/lib.so", size, 1),
        ]);
        let report = DuplicateFinder::new().find_duplicates(&inventory);
        assert!(!report.has_duplicates());

        let config = DuplicateConfig::builder()
            .exclude_patterns(Vec::<String>::new())
            .build()
            .unwrap();
        let report = DuplicateFinder::with_config(config).find_duplicates(&inventory);
        assert_eq!(report.clusters[0].count(), 3);
        assert_eq!(report.extra_bytes, 2 * size);
    }

    #[test]
    fn test_order_and_limit() {
        let size = 2 * MIB;
        let inventory = Inventory::new(vec![
            file("/1/b.dat", size, 1),
            file("/2/b.dat", size, 1),
            file("/1/a.dat", size, 1),
            file("/2/a.dat", size, 1),
            file("/1/c.dat", size, 1),
            file("/2/c.dat", size, 1),
            file("/3/c.dat", size, 1),
        ]);
        let report = DuplicateFinder::new().find_duplicates(&inventory);
        let stems: Vec<&str> = report.clusters.iter().map(|c| c.stem.as_str()).collect();
        assert_eq!(stems, vec!["c", "a", "b"]);

        let config = DuplicateConfig::builder().max_groups(1usize).build().unwrap();
        let report = DuplicateFinder::with_config(config).find_duplicates(&inventory);
        assert_eq!(report.clusters.len(), 1);
        assert_eq!(report.extra_bytes, 2 * size);
    }
}
