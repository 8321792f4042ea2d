//! Inventory rows and their explicit row kind.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// File type bits of `st_mode`.
const S_IFMT: u32 = 0o170000;
/// Directory bits of `st_mode`.
const S_IFDIR: u32 = 0o040000;

/// Access, modification and change times in seconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last access time.
    pub accessed: i64,
    /// Last modification time.
    pub modified: i64,
    /// Last status change time (if the walker reported it).
    pub changed: Option<i64>,
}

impl Timestamps {
    /// Create timestamps without a change time.
    pub fn new(accessed: i64, modified: i64) -> Self {
        Self {
            accessed,
            modified,
            changed: None,
        }
    }

    /// Create timestamps where access and modification time are equal.
    pub fn uniform(time: i64) -> Self {
        Self::new(time, time)
    }
}

/// Walker bookkeeping columns that are carried along but not consumed
/// by any report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkerMeta {
    pub inode: Option<u64>,
    pub parent_inode: Option<u64>,
    pub depth: Option<u32>,
    pub device: Option<u64>,
    pub blocks: Option<u64>,
    pub link_count: Option<u64>,
    pub mode: Option<u32>,
}

impl WalkerMeta {
    /// Whether `mode` says this entry is a directory. `None` when the mode
    /// is unknown.
    pub fn is_dir_mode(&self) -> Option<bool> {
        self.mode.map(|mode| mode & S_IFMT == S_IFDIR)
    }
}

/// Kind of inventory row.
///
/// The walker output has no explicit tag, so ingestion assigns one. Only
/// directories with a usable rollup (`file_count > 0`) are ever
/// represented; empty rollups are dropped before they get here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowKind {
    /// Plain leaf entry.
    File,
    /// Directory carrying a subtree rollup.
    Directory {
        /// Number of files in the subtree.
        file_count: u64,
        /// Total bytes of the subtree.
        dir_size_sum: u64,
    },
}

impl RowKind {
    /// Classify a raw walker row.
    ///
    /// `mode` wins when present. Without it, a positive file count or
    /// rollup sum marks a directory. Returns `None` for directories whose
    /// file count is not positive.
    pub fn classify(is_dir_mode: Option<bool>, file_count: i64, dir_size_sum: i64) -> Option<Self> {
        let is_dir = match is_dir_mode {
            Some(is_dir) => is_dir,
            None => file_count > 0 || dir_size_sum > 0,
        };

        if !is_dir {
            return Some(RowKind::File);
        }
        if file_count <= 0 {
            return None;
        }
        Some(RowKind::Directory {
            file_count: file_count as u64,
            dir_size_sum: dir_size_sum.max(0) as u64,
        })
    }

    /// Check if this is a rollup-bearing directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, RowKind::Directory { .. })
    }

    /// Check if this is a plain file.
    pub fn is_file(&self) -> bool {
        matches!(self, RowKind::File)
    }
}

/// One walker row: a file or a directory with its rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Full path as reported by the walker.
    pub path: PathBuf,

    /// Numeric owner id.
    pub owner_id: u32,

    /// Numeric group id.
    pub group_id: u32,

    /// Size of the entry itself in bytes.
    pub size_bytes: u64,

    /// Entry timestamps.
    pub timestamps: Timestamps,

    /// Extension of the leaf name, empty for directories.
    pub extension: CompactString,

    /// Row kind and rollup values.
    pub kind: RowKind,

    /// Walker columns kept for completeness.
    #[serde(default)]
    pub meta: WalkerMeta,
}

impl InventoryRecord {
    /// Create a file row. The extension is derived from the path.
    pub fn file(path: impl Into<PathBuf>, size_bytes: u64, timestamps: Timestamps) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            owner_id: 0,
            group_id: 0,
            size_bytes,
            timestamps,
            extension,
            kind: RowKind::File,
            meta: WalkerMeta::default(),
        }
    }

    /// Create a directory rollup row.
    pub fn directory(
        path: impl Into<PathBuf>,
        file_count: u64,
        dir_size_sum: u64,
        timestamps: Timestamps,
    ) -> Self {
        Self {
            path: path.into(),
            owner_id: 0,
            group_id: 0,
            size_bytes: 0,
            timestamps,
            extension: CompactString::default(),
            kind: RowKind::Directory {
                file_count,
                dir_size_sum,
            },
            meta: WalkerMeta::default(),
        }
    }

    /// Set owner and group ids.
    pub fn with_owner(mut self, owner_id: u32, group_id: u32) -> Self {
        self.owner_id = owner_id;
        self.group_id = group_id;
        self
    }

    /// Override the extension.
    pub fn with_extension(mut self, extension: impl Into<CompactString>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Check if this row is a plain file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this row is a directory rollup.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Files beneath this directory, 0 for files.
    pub fn file_count(&self) -> u64 {
        match self.kind {
            RowKind::Directory { file_count, .. } => file_count,
            RowKind::File => 0,
        }
    }

    /// Subtree bytes for directories, 0 for files.
    pub fn dir_size_sum(&self) -> u64 {
        match self.kind {
            RowKind::Directory { dir_size_sum, .. } => dir_size_sum,
            RowKind::File => 0,
        }
    }

    /// Leaf name, or the whole path when it has no separator.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Leaf name with one trailing extension segment removed.
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_name())
    }
}

/// Extension of the leaf name of `path`, without the dot.
pub fn extension_of(path: &Path) -> CompactString {
    path.extension()
        .map(|ext| CompactString::from(ext.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_counts() {
        assert_eq!(RowKind::classify(None, -1, 0), Some(RowKind::File));
        assert_eq!(RowKind::classify(None, 0, 0), Some(RowKind::File));
        assert_eq!(
            RowKind::classify(None, 3, 300),
            Some(RowKind::Directory {
                file_count: 3,
                dir_size_sum: 300
            })
        );
        // A rollup sum without files is an unusable directory.
        assert_eq!(RowKind::classify(None, 0, 4096), None);
    }

    #[test]
    fn test_classify_by_mode() {
        assert_eq!(RowKind::classify(Some(true), 0, 0), None);
        assert_eq!(RowKind::classify(Some(false), 5, 10), Some(RowKind::File));
        assert!(RowKind::classify(Some(true), 2, 10).unwrap().is_dir());
    }

    #[test]
    fn test_dir_mode_bits() {
        let dir = WalkerMeta {
            mode: Some(0o040755),
            ..Default::default()
        };
        let file = WalkerMeta {
            mode: Some(0o100644),
            ..Default::default()
        };
        assert_eq!(dir.is_dir_mode(), Some(true));
        assert_eq!(file.is_dir_mode(), Some(false));
        assert_eq!(WalkerMeta::default().is_dir_mode(), None);
    }

    #[test]
    fn test_file_stem_edge_cases() {
        let ts = Timestamps::uniform(0);
        assert_eq!(InventoryRecord::file("/a/b/data.tar.gz", 1, ts).file_stem(), "data.tar");
        assert_eq!(InventoryRecord::file("/a/b/README", 1, ts).file_stem(), "README");
        assert_eq!(InventoryRecord::file("plain.txt", 1, ts).file_stem(), "plain");
        assert_eq!(InventoryRecord::file("/home/u/.bashrc", 1, ts).file_stem(), ".bashrc");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("/x/y.PDF")), "PDF");
        assert_eq!(extension_of(Path::new("/x/noext")), "");
        assert_eq!(extension_of(Path::new(".hidden")), "");
    }
}
