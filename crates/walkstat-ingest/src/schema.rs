//! Column layout of walker CSV files and per-row normalization.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use csv::ByteRecord;
use indexmap::IndexMap;

use walkstat_core::{IngestError, InventoryRecord, RowKind, Timestamps, WalkerMeta};

// Accepted header names per column, canonical name first.
const PATH: &[&str] = &["filename", "path", "folder"];
const OWNER: &[&str] = &["UID"];
const GROUP: &[&str] = &["GID"];
const SIZE: &[&str] = &["st_size"];
const ATIME: &[&str] = &["st_atime"];
const MTIME: &[&str] = &["st_mtime"];
const FILE_COUNT: &[&str] = &["pw_fcount", "fileCount"];
const DIR_SIZE_SUM: &[&str] = &["pw_dirsum", "dirSizeSum"];

const EXTENSION: &[&str] = &["fileExtension", "extension"];
const CTIME: &[&str] = &["st_ctime"];
const INODE: &[&str] = &["inode"];
const PARENT_INODE: &[&str] = &["p_inode", "parent-inode"];
const DEPTH: &[&str] = &["d_depth", "directory-depth"];
const DEVICE: &[&str] = &["st_dev"];
const BLOCKS: &[&str] = &["st_blocks"];
const LINKS: &[&str] = &["st_nlink"];
const MODE: &[&str] = &["st_mode"];

/// A required field that could not be parsed.
#[derive(Debug)]
pub(crate) struct FieldError {
    pub field: &'static str,
    pub value: String,
}

/// Result of normalizing one data row.
#[derive(Debug)]
pub(crate) enum Row {
    /// Row kept. `repaired` is set when text fields needed lossy decoding.
    Kept {
        record: InventoryRecord,
        repaired: bool,
    },
    /// Directory without a usable rollup.
    EmptyRollup,
}

/// Column indices resolved from a header row.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMap {
    path: usize,
    owner: usize,
    group: usize,
    size: usize,
    atime: usize,
    mtime: usize,
    file_count: usize,
    dir_size_sum: usize,
    extension: Option<usize>,
    ctime: Option<usize>,
    inode: Option<usize>,
    parent_inode: Option<usize>,
    depth: Option<usize>,
    device: Option<usize>,
    blocks: Option<usize>,
    links: Option<usize>,
    mode: Option<usize>,
}

impl ColumnMap {
    /// Resolve columns from `headers`, failing with the list of missing
    /// required columns.
    pub fn from_headers(path: &Path, headers: &ByteRecord) -> Result<Self, IngestError> {
        let mut index: IndexMap<String, usize> = IndexMap::new();
        for (i, header) in headers.iter().enumerate() {
            let name = String::from_utf8_lossy(header);
            let name = name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase();
            index.entry(name).or_insert(i);
        }

        let lookup = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| index.get(&alias.to_ascii_lowercase()).copied())
        };

        let mut missing = Vec::new();
        let mut required = |aliases: &[&str]| match lookup(aliases) {
            Some(i) => i,
            None => {
                missing.push(aliases[0].to_string());
                0
            }
        };

        let map = Self {
            path: required(PATH),
            owner: required(OWNER),
            group: required(GROUP),
            size: required(SIZE),
            atime: required(ATIME),
            mtime: required(MTIME),
            file_count: required(FILE_COUNT),
            dir_size_sum: required(DIR_SIZE_SUM),
            extension: lookup(EXTENSION),
            ctime: lookup(CTIME),
            inode: lookup(INODE),
            parent_inode: lookup(PARENT_INODE),
            depth: lookup(DEPTH),
            device: lookup(DEVICE),
            blocks: lookup(BLOCKS),
            links: lookup(LINKS),
            mode: lookup(MODE),
        };

        if !missing.is_empty() {
            return Err(IngestError::SchemaMismatch {
                path: path.to_path_buf(),
                missing,
            });
        }
        Ok(map)
    }

    /// Normalize one data row.
    pub fn parse(&self, record: &ByteRecord) -> Result<Row, FieldError> {
        let (path, mut repaired) = text(record, Some(self.path));
        if path.is_empty() {
            return Err(FieldError {
                field: PATH[0],
                value: String::new(),
            });
        }

        let owner_id = id(record, self.owner, OWNER[0])?;
        let group_id = id(record, self.group, GROUP[0])?;
        let size_bytes = int(record, self.size, SIZE[0])?.max(0) as u64;
        let timestamps = Timestamps {
            accessed: int(record, self.atime, ATIME[0])?,
            modified: int(record, self.mtime, MTIME[0])?,
            changed: optional(record, self.ctime).and_then(|raw| parse_int(&raw)),
        };
        let file_count = int(record, self.file_count, FILE_COUNT[0])?;
        let dir_size_sum = int(record, self.dir_size_sum, DIR_SIZE_SUM[0])?;

        let meta = WalkerMeta {
            inode: unsigned(record, self.inode),
            parent_inode: unsigned(record, self.parent_inode),
            depth: unsigned(record, self.depth).and_then(|v| u32::try_from(v).ok()),
            device: unsigned(record, self.device),
            blocks: unsigned(record, self.blocks),
            link_count: unsigned(record, self.links),
            mode: optional(record, self.mode).and_then(|raw| parse_mode(&raw)),
        };

        let Some(kind) = RowKind::classify(meta.is_dir_mode(), file_count, dir_size_sum) else {
            return Ok(Row::EmptyRollup);
        };

        let path = PathBuf::from(path.into_owned());
        let mut row = match kind {
            RowKind::File => {
                let row = InventoryRecord::file(path, size_bytes, timestamps);
                match self.extension {
                    Some(_) => {
                        let (ext, ext_repaired) = text(record, self.extension);
                        repaired |= ext_repaired;
                        row.with_extension(ext.trim().to_string())
                    }
                    None => row,
                }
            }
            RowKind::Directory {
                file_count,
                dir_size_sum,
            } => {
                let mut row = InventoryRecord::directory(path, file_count, dir_size_sum, timestamps);
                row.size_bytes = size_bytes;
                row
            }
        };
        row = row.with_owner(owner_id, group_id);
        row.meta = meta;

        Ok(Row::Kept {
            record: row,
            repaired,
        })
    }
}

/// Decode a text field, replacing invalid UTF-8.
fn text(record: &ByteRecord, index: Option<usize>) -> (Cow<'_, str>, bool) {
    match index.and_then(|i| record.get(i)) {
        Some(bytes) => {
            let decoded = String::from_utf8_lossy(bytes);
            let repaired = matches!(decoded, Cow::Owned(_));
            (decoded, repaired)
        }
        None => (Cow::Borrowed(""), false),
    }
}

fn optional(record: &ByteRecord, index: Option<usize>) -> Option<String> {
    let (raw, _) = text(record, index);
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

fn int(record: &ByteRecord, index: usize, field: &'static str) -> Result<i64, FieldError> {
    let (raw, _) = text(record, Some(index));
    parse_int(&raw).ok_or_else(|| FieldError {
        field,
        value: raw.into_owned(),
    })
}

fn id(record: &ByteRecord, index: usize, field: &'static str) -> Result<u32, FieldError> {
    let value = int(record, index, field)?;
    u32::try_from(value).map_err(|_| FieldError {
        field,
        value: value.to_string(),
    })
}

fn unsigned(record: &ByteRecord, index: Option<usize>) -> Option<u64> {
    optional(record, index)
        .and_then(|raw| parse_int(&raw))
        .and_then(|v| u64::try_from(v).ok())
}

/// Parse an integer, accepting float notation such as `1.0` or `1e3`.
pub(crate) fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
    })
}

/// The walker writes `st_mode` as zero-padded octal.
pub(crate) fn parse_mode(raw: &str) -> Option<u32> {
    u32::from_str_radix(raw.trim(), 8).ok()
}
