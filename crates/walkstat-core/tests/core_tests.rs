use walkstat_core::{
    ConfigError, IngestConfig, IngestError, IngestStats, IngestWarning, Inventory,
    InventoryRecord, RowKind, Timestamps, WalkerMeta, WarningKind, units,
};
use std::path::PathBuf;

#[test]
fn test_timestamps() {
    let ts = Timestamps::new(100, 200);
    assert_eq!(ts.accessed, 100);
    assert_eq!(ts.modified, 200);
    assert!(ts.changed.is_none());

    let uniform = Timestamps::uniform(42);
    assert_eq!(uniform.accessed, uniform.modified);
}

#[test]
fn test_row_kind_discrimination() {
    let file = RowKind::File;
    assert!(file.is_file());
    assert!(!file.is_dir());

    let dir = RowKind::Directory {
        file_count: 10,
        dir_size_sum: 4096,
    };
    assert!(dir.is_dir());
    assert!(!dir.is_file());
}

#[test]
fn test_empty_directory_is_not_confused_with_file() {
    // Empty and zero-sized: numerically identical to a file without the mode.
    let dir_mode = WalkerMeta {
        mode: Some(0o040700),
        ..Default::default()
    };
    assert_eq!(RowKind::classify(dir_mode.is_dir_mode(), 0, 0), None);
    assert_eq!(RowKind::classify(None, 0, 0), Some(RowKind::File));
}

#[test]
fn test_record_accessors() {
    let ts = Timestamps::uniform(0);
    let dir = InventoryRecord::directory("/proj", 4, 8 * units::GIB, ts).with_owner(1000, 100);
    assert!(dir.is_dir());
    assert_eq!(dir.file_count(), 4);
    assert_eq!(dir.dir_size_sum(), 8 * units::GIB);
    assert_eq!(dir.owner_id, 1000);
    assert_eq!(dir.group_id, 100);
    assert!(dir.extension.is_empty());

    let file = InventoryRecord::file("/proj/model.ckpt", 10, ts);
    assert!(file.is_file());
    assert_eq!(file.file_count(), 0);
    assert_eq!(file.dir_size_sum(), 0);
    assert_eq!(file.extension, "ckpt");
    assert_eq!(file.file_name(), "model.ckpt");
    assert_eq!(file.file_stem(), "model");

    let overridden = file.with_extension("bin");
    assert_eq!(overridden.extension, "bin");
}

#[test]
fn test_record_serde_roundtrip() {
    let ts = Timestamps::uniform(1_600_000_000);
    let dir = InventoryRecord::directory("/scratch/run1", 12, 4096, ts);
    let json = serde_json::to_string(&dir).unwrap();
    assert!(json.contains("\"type\":\"directory\""));
    let back: InventoryRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, dir);
}

#[test]
fn test_inventory_totals_only_count_rollups() {
    let ts = Timestamps::uniform(0);
    let inventory = Inventory::new(vec![
        InventoryRecord::directory("/a", 1, 10, ts),
        InventoryRecord::directory("/b", 3, 20, ts),
        InventoryRecord::file("/a/x", 10, ts),
    ]);
    assert_eq!(inventory.corpus_bytes(), 30);
    assert_eq!(inventory.file_bytes(), 10);
}

#[test]
fn test_ingest_stats_merge() {
    let mut a = IngestStats {
        files_read: 1,
        rows_read: 10,
        rows_kept: 8,
        empty_rollups_dropped: 2,
        ..Default::default()
    };
    let b = IngestStats {
        files_read: 1,
        rows_read: 5,
        rows_kept: 4,
        malformed_rows: 1,
        ..Default::default()
    };
    a.merge(&b);
    assert_eq!(a.files_read, 2);
    assert_eq!(a.rows_read, 15);
    assert_eq!(a.rows_kept, 12);
    assert_eq!(a.empty_rollups_dropped, 2);
    assert_eq!(a.malformed_rows, 1);
}

#[test]
fn test_ingest_config_defaults() {
    let config = IngestConfig::new("/walk");
    assert_eq!(config.input, PathBuf::from("/walk"));
    assert_eq!(config.file_pattern, "*.csv");
    assert!(config.strict_schema);
}

#[test]
fn test_error_display() {
    let err = IngestError::InputNotFound {
        path: PathBuf::from("/nope"),
    };
    assert_eq!(err.to_string(), "Path /nope does not exist");

    let err: IngestError = ConfigError::EmptyAgeBoundaries.into();
    assert!(matches!(err, IngestError::Config(_)));
}

#[test]
fn test_warning_kinds() {
    let warning = IngestWarning::decode("walk.csv", 3);
    assert_eq!(warning.kind, WarningKind::Decode);
    assert_eq!(warning.line, Some(3));
}
