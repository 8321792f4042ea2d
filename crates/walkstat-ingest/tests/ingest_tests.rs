use std::fs;
use std::path::Path;

use tempfile::TempDir;
use walkstat_ingest::{CsvIngestor, IngestConfig, IngestError, Snapshot, WarningKind};

const HEADER: &str = "inode,p_inode,d_depth,filename,fileExtension,UID,GID,st_size,st_dev,st_blocks,st_nlink,st_mode,st_atime,st_mtime,st_ctime,pw_fcount,pw_dirsum";

const GIB: u64 = 1024 * 1024 * 1024;

/// Rows of a small corpus: three rollups, one empty directory, four files.
fn corpus_rows() -> Vec<String> {
    vec![
        format!("1,0,0,\"/proj\",\"\",1000,100,4096,1,8,4,\"0040755\",100,100,100,3,{}", 12 * GIB),
        format!("2,1,1,\"/proj/a\",\"\",1000,100,4096,1,8,2,\"0040755\",100,100,100,2,{}", 5 * GIB),
        format!("3,1,1,\"/proj/b\",\"\",1000,100,4096,1,8,2,\"0040755\",100,100,100,1,{}", 7 * GIB),
        "4,1,1,\"/proj/empty\",\"\",1000,100,4096,1,8,2,\"0040755\",100,100,100,0,0".to_string(),
        "5,2,2,\"/proj/a/x.dat\",\"dat\",1000,100,3000,1,8,1,\"0100644\",100,100,100,-1,0"
            .to_string(),
        "6,2,2,\"/proj/a/y.dat\",\"dat\",1000,100,2000,1,8,1,\"0100644\",100,100,100,-1,0"
            .to_string(),
        "7,3,2,\"/proj/b/z.log\",\"log\",1000,100,1000,1,8,1,\"0100644\",100,100,100,-1,0"
            .to_string(),
        "8,1,1,\"/proj/README\",\"\",1000,100,10,1,8,1,\"0100644\",100,100,100,-1,0".to_string(),
    ]
}

fn write_csv(path: &Path, rows: &[String]) {
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(path, content).unwrap();
}

fn ingest(path: &Path) -> walkstat_ingest::Inventory {
    CsvIngestor::new().ingest(&IngestConfig::new(path)).unwrap()
}

#[test]
fn test_totals_independent_of_file_split() {
    let rows = corpus_rows();

    let single = TempDir::new().unwrap();
    write_csv(&single.path().join("all.csv"), &rows);

    let split = TempDir::new().unwrap();
    write_csv(&split.path().join("1.csv"), &rows[5..]);
    write_csv(&split.path().join("2.csv"), &rows[..2]);
    write_csv(&split.path().join("3.csv"), &rows[2..5]);

    let one = ingest(single.path());
    let many = ingest(split.path());

    assert_eq!(one.corpus_bytes(), 24 * GIB);
    assert_eq!(one.corpus_bytes(), many.corpus_bytes());
    assert_eq!(one.file_bytes(), many.file_bytes());
    assert_eq!(one.len(), many.len());
    assert_eq!(many.stats.files_read, 3);
    assert_eq!(many.stats.empty_rollups_dropped, 1);
}

#[test]
fn test_thread_count_does_not_change_result() {
    let temp = TempDir::new().unwrap();
    let rows = corpus_rows();
    for (i, chunk) in rows.chunks(2).enumerate() {
        write_csv(&temp.path().join(format!("part{i}.csv")), chunk);
    }

    let default = ingest(temp.path());
    let config = IngestConfig::builder()
        .input(temp.path())
        .threads(1usize)
        .build()
        .unwrap();
    let single_thread = CsvIngestor::new().ingest(&config).unwrap();

    assert_eq!(default.records, single_thread.records);
}

#[test]
fn test_malformed_rows_do_not_abort_file() {
    let temp = TempDir::new().unwrap();
    let mut rows = corpus_rows();
    rows.insert(2, "9,1,1,\"/proj/bad\",\"\",notanid,100,1,1,8,1,\"0100644\",1,1,1,-1,0".to_string());
    let path = temp.path().join("walk.csv");
    write_csv(&path, &rows);

    let inventory = ingest(&path);
    assert_eq!(inventory.stats.malformed_rows, 1);
    assert_eq!(inventory.len(), 7);
    assert!(inventory
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::InvalidField && w.message.contains("UID")));
}

#[test]
fn test_undecodable_bytes_are_replaced() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("walk.csv");
    let mut content = format!("{HEADER}\n").into_bytes();
    content.extend_from_slice(b"1,0,1,\"/proj/na\xefve.txt\",\"txt\",0,0,5,1,8,1,\"0100644\",1,1,1,-1,0\n");
    fs::write(&path, content).unwrap();

    let inventory = ingest(&path);
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory.warnings[0].kind, WarningKind::Decode);
    assert_eq!(inventory.records[0].extension, "txt");
}

#[test]
fn test_schema_mismatch_strict_and_lenient() {
    let temp = TempDir::new().unwrap();
    write_csv(&temp.path().join("good.csv"), &corpus_rows());
    fs::write(
        temp.path().join("other.csv"),
        "folder,user,group,days_acc,days_mod,fileCount,dirSizeSum,TiB,GiB,MiBAvg\n\
         /proj,alice,staff,10,10,3,100,0,0,0\n",
    )
    .unwrap();

    let err = CsvIngestor::new()
        .ingest(&IngestConfig::new(temp.path()))
        .unwrap_err();
    assert!(matches!(err, IngestError::SchemaMismatch { .. }));

    let lenient = IngestConfig::builder()
        .input(temp.path())
        .strict_schema(false)
        .build()
        .unwrap();
    let inventory = CsvIngestor::new().ingest(&lenient).unwrap();
    assert_eq!(inventory.stats.files_read, 1);
    assert!(inventory
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::SchemaMismatch));
}

#[test]
fn test_snapshot_roundtrip_preserves_corpus_total() {
    let temp = TempDir::new().unwrap();
    let csv = temp.path().join("walk.csv");
    write_csv(&csv, &corpus_rows());

    let inventory = ingest(&csv);
    let store = temp.path().join("hotspots.json");
    Snapshot::from_inventory(&inventory).save(&store).unwrap();

    let snapshot = Snapshot::load(&store).unwrap();
    assert_eq!(snapshot.corpus_bytes(), inventory.corpus_bytes());
    assert_eq!(snapshot.rollups.len(), 3);
    assert!(snapshot
        .rollups
        .windows(2)
        .all(|w| w[0].dir_size_sum() >= w[1].dir_size_sum()));
}
