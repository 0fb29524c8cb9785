//! Integration tests for the storage layer
//!
//! These tests exercise real RocksDB stores in scratch directories:
//! - sequence metadata recovery across reopen
//! - merge-operator invariants on posting lists and shard sets
//! - open modes (read-only visibility, bulk load + compaction)
//! - prefix scans and chunked compaction

use std::time::Duration;

use rocksdb::WriteBatch;
use tempfile::TempDir;

use greylock_core::document::{DocumentForIndex, ShardSet};
use greylock_core::format;
use greylock_core::id::DocumentId;
use greylock_core::options::{Options, METADATA_KEY};
use greylock_storage::{Database, OpenMode, Store};

// ============================================================================
// Helpers
// ============================================================================

fn test_options() -> Options {
    Options {
        // Most tests flush explicitly; the timer test overrides this.
        sync_metadata_interval: Duration::ZERO,
        ..Options::default()
    }
}

fn open_database(tmp: &TempDir, options: Options, mode: OpenMode) -> Database {
    Database::open(
        tmp.path().join("docs"),
        tmp.path().join("indexes"),
        options,
        mode,
    )
    .expect("database open failed")
}

fn posting_operand(seq: u32) -> Vec<u8> {
    format::encode_document_for_index(&DocumentForIndex {
        indexed_id: DocumentId::new(0, 0, seq),
    })
    .unwrap()
}

fn merge_postings(store: &Store, key: &str, seqs: &[u32]) {
    let mut batch = WriteBatch::default();
    for &seq in seqs {
        batch.merge(key.as_bytes(), posting_operand(seq));
    }
    store.write(batch).unwrap();
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn test_sequence_starts_at_zero() {
    let tmp = TempDir::new().unwrap();
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
    assert_eq!(db.next_seq(), 0);
    assert_eq!(db.next_seq(), 1);
}

#[test]
fn test_sequence_recovered_after_explicit_flush() {
    let tmp = TempDir::new().unwrap();
    {
        let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
        for _ in 0..5 {
            db.next_seq();
        }
        db.sync_metadata().unwrap();
    }

    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
    assert_eq!(db.metadata().sequence(), 5);
    assert_eq!(db.next_seq(), 5);
}

#[test]
fn test_sequence_flushed_on_shutdown() {
    let tmp = TempDir::new().unwrap();
    {
        let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
        db.next_seq();
        db.next_seq();
        // No explicit flush: drop performs the final one.
    }

    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
    assert_eq!(db.metadata().sequence(), 2);
}

#[test]
fn test_sync_metadata_idempotent_when_clean() {
    let tmp = TempDir::new().unwrap();
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);

    db.next_seq();
    db.sync_metadata().unwrap();
    assert!(!db.metadata().dirty());

    // Flushing a clean record is a no-op.
    db.sync_metadata().unwrap();
    db.sync_metadata().unwrap();

    let bytes = db.docs().get(METADATA_KEY).unwrap().unwrap();
    assert_eq!(format::decode_metadata(&bytes, METADATA_KEY).unwrap(), 1);
}

#[test]
fn test_background_timer_flushes_dirty_metadata() {
    let tmp = TempDir::new().unwrap();
    let options = Options {
        sync_metadata_interval: Duration::from_millis(100),
        ..Options::default()
    };
    let db = open_database(&tmp, options, OpenMode::ReadWrite);

    db.next_seq();
    db.next_seq();
    db.next_seq();

    // Give the timer a couple of cycles.
    std::thread::sleep(Duration::from_millis(500));

    let bytes = db.docs().get(METADATA_KEY).unwrap().unwrap();
    assert_eq!(format::decode_metadata(&bytes, METADATA_KEY).unwrap(), 3);
    assert!(!db.metadata().dirty());
}

// ============================================================================
// Merge operator
// ============================================================================

#[test]
fn test_posting_merges_stay_sorted_and_unique() {
    let tmp = TempDir::new().unwrap();
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);

    let key = "index.m1.title.hello.0";
    merge_postings(db.indexes(), key, &[9, 1, 5]);
    merge_postings(db.indexes(), key, &[5, 3]);

    let list = db.indexes().read_posting_list(key).unwrap().unwrap();
    let seqs: Vec<u32> = list.ids.iter().map(|d| d.indexed_id.seq).collect();
    assert_eq!(seqs, vec![1, 3, 5, 9]);
}

#[test]
fn test_shard_set_merges_stay_sorted_and_unique() {
    let tmp = TempDir::new().unwrap();
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);

    let key = "token_shards.m1.title.hello";
    for shard in [4u64, 0, 4, 2] {
        let mut batch = WriteBatch::default();
        batch.merge(
            key.as_bytes(),
            format::encode_shard_set(&ShardSet::single(shard)).unwrap(),
        );
        db.indexes().write(batch).unwrap();
    }

    let set = db.indexes().get_shards(key).unwrap();
    assert_eq!(set.shards, vec![0, 2, 4]);
}

#[test]
fn test_merges_survive_reopen_and_compaction() {
    let tmp = TempDir::new().unwrap();
    let key = "index.m1.body.tok.0";
    {
        let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
        merge_postings(db.indexes(), key, &[2, 7]);
    }

    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
    merge_postings(db.indexes(), key, &[4]);
    db.compact();

    let list = db.indexes().read_posting_list(key).unwrap().unwrap();
    let seqs: Vec<u32> = list.ids.iter().map(|d| d.indexed_id.seq).collect();
    assert_eq!(seqs, vec![2, 4, 7]);
}

#[test]
fn test_merge_outside_index_prefixes_poisons_reads() {
    let tmp = TempDir::new().unwrap();
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);

    let mut batch = WriteBatch::default();
    batch.merge(b"unrelated.key", posting_operand(1));
    db.indexes().write(batch).unwrap();

    // The operator rejects the key, so the engine surfaces the failure to
    // the reader instead of returning a value.
    assert!(db.indexes().get("unrelated.key").is_err());
}

#[test]
fn test_missing_records_read_as_empty() {
    let tmp = TempDir::new().unwrap();
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);

    assert!(db
        .indexes()
        .get_shards("token_shards.m1.title.absent")
        .unwrap()
        .is_empty());
    assert!(db
        .indexes()
        .read_posting_list("index.m1.title.absent.0")
        .unwrap()
        .is_none());
}

// ============================================================================
// Open modes
// ============================================================================

#[test]
fn test_read_only_sees_merged_data_and_rejects_writes() {
    let tmp = TempDir::new().unwrap();
    let key = "index.m1.title.ro.0";
    {
        let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
        merge_postings(db.indexes(), key, &[3, 1]);
    }

    let db = open_database(&tmp, test_options(), OpenMode::ReadOnly);
    assert!(db.is_read_only());

    let list = db.indexes().read_posting_list(key).unwrap().unwrap();
    let seqs: Vec<u32> = list.ids.iter().map(|d| d.indexed_id.seq).collect();
    assert_eq!(seqs, vec![1, 3]);

    assert!(db.docs().put("some.key", b"value").is_err());
    assert!(db.sync_metadata().is_ok());
}

#[test]
fn test_bulk_open_then_explicit_compaction() {
    let tmp = TempDir::new().unwrap();
    let key = "index.m1.title.bulk.0";
    {
        let db = open_database(&tmp, test_options(), OpenMode::Bulk);
        merge_postings(db.indexes(), key, &[1, 2, 3]);
        db.compact();

        let list = db.indexes().read_posting_list(key).unwrap().unwrap();
        assert_eq!(list.len(), 3);
    }

    // A normal open afterwards sees the loaded data.
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);
    assert_eq!(
        db.indexes().read_posting_list(key).unwrap().unwrap().len(),
        3
    );
}

// ============================================================================
// Scans and compaction
// ============================================================================

#[test]
fn test_prefix_scan_is_ordered_and_bounded() {
    let tmp = TempDir::new().unwrap();
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);

    let docs = db.docs();
    docs.put("scan.b", b"2").unwrap();
    docs.put("scan.a", b"1").unwrap();
    docs.put("scan.c", b"3").unwrap();
    docs.put("zother", b"x").unwrap();

    let hits = docs.prefix_scan(b"scan.").unwrap();
    let keys: Vec<String> = hits
        .iter()
        .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
        .collect();
    assert_eq!(keys, vec!["scan.a", "scan.b", "scan.c"]);
}

#[test]
fn test_chunked_compaction_walks_whole_keyspace() {
    let tmp = TempDir::new().unwrap();
    let db = open_database(&tmp, test_options(), OpenMode::ReadWrite);

    for i in 0..20 {
        db.docs()
            .put(format!("chunk.{:03}", i), vec![0xAB; 256])
            .unwrap();
    }

    // Small chunk budget forces several slices.
    let chunks = db.docs().compact_chunked(1024).unwrap();
    assert!(chunks >= 2, "expected multiple slices, got {chunks}");

    // Data is intact afterwards.
    assert!(db.docs().get("chunk.000").unwrap().is_some());
    assert!(db.docs().get("chunk.019").unwrap().is_some());
}
