//! One RocksDB store
//!
//! `Store` wraps a single RocksDB handle with the open modes and access
//! paths the engine relies on: point reads, column-family reads, atomic
//! batch writes, shard-set and posting-list reads with the engine's
//! missing-vs-corrupt semantics, prefix scans, and range compaction.

use std::path::{Path, PathBuf};

use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamily, ColumnFamilyDescriptor, CompactOptions,
    DBCompressionType, Direction, IteratorMode, Options as RocksOptions, WriteBatch, DB,
};
use tracing::{debug, info};

use greylock_core::document::{PostingList, ShardSet};
use greylock_core::error::{Error, Result};
use greylock_core::format;
use greylock_core::options::Options;

use crate::merge;

/// How a store is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create missing stores, allow writes
    ReadWrite,
    /// No writes; merged views of already-written operands are still visible
    ReadOnly,
    /// Read-write with compaction disabled during load; the caller invokes
    /// explicit compaction afterwards
    Bulk,
}

/// A single RocksDB store
pub struct Store {
    db: DB,
    path: PathBuf,
    read_only: bool,
}

fn tuned_options(options: &Options, cache: &Cache) -> RocksOptions {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(options.bits_per_key as f64, true);

    let mut opts = RocksOptions::default();
    opts.set_max_open_files(options.max_open_files);
    opts.set_block_based_table_factory(&block_opts);
    opts
}

impl Store {
    /// Open a store at `path`
    ///
    /// `columns` lists the column families beyond the default one.
    /// `with_merge` binds the index merge operator; the indexes store sets
    /// it in every mode so that read-only opens see merged views.
    pub fn open(
        path: impl AsRef<Path>,
        options: &Options,
        mode: OpenMode,
        columns: &[&str],
        with_merge: bool,
    ) -> Result<Store> {
        let path = path.as_ref().to_path_buf();
        let cache = Cache::new_lru_cache(options.lru_cache_size);

        let mut db_opts = tuned_options(options, &cache);
        if with_merge {
            db_opts.set_merge_operator(
                merge::MERGE_OPERATOR_NAME,
                merge::full_merge,
                merge::partial_merge,
            );
        }

        let db = match mode {
            OpenMode::ReadWrite | OpenMode::Bulk => {
                db_opts.create_if_missing(true);
                db_opts.create_missing_column_families(true);
                db_opts.set_compression_type(DBCompressionType::Lz4hc);
                if mode == OpenMode::Bulk {
                    db_opts.prepare_for_bulk_load();
                }
                let descriptors: Vec<ColumnFamilyDescriptor> = columns
                    .iter()
                    .map(|name| {
                        let mut cf_opts = tuned_options(options, &cache);
                        cf_opts.set_compression_type(DBCompressionType::Lz4hc);
                        ColumnFamilyDescriptor::new(*name, cf_opts)
                    })
                    .collect();
                DB::open_cf_descriptors(&db_opts, &path, descriptors)
            }
            OpenMode::ReadOnly => DB::open_cf_for_read_only(&db_opts, &path, columns, false),
        }
        .map_err(|e| {
            Error::Storage(format!(
                "failed to open store at '{}': {}",
                path.display(),
                e
            ))
        })?;

        info!(
            path = %path.display(),
            ?mode,
            cache_mb = options.lru_cache_size / (1024 * 1024),
            "opened store"
        );

        Ok(Store {
            db,
            path,
            read_only: mode == OpenMode::ReadOnly,
        })
    }

    /// Filesystem path of this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the store was opened read-only
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("missing column family '{}'", name)))
    }

    /// Point read from the default column family
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.db.get(key).map_err(Error::storage)
    }

    /// Point read from a named column family
    pub fn get_column(&self, column: &str, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.db.get_cf(self.cf(column)?, key).map_err(Error::storage)
    }

    /// Single put to the default column family
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        if self.read_only {
            return Err(Error::Storage(format!(
                "store at '{}' is read-only",
                self.path.display()
            )));
        }
        self.db.put(key, value).map_err(Error::storage)
    }

    /// Commit an atomic write batch
    pub fn write(&self, batch: WriteBatch) -> Result<()> {
        if self.read_only {
            return Err(Error::Storage(format!(
                "store at '{}' is read-only",
                self.path.display()
            )));
        }
        self.db.write(batch).map_err(Error::storage)
    }

    /// Stage a put into a named column family of a batch
    pub fn batch_put_column(
        &self,
        batch: &mut WriteBatch,
        column: &str,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<()> {
        batch.put_cf(self.cf(column)?, key, value);
        Ok(())
    }

    /// Read the shard set of a token; a missing key is an empty set
    pub fn get_shards(&self, key: &str) -> Result<ShardSet> {
        match self.get(key)? {
            None => Ok(ShardSet::new()),
            Some(bytes) => format::decode_shard_set(&bytes, key),
        }
    }

    /// Read one shard's posting list; a missing key is `None`, a value that
    /// fails to decode (including a failed merge surfaced by the engine)
    /// aborts the query as `CorruptIndex`
    pub fn read_posting_list(&self, key: &str) -> Result<Option<PostingList>> {
        match self.db.get(key) {
            Ok(None) => Ok(None),
            Ok(Some(bytes)) => format::decode_posting_list(&bytes, key).map(Some),
            Err(e) if e.kind() == rocksdb::ErrorKind::Corruption => Err(Error::CorruptIndex {
                key: key.to_string(),
            }),
            Err(e) => Err(Error::storage(e)),
        }
    }

    /// Ordered scan of all keys starting with `prefix` in the default
    /// column family
    pub fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(Error::storage)?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    /// Compact the whole store down to the bottom level
    pub fn compact(&self) {
        let mut opts = CompactOptions::default();
        opts.set_change_level(true);
        opts.set_target_level(0);
        self.db
            .compact_range_opt(None::<&[u8]>, None::<&[u8]>, &opts);
    }

    /// Compact a key range
    pub fn compact_range(&self, start: &[u8], end: &[u8]) {
        self.db.compact_range(Some(start), Some(end));
    }

    /// Walk the keyspace and compact it in slices of roughly `chunk_bytes`
    /// of value data; returns the number of slices compacted
    pub fn compact_chunked(&self, chunk_bytes: u64) -> Result<u64> {
        let mut chunks = 0u64;
        let mut iter = self.db.iterator(IteratorMode::Start);

        loop {
            let (first_key, first_value) = match iter.next() {
                None => break,
                Some(item) => item.map_err(Error::storage)?,
            };
            let start = first_key.to_vec();
            let mut end = first_key.to_vec();
            let mut size = first_value.len() as u64;

            while size < chunk_bytes {
                match iter.next() {
                    None => break,
                    Some(item) => {
                        let (key, value) = item.map_err(Error::storage)?;
                        end = key.to_vec();
                        size += value.len() as u64;
                    }
                }
            }

            self.compact_range(&start, &end);
            chunks += 1;
            debug!(
                path = %self.path.display(),
                chunk = chunks,
                bytes = size,
                "compacted range slice"
            );
        }

        Ok(chunks)
    }
}
