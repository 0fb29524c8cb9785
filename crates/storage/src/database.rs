//! The paired docs/indexes stores with sequence metadata
//!
//! `Database` owns the two stores the engine operates on, recovers the
//! sequence counter at open time, and keeps it durable: a background timer
//! flushes dirty metadata every `sync_metadata_interval`, and drop performs
//! a final flush. Compaction and caching of the two stores are tuned
//! independently because their access patterns differ (point reads of
//! documents vs merged scans of posting lists).

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use greylock_core::error::Result;
use greylock_core::format;
use greylock_core::metadata::Metadata;
use greylock_core::options::{Options, DOCUMENTS_COLUMN, DOCUMENT_IDS_COLUMN, METADATA_KEY};

use crate::store::{OpenMode, Store};
use crate::sync::MetadataSyncer;

/// The engine's storage root: docs store, indexes store, sequence metadata
pub struct Database {
    docs: Arc<Store>,
    indexes: Arc<Store>,
    metadata: Arc<Metadata>,
    options: Options,
    syncer: Option<MetadataSyncer>,
    read_only: bool,
}

impl Database {
    /// Open (or create) the two stores and recover the sequence counter
    pub fn open(
        docs_path: impl AsRef<Path>,
        indexes_path: impl AsRef<Path>,
        options: Options,
        mode: OpenMode,
    ) -> Result<Database> {
        let docs = Arc::new(Store::open(
            docs_path,
            &options,
            mode,
            &[DOCUMENTS_COLUMN, DOCUMENT_IDS_COLUMN],
            false,
        )?);
        let indexes = Arc::new(Store::open(indexes_path, &options, mode, &[], true)?);

        let metadata = Arc::new(Metadata::new());
        if let Some(bytes) = docs.get(METADATA_KEY)? {
            let seq = format::decode_metadata(&bytes, METADATA_KEY)?;
            metadata.restore(seq);
            info!(seq, "recovered sequence metadata");
        }

        let read_only = mode == OpenMode::ReadOnly;
        let syncer = if !read_only && !options.sync_metadata_interval.is_zero() {
            Some(MetadataSyncer::start(
                Arc::clone(&docs),
                Arc::clone(&metadata),
                options.sync_metadata_interval,
            ))
        } else {
            None
        };

        Ok(Database {
            docs,
            indexes,
            metadata,
            options,
            syncer,
            read_only,
        })
    }

    /// The store holding documents, external ids and metadata
    pub fn docs(&self) -> &Store {
        &self.docs
    }

    /// The store holding posting lists and token shard sets
    pub fn indexes(&self) -> &Store {
        &self.indexes
    }

    /// Engine options this database was opened with
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The sequence counter
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Whether this database rejects writes
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Allocate the next sequence number
    pub fn next_seq(&self) -> u64 {
        self.metadata.next_seq()
    }

    /// Flush the sequence metadata if it is dirty
    pub fn sync_metadata(&self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        flush_metadata(&self.docs, &self.metadata)
    }

    /// Compact both stores down to the bottom level
    pub fn compact(&self) {
        self.docs.compact();
        self.indexes.compact();
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Stop the timer before the final flush so the metadata key has a
        // single writer during shutdown.
        self.syncer.take();
        if !self.read_only {
            if let Err(e) = flush_metadata(&self.docs, &self.metadata) {
                warn!(error = %e, "final metadata flush failed");
            }
        }
    }
}

/// Serialize the counter under the metadata key via a single put.
/// Idempotent when the record is not dirty.
pub(crate) fn flush_metadata(docs: &Store, metadata: &Metadata) -> Result<()> {
    if !metadata.take_dirty() {
        return Ok(());
    }

    let result = metadata
        .encode()
        .and_then(|bytes| docs.put(METADATA_KEY, &bytes));
    if result.is_err() {
        // Keep the record dirty so the next flush retries.
        metadata.mark_dirty();
    }
    result
}
