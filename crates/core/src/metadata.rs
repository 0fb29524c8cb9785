//! Durable sequence metadata
//!
//! The metadata record is a process-singleton counter persisted under a
//! single well-known key in the docs store. `next_seq` is a lock-free
//! increment that marks the record dirty; the storage layer flushes dirty
//! metadata on a timer and on shutdown. Sequence numbers are monotonic for
//! the life of a database and never reused — a crash before a flush may
//! forget the tail of the allocated range, which only skips id space.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::Result;
use crate::format;

/// The in-memory face of the persisted `{seq}` record
#[derive(Debug, Default)]
pub struct Metadata {
    seq: AtomicU64,
    dirty: AtomicBool,
}

impl Metadata {
    /// Create metadata starting at sequence zero
    pub fn new() -> Self {
        Metadata::default()
    }

    /// Allocate the next sequence number and mark the record dirty
    pub fn next_seq(&self) -> u64 {
        self.dirty.store(true, Ordering::Release);
        self.seq.fetch_add(1, Ordering::AcqRel)
    }

    /// Current value of the counter (the next number to be issued)
    pub fn sequence(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    /// Restore the counter from a persisted value at open time
    pub fn restore(&self, seq: u64) {
        self.seq.store(seq, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
    }

    /// Check whether there are allocations not yet flushed
    pub fn dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Atomically take the dirty flag; returns whether it was set
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Re-mark dirty, used when a flush attempt fails after taking the flag
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Serialize the current counter for persistence
    pub fn encode(&self) -> Result<Vec<u8>> {
        format::encode_metadata(self.sequence())
    }
}
