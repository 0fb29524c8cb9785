//! RocksDB-backed stores for the Greylock search engine
//!
//! This crate adapts RocksDB to the two stores the engine needs:
//! - `docs`: documents by internal id, external-id mapping, and the
//!   sequence metadata record
//! - `indexes`: posting lists and token shard sets, written exclusively
//!   through an associative set-union merge operator
//!
//! Writes within one store are atomic (`WriteBatch`); there is no atomicity
//! across the two stores. Index updates never read-modify-write: concurrent
//! merges of posting operands commute, so any interleaving of writers
//! produces the same final state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod merge;
pub mod store;
mod sync;

pub use database::Database;
pub use merge::MERGE_OPERATOR_NAME;
pub use store::{OpenMode, Store};
