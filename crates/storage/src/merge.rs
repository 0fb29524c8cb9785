//! The set-union merge operator of the indexes store
//!
//! Index updates are expressed as merges instead of read-modify-write:
//! every operand is a small delta (one posting entry, one shard id) and the
//! operator folds deltas into the stored sorted set. The fold is a pure
//! set-union, so it is associative, commutative and deterministic, which is
//! what makes concurrent index writers correct without locking.
//!
//! Dispatch is by key prefix: `token_shards.` keys hold `ShardSet`s,
//! `index.` keys hold `PostingList`s, and a merge on any other key fails.
//! Partial merge (combining two operands without the stored value) is
//! declined, forcing the engine to fall back to full merges on read.

use std::collections::BTreeSet;

use rocksdb::MergeOperands;
use tracing::error;

use greylock_core::document::{DocumentForIndex, PostingList, ShardSet};
use greylock_core::format;
use greylock_core::options::{INDEX_PREFIX, TOKEN_SHARDS_PREFIX};

/// Name the operator is registered under; must stay stable across opens
pub const MERGE_OPERATOR_NAME: &str = "greylock.disk-index-merge";

/// Full-merge callback registered with the indexes store
pub fn full_merge(
    key: &[u8],
    existing: Option<&[u8]>,
    operands: &MergeOperands,
) -> Option<Vec<u8>> {
    merge_dispatch(key, existing, operands.iter())
}

/// Partial-merge callback; always declines
pub fn partial_merge(
    _key: &[u8],
    _existing: Option<&[u8]>,
    _operands: &MergeOperands,
) -> Option<Vec<u8>> {
    None
}

fn merge_dispatch<'a, I>(key: &[u8], existing: Option<&[u8]>, operands: I) -> Option<Vec<u8>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    if key.starts_with(TOKEN_SHARDS_PREFIX.as_bytes()) {
        merge_shard_set(key, existing, operands)
    } else if key.starts_with(INDEX_PREFIX.as_bytes()) {
        merge_posting_list(key, existing, operands)
    } else {
        error!(
            key = %String::from_utf8_lossy(key),
            "merge requested on a key outside the index prefixes"
        );
        None
    }
}

fn merge_posting_list<'a, I>(key: &[u8], existing: Option<&[u8]>, operands: I) -> Option<Vec<u8>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let key_str = String::from_utf8_lossy(key);
    let mut unique: BTreeSet<DocumentForIndex> = BTreeSet::new();

    if let Some(bytes) = existing {
        match format::decode_posting_list(bytes, &key_str) {
            Ok(list) => unique.extend(list.ids),
            Err(e) => {
                error!(key = %key_str, error = %e, "stored posting list failed to decode");
                return None;
            }
        }
    }

    for operand in operands {
        match format::decode_document_for_index(operand, &key_str) {
            Ok(did) => {
                unique.insert(did);
            }
            Err(e) => {
                error!(key = %key_str, error = %e, "posting operand failed to decode");
                return None;
            }
        }
    }

    let merged = PostingList {
        ids: unique.into_iter().collect(),
    };
    match format::encode_posting_list(&merged) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!(key = %key_str, error = %e, "merged posting list failed to encode");
            None
        }
    }
}

fn merge_shard_set<'a, I>(key: &[u8], existing: Option<&[u8]>, operands: I) -> Option<Vec<u8>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let key_str = String::from_utf8_lossy(key);
    let mut unique: BTreeSet<u64> = BTreeSet::new();

    if let Some(bytes) = existing {
        match format::decode_shard_set(bytes, &key_str) {
            Ok(set) => unique.extend(set.shards),
            Err(e) => {
                error!(key = %key_str, error = %e, "stored shard set failed to decode");
                return None;
            }
        }
    }

    for operand in operands {
        match format::decode_shard_set(operand, &key_str) {
            Ok(set) => unique.extend(set.shards),
            Err(e) => {
                error!(key = %key_str, error = %e, "shard set operand failed to decode");
                return None;
            }
        }
    }

    let merged = ShardSet {
        shards: unique.into_iter().collect(),
    };
    match format::encode_shard_set(&merged) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!(key = %key_str, error = %e, "merged shard set failed to encode");
            None
        }
    }
}
