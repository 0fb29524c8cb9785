//! Version-tagged serialization of persisted values
//!
//! Every value written to the stores is framed as a leading `u32` version
//! tag followed by the bincode-encoded payload. The tag value equals the
//! arity of the encoded record (the tag itself counts), so a reader can
//! validate that it is looking at the layout it expects; any mismatch or
//! decoder failure surfaces as a corruption error carrying the key.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::document::{Document, DocumentForIndex, PostingList, ShardSet};
use crate::error::{Error, Result};

/// Version tag of the metadata record: `[tag, seq]`
pub const METADATA_VERSION: u32 = 2;
/// Version tag of a posting-list operand: `[tag, indexed_id]`
pub const DOCUMENT_FOR_INDEX_VERSION: u32 = 2;
/// Version tag of a posting list: `[tag, ids]`
pub const POSTING_LIST_VERSION: u32 = 2;
/// Version tag of a shard set: `[tag, shards]`
pub const SHARD_SET_VERSION: u32 = 2;
/// Version tag of a document record: `[tag, id, indexed_id, mailbox,
/// author, content, index_attributes]`
pub const DOCUMENT_VERSION: u32 = 7;

fn encode_framed<T: Serialize>(version: u32, value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&(version, value))?)
}

fn decode_framed<T: DeserializeOwned>(bytes: &[u8], version: u32, key: &str) -> Result<T> {
    let (tag, value): (u32, T) =
        bincode::deserialize(bytes).map_err(|e| Error::corrupt(key, e))?;
    if tag != version {
        return Err(Error::corrupt(
            key,
            format!("unexpected version tag {} (want {})", tag, version),
        ));
    }
    Ok(value)
}

/// Encode the sequence metadata record
pub fn encode_metadata(seq: u64) -> Result<Vec<u8>> {
    encode_framed(METADATA_VERSION, &seq)
}

/// Decode the sequence metadata record
pub fn decode_metadata(bytes: &[u8], key: &str) -> Result<u64> {
    decode_framed(bytes, METADATA_VERSION, key)
}

/// Encode a document record
pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    encode_framed(DOCUMENT_VERSION, doc)
}

/// Decode a document record
pub fn decode_document(bytes: &[u8], key: &str) -> Result<Document> {
    decode_framed(bytes, DOCUMENT_VERSION, key)
}

/// Encode a single-document posting operand
pub fn encode_document_for_index(doc: &DocumentForIndex) -> Result<Vec<u8>> {
    encode_framed(DOCUMENT_FOR_INDEX_VERSION, doc)
}

/// Decode a single-document posting operand
pub fn decode_document_for_index(bytes: &[u8], key: &str) -> Result<DocumentForIndex> {
    decode_framed(bytes, DOCUMENT_FOR_INDEX_VERSION, key)
}

/// Encode a posting list
pub fn encode_posting_list(list: &PostingList) -> Result<Vec<u8>> {
    encode_framed(POSTING_LIST_VERSION, list)
}

/// Decode a posting list; failure aborts the reading query
pub fn decode_posting_list(bytes: &[u8], key: &str) -> Result<PostingList> {
    decode_framed(bytes, POSTING_LIST_VERSION, key).map_err(|_| Error::CorruptIndex {
        key: key.to_string(),
    })
}

/// Encode a shard set
pub fn encode_shard_set(set: &ShardSet) -> Result<Vec<u8>> {
    encode_framed(SHARD_SET_VERSION, set)
}

/// Decode a shard set
pub fn decode_shard_set(bytes: &[u8], key: &str) -> Result<ShardSet> {
    decode_framed(bytes, SHARD_SET_VERSION, key)
}
