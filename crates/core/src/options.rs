//! Engine options and key-layout constants
//!
//! One flat options struct is shared by the storage and engine layers,
//! mirroring the knobs of the original deployment: shard sizing, the ngram
//! threshold, store tuning (bloom bits, block cache, open files) and the
//! metadata flush interval.

use std::time::Duration;

/// Prefix of posting-list keys: `index.<mbox>.<attr>.<token>.<shard>`
pub const INDEX_PREFIX: &str = "index.";

/// Prefix of shard-membership keys: `token_shards.<mbox>.<attr>.<token>`
pub const TOKEN_SHARDS_PREFIX: &str = "token_shards.";

/// Well-known key of the persisted sequence metadata in the docs store
pub const METADATA_KEY: &str = "greylock.meta.key";

/// Column family holding serialized documents keyed by `indexed_id` string
pub const DOCUMENTS_COLUMN: &str = "documents";

/// Column family mapping external document ids to serialized `indexed_id`s
pub const DOCUMENT_IDS_COLUMN: &str = "document_ids";

/// Build the posting-list key for one token in one shard
pub fn index_key(mailbox: &str, attr: &str, token: &str, shard: u64) -> String {
    format!("{}{}.{}.{}.{}", INDEX_PREFIX, mailbox, attr, token, shard)
}

/// Build the shard-membership key for one token
pub fn token_shards_key(mailbox: &str, attr: &str, token: &str) -> String {
    format!("{}{}.{}.{}", TOKEN_SHARDS_PREFIX, mailbox, attr, token)
}

/// Tunable parameters of the engine
#[derive(Debug, Clone)]
pub struct Options {
    /// Width of one index shard in sequence space; a document's postings
    /// land in shard `seq / tokens_shard_size`
    pub tokens_shard_size: u64,

    /// Minimum token length that gets its own index entry. Shorter tokens
    /// are additionally indexed as bigrams with their neighbors. Zero
    /// disables ngram indexing.
    pub ngram_index_size: usize,

    /// Bloom filter bits per key for both stores
    pub bits_per_key: i32,

    /// Uncompressed block cache size in bytes, shared per store
    pub lru_cache_size: usize,

    /// RocksDB open file limit per store
    pub max_open_files: i32,

    /// How often the background timer flushes dirty metadata. Zero disables
    /// the timer; metadata is then flushed only on shutdown.
    pub sync_metadata_interval: Duration,

    /// Probe the external-id column before indexing and skip documents that
    /// were already indexed under the same external id
    pub dedup_inserts: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            tokens_shard_size: 4_000_000,
            ngram_index_size: 0,
            bits_per_key: 10,
            lru_cache_size: 100 * 1024 * 1024,
            max_open_files: 1000,
            sync_metadata_interval: Duration::from_secs(60),
            dedup_inserts: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.tokens_shard_size, 4_000_000);
        assert_eq!(opts.ngram_index_size, 0);
        assert_eq!(opts.bits_per_key, 10);
        assert_eq!(opts.sync_metadata_interval, Duration::from_secs(60));
        assert!(!opts.dedup_inserts);
    }
}
