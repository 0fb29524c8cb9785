//! The indexable document model and persisted index records
//!
//! A `Document` is immutable after insert. Its `index_attributes` carry the
//! tokens that feed the inverted index; each token knows its positions
//! within the attribute value and, once keys are generated, the index keys
//! it will be merged under.
//!
//! `PostingList` and `ShardSet` are the two record types living in the
//! `indexes` store. Both are ordered sets: strictly ascending, no
//! duplicates, grown only by set-union merges.

use serde::{Deserialize, Serialize};

use crate::id::DocumentId;
use crate::options::{self, Options};

/// Textual content of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Document title
    pub title: String,
    /// Document body text
    pub body: String,
    /// Outbound links
    pub links: Vec<String>,
    /// Image references
    pub images: Vec<String>,
}

/// A normalized term extracted from an attribute value
///
/// `positions` are word offsets within the attribute value. The `shards`,
/// `key` and `shard_key` fields are derived at index time by
/// [`Token::generate_keys`] and are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Normalized token text
    pub name: String,
    /// Word offsets of this token within the attribute value
    pub positions: Vec<u32>,
    /// Shard ids this token occurs in (one per writing document)
    #[serde(skip)]
    pub shards: Vec<u64>,
    /// Posting-list key: `index.<mbox>.<attr>.<token>.<shard>`
    #[serde(skip)]
    pub key: String,
    /// Shard-membership key: `token_shards.<mbox>.<attr>.<token>`
    #[serde(skip)]
    pub shard_key: String,
}

impl Token {
    /// Create a token with its positions
    pub fn new(name: impl Into<String>, positions: Vec<u32>) -> Self {
        Token {
            name: name.into(),
            positions,
            ..Token::default()
        }
    }

    /// Derive the index keys for this token on behalf of one document
    pub fn generate_keys(&mut self, options: &Options, mailbox: &str, attr: &str, id: DocumentId) {
        let shard = id.shard(options.tokens_shard_size);
        self.shards = vec![shard];
        self.key = options::index_key(mailbox, attr, &self.name, shard);
        self.shard_key = options::token_shards_key(mailbox, attr, &self.name);
    }
}

/// A sequence of tokens with intra-token positions, re-verified against the
/// stored content at query time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhrasePattern {
    /// Pattern tokens; each position is an offset from the candidate start
    pub tokens: Vec<Token>,
}

/// A named field of a document that contributes to the index
///
/// The same type serves both sides: at index time `tokens` is the
/// inverted-index contribution; at query time `tokens` is the intersection
/// requirement, `exact` holds phrase patterns and `negation` holds tokens
/// whose presence in the stored content rejects a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute identifier, e.g. `"title"` or `"to"`
    pub name: String,
    /// Tokens extracted from (or required in) the attribute value
    pub tokens: Vec<Token>,
    /// Phrase patterns re-verified against stored content
    pub exact: Vec<PhrasePattern>,
    /// Tokens whose presence in stored content rejects a candidate
    pub negation: Vec<Token>,
}

impl Attribute {
    /// Create an empty attribute
    pub fn new(name: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            ..Attribute::default()
        }
    }
}

/// A structured document with its index contribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-chosen external key
    pub id: String,
    /// Internal ordered key
    pub indexed_id: DocumentId,
    /// Mailbox this document belongs to
    pub mailbox: String,
    /// Document author
    pub author: String,
    /// Textual content
    pub content: Content,
    /// Attributes that fed the inverted index
    pub index_attributes: Vec<Attribute>,
}

impl Document {
    /// Derive index keys for every token of every attribute
    pub fn generate_token_keys(&mut self, options: &Options) {
        let id = self.indexed_id;
        for attr in &mut self.index_attributes {
            let name = attr.name.clone();
            for token in &mut attr.tokens {
                token.generate_keys(options, &self.mailbox, &name, id);
            }
        }
    }
}

/// The posting-list element: one indexed document
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DocumentForIndex {
    /// Internal id of the indexed document
    pub indexed_id: DocumentId,
}

/// Ordered set of documents containing a token within one shard
///
/// Invariant: `ids` is strictly ascending by `indexed_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    /// Posting entries, strictly ascending
    pub ids: Vec<DocumentForIndex>,
}

impl PostingList {
    /// Create an empty posting list
    pub fn new() -> Self {
        PostingList::default()
    }

    /// Insert while preserving the sorted-unique invariant
    pub fn insert(&mut self, doc: DocumentForIndex) {
        if let Err(pos) = self.ids.binary_search(&doc) {
            self.ids.insert(pos, doc);
        }
    }

    /// Membership probe by binary search
    pub fn contains(&self, id: DocumentId) -> bool {
        self.ids
            .binary_search(&DocumentForIndex { indexed_id: id })
            .is_ok()
    }

    /// Offset of the first entry with id >= `cursor`
    pub fn seek(&self, cursor: DocumentId) -> usize {
        self.ids.partition_point(|d| d.indexed_id < cursor)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Ordered set of shard ids in which a token has at least one posting
///
/// Invariant: `shards` is strictly ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSet {
    /// Shard ids, strictly ascending
    pub shards: Vec<u64>,
}

impl ShardSet {
    /// Create an empty shard set
    pub fn new() -> Self {
        ShardSet::default()
    }

    /// Create a single-shard delta for a merge operand
    pub fn single(shard: u64) -> Self {
        ShardSet {
            shards: vec![shard],
        }
    }

    /// Insert while preserving the sorted-unique invariant
    pub fn insert(&mut self, shard: u64) {
        if let Err(pos) = self.shards.binary_search(&shard) {
            self.shards.insert(pos, shard);
        }
    }

    /// Intersect two shard sets, preserving order
    pub fn intersect(&self, other: &ShardSet) -> ShardSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.shards.len() && j < other.shards.len() {
            match self.shards[i].cmp(&other.shards[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.push(self.shards[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        ShardSet { shards: out }
    }

    /// Number of shards
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did(seq: u32) -> DocumentForIndex {
        DocumentForIndex {
            indexed_id: DocumentId::new(0, 0, seq),
        }
    }

    #[test]
    fn test_posting_list_sorted_unique() {
        let mut list = PostingList::new();
        list.insert(did(5));
        list.insert(did(1));
        list.insert(did(3));
        list.insert(did(3));

        let seqs: Vec<u32> = list.ids.iter().map(|d| d.indexed_id.seq).collect();
        assert_eq!(seqs, vec![1, 3, 5]);
    }

    #[test]
    fn test_posting_list_contains_and_seek() {
        let mut list = PostingList::new();
        for seq in [2, 4, 6] {
            list.insert(did(seq));
        }
        assert!(list.contains(DocumentId::new(0, 0, 4)));
        assert!(!list.contains(DocumentId::new(0, 0, 5)));

        assert_eq!(list.seek(DocumentId::MIN), 0);
        assert_eq!(list.seek(DocumentId::new(0, 0, 4)), 1);
        assert_eq!(list.seek(DocumentId::new(0, 0, 7)), 3);
    }

    #[test]
    fn test_shard_set_sorted_unique() {
        let mut set = ShardSet::new();
        for shard in [9, 1, 4, 4, 1] {
            set.insert(shard);
        }
        assert_eq!(set.shards, vec![1, 4, 9]);
    }

    #[test]
    fn test_shard_set_intersect() {
        let a = ShardSet {
            shards: vec![0, 2, 4, 6],
        };
        let b = ShardSet {
            shards: vec![2, 3, 4, 8],
        };
        assert_eq!(a.intersect(&b).shards, vec![2, 4]);
        assert!(a.intersect(&ShardSet::new()).is_empty());
    }

    #[test]
    fn test_token_key_layout() {
        let opts = Options {
            tokens_shard_size: 100,
            ..Options::default()
        };
        let mut token = Token::new("hello", vec![0]);
        token.generate_keys(&opts, "m1", "title", DocumentId::new(7, 0, 250));

        assert_eq!(token.key, "index.m1.title.hello.2");
        assert_eq!(token.shard_key, "token_shards.m1.title.hello");
        assert_eq!(token.shards, vec![2]);
    }

    #[test]
    fn test_generate_token_keys_covers_all_attributes() {
        let opts = Options::default();
        let mut doc = Document {
            id: "ext".into(),
            indexed_id: DocumentId::new(1, 0, 3),
            mailbox: "mbox".into(),
            author: "a".into(),
            content: Content::default(),
            index_attributes: vec![
                Attribute {
                    name: "title".into(),
                    tokens: vec![Token::new("one", vec![0])],
                    ..Attribute::default()
                },
                Attribute {
                    name: "to".into(),
                    tokens: vec![Token::new("two", vec![0])],
                    ..Attribute::default()
                },
            ],
        };
        doc.generate_token_keys(&opts);

        assert_eq!(doc.index_attributes[0].tokens[0].key, "index.mbox.title.one.0");
        assert_eq!(doc.index_attributes[1].tokens[0].shard_key, "token_shards.mbox.to.two");
    }
}
