//! Core types for the Greylock search engine
//!
//! This crate defines the foundational types shared by the storage and
//! engine layers:
//! - DocumentId: sequenced, timestamp-prefixed document identifier
//! - Document, Attribute, Token: the indexable document model
//! - PostingList, ShardSet: the persisted inverted-index records
//! - Metadata: the durable sequence counter
//! - Error: unified error hierarchy
//! - format: version-tagged binary serialization for persisted values

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod format;
pub mod id;
pub mod metadata;
pub mod options;

pub use document::{
    Attribute, Content, Document, DocumentForIndex, PhrasePattern, PostingList, ShardSet, Token,
};
pub use error::{Error, Result};
pub use id::DocumentId;
pub use metadata::Metadata;
pub use options::{
    Options, DOCUMENTS_COLUMN, DOCUMENT_IDS_COLUMN, INDEX_PREFIX, METADATA_KEY,
    TOKEN_SHARDS_PREFIX,
};
