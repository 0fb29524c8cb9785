//! Indexing and ordered-intersection retrieval for Greylock
//!
//! This crate implements the two data paths of the engine:
//! - [`index`]: tokenize attribute values, assign a sequenced document id,
//!   and commit the document and its posting merges as two atomic batches
//! - [`Intersector::intersect`]: resolve a multi-attribute query by
//!   walking the shards of the rarest token, intersecting the rest, and
//!   re-verifying phrase constraints against stored content
//!
//! The tokenizer lives here too because index time and verification time
//! must tokenize identically.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod indexer;
pub mod intersect;
pub mod query;
pub mod tokenizer;
pub mod verify;

pub use indexer::{index, AttributeInput, DocumentInput};
pub use intersect::Intersector;
pub use query::{
    exact_attribute, text_attribute, with_negation, IntersectionQuery, MailboxQuery, SearchResult,
    SingleDocResult,
};
pub use verify::{accept_all, content_filter};
