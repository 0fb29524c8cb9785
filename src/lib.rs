//! # Greylock
//!
//! An inverted-index search engine over mailbox-scoped document
//! collections, backed by two RocksDB stores.
//!
//! Documents are submitted with explicit index attributes; the engine
//! persists them durably, builds posting lists keyed by
//! `(mailbox, attribute, token)` spread across sequence-space shards, and
//! answers intersection queries with timestamp windows, phrase
//! re-verification and cursor pagination.
//!
//! # Quick start
//!
//! ```no_run
//! use greylock::{
//!     content_filter, index, text_attribute, Database, DocumentInput, IntersectionQuery,
//!     Intersector, MailboxQuery, OpenMode, Options,
//! };
//!
//! fn main() -> greylock::Result<()> {
//!     let db = Database::open("./docs", "./indexes", Options::default(), OpenMode::ReadWrite)?;
//!
//!     index(
//!         &db,
//!         "inbox",
//!         vec![DocumentInput::new("doc-1")
//!             .with_title("hello world")
//!             .with_attribute("title", "hello world")],
//!     )?;
//!
//!     let query = IntersectionQuery::new()
//!         .with_mailbox(MailboxQuery::new("inbox").with_attribute(text_attribute("title", "hello")));
//!     let result = Intersector::new(&db).intersect(&query, content_filter(&query))?;
//!     assert_eq!(result.docs.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! The HTTP surface, JSON parsing and HTML tokenization are external
//! collaborators; this crate is the storage-and-retrieval core.

pub use greylock_core::*;
pub use greylock_engine::*;
pub use greylock_storage::*;
