//! Query and result types for ordered intersection
//!
//! The engine consumes already-parsed query objects; JSON parsing belongs
//! to the HTTP shell. A query names one or more mailboxes, each with the
//! attributes a matching document must satisfy, plus a timestamp window,
//! a pagination cursor and a soft result cap. The caller echoes
//! `next_document_id` from the previous response until `completed` is true.

use std::time::Instant;

use greylock_core::document::{Attribute, Document, PhrasePattern};
use greylock_core::id::DocumentId;

use crate::tokenizer;

/// The attribute requirements for one mailbox
#[derive(Debug, Clone, Default)]
pub struct MailboxQuery {
    /// Mailbox to search
    pub mailbox: String,
    /// Attributes a matching document must satisfy (AND across attributes)
    pub attributes: Vec<Attribute>,
}

impl MailboxQuery {
    /// Create a query for one mailbox
    pub fn new(mailbox: impl Into<String>) -> Self {
        MailboxQuery {
            mailbox: mailbox.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute requirement
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A multi-mailbox intersection query
#[derive(Debug, Clone)]
pub struct IntersectionQuery {
    /// Per-mailbox requirements; results are the union across mailboxes
    pub mailboxes: Vec<MailboxQuery>,
    /// Inclusive lower bound of the timestamp window
    pub range_start: DocumentId,
    /// Exclusive upper bound of the timestamp window
    pub range_end: DocumentId,
    /// Pagination cursor; `DocumentId::MIN` starts from the beginning
    pub next_document_id: DocumentId,
    /// Soft result cap
    pub max_number: usize,
    /// Optional deadline, checked at shard boundaries
    pub deadline: Option<Instant>,
}

impl Default for IntersectionQuery {
    fn default() -> Self {
        IntersectionQuery {
            mailboxes: Vec::new(),
            range_start: DocumentId::MIN,
            range_end: DocumentId::MAX,
            next_document_id: DocumentId::MIN,
            max_number: usize::MAX,
            deadline: None,
        }
    }
}

impl IntersectionQuery {
    /// Create an unconstrained query
    pub fn new() -> Self {
        IntersectionQuery::default()
    }

    /// Add a mailbox to search
    pub fn with_mailbox(mut self, query: MailboxQuery) -> Self {
        self.mailboxes.push(query);
        self
    }

    /// Restrict results to `[start_sec, end_sec)` in document timestamps
    pub fn with_time_range(mut self, start_sec: u64, end_sec: u64) -> Self {
        self.range_start = DocumentId::from_timestamp(start_sec, 0);
        self.range_end = DocumentId::from_timestamp(end_sec, 0);
        self
    }

    /// Resume from a cursor returned by a previous response
    pub fn with_cursor(mut self, cursor: DocumentId) -> Self {
        self.next_document_id = cursor;
        self
    }

    /// Cap the number of returned documents
    pub fn with_limit(mut self, max_number: usize) -> Self {
        self.max_number = max_number;
        self
    }

    /// Abort the shard walk once this instant passes
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// One matching document with its relevance
#[derive(Debug, Clone)]
pub struct SingleDocResult {
    /// The matching document
    pub doc: Document,
    /// Number of required tokens the document matched
    pub relevance: usize,
}

/// The response of an intersection query
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Matching documents in ascending `indexed_id` order
    pub docs: Vec<SingleDocResult>,
    /// Whether the walk reached the end of the index
    pub completed: bool,
    /// Cursor to resume from; `DocumentId::MAX` when completed
    pub next_document_id: DocumentId,
}

/// Build an attribute that requires all tokens of `text`
pub fn text_attribute(name: impl Into<String>, text: &str) -> Attribute {
    Attribute {
        name: name.into(),
        tokens: tokenizer::tokenize(text),
        ..Attribute::default()
    }
}

/// Build an attribute that requires `phrase` to appear verbatim
///
/// The tokens feed the posting-list intersection; the phrase pattern is
/// re-verified against stored content with word positions taken from the
/// phrase itself.
pub fn exact_attribute(name: impl Into<String>, phrase: &str) -> Attribute {
    let tokens = tokenizer::tokenize(phrase);
    Attribute {
        name: name.into(),
        tokens: tokens.clone(),
        exact: vec![PhrasePattern { tokens }],
        ..Attribute::default()
    }
}

/// Add tokens whose presence in stored content rejects a candidate
pub fn with_negation(mut attribute: Attribute, text: &str) -> Attribute {
    attribute.negation.extend(tokenizer::tokenize(text));
    attribute
}
