//! Document indexing
//!
//! Indexing a document produces two atomic batches:
//! - `docs`: the serialized document under its `indexed_id` string and the
//!   external-id mapping
//! - `indexes`: one posting merge and one shard-set merge per token
//!
//! The docs batch commits strictly first. If the process dies between the
//! two commits, the document exists but is unsearchable, which a lookup by
//! external id can detect; the inverse order would leave dangling index
//! entries. Replays are safe: a retried document gets a fresh `indexed_id`
//! and the set-union merges absorb the duplicate postings.

use std::time::Instant;

use rocksdb::WriteBatch;
use tracing::{debug, info};

use greylock_core::document::{Attribute, Content, Document, DocumentForIndex, ShardSet};
use greylock_core::error::{Error, Result};
use greylock_core::format;
use greylock_core::id::DocumentId;
use greylock_core::options::{DOCUMENTS_COLUMN, DOCUMENT_IDS_COLUMN};
use greylock_storage::Database;

use crate::tokenizer;

/// One attribute value to index: the attribute name and its raw text
#[derive(Debug, Clone)]
pub struct AttributeInput {
    /// Attribute identifier, e.g. `"title"` or `"to"`
    pub name: String,
    /// Raw attribute text, tokenized by the engine
    pub text: String,
}

impl AttributeInput {
    /// Create an attribute input
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        AttributeInput {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// One document submitted for indexing
#[derive(Debug, Clone, Default)]
pub struct DocumentInput {
    /// Caller-chosen external key
    pub id: String,
    /// Document author
    pub author: String,
    /// Textual content stored with the document
    pub content: Content,
    /// Caller-supplied timestamp; the current wall clock when absent
    pub timestamp: Option<(u64, u32)>,
    /// Attribute values contributing to the index
    pub attributes: Vec<AttributeInput>,
}

impl DocumentInput {
    /// Create an input with an external id
    pub fn new(id: impl Into<String>) -> Self {
        DocumentInput {
            id: id.into(),
            ..DocumentInput::default()
        }
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the stored title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.content.title = title.into();
        self
    }

    /// Set the stored body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.content.body = body.into();
        self
    }

    /// Pin the document timestamp instead of using the wall clock
    pub fn with_timestamp(mut self, tsec: u64, tnsec: u32) -> Self {
        self.timestamp = Some((tsec, tnsec));
        self
    }

    /// Add an attribute value to index
    pub fn with_attribute(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.attributes.push(AttributeInput::new(name, text));
        self
    }
}

/// Index a batch of documents into a mailbox
///
/// Returns the `indexed_id` assigned to each document, in input order. An
/// error inside one document aborts the request at that document; earlier
/// documents stay indexed.
pub fn index(db: &Database, mailbox: &str, inputs: Vec<DocumentInput>) -> Result<Vec<DocumentId>> {
    if mailbox.is_empty() {
        return Err(Error::InvalidRequest("mailbox must not be empty".into()));
    }

    let started = Instant::now();
    let mut ids = Vec::with_capacity(inputs.len());
    for input in inputs {
        ids.push(index_one(db, mailbox, input)?);
    }

    info!(
        mailbox,
        documents = ids.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "index request completed"
    );
    Ok(ids)
}

fn index_one(db: &Database, mailbox: &str, input: DocumentInput) -> Result<DocumentId> {
    if input.id.is_empty() {
        return Err(Error::InvalidRequest(
            "document id must not be empty".into(),
        ));
    }

    let options = db.options();

    if options.dedup_inserts {
        if let Some(bytes) = db
            .docs()
            .get_column(DOCUMENT_IDS_COLUMN, input.id.as_bytes())?
        {
            let existing = format::decode_document_for_index(&bytes, &input.id)?;
            debug!(
                mailbox,
                id = %input.id,
                indexed_id = %existing.indexed_id,
                "document already indexed, skipping"
            );
            return Ok(existing.indexed_id);
        }
    }

    let seq = db.next_seq() as u32;
    let indexed_id = match input.timestamp {
        Some((tsec, tnsec)) => DocumentId::new(tsec, tnsec, seq),
        None => DocumentId::now(seq),
    };

    let mut doc = Document {
        id: input.id,
        indexed_id,
        mailbox: mailbox.to_string(),
        author: input.author,
        content: input.content,
        index_attributes: Vec::with_capacity(input.attributes.len()),
    };
    for attr_input in input.attributes {
        let mut attr = Attribute::new(attr_input.name);
        attr.tokens = tokenizer::tokenize_with_ngrams(&attr_input.text, options.ngram_index_size);
        doc.index_attributes.push(attr);
    }
    doc.generate_token_keys(options);

    let did_bytes = format::encode_document_for_index(&DocumentForIndex { indexed_id })?;

    let mut docs_batch = WriteBatch::default();
    db.docs().batch_put_column(
        &mut docs_batch,
        DOCUMENTS_COLUMN,
        indexed_id.to_string().as_bytes(),
        &format::encode_document(&doc)?,
    )?;
    db.docs().batch_put_column(
        &mut docs_batch,
        DOCUMENT_IDS_COLUMN,
        doc.id.as_bytes(),
        &did_bytes,
    )?;

    let mut indexes_batch = WriteBatch::default();
    let mut tokens = 0usize;
    for attr in &doc.index_attributes {
        for token in &attr.tokens {
            indexes_batch.merge(token.key.as_bytes(), &did_bytes);
            let delta = format::encode_shard_set(&ShardSet {
                shards: token.shards.clone(),
            })?;
            indexes_batch.merge(token.shard_key.as_bytes(), &delta);
            tokens += 1;
        }
    }

    // The document must be durable before it becomes discoverable.
    db.docs().write(docs_batch)?;
    db.indexes().write(indexes_batch)?;

    debug!(
        mailbox,
        id = %doc.id,
        indexed_id = %indexed_id,
        tokens,
        "indexed document"
    );
    Ok(indexed_id)
}
