//! Ordered-intersection retrieval
//!
//! A query resolves in three stages per mailbox:
//! 1. Read every required token's shard set. A token with no shards, or an
//!    attribute whose tokens share no shard, short-circuits to an empty
//!    result: a document's tokens within one attribute always land in the
//!    same shard, so a disjoint intersection cannot match anything.
//! 2. Pick the driving stream: the attribute with the smallest shard-set
//!    intersection, and within it the token with the fewest shards. Ties
//!    break by attribute name, then token name.
//! 3. Walk the driver's shards in ascending order from the cursor's shard,
//!    probing every other required token's posting list for the same shard
//!    and re-verifying accepted candidates against the stored document.
//!
//! Reads are individually consistent but not mutually snapshotted: a
//! document may be visible in a shard set and not yet in a posting list or
//! the docs store. Any missing read counts as "not a match".

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::info;

use greylock_core::document::{Document, ShardSet};
use greylock_core::error::{Error, Result};
use greylock_core::format;
use greylock_core::id::DocumentId;
use greylock_core::options::{self, DOCUMENTS_COLUMN};
use greylock_storage::Database;

use crate::query::{IntersectionQuery, MailboxQuery, SearchResult, SingleDocResult};

/// Executes intersection queries against one database
pub struct Intersector<'a> {
    db: &'a Database,
}

struct TokenPlan {
    name: String,
    shards: ShardSet,
}

struct AttrPlan {
    name: String,
    tokens: Vec<TokenPlan>,
    intersection: ShardSet,
}

struct MailboxWalk {
    docs: Vec<SingleDocResult>,
    completed: bool,
    next: DocumentId,
}

impl MailboxWalk {
    fn exhausted(docs: Vec<SingleDocResult>) -> Self {
        MailboxWalk {
            docs,
            completed: true,
            next: DocumentId::MAX,
        }
    }
}

impl<'a> Intersector<'a> {
    /// Create an intersector over a database
    pub fn new(db: &'a Database) -> Self {
        Intersector { db }
    }

    /// Resolve a query into matching documents
    ///
    /// `filter` sees every candidate that survived the posting-list
    /// intersection and the time window; it is where phrase/exact
    /// constraints get re-verified (see [`crate::verify`]).
    pub fn intersect<F>(&self, query: &IntersectionQuery, mut filter: F) -> Result<SearchResult>
    where
        F: FnMut(&Document) -> bool,
    {
        let started = Instant::now();

        for mq in &query.mailboxes {
            if mq.mailbox.is_empty() {
                return Err(Error::InvalidRequest("mailbox must not be empty".into()));
            }
        }

        if query.max_number == 0 {
            return Ok(SearchResult {
                docs: Vec::new(),
                completed: false,
                next_document_id: query.next_document_id,
            });
        }

        let mut walks = Vec::with_capacity(query.mailboxes.len());
        for mq in &query.mailboxes {
            walks.push(self.walk_mailbox(mq, query, &mut filter)?);
        }

        // Union across mailboxes: merge ascending by indexed id, first
        // occurrence wins, then apply the global cap.
        let mut merged: BTreeMap<DocumentId, SingleDocResult> = BTreeMap::new();
        let mut all_completed = true;
        let mut resume_floor = DocumentId::MAX;
        for walk in walks {
            all_completed &= walk.completed;
            if !walk.completed {
                resume_floor = resume_floor.min(walk.next);
            }
            for entry in walk.docs {
                merged.entry(entry.doc.indexed_id).or_insert(entry);
            }
        }

        let mut docs: Vec<SingleDocResult> = merged.into_values().collect();
        let truncated = docs.len() > query.max_number;
        docs.truncate(query.max_number);

        let (completed, next_document_id) = if all_completed && !truncated {
            (true, DocumentId::MAX)
        } else if let Some(last) = docs.last() {
            // Every dropped or unwalked candidate is strictly greater than
            // the last emitted id, so this cursor loses nothing.
            (false, last.doc.indexed_id.successor())
        } else {
            (false, resume_floor.min(DocumentId::MAX))
        };

        info!(
            mailboxes = query.mailboxes.len(),
            returned = docs.len(),
            completed,
            cursor_in = %query.next_document_id,
            cursor_out = %next_document_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search completed"
        );

        Ok(SearchResult {
            docs,
            completed,
            next_document_id,
        })
    }

    fn walk_mailbox<F>(
        &self,
        mq: &MailboxQuery,
        query: &IntersectionQuery,
        filter: &mut F,
    ) -> Result<MailboxWalk>
    where
        F: FnMut(&Document) -> bool,
    {
        let indexes = self.db.indexes();
        let shard_size = self.db.options().tokens_shard_size;

        // Stage 1: resolve shard sets and per-attribute intersections.
        let mut plans: Vec<AttrPlan> = Vec::new();
        for attr in &mq.attributes {
            if attr.tokens.is_empty() {
                // Wildcard attribute: contributes no posting-list filter.
                continue;
            }

            let mut tokens: Vec<TokenPlan> = Vec::with_capacity(attr.tokens.len());
            for token in &attr.tokens {
                let shard_key = options::token_shards_key(&mq.mailbox, &attr.name, &token.name);
                let shards = indexes.get_shards(&shard_key)?;
                if shards.is_empty() {
                    return Ok(MailboxWalk::exhausted(Vec::new()));
                }
                tokens.push(TokenPlan {
                    name: token.name.clone(),
                    shards,
                });
            }

            let mut intersection = tokens[0].shards.clone();
            for plan in &tokens[1..] {
                intersection = intersection.intersect(&plan.shards);
            }
            if intersection.is_empty() {
                return Ok(MailboxWalk::exhausted(Vec::new()));
            }

            plans.push(AttrPlan {
                name: attr.name.clone(),
                tokens,
                intersection,
            });
        }

        if plans.is_empty() {
            return Ok(MailboxWalk::exhausted(Vec::new()));
        }

        // Stage 2: driver selection with deterministic tie-breaks.
        let driver_idx = plans
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.intersection
                    .len()
                    .cmp(&b.intersection.len())
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        let driver = &plans[driver_idx];

        let primary_idx = driver
            .tokens
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.shards
                    .len()
                    .cmp(&b.shards.len())
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        let primary = &driver.tokens[primary_idx];

        let mut others: Vec<(&str, &str)> = Vec::new();
        for (ai, plan) in plans.iter().enumerate() {
            for (ti, token) in plan.tokens.iter().enumerate() {
                if ai == driver_idx && ti == primary_idx {
                    continue;
                }
                others.push((&plan.name, &token.name));
            }
        }
        let relevance = 1 + others.len();

        // Stage 3: walk the driver's shards from the cursor.
        let cursor = query.next_document_id;
        let start_shard = cursor.shard(shard_size);
        let cap = query.max_number;

        let mut docs: Vec<SingleDocResult> = Vec::new();
        for &shard in driver.intersection.shards.iter() {
            if shard < start_shard {
                continue;
            }

            if let Some(deadline) = query.deadline {
                if Instant::now() >= deadline {
                    let next = docs
                        .last()
                        .map(|d| d.doc.indexed_id.successor())
                        .unwrap_or(cursor);
                    return Ok(MailboxWalk {
                        docs,
                        completed: false,
                        next,
                    });
                }
            }

            let primary_key = options::index_key(&mq.mailbox, &driver.name, &primary.name, shard);
            let primary_list = match indexes.read_posting_list(&primary_key)? {
                // Listed in the shard set but not written yet: empty.
                None => continue,
                Some(list) => list,
            };

            let mut other_lists = Vec::with_capacity(others.len());
            let mut shard_covered = true;
            for (attr_name, token_name) in &others {
                let key = options::index_key(&mq.mailbox, attr_name, token_name, shard);
                match indexes.read_posting_list(&key)? {
                    None => {
                        shard_covered = false;
                        break;
                    }
                    Some(list) => other_lists.push(list),
                }
            }
            if !shard_covered {
                continue;
            }

            let start = primary_list.seek(cursor);
            for candidate in &primary_list.ids[start..] {
                let id = candidate.indexed_id;
                if id < query.range_start {
                    continue;
                }
                if id >= query.range_end {
                    // Entries ascend within a shard; the rest are out too.
                    break;
                }
                if !other_lists.iter().all(|list| list.contains(id)) {
                    continue;
                }
                let doc = match self.fetch_document(id)? {
                    None => continue,
                    Some(doc) => doc,
                };
                if !filter(&doc) {
                    continue;
                }

                docs.push(SingleDocResult { doc, relevance });
                if docs.len() >= cap {
                    return Ok(MailboxWalk {
                        docs,
                        completed: false,
                        next: id.successor(),
                    });
                }
            }
        }

        Ok(MailboxWalk::exhausted(docs))
    }

    fn fetch_document(&self, id: DocumentId) -> Result<Option<Document>> {
        let key = id.to_string();
        match self.db.docs().get_column(DOCUMENTS_COLUMN, key.as_bytes())? {
            None => Ok(None),
            Some(bytes) => format::decode_document(&bytes, &key).map(Some),
        }
    }
}
