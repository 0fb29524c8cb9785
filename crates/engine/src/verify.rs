//! Phrase and negation re-verification
//!
//! Posting-list intersection proves token co-occurrence, not adjacency, so
//! exact patterns take a second pass over the stored content: retokenize it
//! with the index-time tokenizer and slide each pattern over the word
//! sequence. A pattern matches at offset `o` when every pattern token `t`
//! satisfies `content[o + p] == t.name` for each of its positions `p`.
//!
//! Attributes whose name contains `"title"` verify against the stored
//! title; all others verify against the body.

use greylock_core::document::{Document, Token};

use crate::query::IntersectionQuery;
use crate::tokenizer::split_words;

/// Build the standard candidate filter for a query
///
/// Applies negation rejection and exact-pattern verification for every
/// attribute of the mailbox the candidate belongs to. Queries without
/// patterns or negations accept everything.
pub fn content_filter(query: &IntersectionQuery) -> impl Fn(&Document) -> bool + '_ {
    move |doc| check_document(query, doc)
}

/// A filter that accepts every candidate
pub fn accept_all(_doc: &Document) -> bool {
    true
}

/// Check one candidate document against a query's content constraints
pub fn check_document(query: &IntersectionQuery, doc: &Document) -> bool {
    for mq in query.mailboxes.iter().filter(|m| m.mailbox == doc.mailbox) {
        for attr in &mq.attributes {
            if attr.exact.is_empty() && attr.negation.is_empty() {
                continue;
            }

            let words = if attr.name.contains("title") {
                split_words(&doc.content.title)
            } else {
                split_words(&doc.content.body)
            };

            if check_negation(&attr.negation, &words) {
                return false;
            }
            for pattern in &attr.exact {
                if !check_exact(&pattern.tokens, &words) {
                    return false;
                }
            }
        }
    }
    true
}

/// Whether any negation token appears in the content words
pub fn check_negation(tokens: &[Token], content: &[String]) -> bool {
    tokens
        .iter()
        .any(|token| content.iter().any(|word| *word == token.name))
}

/// Whether the pattern tokens match the content at any offset
pub fn check_exact(tokens: &[Token], content: &[String]) -> bool {
    if tokens.is_empty() {
        return true;
    }

    for offset in 0..content.len() {
        let matched = tokens.iter().all(|token| {
            token.positions.iter().all(|&pos| {
                content
                    .get(offset + pos as usize)
                    .is_some_and(|word| *word == token.name)
            })
        });
        if matched {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{exact_attribute, text_attribute, with_negation, MailboxQuery};
    use greylock_core::document::Content;

    fn doc(mailbox: &str, title: &str, body: &str) -> Document {
        Document {
            mailbox: mailbox.into(),
            content: Content {
                title: title.into(),
                body: body.into(),
                ..Content::default()
            },
            ..Document::default()
        }
    }

    fn words(text: &str) -> Vec<String> {
        split_words(text)
    }

    #[test]
    fn test_check_exact_adjacent() {
        let attr = exact_attribute("body", "quick fox");
        let pattern = &attr.exact[0].tokens;

        assert!(check_exact(pattern, &words("the quick fox jumps")));
        assert!(!check_exact(pattern, &words("the quick red fox")));
        assert!(!check_exact(pattern, &words("fox quick")));
    }

    #[test]
    fn test_check_exact_empty_content() {
        let attr = exact_attribute("body", "quick fox");
        assert!(!check_exact(&attr.exact[0].tokens, &[]));
    }

    #[test]
    fn test_check_exact_pattern_at_end_boundary() {
        let attr = exact_attribute("body", "quick fox");
        // "quick" is the last word; position 1 runs past the end.
        assert!(!check_exact(&attr.exact[0].tokens, &words("the quick")));
    }

    #[test]
    fn test_check_exact_repeated_word_positions() {
        let attr = exact_attribute("body", "tora tora tora");
        let pattern = &attr.exact[0].tokens;
        assert!(check_exact(pattern, &words("cry tora tora tora end")));
        assert!(!check_exact(pattern, &words("tora tora end")));
    }

    #[test]
    fn test_check_negation() {
        let tokens = text_attribute("body", "wolf").tokens;
        assert!(check_negation(&tokens, &words("a lone wolf howls")));
        assert!(!check_negation(&tokens, &words("a lone fox")));
    }

    #[test]
    fn test_check_document_title_routing() {
        let query = IntersectionQuery::new().with_mailbox(
            MailboxQuery::new("m1").with_attribute(exact_attribute("title", "hello world")),
        );

        let matching = doc("m1", "hello world", "unrelated body");
        let wrong_field = doc("m1", "unrelated", "hello world");
        assert!(check_document(&query, &matching));
        assert!(!check_document(&query, &wrong_field));
    }

    #[test]
    fn test_check_document_ignores_other_mailboxes() {
        let query = IntersectionQuery::new().with_mailbox(
            MailboxQuery::new("m1").with_attribute(exact_attribute("body", "quick fox")),
        );

        // Constraints of m1 do not apply to a document from m2.
        let other = doc("m2", "", "slow fox");
        assert!(check_document(&query, &other));
    }

    #[test]
    fn test_check_document_negation_rejects() {
        let query = IntersectionQuery::new().with_mailbox(
            MailboxQuery::new("m1")
                .with_attribute(with_negation(text_attribute("body", "fox"), "trap")),
        );

        assert!(check_document(&query, &doc("m1", "", "a fox runs free")));
        assert!(!check_document(&query, &doc("m1", "", "a fox in a trap")));
    }
}
