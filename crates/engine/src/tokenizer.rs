//! Positional tokenization
//!
//! The same tokenizer runs at index time and at verification time; if the
//! two ever diverge, phrase patterns silently stop matching. Tokenization
//! is deliberately simple:
//! - lowercase
//! - split on non-alphanumeric characters (Unicode-aware)
//! - a token's positions are its word offsets within the value
//!
//! When `ngram_index_size` is set, tokens shorter than the threshold are
//! additionally indexed as bigrams composed with their neighbors. This
//! speeds up phrase queries full of short words at the cost of index
//! volume; bigrams never participate in phrase verification.

use std::collections::HashMap;

use greylock_core::document::Token;

/// Split text into the flat lowercase word sequence
///
/// This is the form phrase verification walks: the offset of a word in the
/// returned vector is the position recorded at index time.
pub fn split_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Tokenize text into unique tokens with their positions
///
/// Tokens come out in first-occurrence order; positions are ascending.
pub fn tokenize(text: &str) -> Vec<Token> {
    let words = split_words(text);
    collect_tokens(
        words
            .iter()
            .enumerate()
            .map(|(pos, word)| (word.clone(), pos as u32)),
    )
}

/// Tokenize for indexing, adding neighbor bigrams for short tokens
///
/// A word shorter than `ngram_index_size` characters is still indexed on
/// its own, and additionally as `previous||current` and `current||next`
/// composed tokens at the position of their left constituent. Zero
/// disables the extra emission.
pub fn tokenize_with_ngrams(text: &str, ngram_index_size: usize) -> Vec<Token> {
    let words = split_words(text);
    let mut pairs: Vec<(String, u32)> = words
        .iter()
        .enumerate()
        .map(|(pos, word)| (word.clone(), pos as u32))
        .collect();

    if ngram_index_size > 0 {
        for (pos, word) in words.iter().enumerate() {
            if word.chars().count() >= ngram_index_size {
                continue;
            }
            if pos > 0 {
                pairs.push((format!("{}{}", words[pos - 1], word), (pos - 1) as u32));
            }
            if pos + 1 < words.len() {
                pairs.push((format!("{}{}", word, words[pos + 1]), pos as u32));
            }
        }
    }

    collect_tokens(pairs)
}

fn collect_tokens(pairs: impl IntoIterator<Item = (String, u32)>) -> Vec<Token> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut tokens: Vec<Token> = Vec::new();

    for (name, pos) in pairs {
        match index.get(&name) {
            Some(&i) => {
                let positions = &mut tokens[i].positions;
                if !positions.contains(&pos) {
                    positions.push(pos);
                }
            }
            None => {
                index.insert(name.clone(), tokens.len());
                tokens.push(Token::new(name, vec![pos]));
            }
        }
    }

    tokens
}
