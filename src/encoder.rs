//! Text encoding and the encoded record format.
//!
//! The encoder turns raw text into word-ID sets and keeps every word
//! occurrence (duplicates included) as the sample hyperplanes are drawn
//! from. IDs are assigned in first-seen order within one encoder, so each
//! set of items gets its own vocabulary scope.
//!
//! Encoded records are one item per line, one word ID per token so that
//! repeats survive into the sample built from the records:
//!
//! ```text
//! <item id>, <word id> <word id> ...
//! ```
//!
//! # Example
//!
//! ```
//! use firststory::encoder::{Encoder, format_record, parse_record};
//!
//! let mut encoder = Encoder::new();
//! let item = encoder.encode(7, "cats and dogs @someone http://x.y cats").unwrap();
//! assert_eq!(item.words.len(), 3);
//! assert_eq!(encoder.word_sample().len(), 4);
//!
//! let line = format_record(&item);
//! assert_eq!(line, "7, 0 1 2 0");
//! assert_eq!(parse_record(1, &line).unwrap(), Some(item));
//! ```

use std::collections::HashMap;

use crate::error::{DetectorError, Result};
use crate::vector::{ItemId, SparseVector, WordId};

/// One item ready for the detector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedItem {
    pub id: ItemId,
    pub words: SparseVector,
    /// Every token's word ID in order, repeats included
    pub occurrences: Vec<WordId>,
}

impl EncodedItem {
    pub fn new(id: ItemId, occurrences: Vec<WordId>) -> Self {
        Self {
            id,
            words: SparseVector::new(occurrences.iter().copied()),
            occurrences,
        }
    }
}

/// Assigns word IDs and records the occurrence sample.
#[derive(Debug, Default)]
pub struct Encoder {
    vocabulary: HashMap<String, WordId>,
    occurrences: Vec<WordId>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens that carry no topic: user mentions and links.
    fn is_ignored(token: &str) -> bool {
        token.starts_with('@') || token.starts_with("http")
    }

    /// Encode one item. Returns `None` when no word survives filtering.
    pub fn encode(&mut self, id: ItemId, text: &str) -> Option<EncodedItem> {
        let mut words = Vec::new();
        for token in text.split_whitespace().filter(|t| !Self::is_ignored(t)) {
            let word = self.word_id(token);
            self.occurrences.push(word);
            words.push(word);
        }

        if words.is_empty() {
            return None;
        }
        Some(EncodedItem::new(id, words))
    }

    /// ID for `token`, assigning the next free one if it is new.
    pub fn word_id(&mut self, token: &str) -> WordId {
        if let Some(&id) = self.vocabulary.get(token) {
            return id;
        }
        let id = self.vocabulary.len() as WordId;
        self.vocabulary.insert(token.to_string(), id);
        id
    }

    /// Every word occurrence so far, in encounter order.
    pub fn word_sample(&self) -> &[WordId] {
        &self.occurrences
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Consume the encoder, keeping only the occurrence sample.
    pub fn into_word_sample(self) -> Vec<WordId> {
        self.occurrences
    }
}

/// Split a raw input line of the form `<item id>\t<text>`.
pub fn parse_raw_line(line_number: usize, line: &str) -> Result<(ItemId, &str)> {
    let (id, text) = line
        .split_once('\t')
        .ok_or_else(|| malformed(line_number, "expected '<id>\\t<text>'"))?;
    let id = id
        .trim()
        .parse::<ItemId>()
        .map_err(|e| malformed(line_number, &format!("bad item id '{id}': {e}")))?;
    Ok((id, text))
}

/// Render an item as an encoded record line (without newline).
pub fn format_record(item: &EncodedItem) -> String {
    let words: Vec<String> = item.occurrences.iter().map(ToString::to_string).collect();
    format!("{}, {}", item.id, words.join(" "))
}

/// Parse an encoded record line.
///
/// Lines without any word (the item had nothing left after encoding) and
/// blank lines yield `Ok(None)`.
pub fn parse_record(line_number: usize, line: &str) -> Result<Option<EncodedItem>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (id, words) = match line.split_once(',') {
        Some((id, words)) => (id, words),
        None => (line, ""),
    };
    let id = id
        .trim()
        .parse::<ItemId>()
        .map_err(|e| malformed(line_number, &format!("bad item id '{id}': {e}")))?;

    let words = words
        .split_whitespace()
        .map(|w| {
            w.parse::<WordId>()
                .map_err(|e| malformed(line_number, &format!("bad word id '{w}': {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    if words.is_empty() {
        return Ok(None);
    }
    Ok(Some(EncodedItem::new(id, words)))
}

fn malformed(line: usize, reason: &str) -> DetectorError {
    DetectorError::MalformedRecord {
        line,
        reason: reason.to_string(),
    }
}
