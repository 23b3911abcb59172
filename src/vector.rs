//! Sparse Binary Vectors
//!
//! Items are word-presence sets: a binary 0/1 vector over the vocabulary,
//! stored as the sorted list of coordinates that are 1.
//!
//! # Performance Considerations
//! - Coordinates are kept sorted so membership is a binary search and
//!   intersection is a linear merge
//! - The coordinate buffer is an `Arc<[WordId]>`, so every hash table can
//!   keep its own handle to an item without copying the words

use std::fmt;
use std::sync::Arc;

use crate::error::{DetectorError, Result};

/// Identifier of a streamed item (tweet ID).
pub type ItemId = u64;

/// Vocabulary index assigned by the encoder.
pub type WordId = u32;

/// Immutable set of word IDs interpreted as a binary vector.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SparseVector {
    words: Arc<[WordId]>,
}

impl SparseVector {
    /// Build a vector from word IDs. Duplicates collapse; order is irrelevant.
    pub fn new(words: impl IntoIterator<Item = WordId>) -> Self {
        let mut words: Vec<WordId> = words.into_iter().collect();
        words.sort_unstable();
        words.dedup();
        Self {
            words: words.into(),
        }
    }

    /// Number of nonzero coordinates (squared magnitude).
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[inline]
    pub fn contains(&self, word: WordId) -> bool {
        self.words.binary_search(&word).is_ok()
    }

    /// Coordinates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = WordId> + '_ {
        self.words.iter().copied()
    }

    pub fn as_slice(&self) -> &[WordId] {
        &self.words
    }

    /// Size of the intersection with `other`, which for binary vectors is
    /// their dot product.
    pub fn intersection_len(&self, other: &SparseVector) -> usize {
        let (a, b) = (&self.words, &other.words);
        let (mut i, mut j, mut shared) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Equal => {
                    shared += 1;
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }
        shared
    }
}

impl FromIterator<WordId> for SparseVector {
    fn from_iter<I: IntoIterator<Item = WordId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.words.iter()).finish()
    }
}

/// Angular distance between two binary vectors, in radians.
///
/// Formula: d(a, b) = acos(|a ∩ b| / sqrt(|a| * |b|))
///
/// Returns a value in [0, π/2] (coordinates are nonnegative):
/// - 0 = same word set
/// - π/2 = no shared words
///
/// # Errors
/// `EmptyVector` if either side has no words; the ratio has a zero
/// denominator there. `item` is reported as the offending ID.
pub fn cosine_distance(item: ItemId, a: &SparseVector, b: &SparseVector) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(DetectorError::EmptyVector(item));
    }

    let shared = a.intersection_len(b) as f64;
    // sqrt of the product is exact for equal lengths, so identical sets give 0
    let magnitude = ((a.len() * b.len()) as f64).sqrt();

    let cosine = (shared / magnitude).min(1.0);
    Ok(cosine.acos())
}
