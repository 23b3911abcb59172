//! Frequency-biased hyperplane sampling.
//!
//! A hyperplane through the origin is stored compressed: only two
//! coordinates carry a nonzero coefficient, one strictly positive and one
//! strictly negative. Coordinates are drawn from a word-occurrence sample
//! (duplicates included), so frequent words are picked more often and the
//! resulting planes split the corpus more evenly than uniform picks would.
//!
//! Each sampler shuffles its own copy of the sample and walks it with a
//! cursor, so tables built from the same sample never interfere.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{DetectorError, Result};
use crate::vector::{SparseVector, WordId};

/// Compressed hyperplane: `positive.1 * x[positive.0] + negative.1 * x[negative.0] = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hyperplane {
    positive: (WordId, f64),
    negative: (WordId, f64),
}

impl Hyperplane {
    /// Returns `None` unless the coordinates differ, `positive_coef > 0`
    /// and `negative_coef < 0`.
    pub fn new(
        positive_word: WordId,
        positive_coef: f64,
        negative_word: WordId,
        negative_coef: f64,
    ) -> Option<Self> {
        (positive_word != negative_word && positive_coef > 0.0 && negative_coef < 0.0).then_some(
            Self {
                positive: (positive_word, positive_coef),
                negative: (negative_word, negative_coef),
            },
        )
    }

    pub fn positive(&self) -> (WordId, f64) {
        self.positive
    }

    pub fn negative(&self) -> (WordId, f64) {
        self.negative
    }

    /// Dot product with a binary vector: the sum of the coefficients whose
    /// coordinate is present.
    #[inline]
    pub fn dot(&self, vector: &SparseVector) -> f64 {
        let mut dot = 0.0;
        if vector.contains(self.negative.0) {
            dot += self.negative.1;
        }
        if vector.contains(self.positive.0) {
            dot += self.positive.1;
        }
        dot
    }

    /// Which side of the plane the point lies on. Points on the plane count
    /// as the positive side.
    #[inline]
    pub fn side(&self, vector: &SparseVector) -> bool {
        self.dot(vector) >= 0.0
    }
}

/// Cursor over a privately shuffled snapshot of the word sample.
///
/// Words skipped while looking for a distinct partner are deferred to the
/// tail and handed out again once the snapshot is exhausted.
#[derive(Debug)]
struct WordCursor {
    snapshot: Vec<WordId>,
    position: usize,
    deferred: VecDeque<WordId>,
}

impl WordCursor {
    fn next(&mut self) -> Option<WordId> {
        if let Some(&word) = self.snapshot.get(self.position) {
            self.position += 1;
            Some(word)
        } else {
            self.deferred.pop_front()
        }
    }

    fn defer(&mut self, word: WordId) {
        self.deferred.push_back(word);
    }

    fn remaining(&self) -> usize {
        self.snapshot.len() - self.position + self.deferred.len()
    }
}

/// Draws hyperplanes for one hash table.
#[derive(Debug)]
pub struct PlaneSampler {
    cursor: WordCursor,
    rng: StdRng,
}

impl PlaneSampler {
    /// Shuffle a private copy of `word_sample` with a generator seeded by `seed`.
    pub fn new(word_sample: &[WordId], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut snapshot = word_sample.to_vec();
        snapshot.shuffle(&mut rng);

        Self {
            cursor: WordCursor {
                snapshot,
                position: 0,
                deferred: VecDeque::new(),
            },
            rng,
        }
    }

    /// Draw `count` hyperplanes, or fail without returning any of them.
    pub fn sample(&mut self, count: usize) -> Result<Vec<Hyperplane>> {
        let mut planes = Vec::with_capacity(count);
        while planes.len() < count {
            match self.next_plane() {
                Some(plane) => planes.push(plane),
                None => {
                    return Err(DetectorError::InsufficientVocabulary {
                        requested: count,
                        built: planes.len(),
                    })
                }
            }
        }
        Ok(planes)
    }

    fn next_plane(&mut self) -> Option<Hyperplane> {
        let (first, second) = self.next_distinct_pair()?;
        let negative_coef = -self.positive_unit();
        let positive_coef = self.positive_unit();
        Hyperplane::new(second, positive_coef, first, negative_coef)
    }

    /// Consume two distinct words. A partner equal to `first` goes to the
    /// back of the line; giving up once every remaining word was tried.
    fn next_distinct_pair(&mut self) -> Option<(WordId, WordId)> {
        let first = self.cursor.next()?;
        for _ in 0..self.cursor.remaining() {
            let second = self.cursor.next()?;
            if second != first {
                return Some((first, second));
            }
            self.cursor.defer(second);
        }
        None
    }

    /// Uniform draw from (0, 1).
    fn positive_unit(&mut self) -> f64 {
        loop {
            let value: f64 = self.rng.gen();
            if value > 0.0 {
                return value;
            }
        }
    }
}
