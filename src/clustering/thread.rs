//! Topic threads: items believed to discuss the same topic, identified by
//! the earliest item that introduced it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::vector::{ItemId, SparseVector, WordId};

/// A growing cluster of items rooted at its founding item.
///
/// The founder is not a member and contributes no words; `size` counts it.
#[derive(Clone, Debug)]
pub struct TopicThread {
    parent: ItemId,
    members: HashSet<ItemId>,
    size: usize,
    word_counts: HashMap<WordId, usize>,
    total_words: usize,
    join_distances: Option<HashMap<ItemId, f64>>,
}

impl TopicThread {
    /// Start a thread founded by `parent`.
    pub fn new(parent: ItemId) -> Self {
        Self {
            parent,
            members: HashSet::new(),
            size: 1,
            word_counts: HashMap::new(),
            total_words: 0,
            join_distances: None,
        }
    }

    /// Start a thread that also remembers how far each member was from its
    /// nearest neighbor when it joined.
    pub fn with_join_audit(parent: ItemId) -> Self {
        Self {
            join_distances: Some(HashMap::new()),
            ..Self::new(parent)
        }
    }

    /// Add a member and fold its words into the histogram.
    pub fn add(&mut self, item: ItemId, words: &SparseVector, distance: f64) {
        self.members.insert(item);
        self.size += 1;
        self.total_words += words.len();
        for word in words.iter() {
            *self.word_counts.entry(word).or_default() += 1;
        }
        if let Some(audit) = &mut self.join_distances {
            audit.insert(item, distance);
        }
    }

    pub fn parent(&self) -> ItemId {
        self.parent
    }

    /// Founder plus members.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Members in no particular order (the founder excluded).
    pub fn members(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.members.iter().copied()
    }

    pub fn contains(&self, item: ItemId) -> bool {
        item == self.parent || self.members.contains(&item)
    }

    pub fn total_words(&self) -> usize {
        self.total_words
    }

    pub fn distinct_words(&self) -> usize {
        self.word_counts.len()
    }

    pub fn word_count(&self, word: WordId) -> usize {
        self.word_counts.get(&word).copied().unwrap_or(0)
    }

    /// Distance at which `item` joined, when the audit is on.
    pub fn join_distance(&self, item: ItemId) -> Option<f64> {
        self.join_distances.as_ref()?.get(&item).copied()
    }

    /// Shannon entropy (natural log) of the word histogram.
    ///
    /// Low entropy means the members keep repeating the same few words,
    /// which is typical of spam and templated posts. A thread with no words
    /// yet has entropy 0.
    pub fn entropy(&self) -> f64 {
        if self.total_words == 0 {
            return 0.0;
        }
        let total = self.total_words as f64;
        self.word_counts
            .values()
            .map(|&count| {
                let p = count as f64 / total;
                -p * p.ln()
            })
            .sum()
    }

    /// Owned snapshot for reporting.
    pub fn summary(&self) -> ThreadSummary {
        let mut members: Vec<ItemId> = self.members().collect();
        members.sort_unstable();
        ThreadSummary {
            parent: self.parent,
            size: self.size,
            entropy: self.entropy(),
            members,
        }
    }
}

/// Detached copy of a thread's reportable state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub parent: ItemId,
    pub size: usize,
    pub entropy: f64,
    /// Member IDs, ascending
    pub members: Vec<ItemId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(words: &[WordId]) -> SparseVector {
        SparseVector::new(words.iter().copied())
    }

    #[test]
    fn test_new_thread() {
        let thread = TopicThread::new(7);
        assert_eq!(thread.parent(), 7);
        assert_eq!(thread.size(), 1);
        assert_eq!(thread.members().count(), 0);
        assert_eq!(thread.total_words(), 0);
        assert_eq!(thread.entropy(), 0.0);
        assert!(thread.contains(7));
    }

    #[test]
    fn test_add_updates_histogram() {
        let mut thread = TopicThread::new(1);
        thread.add(2, &v(&[10, 11]), 0.1);
        thread.add(3, &v(&[10, 12, 13]), 0.2);

        assert_eq!(thread.size(), 3);
        assert!(thread.contains(3));
        assert!(!thread.contains(4));
        assert_eq!(thread.total_words(), 5);
        assert_eq!(thread.distinct_words(), 4);
        assert_eq!(thread.word_count(10), 2);
        assert_eq!(thread.word_count(99), 0);

        let counted: usize = [10, 11, 12, 13].iter().map(|w| thread.word_count(*w)).sum();
        assert_eq!(counted, thread.total_words());
    }

    #[test]
    fn test_entropy_single_word_is_zero() {
        let mut thread = TopicThread::new(1);
        thread.add(2, &v(&[5]), 0.0);
        thread.add(3, &v(&[5]), 0.0);
        assert_eq!(thread.entropy(), 0.0);
    }

    #[test]
    fn test_entropy_uniform_histogram() {
        let mut thread = TopicThread::new(1);
        thread.add(2, &v(&[1, 2, 3, 4]), 0.0);
        assert!((thread.entropy() - 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_join_audit_off_by_default() {
        let mut thread = TopicThread::new(1);
        thread.add(2, &v(&[1]), 0.4);
        assert_eq!(thread.join_distance(2), None);

        let mut audited = TopicThread::with_join_audit(1);
        audited.add(2, &v(&[1]), 0.4);
        assert_eq!(audited.join_distance(2), Some(0.4));
        assert_eq!(audited.join_distance(3), None);
    }

    #[test]
    fn test_summary_sorts_members() {
        let mut thread = TopicThread::new(1);
        for id in [9, 4, 6] {
            thread.add(id, &v(&[1, 2]), 0.0);
        }
        let summary = thread.summary();
        assert_eq!(summary.parent, 1);
        assert_eq!(summary.size, 4);
        assert_eq!(summary.members, vec![4, 6, 9]);
        assert!((summary.entropy - 2f64.ln()).abs() < 1e-12);
    }
}
