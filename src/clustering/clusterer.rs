//! Streaming thread assignment.
//!
//! Items must arrive in stream order. Each item is inserted into the LSH
//! index first, so its neighbor can only be an item seen earlier; that is
//! what makes a thread's founder the earliest item on its topic.
//!
//! ```text
//! (item, words) -> LshIndex::insert -> NearestNeighbor
//!                                        |
//!            distance > threshold or none | otherwise
//!                   v                     v
//!            found new thread      join neighbor's thread
//!                   \                     /
//!                    item -> parent index
//! ```

use std::collections::HashMap;

use super::thread::TopicThread;
use crate::config::{ClusteringConfig, Config};
use crate::error::{DetectorError, Result};
use crate::lsh::{IndexStats, LshIndex};
use crate::vector::{ItemId, SparseVector, WordId};

/// What happened to one item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    /// The item started a new thread.
    Founded,
    /// The item joined the thread of its nearest neighbor.
    Joined { neighbor: ItemId },
}

/// Routing decision for one item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assignment {
    pub item: ItemId,
    /// Founder of the thread the item now belongs to
    pub parent: ItemId,
    pub outcome: Outcome,
    /// Distance to the nearest neighbor, infinite when none was found
    pub distance: f64,
}

impl Assignment {
    pub fn is_novel(&self) -> bool {
        matches!(self.outcome, Outcome::Founded)
    }
}

/// Threads keyed by founder plus the item -> founder index.
///
/// Both maps grow for the lifetime of one streaming run and are dropped
/// with it.
#[derive(Debug, Default)]
pub struct ThreadStore {
    threads: HashMap<ItemId, TopicThread>,
    parents: HashMap<ItemId, ItemId>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `thread` and map its founder to itself.
    pub fn found(&mut self, thread: TopicThread) {
        let parent = thread.parent();
        self.parents.insert(parent, parent);
        self.threads.insert(parent, thread);
    }

    /// Add `item` to the thread that `neighbor` belongs to. Returns the
    /// thread's founder, or `None` if `neighbor` was never routed.
    pub fn join(
        &mut self,
        item: ItemId,
        neighbor: ItemId,
        words: &SparseVector,
        distance: f64,
    ) -> Option<ItemId> {
        let parent = *self.parents.get(&neighbor)?;
        let thread = self.threads.get_mut(&parent)?;
        thread.add(item, words, distance);
        self.parents.insert(item, parent);
        Some(parent)
    }

    /// Founder of the thread `item` belongs to.
    pub fn parent_of(&self, item: ItemId) -> Option<ItemId> {
        self.parents.get(&item).copied()
    }

    pub fn get(&self, parent: ItemId) -> Option<&TopicThread> {
        self.threads.get(&parent)
    }

    /// Thread containing `item`.
    pub fn thread_of(&self, item: ItemId) -> Option<&TopicThread> {
        self.parent_of(item).and_then(|parent| self.get(parent))
    }

    pub fn contains_item(&self, item: ItemId) -> bool {
        self.parents.contains_key(&item)
    }

    pub fn threads(&self) -> impl Iterator<Item = &TopicThread> {
        self.threads.values()
    }

    /// Number of threads.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Number of items routed so far.
    pub fn item_count(&self) -> usize {
        self.parents.len()
    }
}

/// Online first story detector: an LSH index plus the thread store it feeds.
#[derive(Debug)]
pub struct StreamingClusterer {
    index: LshIndex,
    store: ThreadStore,
    config: ClusteringConfig,
}

impl StreamingClusterer {
    pub fn new(index: LshIndex, config: ClusteringConfig) -> Self {
        Self {
            index,
            store: ThreadStore::new(),
            config,
        }
    }

    /// Validate `config` and build the index from `word_sample`.
    pub fn from_config(config: &Config, word_sample: &[WordId]) -> Result<Self> {
        config.validate()?;
        let index = LshIndex::from_config(&config.lsh, &config.performance, word_sample)?;
        Ok(Self::new(index, config.clustering.clone()))
    }

    /// Route the next item of the stream.
    ///
    /// Empty and already-seen items are rejected before touching the index.
    pub fn process(&mut self, item: ItemId, words: &SparseVector) -> Result<Assignment> {
        if words.is_empty() {
            return Err(DetectorError::EmptyVector(item));
        }
        if self.store.contains_item(item) {
            return Err(DetectorError::DuplicateItem(item));
        }

        let nearest = self.index.insert(item, words)?;

        let assignment = match nearest.neighbor {
            Some(neighbor) if nearest.distance <= self.config.novelty_threshold => {
                let parent = self
                    .store
                    .join(item, neighbor, words, nearest.distance)
                    .ok_or(DetectorError::OrphanNeighbor { item, neighbor })?;
                tracing::debug!(
                    item,
                    neighbor,
                    parent,
                    distance = nearest.distance,
                    "item_joined_thread"
                );
                Assignment {
                    item,
                    parent,
                    outcome: Outcome::Joined { neighbor },
                    distance: nearest.distance,
                }
            }
            _ => {
                let thread = if self.config.record_join_distances {
                    TopicThread::with_join_audit(item)
                } else {
                    TopicThread::new(item)
                };
                self.store.found(thread);
                tracing::debug!(item, distance = nearest.distance, "thread_founded");
                Assignment {
                    item,
                    parent: item,
                    outcome: Outcome::Founded,
                    distance: nearest.distance,
                }
            }
        };

        Ok(assignment)
    }

    pub fn store(&self) -> &ThreadStore {
        &self.store
    }

    pub fn threads(&self) -> impl Iterator<Item = &TopicThread> {
        self.store.threads()
    }

    pub fn index(&self) -> &LshIndex {
        &self.index
    }

    pub fn index_stats(&self) -> IndexStats {
        self.index.stats()
    }

    pub fn novelty_threshold(&self) -> f64 {
        self.config.novelty_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(words: &[WordId]) -> SparseVector {
        SparseVector::new(words.iter().copied())
    }

    fn clusterer(record_join_distances: bool) -> StreamingClusterer {
        let sample: Vec<WordId> = (0..40).cycle().take(800).collect();
        let index = LshIndex::new(4, 10, 20, &sample, 2015).unwrap();
        StreamingClusterer::new(
            index,
            ClusteringConfig {
                novelty_threshold: 0.75,
                record_join_distances,
            },
        )
    }

    #[test]
    fn test_first_item_founds_thread() {
        let mut c = clusterer(false);
        let a = c.process(1, &v(&[1, 2])).unwrap();
        assert!(a.is_novel());
        assert_eq!(a.parent, 1);
        assert!(a.distance.is_infinite());
        assert_eq!(c.store().parent_of(1), Some(1));
    }

    #[test]
    fn test_identical_item_joins() {
        let mut c = clusterer(false);
        c.process(1, &v(&[1, 2])).unwrap();
        let a = c.process(2, &v(&[1, 2])).unwrap();
        assert_eq!(a.outcome, Outcome::Joined { neighbor: 1 });
        assert_eq!(a.parent, 1);
        assert_eq!(c.store().get(1).unwrap().size(), 2);
        assert_eq!(c.store().thread_of(2).unwrap().parent(), 1);
    }

    #[test]
    fn test_join_follows_neighbor_to_its_founder() {
        let mut c = clusterer(false);
        c.process(1, &v(&[1, 2, 3])).unwrap();
        c.process(2, &v(&[1, 2, 3])).unwrap();
        // Nearest is whichever of 1 or 2 the tables surface; both map to 1.
        let a = c.process(3, &v(&[1, 2, 3])).unwrap();
        assert_eq!(a.parent, 1);
        assert_eq!(c.store().get(1).unwrap().size(), 3);
        assert_eq!(c.store().len(), 1);
        assert_eq!(c.store().item_count(), 3);
    }

    #[test]
    fn test_duplicate_item_rejected() {
        let mut c = clusterer(false);
        c.process(1, &v(&[1])).unwrap();
        assert_eq!(
            c.process(1, &v(&[1])).unwrap_err(),
            DetectorError::DuplicateItem(1)
        );
        assert_eq!(c.index_stats().entries, 4);
    }

    #[test]
    fn test_empty_item_rejected() {
        let mut c = clusterer(false);
        assert_eq!(
            c.process(1, &v(&[])).unwrap_err(),
            DetectorError::EmptyVector(1)
        );
        assert!(c.store().is_empty());
    }

    #[test]
    fn test_join_audit_records_distance() {
        let mut c = clusterer(true);
        c.process(1, &v(&[1, 2])).unwrap();
        c.process(2, &v(&[1, 2])).unwrap();
        assert_eq!(c.store().get(1).unwrap().join_distance(2), Some(0.0));
    }

    #[test]
    fn test_store_join_unknown_neighbor() {
        let mut store = ThreadStore::new();
        assert_eq!(store.join(2, 1, &v(&[1]), 0.0), None);
        store.found(TopicThread::new(1));
        assert_eq!(store.join(2, 1, &v(&[1]), 0.0), Some(1));
        assert_eq!(store.parent_of(2), Some(1));
    }
}
