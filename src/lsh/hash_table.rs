//! Single LSH table: one fixed hyperplane set and capped FIFO buckets keyed
//! by signature.
//!
//! # Architecture
//!
//! ```text
//! HashTable
//!   |-- Vec<Hyperplane>                      (fixed at construction)
//!   `-- HashMap<Signature, Bucket>
//!         `-- VecDeque<(ItemId, SparseVector)>  (oldest at the front)
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use super::sampler::{Hyperplane, PlaneSampler};
use crate::error::{DetectorError, Result};
use crate::vector::{cosine_distance, ItemId, SparseVector, WordId};

/// One bit per hyperplane, packed little-endian into 64-bit words.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    bits: Vec<u64>,
    len: usize,
}

impl Signature {
    fn with_len(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(64)],
            len,
        }
    }

    fn set(&mut self, index: usize) {
        self.bits[index / 64] |= 1 << (index % 64);
    }

    /// Number of bits (hyperplanes).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        (index < self.len).then(|| self.bits[index / 64] & (1 << (index % 64)) != 0)
    }

    pub fn count_ones(&self) -> u32 {
        self.bits.iter().map(|word| word.count_ones()).sum()
    }
}

/// Nearest neighbor of an item as estimated by one or more tables.
///
/// `neighbor` is `None` exactly when `distance` is infinite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestNeighbor {
    pub item: ItemId,
    pub neighbor: Option<ItemId>,
    pub distance: f64,
}

impl NearestNeighbor {
    /// Sentinel for "no other item shared the bucket".
    pub fn none(item: ItemId) -> Self {
        Self {
            item,
            neighbor: None,
            distance: f64::INFINITY,
        }
    }

    pub fn is_found(&self) -> bool {
        self.neighbor.is_some()
    }
}

type Bucket = VecDeque<(ItemId, SparseVector)>;

/// Random-hyperplane hash table over binary vectors.
#[derive(Debug)]
pub struct HashTable {
    hyperplanes: Vec<Hyperplane>,
    buckets: HashMap<Signature, Bucket>,
    bucket_capacity: usize,
}

impl HashTable {
    /// Build a table whose hyperplanes are drawn from `word_sample` with the
    /// given seed. Deterministic in `seed`.
    pub fn new(
        num_hyperplanes: usize,
        bucket_capacity: usize,
        word_sample: &[WordId],
        seed: u64,
    ) -> Result<Self> {
        if num_hyperplanes == 0 {
            return Err(DetectorError::InvalidParameter(
                "num_hyperplanes must be at least 1".to_string(),
            ));
        }
        if bucket_capacity == 0 {
            return Err(DetectorError::InvalidParameter(
                "bucket_capacity must be at least 1".to_string(),
            ));
        }

        let hyperplanes = PlaneSampler::new(word_sample, seed).sample(num_hyperplanes)?;
        Ok(Self::with_hyperplanes(hyperplanes, bucket_capacity))
    }

    /// Build a table from explicit hyperplanes.
    pub fn with_hyperplanes(hyperplanes: Vec<Hyperplane>, bucket_capacity: usize) -> Self {
        Self {
            hyperplanes,
            buckets: HashMap::new(),
            bucket_capacity: bucket_capacity.max(1),
        }
    }

    /// Record which side of every hyperplane `vector` lies on.
    pub fn signature(&self, vector: &SparseVector) -> Signature {
        let mut signature = Signature::with_len(self.hyperplanes.len());
        for (i, plane) in self.hyperplanes.iter().enumerate() {
            if plane.side(vector) {
                signature.set(i);
            }
        }
        signature
    }

    /// Append the item to its bucket, evicting the oldest entry when the
    /// bucket is over capacity. Returns the signature used as the key.
    pub fn insert(&mut self, item: ItemId, vector: &SparseVector) -> Signature {
        let signature = self.signature(vector);
        let bucket = self.buckets.entry(signature.clone()).or_default();
        bucket.push_back((item, vector.clone()));
        while bucket.len() > self.bucket_capacity {
            bucket.pop_front();
        }
        signature
    }

    /// Exact search inside the bucket for `signature`, skipping `item` itself.
    /// Earlier bucket entries win ties.
    pub fn nearest_neighbor(
        &self,
        item: ItemId,
        vector: &SparseVector,
        signature: &Signature,
    ) -> Result<NearestNeighbor> {
        let bucket = self
            .buckets
            .get(signature)
            .ok_or(DetectorError::UnknownSignature)?;

        let mut best = NearestNeighbor::none(item);
        for (candidate, words) in bucket {
            if *candidate == item {
                continue;
            }
            let distance = cosine_distance(item, vector, words)?;
            if distance < best.distance {
                best = NearestNeighbor {
                    item,
                    neighbor: Some(*candidate),
                    distance,
                };
            }
        }
        Ok(best)
    }

    /// Insert, then search the bucket the item landed in.
    pub fn insert_and_search(
        &mut self,
        item: ItemId,
        vector: &SparseVector,
    ) -> Result<NearestNeighbor> {
        let signature = self.insert(item, vector);
        self.nearest_neighbor(item, vector, &signature)
    }

    /// Item IDs in one bucket, oldest first.
    pub fn bucket_items(&self, signature: &Signature) -> Option<Vec<ItemId>> {
        self.buckets
            .get(signature)
            .map(|bucket| bucket.iter().map(|(id, _)| *id).collect())
    }

    /// Item-ID sets of every bucket.
    pub fn buckets(&self) -> Vec<HashSet<ItemId>> {
        self.buckets
            .values()
            .map(|bucket| bucket.iter().map(|(id, _)| *id).collect())
            .collect()
    }

    pub fn hyperplanes(&self) -> &[Hyperplane] {
        &self.hyperplanes
    }

    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Entries currently held across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn largest_bucket(&self) -> usize {
        self.buckets.values().map(VecDeque::len).max().unwrap_or(0)
    }
}
