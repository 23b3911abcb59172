//! Ensemble of independent LSH tables.
//!
//! Every insert goes to all tables; each table answers with the closest
//! item from the bucket the new item landed in, and the ensemble keeps the
//! smallest distance. Independent tables lower the chance that one unlucky
//! partition hides a close neighbor.
//!
//! Table `i` is seeded with `derive_table_seed(run_seed, i)`, so tables can be
//! built in any order (or in parallel) and still reproduce exactly.

use rayon::prelude::*;
use rayon::ThreadPool;
use sha2::{Digest, Sha256};

use super::hash_table::{HashTable, NearestNeighbor};
use crate::config::{LshConfig, PerformanceConfig};
use crate::error::{DetectorError, Result};
use crate::vector::{ItemId, SparseVector, WordId};

/// Seed for table `table_index` of a run seeded with `run_seed`.
pub fn derive_table_seed(run_seed: u64, table_index: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"firststory-table");
    hasher.update(run_seed.to_le_bytes());
    hasher.update((table_index as u64).to_le_bytes());
    let digest = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed)
}

/// Occupancy summary across all tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub tables: usize,
    pub hyperplanes_per_table: usize,
    pub buckets: usize,
    pub entries: usize,
    pub largest_bucket: usize,
}

/// Fixed set of independently seeded [`HashTable`]s.
pub struct LshIndex {
    tables: Vec<HashTable>,
    pool: Option<ThreadPool>,
}

impl LshIndex {
    /// Build `num_tables` tables sequentially.
    pub fn new(
        num_tables: usize,
        num_hyperplanes: usize,
        bucket_capacity: usize,
        word_sample: &[WordId],
        seed: u64,
    ) -> Result<Self> {
        let lsh = LshConfig {
            num_tables,
            num_hyperplanes,
            bucket_capacity,
            seed,
        };
        Self::build(&lsh, word_sample, None)
    }

    /// Build from config. With `parallel_tables`, tables are built and
    /// searched on a dedicated rayon pool.
    pub fn from_config(
        lsh: &LshConfig,
        performance: &PerformanceConfig,
        word_sample: &[WordId],
    ) -> Result<Self> {
        if !performance.parallel_tables {
            return Self::build(lsh, word_sample, None);
        }

        let threads = match performance.num_threads {
            0 => num_cpus::get(),
            n => n,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("lsh-table-{i}"))
            .build()
            .map_err(|e| DetectorError::ThreadPool(e.to_string()))?;

        Self::build(lsh, word_sample, Some(pool))
    }

    fn build(lsh: &LshConfig, word_sample: &[WordId], pool: Option<ThreadPool>) -> Result<Self> {
        if lsh.num_tables == 0 {
            return Err(DetectorError::InvalidParameter(
                "num_tables must be at least 1".to_string(),
            ));
        }

        let build_table = |i: usize| {
            HashTable::new(
                lsh.num_hyperplanes,
                lsh.bucket_capacity,
                word_sample,
                derive_table_seed(lsh.seed, i),
            )
        };
        let tables = match &pool {
            Some(pool) => pool.install(|| {
                (0..lsh.num_tables)
                    .into_par_iter()
                    .map(build_table)
                    .collect::<Result<Vec<_>>>()
            })?,
            None => (0..lsh.num_tables)
                .map(build_table)
                .collect::<Result<Vec<_>>>()?,
        };

        tracing::info!(
            tables = lsh.num_tables,
            hyperplanes = lsh.num_hyperplanes,
            bucket_capacity = lsh.bucket_capacity,
            sample_len = word_sample.len(),
            threads = pool.as_ref().map_or(1, ThreadPool::current_num_threads),
            "lsh_index_built"
        );

        Ok(Self { tables, pool })
    }

    /// Insert into every table and return the best neighbor any of them
    /// found. On equal distances the lower table index wins.
    pub fn insert(&mut self, item: ItemId, vector: &SparseVector) -> Result<NearestNeighbor> {
        if vector.is_empty() {
            return Err(DetectorError::EmptyVector(item));
        }

        let candidates = match &self.pool {
            Some(pool) => {
                let tables = &mut self.tables;
                pool.install(|| {
                    tables
                        .par_iter_mut()
                        .map(|table| table.insert_and_search(item, vector))
                        .collect::<Result<Vec<_>>>()
                })?
            }
            None => self
                .tables
                .iter_mut()
                .map(|table| table.insert_and_search(item, vector))
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(closest(item, candidates))
    }

    pub fn tables(&self) -> &[HashTable] {
        &self.tables
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            tables: self.tables.len(),
            hyperplanes_per_table: self.tables.first().map_or(0, |t| t.hyperplanes().len()),
            buckets: self.tables.iter().map(HashTable::bucket_count).sum(),
            entries: self.tables.iter().map(HashTable::len).sum(),
            largest_bucket: self
                .tables
                .iter()
                .map(HashTable::largest_bucket)
                .max()
                .unwrap_or(0),
        }
    }
}

impl std::fmt::Debug for LshIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LshIndex")
            .field("tables", &self.tables.len())
            .field("parallel", &self.is_parallel())
            .finish()
    }
}

/// First strict minimum in table order.
fn closest(item: ItemId, candidates: Vec<NearestNeighbor>) -> NearestNeighbor {
    candidates
        .into_iter()
        .fold(NearestNeighbor::none(item), |best, candidate| {
            if candidate.distance < best.distance {
                candidate
            } else {
                best
            }
        })
}
