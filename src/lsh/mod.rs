//! Cosine LSH over sparse binary vectors.
//!
//! ```text
//! LshIndex
//!   `-- Vec<HashTable>            (one derived seed each)
//!         |-- Vec<Hyperplane>     (PlaneSampler, frequency biased)
//!         `-- Signature -> capped FIFO bucket
//! ```
//!
//! Two items that fall on the same side of every hyperplane share a bucket,
//! and the probability of that grows as the angle between them shrinks.
//! Only bucket-mates are compared exactly, so the answer is approximate:
//! a true nearest neighbor can be hashed apart or evicted.

pub mod ensemble;
pub mod hash_table;
pub mod sampler;

pub use ensemble::{derive_table_seed, IndexStats, LshIndex};
pub use hash_table::{HashTable, NearestNeighbor, Signature};
pub use sampler::{Hyperplane, PlaneSampler};
