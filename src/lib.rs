//! # First Story Detection
//!
//! Streaming detection of new topics ("first stories") in a sequence of short
//! documents. Each document arrives as a set of word IDs; it is hashed into an
//! ensemble of random-hyperplane LSH tables, its approximate nearest earlier
//! neighbor is found by cosine distance, and it either joins that neighbor's
//! thread or founds a new one.
//!
//! ## Pipeline
//!
//! ```text
//! raw text
//!     ↓
//! [Encoder]                  → EncodedItem + word occurrence sample
//!     ↓
//! [PlaneSampler]             → frequency-biased two-word hyperplanes
//!     ↓
//! [LshIndex]                 → one HashTable per seed, nearest earlier item
//!     ↓
//! [StreamingClusterer]       → join or found a TopicThread
//!     ↓
//! [TopKSelector]             → largest threads above size/entropy cutoffs
//! ```
//!
//! ## Usage
//!
//! ```
//! use firststory::{Config, SizeOrder, SparseVector, StreamingClusterer, TopKSelector};
//!
//! let mut config = Config::default();
//! config.lsh.num_tables = 4;
//! config.lsh.num_hyperplanes = 8;
//! config.performance.parallel_tables = false;
//!
//! let sample: Vec<u32> = (0..20).collect();
//! let mut detector = StreamingClusterer::from_config(&config, &sample).unwrap();
//!
//! let first = detector.process(1, &SparseVector::new([1, 2, 3])).unwrap();
//! assert!(first.is_novel());
//! let second = detector.process(2, &SparseVector::new([1, 2, 3])).unwrap();
//! assert_eq!(second.parent, 1);
//!
//! let top = TopKSelector::unfiltered(1).select(detector.threads(), SizeOrder::Largest);
//! assert_eq!(top[0].size(), 2);
//! ```

pub mod clustering;
pub mod config;
pub mod encoder;
pub mod error;
pub mod lsh;
pub mod selection;
pub mod vector;

pub use clustering::{Assignment, Outcome, StreamingClusterer, ThreadSummary, TopicThread};
pub use config::Config;
pub use encoder::{EncodedItem, Encoder};
pub use error::{DetectorError, Result};
pub use lsh::{HashTable, LshIndex, NearestNeighbor};
pub use selection::{RankedThread, SizeOrder, TopKSelector};
pub use vector::{cosine_distance, ItemId, SparseVector, WordId};
