//! Detector Error Types

use crate::vector::ItemId;
use thiserror::Error;

/// Errors raised by the LSH index, the clusterer and the record codec.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// The word sample ran out of distinct coordinate pairs while building
    /// hyperplanes. Retrying needs a larger sample.
    #[error(
        "Insufficient vocabulary: built {built} of {requested} hyperplanes before the word sample ran out of distinct pairs"
    )]
    InsufficientVocabulary { requested: usize, built: usize },

    /// A bucket was looked up for a signature that was never inserted.
    #[error("No bucket exists for the given signature")]
    UnknownSignature,

    /// Cosine distance is undefined for an item with no words.
    #[error("Item {0} has no words")]
    EmptyVector(ItemId),

    /// The item was already routed into a thread during this run.
    #[error("Item {0} was already processed")]
    DuplicateItem(ItemId),

    /// The index returned a neighbor that no thread knows about.
    #[error("Neighbor {neighbor} of item {item} belongs to no thread")]
    OrphanNeighbor { item: ItemId, neighbor: ItemId },

    /// Invalid parameter value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An encoded record line could not be parsed.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// The worker pool for table fan-out could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Result type for detector operations
pub type Result<T> = std::result::Result<T, DetectorError>;
