//! Online clustering of the item stream into topic threads.

pub mod clusterer;
pub mod thread;

pub use clusterer::{Assignment, Outcome, StreamingClusterer, ThreadStore};
pub use thread::{ThreadSummary, TopicThread};
