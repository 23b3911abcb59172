//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (FIRSTSTORY_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [lsh]
//! num_tables = 25
//! num_hyperplanes = 200
//! bucket_capacity = 70
//!
//! [selection]
//! min_entropy = 2.7
//! min_size = 35
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! FIRSTSTORY_LSH__NUM_TABLES=10
//! FIRSTSTORY_CLUSTERING__NOVELTY_THRESHOLD=0.8
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{DetectorError, Result};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub lsh: LshConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hash table ensemble shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LshConfig {
    /// Number of independent hash tables
    #[serde(default = "default_num_tables")]
    pub num_tables: usize,

    /// Hyperplanes (signature bits) per table
    #[serde(default = "default_num_hyperplanes")]
    pub num_hyperplanes: usize,

    /// Maximum items kept per signature bucket; the oldest is evicted first
    #[serde(default = "default_bucket_capacity")]
    pub bucket_capacity: usize,

    /// Run seed. Each table's seed is derived from this and its index.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Thread assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Distance (radians) above which an item founds a new thread
    #[serde(default = "default_novelty_threshold")]
    pub novelty_threshold: f64,

    /// Keep the distance at which every member joined its thread
    #[serde(default)]
    pub record_join_distances: bool,
}

/// Top thread reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Threads with lower word entropy are treated as spam
    #[serde(default = "default_min_entropy")]
    pub min_entropy: f64,

    /// Threads smaller than this are ignored
    #[serde(default = "default_min_size")]
    pub min_size: usize,

    /// Threads reported per set
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Threads kept on the leaderboard across all sets
    #[serde(default = "default_global_top_k")]
    pub global_top_k: usize,
}

/// Input streaming (driver only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Items per independent set. 0 = the whole input is one set.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Log progress every N items. 0 = disabled.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Member IDs printed per reported thread
    #[serde(default = "default_threads_shown")]
    pub threads_shown: usize,
}

/// Performance tuning options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Build and search tables on a worker pool
    #[serde(default = "default_true")]
    pub parallel_tables: bool,

    /// Number of worker threads for the table fan-out
    /// 0 = use all available CPU cores
    #[serde(default)]
    pub num_threads: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Append logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

// Default value functions
fn default_num_tables() -> usize {
    25
}
fn default_num_hyperplanes() -> usize {
    200
}
fn default_bucket_capacity() -> usize {
    70
}
fn default_seed() -> u64 {
    2015
}
fn default_novelty_threshold() -> f64 {
    0.75
}
fn default_min_entropy() -> f64 {
    2.7
}
fn default_min_size() -> usize {
    35
}
fn default_top_k() -> usize {
    10
}
fn default_global_top_k() -> usize {
    50
}
fn default_chunk_size() -> usize {
    100_000
}
fn default_progress_interval() -> usize {
    1000
}
fn default_threads_shown() -> usize {
    5
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. config.toml (base configuration)
    /// 2. config.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (FIRSTSTORY_* prefix)
    pub fn load() -> std::result::Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("FIRSTSTORY_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> std::result::Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FIRSTSTORY_").split("__"))
            .extract()
    }

    /// Reject values the index or selector cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid =
            |msg: &str| -> Result<()> { Err(DetectorError::InvalidParameter(msg.to_string())) };

        if self.lsh.num_tables == 0 {
            return invalid("lsh.num_tables must be at least 1");
        }
        if self.lsh.num_hyperplanes == 0 {
            return invalid("lsh.num_hyperplanes must be at least 1");
        }
        if self.lsh.bucket_capacity == 0 {
            return invalid("lsh.bucket_capacity must be at least 1");
        }
        if !(0.0..=PI).contains(&self.clustering.novelty_threshold) {
            return invalid("clustering.novelty_threshold must be within [0, pi]");
        }
        if self.selection.top_k == 0 {
            return invalid("selection.top_k must be at least 1");
        }
        if self.selection.global_top_k == 0 {
            return invalid("selection.global_top_k must be at least 1");
        }
        if self.selection.min_entropy.is_nan() {
            return invalid("selection.min_entropy must be a number");
        }
        Ok(())
    }
}

impl Default for LshConfig {
    fn default() -> Self {
        LshConfig {
            num_tables: default_num_tables(),
            num_hyperplanes: default_num_hyperplanes(),
            bucket_capacity: default_bucket_capacity(),
            seed: default_seed(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        ClusteringConfig {
            novelty_threshold: default_novelty_threshold(),
            record_join_distances: false,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            min_entropy: default_min_entropy(),
            min_size: default_min_size(),
            top_k: default_top_k(),
            global_top_k: default_global_top_k(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            chunk_size: default_chunk_size(),
            progress_interval: default_progress_interval(),
            threads_shown: default_threads_shown(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        PerformanceConfig {
            parallel_tables: true,
            num_threads: 0, // 0 = use all available CPU cores
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}
