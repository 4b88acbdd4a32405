//! Configuration for the lending pool and its backends.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pool-wide knobs shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of items in the pool; records are numbered `1..=pool_size`.
    /// Default: 21
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// How many activity entries a backend keeps. Older entries are pruned
    /// on append.
    /// Default: 50
    #[serde(default = "default_activity_window")]
    pub activity_window: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            activity_window: default_activity_window(),
        }
    }
}

fn default_pool_size() -> u32 {
    21
}

fn default_activity_window() -> usize {
    50
}

/// Configuration for the relational (SQLite) adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,

    /// Enable WAL mode.
    /// Default: true
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// SQLite synchronous mode.
    #[serde(default)]
    pub synchronous: SynchronousMode,

    /// SQLite cache size (in pages, negative = KB).
    /// Default: -64000 (64MB)
    #[serde(default = "default_cache_size")]
    pub cache_size: i32,
}

impl RelationalConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            wal_mode: default_wal_mode(),
            synchronous: SynchronousMode::default(),
            cache_size: default_cache_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SynchronousMode {
    /// Full fsync (safest, slowest)
    Full,
    /// fsync at critical moments (good balance)
    #[default]
    Normal,
    /// No fsync (fastest, least safe)
    Off,
}

fn default_wal_mode() -> bool {
    true
}

fn default_cache_size() -> i32 {
    -64000 // 64MB
}
