//! Runtime configuration
//!
//! Defaults first, then environment overrides, then whatever the CLI passes
//! explicitly.

use std::path::PathBuf;
use std::time::Duration;

use crate::change::HASH_BATCH_SIZE;
use crate::dual_write::DEFAULT_BATCH_THRESHOLD;

/// Data directory used when nothing else is configured
pub const DEFAULT_DATA_DIR: &str = ".graphvault";

pub const ENV_DATA_DIR: &str = "GRAPHVAULT_DATA_DIR";
pub const ENV_BATCH_THRESHOLD: &str = "GRAPHVAULT_BATCH_THRESHOLD";
pub const ENV_SECONDARY_DB: &str = "GRAPHVAULT_SECONDARY_DB";

/// Limits of one response cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLimits {
    /// Maximum number of entries
    pub capacity: usize,
    /// Maximum summed payload size in bytes (None = entry count only)
    pub max_bytes: Option<usize>,
    /// Age after which an entry reads as a miss
    pub ttl: Duration,
}

/// Settings of both response caches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCacheConfig {
    pub content: CacheLimits,
    pub listings: CacheLimits,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            content: CacheLimits {
                capacity: 500,
                max_bytes: Some(50 * 1024 * 1024),
                ttl: Duration::from_secs(5 * 60),
            },
            listings: CacheLimits {
                capacity: 200,
                max_bytes: None,
                ttl: Duration::from_secs(2 * 60),
            },
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct GraphVaultConfig {
    /// Root of the version store (index.json + graphs/)
    pub data_dir: PathBuf,
    /// Buffered secondary writes that trigger an auto-flush
    pub batch_threshold: usize,
    /// Files hashed per batch by the change detector
    pub hash_batch_size: usize,
    /// Optional SQLite file used as the secondary store
    pub secondary_db: Option<PathBuf>,
    pub cache: ResponseCacheConfig,
}

impl Default for GraphVaultConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            hash_batch_size: HASH_BATCH_SIZE,
            secondary_db: None,
            cache: ResponseCacheConfig::default(),
        }
    }
}

impl GraphVaultConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production)
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_BATCH_THRESHOLD) {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.batch_threshold = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid {}", ENV_BATCH_THRESHOLD),
            }
        }
        if let Some(db) = lookup(ENV_SECONDARY_DB).filter(|v| !v.is_empty()) {
            self.secondary_db = Some(PathBuf::from(db));
        }
        self
    }
}
