//! Cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Default idle time before an entry expires (60 s)
pub const DEFAULT_TTL_MS: u64 = 60_000;

/// Construction parameters for a [`HotCache`](crate::HotCache)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of resident entries; 0 keeps the cache empty
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Idle time in milliseconds after which an entry is treated as absent
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_ttl_ms() -> u64 {
    DEFAULT_TTL_MS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_ms: default_ttl_ms(),
        }
    }
}

impl CacheConfig {
    /// Config with explicit limits
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Idle time as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}
