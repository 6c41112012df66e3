//! # hotcache
//!
//! Thread-safe LRU cache with capacity and idle-time eviction.
//!
//! ## Architecture
//! - **HashMap**: AHash index from key to list slot (O(1))
//! - **LRU List**: Slot-arena doubly-linked list, head = least recently used,
//!   tail = most recently used (O(1) move and evict)
//! - **Expiry**: Each entry records its last access; lookups past the TTL
//!   evict the entry inline and report a miss
//!
//! ```
//! use std::time::Duration;
//! use hotcache::HotCache;
//!
//! let cache = HotCache::new(2, Duration::from_secs(30));
//! cache.set("a", 1);
//! cache.set("b", 2);
//! cache.get(&"a");
//! cache.set("c", 3); // evicts "b"
//!
//! assert_eq!(cache.get(&"b"), None);
//! assert_eq!(cache.get(&"a"), Some(1));
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod lru;
mod stats;

pub use cache::HotCache;
pub use config::{CacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_MS};
pub use lru::LruCache;
pub use stats::CacheStats;
