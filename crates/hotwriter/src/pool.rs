//! Free-list of fixed-capacity byte buffers
//!
//! Buffers move between the pool, the writer's hot slot and the drain
//! thread by value, so a buffer only ever has one owner.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use crossbeam_queue::SegQueue;
use tracing::debug;

/// Counters describing pool traffic
#[derive(Debug, Default)]
pub struct PoolStats {
    allocated: AtomicU64,
    reused: AtomicU64,
    released: AtomicU64,
}

impl PoolStats {
    /// Buffers allocated because the free-list was empty
    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Buffers handed out from the free-list
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    /// Buffers put back on the free-list
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }
}

/// Unbounded pool of `BytesMut` buffers sharing one capacity
///
/// The pool never shrinks; a burst that keeps many buffers in flight leaves
/// them all on the free-list afterwards.
#[derive(Debug)]
pub struct BufferPool {
    free: SegQueue<BytesMut>,
    capacity: usize,
    stats: PoolStats,
}

impl BufferPool {
    /// Create an empty pool handing out buffers of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            free: SegQueue::new(),
            capacity,
            stats: PoolStats::default(),
        }
    }

    /// Take a buffer, allocating one if the free-list is empty
    pub fn acquire(&self) -> BytesMut {
        match self.free.pop() {
            Some(buf) => {
                self.stats.reused.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                let total = self.stats.allocated.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(capacity = self.capacity, total, "allocating pooled buffer");
                BytesMut::with_capacity(self.capacity)
            }
        }
    }

    /// Reset a buffer and return it to the free-list
    ///
    /// Buffers that lost capacity (for example after being split) are dropped
    /// instead of being pooled.
    pub fn release(&self, mut buf: BytesMut) {
        buf.clear();
        if buf.capacity() < self.capacity {
            return;
        }
        self.free.push(buf);
        self.stats.released.fetch_add(1, Ordering::Relaxed);
    }

    /// Capacity of buffers handed out by this pool
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffers currently waiting on the free-list
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    /// Pool traffic counters
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}
