//! Double-buffered background writer
//!
//! The producer fills a hot buffer taken from a [`BufferPool`]. Full buffers
//! travel through a channel of depth [`QUEUE_DEPTH`] to a single drain thread,
//! which is the only code that touches the sink. Failures are latched into one
//! shared slot and reported from [`BufferedWriter::write`] and
//! [`BufferedWriter::wait_clean`]; nothing is retried.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::{BufMut, Bytes, BytesMut};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::config::WriterConfig;
use crate::error::{accumulate, Error, Result};
use crate::pool::{BufferPool, PoolStats};

/// Number of buffers that may wait for the drain thread at once
pub const QUEUE_DEPTH: usize = 2;

/// Bytes handed to the drain thread
enum Chunk {
    /// A pooled buffer, released back to the pool once written
    Pooled(BytesMut),
    /// A write too large for the pool, sent as-is
    Standalone(Bytes),
}

impl Chunk {
    fn as_slice(&self) -> &[u8] {
        match self {
            Chunk::Pooled(buf) => &buf[..],
            Chunk::Standalone(bytes) => &bytes[..],
        }
    }
}

enum Batch {
    Data(Chunk),
    Done,
}

/// Single-slot error holder; later failures are appended, never overwrite
#[derive(Debug, Default)]
struct ErrorCell(Mutex<Option<Error>>);

impl ErrorCell {
    fn latch(&self, err: Error) -> Error {
        let mut slot = self.0.lock();
        let combined = accumulate(slot.take(), err);
        *slot = Some(combined.clone());
        combined
    }

    fn is_set(&self) -> bool {
        self.0.lock().is_some()
    }

    fn take(&self) -> Option<Error> {
        self.0.lock().take()
    }
}

/// State shared between the producer and the drain thread
#[derive(Debug)]
struct Shared {
    pool: BufferPool,
    errors: ErrorCell,
    bytes_written: AtomicU64,
}

/// Buffered writer that batches small writes and drains them on a
/// background thread
///
/// `write` takes `&mut self`, so there is exactly one producer. Callers must
/// finish with [`wait_clean`](Self::wait_clean); dropping the writer instead
/// discards whatever is still in the hot buffer.
pub struct BufferedWriter<W> {
    hot: Option<BytesMut>,
    queue: Option<Sender<Batch>>,
    drain: Option<JoinHandle<W>>,
    shared: Arc<Shared>,
    capacity: usize,
    bytes_submitted: u64,
}

impl<W> BufferedWriter<W>
where
    W: Write + Send + 'static,
{
    /// Create a writer over `sink` with buffers of `buffer_capacity` bytes
    ///
    /// # Arguments
    /// * `sink` - Destination for all written bytes; never flushed or closed here
    /// * `buffer_capacity` - Target size of each batch, must be non-zero
    ///
    /// # Returns
    /// * `Result<BufferedWriter<W>>` - Writer with its drain thread running
    pub fn new(sink: W, buffer_capacity: usize) -> Result<Self> {
        Self::with_config(sink, WriterConfig::with_capacity(buffer_capacity))
    }

    /// Create a writer from a [`WriterConfig`]
    pub fn with_config(sink: W, config: WriterConfig) -> Result<Self> {
        config.validate()?;

        let capacity = config.buffer_capacity;
        let shared = Arc::new(Shared {
            pool: BufferPool::new(capacity),
            errors: ErrorCell::default(),
            bytes_written: AtomicU64::new(0),
        });
        let (tx, rx) = bounded(QUEUE_DEPTH);

        let drain_shared = Arc::clone(&shared);
        let drain = thread::Builder::new()
            .name("hotwriter-drain".into())
            .spawn(move || run_drain(sink, rx, drain_shared))
            .map_err(|e| Error::Spawn(Arc::new(e)))?;

        debug!(capacity, depth = QUEUE_DEPTH, "buffered writer started");

        Ok(Self {
            hot: None,
            queue: Some(tx),
            drain: Some(drain),
            shared,
            capacity,
            bytes_submitted: 0,
        })
    }

    /// Append `data` to the stream
    ///
    /// Blocks while both queue slots are occupied. Data at least as large as
    /// the buffer capacity skips the hot buffer and is queued on its own.
    /// A failure here is appended to any error already latched, and the
    /// combined error is returned.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.buffer(data)
            .map_err(|err| self.shared.errors.latch(err))
    }

    /// Flush the hot buffer, stop the drain thread and wait for it
    ///
    /// # Returns
    /// * `Result<W>` - The sink once every byte reached it, or the latched error
    pub fn wait_clean(mut self) -> Result<W> {
        if !self.shared.errors.is_set() {
            if let Err(err) = self.submit_hot() {
                self.shared.errors.latch(err);
            }
        }

        if let Some(queue) = self.queue.take() {
            // A dead drain thread has already latched its reason.
            let _ = queue.send(Batch::Done);
        }

        let sink = self.join_drain();
        match self.shared.errors.take() {
            Some(err) => Err(err),
            None => sink.ok_or(Error::Disconnected),
        }
    }

    fn buffer(&mut self, data: &[u8]) -> Result<()> {
        if data.len() >= self.capacity {
            self.submit_hot()?;
            return self.submit(Chunk::Standalone(Bytes::copy_from_slice(data)));
        }

        let used = self.hot.as_ref().map_or(0, BytesMut::len);
        if used + data.len() > self.capacity {
            self.submit_hot()?;
        }

        let pool = &self.shared.pool;
        self.hot
            .get_or_insert_with(|| pool.acquire())
            .put_slice(data);
        Ok(())
    }

    fn submit_hot(&mut self) -> Result<()> {
        match self.hot.take() {
            Some(buf) if !buf.is_empty() => self.submit(Chunk::Pooled(buf)),
            idle => {
                self.hot = idle;
                Ok(())
            }
        }
    }

    fn submit(&mut self, chunk: Chunk) -> Result<()> {
        let len = chunk.as_slice().len() as u64;
        let queue = self.queue.as_ref().ok_or(Error::Disconnected)?;
        queue
            .send(Batch::Data(chunk))
            .map_err(|_| Error::Disconnected)?;
        self.bytes_submitted += len;
        Ok(())
    }

    fn join_drain(&mut self) -> Option<W> {
        let handle = self.drain.take()?;
        match handle.join() {
            Ok(sink) => Some(sink),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(%reason, "drain thread died outside its guard");
                self.shared.errors.latch(Error::DrainPanicked(reason));
                None
            }
        }
    }
}

impl<W> BufferedWriter<W> {
    /// Target buffer capacity in bytes
    pub fn buffer_capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes accepted onto the drain queue so far
    pub fn bytes_submitted(&self) -> u64 {
        self.bytes_submitted
    }

    /// Bytes the sink has accepted so far
    pub fn bytes_written(&self) -> u64 {
        self.shared.bytes_written.load(Ordering::Relaxed)
    }

    /// Whether an error has been latched; the writer should then be discarded
    pub fn has_failed(&self) -> bool {
        self.shared.errors.is_set()
    }

    /// Buffer pool counters
    pub fn pool_stats(&self) -> &PoolStats {
        self.shared.pool.stats()
    }
}

impl<W> Drop for BufferedWriter<W> {
    fn drop(&mut self) {
        if self.drain.is_none() {
            return;
        }
        let pending = self.hot.as_ref().map_or(0, BytesMut::len);
        warn!(pending, "buffered writer dropped without wait_clean");
        // Disconnecting lets the drain thread finish queued chunks and exit.
        self.queue.take();
    }
}

fn run_drain<W: Write>(mut sink: W, rx: Receiver<Batch>, shared: Arc<Shared>) -> W {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| drain(&mut sink, &rx, &shared)));
    match outcome {
        Ok(Ok(())) => debug!("drain finished"),
        Ok(Err(err)) => {
            warn!(error = %err, "drain stopped, queued data discarded");
            shared.errors.latch(err);
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(%reason, "drain panicked");
            shared.errors.latch(Error::DrainPanicked(reason));
        }
    }
    // Dropping the receiver after latching makes later sends fail fast.
    drop(rx);
    sink
}

fn drain<W: Write>(sink: &mut W, rx: &Receiver<Batch>, shared: &Shared) -> Result<()> {
    loop {
        if shared.errors.is_set() {
            debug!("error latched, drain stopping");
            return Ok(());
        }

        let chunk = match rx.recv() {
            Ok(Batch::Data(chunk)) => chunk,
            Ok(Batch::Done) | Err(_) => return Ok(()),
        };

        let bytes = chunk.as_slice();
        sink.write_all(bytes)?;
        shared
            .bytes_written
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);

        if let Chunk::Pooled(buf) = chunk {
            shared.pool.release(buf);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
