//! # hotwriter
//!
//! Buffered writer that moves sink I/O off the producer's thread.
//!
//! ## Architecture
//! - **Buffer pool**: lock-free free-list of fixed-capacity `BytesMut` buffers
//! - **Double buffering**: a bounded queue of two buffers between the producer
//!   and one drain thread, so one buffer fills while another drains
//! - **Latched errors**: the first sink failure stops the drain thread and is
//!   reported, together with any later failures, by `wait_clean`
//!
//! ```no_run
//! use hotwriter::BufferedWriter;
//!
//! # fn main() -> hotwriter::Result<()> {
//! let file = std::fs::File::create("out.log").expect("create");
//! let mut writer = BufferedWriter::new(file, 64 * 1024)?;
//! writer.write(b"first line\n")?;
//! writer.write(b"second line\n")?;
//! let _file = writer.wait_clean()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod pool;
mod writer;

pub use config::{WriterConfig, DEFAULT_BUFFER_CAPACITY};
pub use error::{Error, Result};
pub use pool::{BufferPool, PoolStats};
pub use writer::{BufferedWriter, QUEUE_DEPTH};
