//! Writer configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default hot buffer capacity (4 MiB)
pub const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024 * 1024;

/// Construction parameters for a [`BufferedWriter`](crate::BufferedWriter)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WriterConfig {
    /// Target size of each pooled buffer in bytes
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl WriterConfig {
    /// Config with the given buffer capacity
    pub fn with_capacity(buffer_capacity: usize) -> Self {
        Self { buffer_capacity }
    }

    /// Reject values the writer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::Config("buffer_capacity must be greater than 0".into()));
        }
        Ok(())
    }
}
