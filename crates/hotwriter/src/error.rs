//! Error types for hotwriter

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias for hotwriter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the buffered writer
///
/// Errors are `Clone` because the writer keeps a latched copy while handing
/// another one back to the caller.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Invalid construction parameters
    #[error("invalid writer configuration: {0}")]
    Config(String),

    /// The drain thread could not be started
    #[error("failed to spawn drain thread: {0}")]
    Spawn(#[source] Arc<io::Error>),

    /// The sink rejected a write
    #[error("sink write failed: {0}")]
    Sink(#[source] Arc<io::Error>),

    /// The drain thread panicked while writing
    #[error("drain thread panicked: {0}")]
    DrainPanicked(String),

    /// A buffer was submitted after the drain thread stopped
    #[error("drain thread is no longer accepting buffers")]
    Disconnected,

    /// Two failures accumulated in the latched cell, oldest first
    #[error("{first}; {then}")]
    Chained {
        /// The earlier failure
        first: Box<Error>,
        /// The later failure
        then: Box<Error>,
    },
}

impl Error {
    /// Append `later` to this error, keeping both messages.
    pub fn chain(self, later: Error) -> Error {
        Error::Chained {
            first: Box::new(self),
            then: Box::new(later),
        }
    }

    /// Iterate over the individual failures, oldest first.
    pub fn causes(&self) -> Vec<&Error> {
        match self {
            Error::Chained { first, then } => {
                let mut out = first.causes();
                out.extend(then.causes());
                out
            }
            other => vec![other],
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Sink(Arc::new(err))
    }
}

/// Combine an optional prior error with a new one.
pub(crate) fn accumulate(prior: Option<Error>, later: Error) -> Error {
    match prior {
        Some(prior) => prior.chain(later),
        None => later,
    }
}
