//! I/O error types for the disk module.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for device I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur during device I/O.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum IoError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// File could not be opened.
    #[error("cannot open database file: {path}")]
    Open { path: PathBuf, source: io::Error },

    /// Buffer length does not match the device page size.
    #[error("buffer size mismatch: device page size {page_size}, buffer {buffer_len}")]
    BufferSize { page_size: usize, buffer_len: usize },

    /// Injected device fault (test devices only).
    #[error("device fault: {message}")]
    Fault { message: String },
}

impl IoError {
    /// Creates an Open error with path context.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates an injected fault error.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }
}
