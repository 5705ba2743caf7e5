//! Buffer pool errors.
//!
//! Only construction can fail with an error value. Operational outcomes
//! follow the pool's contracts instead: starvation is a `None` return,
//! misuse of pin counts is a `false` return, and invariant violations or
//! failed I/O completions abort the process.

use thiserror::Error;

/// Result type for buffer pool construction.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur while building a buffer pool.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// Configuration rejected by validation.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Device and configuration disagree on page size.
    #[error("page size mismatch: device {device}, config {config}")]
    PageSizeMismatch { device: usize, config: usize },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BufferError::config("pool_size must be > 0");
        assert!(err.to_string().contains("pool_size"));

        let err = BufferError::PageSizeMismatch {
            device: 4096,
            config: 8192,
        };
        assert!(err.to_string().contains("4096"));
    }
}
