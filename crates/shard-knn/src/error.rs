//! Errors raised while loading data, exchanging candidates, or reporting.

use core::time::Duration;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can end a run.
///
/// None of these are retried: inputs are static files read once, so every
/// error is terminal for the run.
#[derive(Error, Debug)]
pub enum KnnError {
    /// A file could not be opened, read, or written.
    #[error("failed to {op} {path:?}: {source}")]
    Io {
        /// What was being attempted, e.g. "read" or "open".
        op: &'static str,
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A file or buffer does not hold the number of values it should.
    #[error("size mismatch in {context}: expected {expected}, found {found}")]
    SizeMismatch {
        /// What was being checked.
        context: String,
        /// The size implied by the configuration.
        expected: usize,
        /// The size actually found.
        found: usize,
    },

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A peer hung up, or a message could not be encoded or decoded.
    #[error("transport error: {0}")]
    Transport(String),

    /// A bounded wait on the mesh expired.
    #[error("worker {worker} timed out after {waited:?} waiting for {waiting_for}")]
    Timeout {
        /// The worker that was waiting.
        worker: usize,
        /// How long it waited.
        waited: Duration,
        /// What it was waiting for.
        waiting_for: String,
    },

    /// A peer sent a message the protocol does not allow.
    #[error("protocol violation at worker {worker}: {reason}")]
    Protocol {
        /// The worker that received the message.
        worker: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result type alias for this crate.
pub type Result<T> = core::result::Result<T, KnnError>;

impl KnnError {
    /// Wraps an I/O error with the operation and file that caused it.
    pub(crate) fn io<P: AsRef<Path>>(op: &'static str, path: P, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// A size mismatch in the given context.
    pub(crate) fn size<S: Into<String>>(context: S, expected: usize, found: usize) -> Self {
        Self::SizeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::KnnError;

    #[test]
    fn display() {
        let err = KnnError::size("training file", 80, 72);
        assert_eq!(err.to_string(), "size mismatch in training file: expected 80, found 72");

        let err = KnnError::Config("k must be positive".to_string());
        assert_eq!(err.to_string(), "invalid configuration: k must be positive");
    }

    #[test]
    fn io_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = KnnError::io("open", "train.bin", source);
        let msg = err.to_string();
        assert!(msg.contains("open"), "{msg}");
        assert!(msg.contains("train.bin"), "{msg}");
    }
}
