//! Error types and handling for rs2-push
//!
//! A stream terminates with at most one [`StreamError`]. The same type is
//! returned by disposal and by the virtual scheduler's stepping methods.

use thiserror::Error;

/// Main error type for rs2-push operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    /// Failure raised by a producer or by the caller
    #[error("Stream error: {0}")]
    Custom(String),
    /// A mapping, predicate or combining function returned an error
    #[error("User function failed: {0}")]
    UserFunction(String),
    /// I/O related errors, usually from a bridged future
    #[error("IO error: {0}")]
    IO(String),
    /// Releasing a resource failed
    #[error("Disposal failed: {0}")]
    Dispose(String),
    /// The consumer lost its subscription before a terminal notification
    #[error("Operation cancelled")]
    Cancelled,
    /// The virtual scheduler fired more tasks than its configured bound
    #[error("Scheduler step limit of {0} exceeded")]
    StepLimitExceeded(usize),
}

impl StreamError {
    /// Shorthand for [`StreamError::Custom`]
    pub fn custom(msg: impl Into<String>) -> Self {
        StreamError::Custom(msg.into())
    }

    /// Shorthand for [`StreamError::UserFunction`]
    pub fn user(msg: impl Into<String>) -> Self {
        StreamError::UserFunction(msg.into())
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::IO(err.to_string())
    }
}

/// Result type for rs2-push operations
pub type StreamResult<T> = Result<T, StreamError>;
