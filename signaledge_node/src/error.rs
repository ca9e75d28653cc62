//! Error types for node operations

use thiserror::Error;

/// Errors surfaced by the control surface, bulk read, and projection paths.
///
/// All failures are synchronous; there is no asynchronous error channel.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Caller passed an out-of-range or unrecognized value
    #[error("Invalid argument: {what}")]
    InvalidArgument {
        /// What was rejected
        what: String,
    },

    /// Byte transfer across the caller boundary failed
    #[error("Copy fault: needed {needed} bytes, caller provided {provided}")]
    CopyFault {
        /// Bytes the operation would have produced or consumed
        needed: usize,
        /// Bytes the caller actually supplied
        provided: usize,
    },

    /// Backing allocation does not exist (before startup or after teardown)
    #[error("Resource unavailable: {name}")]
    ResourceUnavailable {
        /// Segment name
        name: String,
    },

    /// Backing segment already exists
    #[error("Segment already exists: {name}")]
    AlreadyExists {
        /// Segment name
        name: String,
    },

    /// IO error from the backing file or mapping
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Delivery failure from a display or indicator sink.
///
/// Deliberately not a `NodeError` variant: sink failures are logged and
/// swallowed by the update engine, never propagated to callers.
#[derive(Error, Debug)]
#[error("Sink delivery failed: {reason}")]
pub struct SinkError {
    /// Why delivery failed
    pub reason: String,
}

impl SinkError {
    /// Build a delivery failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
