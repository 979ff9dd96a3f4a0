//! Error values returned at the engine's operation boundary.
//!
//! The engine never panics on misuse. Every failure is reported twice: once
//! through the diagnostic channel (an `INTERNAL` message or a debug line) so
//! that it is seen even when the return value is ignored, and once as one of
//! the values below so that callers who check can react.

use core::fmt;

use hexer_internals::DepthExceeded;

/// Failure of an engine operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HexerError {
    /// A message-building operation was called while no block was open.
    NoOpenBlock,
    /// A block guard was used while a block opened after it was still open.
    BlockNotInnermost,
    /// The context's allocator refused to store message text.
    AllocationRefused {
        /// Number of bytes that were requested.
        requested: usize,
    },
    /// Opening the block would exceed the configured nesting depth.
    DepthExceeded {
        /// The configured maximum depth.
        limit: usize,
    },
    /// A close event did not match any open block.
    UnmatchedClose,
}

impl fmt::Display for HexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HexerError::NoOpenBlock => write!(f, "no message block is open"),
            HexerError::BlockNotInnermost => {
                write!(f, "the block is not the innermost open block")
            }
            HexerError::AllocationRefused { requested } => {
                write!(f, "allocator refused a request for {requested} bytes")
            }
            HexerError::DepthExceeded { limit } => {
                write!(f, "block nesting depth limit of {limit} exceeded")
            }
            HexerError::UnmatchedClose => {
                write!(f, "block close does not match any open block")
            }
        }
    }
}

impl core::error::Error for HexerError {}

impl From<DepthExceeded> for HexerError {
    fn from(value: DepthExceeded) -> Self {
        HexerError::DepthExceeded { limit: value.limit }
    }
}

/// Failure of a [`Stream`](crate::stream::Stream) write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StreamError {
    /// The stream was finalized; the write was reported as an error message
    /// instead of being performed.
    Expired,
    /// The underlying writer failed.
    Backend,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Expired => write!(f, "write to an expired stream"),
            StreamError::Backend => write!(f, "the stream backend failed to write"),
        }
    }
}

impl core::error::Error for StreamError {}
