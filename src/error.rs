//! Error types untuk vnproto.
//!
//! Error internal hanya hidup di bawah dispatcher. Permukaan `call_*`
//! selalu mengembalikan [`ResultCode`](crate::protocol::ResultCode).

use thiserror::Error;

use crate::protocol::{CommandType, StructureType};

/// Main error type for all marshalling operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Heap region for a large command could not be obtained.
    #[error("failed to allocate {size} byte command buffer")]
    AllocationFailed { size: usize },

    /// A custom allocation callback was supplied; the wire has no representation for it.
    #[error("custom allocation callbacks cannot be marshalled")]
    UnsupportedAllocator,

    /// Reply tag does not match the request tag. The channel framing is broken.
    #[error("reply desync: expected {expected:?}, found {found:?}")]
    Desync {
        expected: CommandType,
        found: CommandType,
    },

    /// Decoder ran out of bytes.
    #[error("truncated input: need {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// Encoder ran out of room. Means size and encode disagree.
    #[error("encode overflow: need {needed} bytes, {remaining} remaining")]
    Overflow { needed: usize, remaining: usize },

    /// Reply carries a value for an out slot the caller passed as null.
    #[error("reply for {0:?} carries a value for a null out argument")]
    UnexpectedReplyValue(CommandType),

    /// A chain link type the decoder has no shape for.
    #[error("unknown structure type {0:?} in extension chain")]
    UnknownStructureType(StructureType),

    /// Command tag the renderer does not implement.
    #[error("unknown command {0:?}")]
    UnknownCommand(CommandType),

    /// Channel did not produce a reply for a submission that requested one.
    #[error("no reply for submission {0}")]
    NoReply(u64),

    /// Channel has been shut down.
    #[error("channel closed")]
    ChannelClosed,

    /// I/O error while setting up a transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
