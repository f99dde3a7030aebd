//! Error types for command dispatch failures.
//!
//! Every [`DispatchError`] answers the client with exactly one result code,
//! see [`DispatchError::result_code`]. Framing failures never reach this
//! layer; the transport drops the connection for those.

use eventmgr_wire::{CursorError, Opcode, PayloadError, ResultCode};
use thiserror::Error;

use crate::backend::BackendError;

/// Reasons an output batch returned by a module cannot be decoded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OutputBatchError {
    /// The module reported more outputs than the buffers can hold.
    #[error("module reported {count} outputs, limit is {limit}")]
    TooManyOutputs {
        /// Reported count.
        count: u32,
        /// Accepted maximum.
        limit: usize,
    },
    /// A result buffer was missing from the operation.
    #[error("operation slot {slot} does not hold a buffer")]
    MissingBuffer {
        /// Parameter slot index.
        slot: usize,
    },
    /// The connection id array ended early.
    #[error("connection id array truncated: {0}")]
    ConnIds(#[source] CursorError),
    /// A ciphertext chunk ran past the data buffer.
    #[error("ciphertext chunk {index} overruns the data buffer: {source}")]
    Chunk {
        /// Position of the chunk in the batch.
        index: usize,
        /// Underlying cursor error.
        #[source]
        source: CursorError,
    },
    /// The tag array ended early.
    #[error("tag array truncated: {0}")]
    Tags(#[source] CursorError),
}

/// Errors surfaced while dispatching a command.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload does not match the command's layout.
    #[error("illegal payload: {0}")]
    IllegalPayload(#[from] PayloadError),

    /// No module is registered under the requested id.
    #[error("module {module_id} is not loaded")]
    UnknownModule {
        /// Requested module id.
        module_id: u16,
    },

    /// A user payload does not fit the data buffer.
    #[error("request of {len} bytes exceeds the {limit}-byte data buffer")]
    RequestTooLarge {
        /// Payload length.
        len: usize,
        /// Data buffer capacity.
        limit: usize,
    },

    /// The backend refused an installation or invocation.
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    /// Output fan-out performed the maximum number of local deliveries.
    #[error("output fan-out exceeded {limit} local deliveries")]
    HopLimitExceeded {
        /// Configured bound.
        limit: u32,
    },

    /// A module returned outputs that cannot be decoded.
    #[error("malformed output batch: {0}")]
    MalformedOutputBatch(#[from] OutputBatchError),

    /// The command is recognised but not served by this daemon.
    #[error("{opcode} is not supported")]
    Unsupported {
        /// Refused opcode.
        opcode: Opcode,
    },

    /// Internal error (e.g., lock poisoned).
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl DispatchError {
    /// Result code reported to the client for this error.
    #[must_use]
    pub const fn result_code(&self) -> ResultCode {
        match self {
            Self::IllegalPayload(_) => ResultCode::IllegalPayload,
            Self::UnknownModule { .. } | Self::RequestTooLarge { .. } => ResultCode::BadRequest,
            Self::Backend(_)
            | Self::HopLimitExceeded { .. }
            | Self::MalformedOutputBatch(_)
            | Self::Unsupported { .. }
            | Self::Internal { .. } => ResultCode::InternalError,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
