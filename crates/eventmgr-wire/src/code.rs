//! Opcode and result-code enumerations.
//!
//! Decoding never fails: bytes past the known range collapse onto a
//! sentinel (`Opcode::Invalid`, `ResultCode::GenericError`) so a corrupt
//! code byte only changes how a frame is interpreted, not how it is framed.

use std::fmt;

/// Command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Insert or replace a routing entry.
    AddConnection = 0,
    /// Invoke an entry point of a loaded module.
    CallEntrypoint = 1,
    /// Encrypted output forwarded by a peer Event Manager.
    RemoteOutput = 2,
    /// Install a module image and open a session to it.
    LoadModule = 3,
    /// Drop every module session and routing entry.
    Reset = 4,
    /// Periodic entry-point registration (unsupported).
    RegisterEntrypoint = 5,
    /// Anything past the known range.
    Invalid = 6,
}

impl Opcode {
    /// Decodes a wire byte, clamping unknown values to [`Opcode::Invalid`].
    #[must_use]
    pub const fn from_u8(byte: u8) -> Self {
        match byte {
            0 => Self::AddConnection,
            1 => Self::CallEntrypoint,
            2 => Self::RemoteOutput,
            3 => Self::LoadModule,
            4 => Self::Reset,
            5 => Self::RegisterEntrypoint,
            _ => Self::Invalid,
        }
    }

    /// Wire byte for this opcode.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the payload length field is four bytes wide.
    #[must_use]
    pub const fn has_wide_length(self) -> bool {
        matches!(self, Self::LoadModule)
    }

    /// Stable lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddConnection => "add_connection",
            Self::CallEntrypoint => "call_entrypoint",
            Self::RemoteOutput => "remote_output",
            Self::LoadModule => "load_module",
            Self::Reset => "reset",
            Self::RegisterEntrypoint => "register_entrypoint",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Result codes carried by reply frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    /// Command succeeded.
    Ok = 0,
    /// Opcode not accepted.
    IllegalCommand = 1,
    /// Payload did not match the command's layout.
    IllegalPayload = 2,
    /// Backend invocation or local resource failure.
    InternalError = 3,
    /// Reference to an unknown module, or an oversized request.
    BadRequest = 4,
    /// Cryptographic verification failed inside a module.
    CryptoError = 5,
    /// Anything past the known range.
    GenericError = 6,
}

impl ResultCode {
    /// Decodes a wire byte, clamping unknown values to [`ResultCode::GenericError`].
    #[must_use]
    pub const fn from_u8(byte: u8) -> Self {
        match byte {
            0 => Self::Ok,
            1 => Self::IllegalCommand,
            2 => Self::IllegalPayload,
            3 => Self::InternalError,
            4 => Self::BadRequest,
            5 => Self::CryptoError,
            _ => Self::GenericError,
        }
    }

    /// Wire byte for this code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the code reports success.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ok => "ok",
            Self::IllegalCommand => "illegal_command",
            Self::IllegalPayload => "illegal_payload",
            Self::InternalError => "internal_error",
            Self::BadRequest => "bad_request",
            Self::CryptoError => "crypto_error",
            Self::GenericError => "generic_error",
        };
        formatter.write_str(label)
    }
}
