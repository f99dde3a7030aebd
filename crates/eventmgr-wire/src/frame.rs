//! Command and result frames and their stream codec.
//!
//! A command frame is `opcode:u8 | length | payload` where `length` is a
//! big-endian `u16`, or a big-endian `u32` for `LoadModule`. A result frame
//! is always `code:u8 | length:u16 | payload`. Any [`FrameError`] leaves the
//! stream at an unknown position, so callers drop the connection.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::code::{Opcode, ResultCode};

/// Largest `LoadModule` payload accepted from a peer (10 MiB).
pub const MAX_LOAD_MODULE_LEN: u32 = 10 * 1024 * 1024;

/// Largest payload a two-byte length field can describe.
pub const MAX_SHORT_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Part of a frame a truncated read stopped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePart {
    /// Code or opcode byte.
    Code,
    /// Length field.
    Length,
    /// Payload bytes.
    Payload,
}

impl FramePart {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Length => "length",
            Self::Payload => "payload",
        }
    }
}

impl std::fmt::Display for FramePart {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Framing failures. Each one ends the connection without a reply.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The underlying stream failed.
    #[error("frame I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A peer declared a payload above the accepted bound.
    #[error("declared payload of {declared} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge {
        /// Length announced on the wire.
        declared: u32,
        /// Accepted maximum.
        limit: u32,
    },
    /// A payload cannot be described by its frame's length field.
    #[error("payload of {len} bytes does not fit a {limit}-byte length field")]
    PayloadTooLong {
        /// Payload length being encoded.
        len: usize,
        /// Largest encodable length.
        limit: usize,
    },
    /// The stream closed part-way through a frame.
    #[error("stream ended inside the frame {part}")]
    Truncated {
        /// Field the read stopped in.
        part: FramePart,
    },
}

/// Request sent to an Event Manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Operation requested.
    pub opcode: Opcode,
    /// Opcode-specific body.
    pub payload: Vec<u8>,
}

impl CommandFrame {
    /// Builds a command frame.
    #[must_use]
    pub const fn new(opcode: Opcode, payload: Vec<u8>) -> Self {
        Self { opcode, payload }
    }

    /// Reads one command frame.
    ///
    /// Returns `Ok(None)` when the stream closes before the opcode byte,
    /// which is how an idle peer hangs up.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>, FrameError> {
        let Some(byte) = read_code_byte(reader)? else {
            return Ok(None);
        };
        let opcode = Opcode::from_u8(byte);
        let declared = if opcode.has_wide_length() {
            let declared = u32::from_be_bytes(read_field(reader, FramePart::Length)?);
            if declared > MAX_LOAD_MODULE_LEN {
                return Err(FrameError::PayloadTooLarge {
                    declared,
                    limit: MAX_LOAD_MODULE_LEN,
                });
            }
            declared
        } else {
            u32::from(u16::from_be_bytes(read_field(reader, FramePart::Length)?))
        };
        let payload = read_payload(reader, declared)?;
        Ok(Some(Self { opcode, payload }))
    }

    /// Serialises the frame into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut out = Vec::with_capacity(self.payload.len().saturating_add(5));
        out.push(self.opcode.as_u8());
        if self.opcode.has_wide_length() {
            let limit = MAX_LOAD_MODULE_LEN as usize;
            let len = u32::try_from(self.payload.len())
                .ok()
                .filter(|len| *len <= MAX_LOAD_MODULE_LEN)
                .ok_or(FrameError::PayloadTooLong {
                    len: self.payload.len(),
                    limit,
                })?;
            out.extend_from_slice(&len.to_be_bytes());
        } else {
            out.extend_from_slice(&short_length(&self.payload)?.to_be_bytes());
        }
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Writes the frame and flushes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), FrameError> {
        write_all_and_flush(writer, &self.encode()?)
    }
}

/// Reply to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFrame {
    /// Outcome.
    pub code: ResultCode,
    /// Command-specific body; empty for most replies.
    pub payload: Vec<u8>,
}

impl ResultFrame {
    /// Builds a result frame.
    #[must_use]
    pub const fn new(code: ResultCode, payload: Vec<u8>) -> Self {
        Self { code, payload }
    }

    /// Empty successful reply.
    #[must_use]
    pub const fn ok() -> Self {
        Self::new(ResultCode::Ok, Vec::new())
    }

    /// Empty reply carrying `code`.
    #[must_use]
    pub const fn with_code(code: ResultCode) -> Self {
        Self::new(code, Vec::new())
    }

    /// Reads one result frame. A closed stream is a truncation here.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, FrameError> {
        let byte = read_code_byte(reader)?.ok_or(FrameError::Truncated {
            part: FramePart::Code,
        })?;
        let declared = u16::from_be_bytes(read_field(reader, FramePart::Length)?);
        let payload = read_payload(reader, u32::from(declared))?;
        Ok(Self {
            code: ResultCode::from_u8(byte),
            payload,
        })
    }

    /// Serialises the frame into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut out = Vec::with_capacity(self.payload.len().saturating_add(3));
        out.push(self.code.as_u8());
        out.extend_from_slice(&short_length(&self.payload)?.to_be_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Writes the frame and flushes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), FrameError> {
        write_all_and_flush(writer, &self.encode()?)
    }
}

fn short_length(payload: &[u8]) -> Result<u16, FrameError> {
    u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLong {
        len: payload.len(),
        limit: MAX_SHORT_PAYLOAD_LEN,
    })
}

fn read_code_byte<R: Read>(reader: &mut R) -> Result<Option<u8>, FrameError> {
    let mut byte = [0_u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => {
                let [code] = byte;
                return Ok(Some(code));
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(FrameError::Io(error)),
        }
    }
}

fn read_field<R: Read, const N: usize>(
    reader: &mut R,
    part: FramePart,
) -> Result<[u8; N], FrameError> {
    let mut field = [0_u8; N];
    reader.read_exact(&mut field).map_err(|error| {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::Truncated { part }
        } else {
            FrameError::Io(error)
        }
    })?;
    Ok(field)
}

/// Reads exactly `declared` bytes, growing the buffer as data arrives so a
/// peer that lies about the length cannot force a large allocation.
fn read_payload<R: Read>(reader: &mut R, declared: u32) -> Result<Vec<u8>, FrameError> {
    let mut payload = Vec::new();
    reader
        .take(u64::from(declared))
        .read_to_end(&mut payload)?;
    if u64::try_from(payload.len()).ok() != Some(u64::from(declared)) {
        return Err(FrameError::Truncated {
            part: FramePart::Payload,
        });
    }
    Ok(payload)
}

fn write_all_and_flush<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), FrameError> {
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}
