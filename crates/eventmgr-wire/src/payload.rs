//! Command payload layouts.
//!
//! Each payload type parses from the bytes of a [`crate::CommandFrame`]
//! through a [`Cursor`] and encodes back to the same layout. Trailing bytes
//! after a fixed-size layout are ignored.

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::cursor::{Cursor, CursorError};
use crate::uuid::{ModuleUuid, UUID_LEN};

/// Authentication tag length.
pub const TAG_LEN: usize = 16;

/// Longest ciphertext a single output can carry.
pub const MAX_CIPHERTEXT_LEN: usize = u8::MAX as usize;

/// Encoded size of an `AddConnection` payload.
pub const ADD_CONNECTION_LEN: usize = 11;

/// Size of the `LoadModule` header preceding the image.
pub const LOAD_HEADER_LEN: usize = 2 + UUID_LEN;

/// Associated data length of `SetKey`.
pub const SET_KEY_AD_LEN: usize = 7;

/// Associated data (nonce) length of `Disable`.
pub const DISABLE_AD_LEN: usize = 2;

/// Ciphertext length of `Disable`.
pub const DISABLE_CIPHER_LEN: usize = 2;

/// Authentication tag attached to every encrypted output.
pub type Tag = [u8; TAG_LEN];

/// Payload parse failures. All of them answer `IllegalPayload`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// A field ran past the end of the payload.
    #[error("payload too short: {0}")]
    Short(#[from] CursorError),
    /// The remainder cannot hold a tag.
    #[error("{len} bytes cannot hold a 16-byte tag")]
    MissingTag {
        /// Remainder length.
        len: usize,
    },
    /// A ciphertext is longer than an output chunk can describe.
    #[error("ciphertext of {len} bytes exceeds 255 bytes")]
    CiphertextTooLong {
        /// Ciphertext length.
        len: usize,
    },
}

/// Routing entry announced by `AddConnection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddConnection {
    /// Connection identifier outputs are addressed to.
    pub conn_id: u16,
    /// Module that receives the output, locally or on the remote node.
    pub target_module: u16,
    /// Whether the target module runs on this node.
    pub is_local: bool,
    /// Remote Event Manager port.
    pub remote_port: u16,
    /// Remote Event Manager address.
    pub remote_address: Ipv4Addr,
}

impl AddConnection {
    /// Parses `[conn_id][target_module][is_local][remote_port][remote_address]`.
    pub fn parse(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cursor = Cursor::new(payload);
        Ok(Self {
            conn_id: cursor.read_u16_be()?,
            target_module: cursor.read_u16_be()?,
            is_local: cursor.read_u8()? != 0,
            remote_port: cursor.read_u16_be()?,
            remote_address: Ipv4Addr::from(cursor.read_array::<4>()?),
        })
    }

    /// Encodes the payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ADD_CONNECTION_LEN);
        out.extend_from_slice(&self.conn_id.to_be_bytes());
        out.extend_from_slice(&self.target_module.to_be_bytes());
        out.push(u8::from(self.is_local));
        out.extend_from_slice(&self.remote_port.to_be_bytes());
        out.extend_from_slice(&self.remote_address.octets());
        out
    }
}

/// Header of a `LoadModule` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadModuleHeader {
    /// Local identifier the module is registered under.
    pub module_id: u16,
    /// Identifier the secure world knows the module by.
    pub uuid: ModuleUuid,
}

impl LoadModuleHeader {
    /// Splits a `LoadModule` payload into its header and image bytes.
    pub fn parse(payload: &[u8]) -> Result<(Self, &[u8]), PayloadError> {
        let mut cursor = Cursor::new(payload);
        let header = Self {
            module_id: cursor.read_u16_be()?,
            uuid: ModuleUuid::read(&mut cursor)?,
        };
        Ok((header, cursor.read_remainder()))
    }

    /// Encodes the header followed by `image`.
    #[must_use]
    pub fn encode_with(&self, image: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(LOAD_HEADER_LEN.saturating_add(image.len()));
        out.extend_from_slice(&self.module_id.to_be_bytes());
        out.extend_from_slice(&self.uuid.to_bytes());
        out.extend_from_slice(image);
        out
    }
}

/// Entry point selected by a `CallEntrypoint` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Provision a connection key.
    SetKey,
    /// Answer an attestation challenge.
    Attest,
    /// Disable the module.
    Disable,
    /// Module-defined entry point.
    User(u16),
}

impl Entry {
    /// Maps a wire index to an entry.
    #[must_use]
    pub const fn from_index(index: u16) -> Self {
        match index {
            0 => Self::SetKey,
            1 => Self::Attest,
            2 => Self::Disable,
            other => Self::User(other),
        }
    }

    /// Wire index of the entry.
    #[must_use]
    pub const fn index(self) -> u16 {
        match self {
            Self::SetKey => 0,
            Self::Attest => 1,
            Self::Disable => 2,
            Self::User(index) => index,
        }
    }
}

/// `CallEntrypoint` payload with entry-specific arguments left unparsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryCall<'a> {
    /// Module to invoke.
    pub module_id: u16,
    /// Entry point to invoke.
    pub entry: Entry,
    /// Remaining bytes, interpreted per entry.
    pub args: &'a [u8],
}

impl<'a> EntryCall<'a> {
    /// Parses `[module_id][entry_index][args]`.
    pub fn parse(payload: &'a [u8]) -> Result<Self, PayloadError> {
        let mut cursor = Cursor::new(payload);
        let module_id = cursor.read_u16_be()?;
        let entry = Entry::from_index(cursor.read_u16_be()?);
        Ok(Self {
            module_id,
            entry,
            args: cursor.read_remainder(),
        })
    }

    /// Encodes the payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.args.len().saturating_add(4));
        out.extend_from_slice(&self.module_id.to_be_bytes());
        out.extend_from_slice(&self.entry.index().to_be_bytes());
        out.extend_from_slice(self.args);
        out
    }
}

/// Arguments of the `SetKey` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetKeyArgs {
    /// Encryption type, connection id, io id and nonce.
    pub associated_data: [u8; SET_KEY_AD_LEN],
    /// Encrypted key.
    pub cipher: [u8; TAG_LEN],
    /// Tag over the key and associated data.
    pub tag: Tag,
}

impl SetKeyArgs {
    /// Parses `[associated_data:7][cipher:16][tag:16]`.
    pub fn parse(args: &[u8]) -> Result<Self, PayloadError> {
        let mut cursor = Cursor::new(args);
        Ok(Self {
            associated_data: cursor.read_array()?,
            cipher: cursor.read_array()?,
            tag: cursor.read_array()?,
        })
    }

    /// Encodes the arguments.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        [&self.associated_data[..], &self.cipher, &self.tag].concat()
    }
}

/// Arguments of the `Attest` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestArgs<'a> {
    /// Challenge to be authenticated by the module.
    pub challenge: &'a [u8],
}

impl<'a> AttestArgs<'a> {
    /// Parses `[challenge_len:u16][challenge]`.
    pub fn parse(args: &'a [u8]) -> Result<Self, PayloadError> {
        let mut cursor = Cursor::new(args);
        let len = cursor.read_u16_be()?;
        Ok(Self {
            challenge: cursor.read_exact(usize::from(len))?,
        })
    }

    /// Encodes the arguments; `None` if the challenge exceeds `u16::MAX` bytes.
    #[must_use]
    pub fn encode(&self) -> Option<Vec<u8>> {
        let len = u16::try_from(self.challenge.len()).ok()?;
        Some([&len.to_be_bytes()[..], self.challenge].concat())
    }
}

/// Arguments of the `Disable` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisableArgs {
    /// Nonce.
    pub nonce: [u8; DISABLE_AD_LEN],
    /// Encrypted command.
    pub cipher: [u8; DISABLE_CIPHER_LEN],
    /// Tag over nonce and cipher.
    pub tag: Tag,
}

impl DisableArgs {
    /// Parses `[nonce:2][cipher:2][tag:16]`.
    pub fn parse(args: &[u8]) -> Result<Self, PayloadError> {
        let mut cursor = Cursor::new(args);
        Ok(Self {
            nonce: cursor.read_array()?,
            cipher: cursor.read_array()?,
            tag: cursor.read_array()?,
        })
    }

    /// Encodes the arguments.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        [&self.nonce[..], &self.cipher, &self.tag].concat()
    }
}

/// Encrypted output travelling between Event Managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteOutput<'a> {
    /// Module that handles the output on the receiving node.
    pub module_id: u16,
    /// Connection the output belongs to.
    pub conn_id: u16,
    /// Ciphertext, at most [`MAX_CIPHERTEXT_LEN`] bytes.
    pub ciphertext: &'a [u8],
    /// Authentication tag.
    pub tag: Tag,
}

impl<'a> RemoteOutput<'a> {
    /// Parses `[module_id][conn_id][ciphertext][tag:16]`; the tag is the
    /// final sixteen bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self, PayloadError> {
        let mut cursor = Cursor::new(payload);
        let module_id = cursor.read_u16_be()?;
        let conn_id = cursor.read_u16_be()?;
        let rest = cursor.read_remainder();
        let (ciphertext, tag) = rest
            .split_last_chunk::<TAG_LEN>()
            .ok_or(PayloadError::MissingTag { len: rest.len() })?;
        if ciphertext.len() > MAX_CIPHERTEXT_LEN {
            return Err(PayloadError::CiphertextTooLong {
                len: ciphertext.len(),
            });
        }
        Ok(Self {
            module_id,
            conn_id,
            ciphertext,
            tag: *tag,
        })
    }

    /// Encodes the payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.ciphertext.len() + TAG_LEN);
        out.extend_from_slice(&self.module_id.to_be_bytes());
        out.extend_from_slice(&self.conn_id.to_be_bytes());
        out.extend_from_slice(self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }
}
