//! Secure-module UUIDs as carried by `LoadModule`.

use std::fmt;

use crate::cursor::{Cursor, CursorError};

/// Encoded size of a [`ModuleUuid`].
pub const UUID_LEN: usize = 16;

/// 128-bit secure-module identifier in the TEE field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleUuid {
    /// First 32-bit field.
    pub time_low: u32,
    /// Second 16-bit field.
    pub time_mid: u16,
    /// Third 16-bit field.
    pub time_hi_and_version: u16,
    /// Trailing eight bytes.
    pub clock_seq_and_node: [u8; 8],
}

impl ModuleUuid {
    /// Decodes the next 16 bytes of `cursor` as a big-endian UUID.
    pub fn read(cursor: &mut Cursor<'_>) -> Result<Self, CursorError> {
        let raw: [u8; UUID_LEN] = cursor.read_array()?;
        Ok(Self::from_bytes(raw))
    }

    /// Builds a UUID from its 16-byte network representation.
    #[must_use]
    pub const fn from_bytes(raw: [u8; UUID_LEN]) -> Self {
        let [t0, t1, t2, t3, m0, m1, h0, h1, clock_seq_and_node @ ..] = raw;
        Self {
            time_low: u32::from_be_bytes([t0, t1, t2, t3]),
            time_mid: u16::from_be_bytes([m0, m1]),
            time_hi_and_version: u16::from_be_bytes([h0, h1]),
            clock_seq_and_node,
        }
    }

    /// Network representation of the UUID.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; UUID_LEN] {
        let [t0, t1, t2, t3] = self.time_low.to_be_bytes();
        let [m0, m1] = self.time_mid.to_be_bytes();
        let [h0, h1] = self.time_hi_and_version.to_be_bytes();
        let [c0, c1, c2, c3, c4, c5, c6, c7] = self.clock_seq_and_node;
        [
            t0, t1, t2, t3, m0, m1, h0, h1, c0, c1, c2, c3, c4, c5, c6, c7,
        ]
    }

    /// File name the image is installed under, e.g.
    /// `8aaaf200-2450-11e4-abe2-0002a5d5c51b.ta`.
    #[must_use]
    pub fn image_file_name(&self) -> String {
        format!("{self}.ta")
    }
}

impl fmt::Display for ModuleUuid {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [c0, c1, n0, n1, n2, n3, n4, n5] = self.clock_seq_and_node;
        write!(
            formatter,
            "{:08x}-{:04x}-{:04x}-{c0:02x}{c1:02x}-{n0:02x}{n1:02x}{n2:02x}{n3:02x}{n4:02x}{n5:02x}",
            self.time_low, self.time_mid, self.time_hi_and_version,
        )
    }
}
