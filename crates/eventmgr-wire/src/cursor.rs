//! Bounds-checked sequential reader over an immutable byte buffer.
//!
//! Every payload the Event Manager parses goes through [`Cursor`]. Reads
//! either consume exactly the requested number of bytes or fail and leave
//! the cursor where it was, so a failed parse never observes a half-advanced
//! position.

use thiserror::Error;

/// Raised when a read asks for more bytes than remain.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("needed {wanted} bytes but only {remaining} remain")]
pub struct CursorError {
    /// Bytes requested by the failing read.
    pub wanted: usize,
    /// Bytes left in the cursor when the read failed.
    pub remaining: usize,
}

/// Sequential big-endian reader borrowing its input.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    /// Wraps `buf`; the cursor starts at its first byte.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Whether every byte has been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the next `len` bytes without copying them.
    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8], CursorError> {
        let (head, tail) = self.buf.split_at_checked(len).ok_or(CursorError {
            wanted: len,
            remaining: self.buf.len(),
        })?;
        self.buf = tail;
        Ok(head)
    }

    /// Copies the next `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let (head, tail) = self.buf.split_first_chunk::<N>().ok_or(CursorError {
            wanted: N,
            remaining: self.buf.len(),
        })?;
        self.buf = tail;
        Ok(*head)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16_be(&mut self) -> Result<u16, CursorError> {
        self.read_array().map(u16::from_be_bytes)
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32_be(&mut self) -> Result<u32, CursorError> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// Returns everything left and empties the cursor. Never fails.
    pub fn read_remainder(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buf)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn reads_fixed_width_values_in_order() {
        let mut cursor = Cursor::new(&[0x01, 0x02, 0x03, 0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(cursor.read_u8(), Ok(0x01));
        assert_eq!(cursor.read_u16_be(), Ok(0x0203));
        assert_eq!(cursor.read_u32_be(), Ok(0xAABB_CCDD));
        assert!(cursor.is_empty());
    }

    #[rstest]
    #[case::empty_u8(&[], 1)]
    #[case::short_u16(&[0x01], 2)]
    #[case::short_u32(&[0x01, 0x02, 0x03], 4)]
    fn underflow_leaves_cursor_untouched(#[case] input: &[u8], #[case] wanted: usize) {
        let mut cursor = Cursor::new(input);
        let error = match wanted {
            1 => cursor.read_u8().map(drop),
            2 => cursor.read_u16_be().map(drop),
            _ => cursor.read_u32_be().map(drop),
        }
        .expect_err("read should underflow");
        assert_eq!(error, CursorError { wanted, remaining: input.len() });
        assert_eq!(cursor.remaining(), input.len());
    }

    #[test]
    fn read_exact_borrows_without_copying() {
        let data = [1_u8, 2, 3, 4];
        let mut cursor = Cursor::new(&data);
        let head = cursor.read_exact(3).expect("three bytes");
        assert_eq!(head, &[1, 2, 3]);
        assert_eq!(head.as_ptr(), data.as_ptr());
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn over_read_fails_once_and_state_survives() {
        let data = [9_u8, 8, 7, 6, 5];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_exact(2), Ok(&data[..2]));
        assert!(cursor.read_exact(4).is_err());
        assert!(cursor.read_exact(usize::MAX).is_err());
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(cursor.read_exact(3), Ok(&data[2..]));
    }

    #[test]
    fn remainder_always_succeeds_and_empties() {
        let mut cursor = Cursor::new(&[1, 2, 3]);
        cursor.read_u8().expect("first byte");
        assert_eq!(cursor.read_remainder(), &[2, 3]);
        assert_eq!(cursor.read_remainder(), &[] as &[u8]);
        assert!(cursor.is_empty());
    }

    #[test]
    fn zero_length_read_on_empty_cursor_succeeds() {
        let mut cursor = Cursor::new(&[]);
        assert_eq!(cursor.read_exact(0), Ok(&[] as &[u8]));
    }
}
