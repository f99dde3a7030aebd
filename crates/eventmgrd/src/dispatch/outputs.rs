//! Decoding of the output batch a module invocation leaves behind.
//!
//! After a user or handle-input invocation the value slot's `b` carries the
//! output count `N`. Slot 1 holds `N` big-endian connection ids, slot 2 a
//! stream of `N` chunks (`len:u8` then `len` bytes of ciphertext) and slot 3
//! `N` contiguous 16-byte tags.

use eventmgr_wire::{Cursor, TAG_LEN, Tag};

use crate::backend::{MAX_OUTPUTS, Operation, Param};

use super::errors::OutputBatchError;

pub(crate) const COUNT_SLOT: usize = 0;
pub(crate) const CONN_ID_SLOT: usize = 1;
pub(crate) const DATA_SLOT: usize = 2;
pub(crate) const TAG_SLOT: usize = 3;

/// One encrypted output addressed to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Connection the output is routed through.
    pub conn_id: u16,
    /// Ciphertext, at most 255 bytes.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub tag: Tag,
}

/// Reconstructs `count` outputs from the three result buffers, in order.
pub fn decode_output_batch(
    count: u32,
    conn_ids: &[u8],
    chunks: &[u8],
    tags: &[u8],
) -> Result<Vec<Output>, OutputBatchError> {
    let total = usize::try_from(count)
        .ok()
        .filter(|total| *total <= MAX_OUTPUTS)
        .ok_or(OutputBatchError::TooManyOutputs {
            count,
            limit: MAX_OUTPUTS,
        })?;

    let mut conn_cursor = Cursor::new(conn_ids);
    let mut chunk_cursor = Cursor::new(chunks);
    let mut tag_cursor = Cursor::new(tags);
    let mut outputs = Vec::with_capacity(total);
    for index in 0..total {
        let conn_id = conn_cursor
            .read_u16_be()
            .map_err(OutputBatchError::ConnIds)?;
        let ciphertext = chunk_cursor
            .read_u8()
            .and_then(|len| chunk_cursor.read_exact(usize::from(len)))
            .map_err(|source| OutputBatchError::Chunk { index, source })?;
        let tag = tag_cursor
            .read_array::<TAG_LEN>()
            .map_err(OutputBatchError::Tags)?;
        outputs.push(Output {
            conn_id,
            ciphertext: ciphertext.to_vec(),
            tag,
        });
    }
    Ok(outputs)
}

/// Reads the output batch left in `operation` by a successful invocation.
pub(crate) fn outputs_of(operation: &Operation) -> Result<Vec<Output>, OutputBatchError> {
    let count = operation
        .param(COUNT_SLOT)
        .and_then(Param::value)
        .map(|(_, count)| count)
        .ok_or(OutputBatchError::MissingBuffer { slot: COUNT_SLOT })?;
    if count == 0 {
        return Ok(Vec::new());
    }
    decode_output_batch(
        count,
        buffer(operation, CONN_ID_SLOT)?,
        buffer(operation, DATA_SLOT)?,
        buffer(operation, TAG_SLOT)?,
    )
}

fn buffer(operation: &Operation, slot: usize) -> Result<&[u8], OutputBatchError> {
    operation
        .param(slot)
        .and_then(Param::bytes)
        .ok_or(OutputBatchError::MissingBuffer { slot })
}
