//! Parameter layouts for each module entry point.

use eventmgr_wire::TAG_LEN;
use eventmgr_wire::payload::{AttestArgs, DisableArgs, SetKeyArgs};

use crate::backend::{
    DATA_BUFFER_LEN, EntryId, MAX_OUTPUTS, Operation, Param, SecureBackend, SessionHandle,
};

use super::errors::DispatchError;
use super::outputs::{Output, outputs_of};

const CONN_ID_BUFFER_LEN: usize = 2 * MAX_OUTPUTS;
const TAG_BUFFER_LEN: usize = TAG_LEN * MAX_OUTPUTS;

/// Rejects user payloads that cannot fit the data buffer.
pub(crate) const fn check_user_payload(len: usize) -> Result<(), DispatchError> {
    if len > DATA_BUFFER_LEN {
        return Err(DispatchError::RequestTooLarge {
            len,
            limit: DATA_BUFFER_LEN,
        });
    }
    Ok(())
}

pub(crate) fn set_key(
    backend: &dyn SecureBackend,
    session: SessionHandle,
    args: &SetKeyArgs,
) -> Result<(), DispatchError> {
    let mut operation = Operation::new([
        Param::Input(args.associated_data.to_vec()),
        Param::Input(args.cipher.to_vec()),
        Param::Input(args.tag.to_vec()),
        Param::None,
    ]);
    backend.invoke(session, EntryId::SetKey, &mut operation)?;
    Ok(())
}

/// Returns the MAC the module computed over the challenge.
pub(crate) fn attest(
    backend: &dyn SecureBackend,
    session: SessionHandle,
    args: &AttestArgs<'_>,
) -> Result<Vec<u8>, DispatchError> {
    let mut operation = Operation::new([
        Param::Input(args.challenge.to_vec()),
        Param::Output(vec![0; TAG_LEN]),
        Param::None,
        Param::None,
    ]);
    backend.invoke(session, EntryId::Attest, &mut operation)?;
    let [_, mac, _, _] = operation.into_params();
    match mac {
        Param::Output(mut bytes) => {
            bytes.truncate(TAG_LEN);
            Ok(bytes)
        }
        _ => Err(DispatchError::internal("attest MAC slot was replaced")),
    }
}

pub(crate) fn disable(
    backend: &dyn SecureBackend,
    session: SessionHandle,
    args: &DisableArgs,
) -> Result<(), DispatchError> {
    let mut operation = Operation::new([
        Param::Input(args.nonce.to_vec()),
        Param::Input(args.cipher.to_vec()),
        Param::Input(args.tag.to_vec()),
        Param::None,
    ]);
    backend.invoke(session, EntryId::Disable, &mut operation)?;
    Ok(())
}

/// Invokes user entry `index` with `payload` and returns the outputs it
/// emitted.
pub(crate) fn call_user(
    backend: &dyn SecureBackend,
    session: SessionHandle,
    index: u16,
    payload: &[u8],
) -> Result<Vec<Output>, DispatchError> {
    check_user_payload(payload.len())?;
    let mut operation = Operation::new([
        Param::Value {
            a: wire_len(payload.len()),
            b: u32::from(index),
        },
        Param::Output(vec![0; CONN_ID_BUFFER_LEN]),
        Param::InOut(padded(payload, DATA_BUFFER_LEN)),
        Param::Output(vec![0; TAG_BUFFER_LEN]),
    ]);
    backend.invoke(session, EntryId::User, &mut operation)?;
    Ok(outputs_of(&operation)?)
}

/// Hands one encrypted input to a module and returns the outputs it
/// emitted in response.
pub(crate) fn handle_input(
    backend: &dyn SecureBackend,
    session: SessionHandle,
    conn_id: u16,
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Vec<Output>, DispatchError> {
    let mut operation = Operation::new([
        Param::Value {
            a: wire_len(ciphertext.len()),
            b: u32::from(conn_id),
        },
        Param::Output(vec![0; CONN_ID_BUFFER_LEN]),
        Param::InOut(padded(ciphertext, DATA_BUFFER_LEN)),
        Param::InOut(padded(tag, TAG_BUFFER_LEN)),
    ]);
    backend.invoke(session, EntryId::HandleInput, &mut operation)?;
    Ok(outputs_of(&operation)?)
}

fn padded(bytes: &[u8], capacity: usize) -> Vec<u8> {
    let mut buffer = bytes.to_vec();
    buffer.resize(capacity.max(bytes.len()), 0);
    buffer
}

// Lengths reaching here are bounded by the data buffer.
fn wire_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
