//! Scripted secure backend for routing scenarios.
//!
//! Sessions are handed out from 1 upwards in installation order. Replies are
//! keyed by session and entry and persist, so a module routed into itself
//! keeps answering the same way.

use std::collections::HashMap;
use std::sync::Mutex;

use eventmgr_wire::{ModuleUuid, TAG_LEN, Tag};

use crate::backend::{BackendError, EntryId, Operation, Param, SecureBackend, SessionHandle};
use crate::dispatch::Output;

/// How a scripted session answers an invocation.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Succeed and emit these outputs.
    Outputs(Vec<Output>),
    /// Fail with this backend code.
    Fail(u32),
    /// Succeed and write this MAC into the attest result slot.
    Mac(Tag),
    /// Succeed but report more outputs than the buffers hold.
    Malformed,
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Session invoked.
    pub session: SessionHandle,
    /// Entry invoked.
    pub entry: EntryId,
    /// Parameters as handed to the backend.
    pub operation: Operation,
}

#[derive(Default)]
struct State {
    next_session: u64,
    installs: Vec<(ModuleUuid, Vec<u8>)>,
    invocations: Vec<Invocation>,
    closed: Vec<SessionHandle>,
    replies: HashMap<(SessionHandle, EntryId), ScriptedReply>,
    failing_installs: bool,
}

/// Backend double driven by per-session scripts.
#[derive(Default)]
pub struct ScriptedBackend {
    state: Mutex<State>,
}

impl ScriptedBackend {
    /// Scripts the reply for `entry` on `session`.
    pub fn reply(&self, session: SessionHandle, entry: EntryId, reply: ScriptedReply) {
        self.lock().replies.insert((session, entry), reply);
    }

    /// Makes every later installation fail.
    pub fn fail_installs(&self) {
        self.lock().failing_installs = true;
    }

    /// Images installed so far.
    pub fn installs(&self) -> Vec<(ModuleUuid, Vec<u8>)> {
        self.lock().installs.clone()
    }

    /// Invocations performed so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().invocations.clone()
    }

    /// Invocations of `entry`, in order.
    pub fn invocations_of(&self, entry: EntryId) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|invocation| invocation.entry == entry)
            .collect()
    }

    /// Sessions closed so far.
    pub fn closed(&self) -> Vec<SessionHandle> {
        self.lock().closed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("scripted backend mutex poisoned")
    }
}

impl SecureBackend for ScriptedBackend {
    fn install(&self, uuid: &ModuleUuid, image: &[u8]) -> Result<SessionHandle, BackendError> {
        let mut state = self.lock();
        if state.failing_installs {
            return Err(BackendError::Session {
                uuid: *uuid,
                message: String::from("scripted refusal"),
            });
        }
        state.next_session += 1;
        state.installs.push((*uuid, image.to_vec()));
        Ok(SessionHandle::new(state.next_session))
    }

    fn invoke(
        &self,
        session: SessionHandle,
        entry: EntryId,
        operation: &mut Operation,
    ) -> Result<(), BackendError> {
        let reply = {
            let mut state = self.lock();
            state.invocations.push(Invocation {
                session,
                entry,
                operation: operation.clone(),
            });
            state.replies.get(&(session, entry)).cloned()
        };
        match reply {
            None => {
                clear_count(operation);
                Ok(())
            }
            Some(ScriptedReply::Outputs(outputs)) => {
                write_outputs(operation, &outputs);
                Ok(())
            }
            Some(ScriptedReply::Fail(code)) => Err(BackendError::Invoke { entry, code }),
            Some(ScriptedReply::Mac(mac)) => {
                if let Some(slot) = operation.param_mut(1).and_then(Param::writable) {
                    overwrite(slot, &mac);
                }
                Ok(())
            }
            Some(ScriptedReply::Malformed) => {
                set_count(operation, 40);
                Ok(())
            }
        }
    }

    fn close(&self, session: SessionHandle) {
        self.lock().closed.push(session);
    }
}

fn clear_count(operation: &mut Operation) {
    if matches!(operation.param(0), Some(Param::Value { .. })) {
        set_count(operation, 0);
    }
}

fn set_count(operation: &mut Operation, count: u32) {
    if let Some(Param::Value { b, .. }) = operation.param_mut(0) {
        *b = count;
    }
}

fn write_outputs(operation: &mut Operation, outputs: &[Output]) {
    let conn_ids: Vec<u8> = outputs
        .iter()
        .flat_map(|output| output.conn_id.to_be_bytes())
        .collect();
    let chunks: Vec<u8> = outputs
        .iter()
        .flat_map(|output| {
            let len = u8::try_from(output.ciphertext.len()).expect("scripted chunk too long");
            std::iter::once(len).chain(output.ciphertext.iter().copied())
        })
        .collect();
    let tags: Vec<u8> = outputs.iter().flat_map(|output| output.tag).collect();
    assert_eq!(tags.len(), outputs.len() * TAG_LEN);

    for (slot, bytes) in [(1, conn_ids), (2, chunks), (3, tags)] {
        let buffer = operation
            .param_mut(slot)
            .and_then(Param::writable)
            .expect("result slot should be writable");
        overwrite(buffer, &bytes);
    }
    set_count(
        operation,
        u32::try_from(outputs.len()).expect("scripted output count"),
    );
}

fn overwrite(buffer: &mut Vec<u8>, bytes: &[u8]) {
    let end = bytes.len().min(buffer.len());
    buffer[..end].copy_from_slice(&bytes[..end]);
}
