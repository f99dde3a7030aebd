//! Forwarder double capturing every frame it is asked to send.

use std::net::SocketAddrV4;
use std::sync::Mutex;

use eventmgr_wire::CommandFrame;

use crate::forward::{ForwardError, Forwarder};

/// Records forwards instead of opening connections.
#[derive(Default)]
pub struct RecordingForwarder {
    sent: Mutex<Vec<(SocketAddrV4, CommandFrame)>>,
}

impl RecordingForwarder {
    /// Frames sent so far, in order.
    pub fn sent(&self) -> Vec<(SocketAddrV4, CommandFrame)> {
        self.sent.lock().expect("forwarder mutex poisoned").clone()
    }
}

impl Forwarder for RecordingForwarder {
    fn forward(&self, destination: SocketAddrV4, frame: &CommandFrame) -> Result<(), ForwardError> {
        self.sent
            .lock()
            .expect("forwarder mutex poisoned")
            .push((destination, frame.clone()));
        Ok(())
    }
}
