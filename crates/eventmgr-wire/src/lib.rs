//! Wire protocol shared by the Event Manager daemon and its peers.
//!
//! The protocol is a single request/response exchange per TCP connection.
//! A client writes one [`CommandFrame`], the daemon answers with one
//! [`ResultFrame`] and closes. Integers are big-endian throughout. Command
//! payloads are decoded with the bounds-checked [`Cursor`]; the layouts live
//! in [`payload`].

mod code;
mod cursor;
mod frame;
pub mod payload;
mod uuid;

pub use code::{Opcode, ResultCode};
pub use cursor::{Cursor, CursorError};
pub use frame::{
    CommandFrame, FrameError, FramePart, MAX_LOAD_MODULE_LEN, MAX_SHORT_PAYLOAD_LEN, ResultFrame,
};
pub use payload::{MAX_CIPHERTEXT_LEN, PayloadError, TAG_LEN, Tag};
pub use uuid::{ModuleUuid, UUID_LEN};
