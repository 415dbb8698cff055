//! Message payloads

mod bucket_query;
mod error_msg;
mod init_session;
mod item_query;
mod set_pir_keys;
mod terminate;
mod wait_ready;

pub use bucket_query::{BucketQueryRequestPayload, BucketQueryResponsePayload};
pub use error_msg::ErrorPayload;
pub use init_session::{InitSessionRequestPayload, InitSessionResponsePayload};
pub use item_query::{ItemQueryRequestPayload, ItemQueryResponsePayload};
pub use set_pir_keys::{SetPirKeysRequestPayload, SetPirKeysResponsePayload};
pub use terminate::{TerminateSessionRequestPayload, TerminateSessionResponsePayload};
pub use wait_ready::{WaitForReadyRequestPayload, WaitForReadyResponsePayload};

use crate::constants::MsgType;
use crate::error::Result;
use crate::frame::Frame;
use crate::header::Header;

/// A typed message payload that knows its wire encoding
pub trait Payload: Sized {
    const MSG_TYPE: MsgType;

    /// Encode the payload to bytes
    fn encode(&self) -> Vec<u8>;

    /// Decode the payload from bytes
    fn decode(data: &[u8]) -> Result<Self>;

    /// Wrap the payload in a frame
    fn into_frame(self, header: Header) -> Frame {
        let payload = self.encode();
        Frame::new(Self::MSG_TYPE, header, payload)
    }
}
