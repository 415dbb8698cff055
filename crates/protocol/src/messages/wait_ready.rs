//! WaitForReady message pair: idempotent readiness probe

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::constants::MsgType;
use crate::error::{ProtocolError, Result};
use crate::messages::Payload;

/// WaitForReady request (Client -> Server), empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitForReadyRequestPayload;

impl Payload for WaitForReadyRequestPayload {
    const MSG_TYPE: MsgType = MsgType::WaitForReadyRequest;

    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }

    fn decode(_data: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// WaitForReady response (Server -> Client)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitForReadyResponsePayload {
    /// True once the server has finished building its index and databases
    pub ready: bool,
}

impl Payload for WaitForReadyResponsePayload {
    const MSG_TYPE: MsgType = MsgType::WaitForReadyResponse;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1);
        buf.write_u8(self.ready as u8).unwrap();
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ProtocolError::InvalidPayloadLength);
        }
        let mut cursor = Cursor::new(data);
        Ok(Self {
            ready: cursor.read_u8()? != 0,
        })
    }
}
