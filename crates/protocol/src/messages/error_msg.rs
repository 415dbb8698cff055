//! Error message payload

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::constants::{ErrorCode, MsgType};
use crate::error::{ProtocolError, Result};
use crate::messages::Payload;
use crate::records;

/// Error response (Server -> Client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Payload for ErrorPayload {
    const MSG_TYPE: MsgType = MsgType::Error;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<LittleEndian>(self.code.to_u16()).unwrap();
        records::write_bytes(&mut buf, self.message.as_bytes()).unwrap();
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let raw = cursor.read_u16::<LittleEndian>()?;
        let code = ErrorCode::from_u16(raw)
            .ok_or_else(|| ProtocolError::InvalidRecord(format!("unknown error code {raw}")))?;
        let message = String::from_utf8(records::read_bytes(&mut cursor)?)
            .map_err(|_| ProtocolError::InvalidRecord("error message is not UTF-8".into()))?;
        Ok(Self { code, message })
    }
}
