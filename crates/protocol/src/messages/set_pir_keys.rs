//! SetPirKeys message pair: install client evaluation keys

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use veilfeed_pir::GaloisKeys;

use crate::constants::MsgType;
use crate::error::{ProtocolError, Result};
use crate::messages::Payload;
use crate::records;

/// SetPirKeys request (Client -> Server)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPirKeysRequestPayload {
    /// Galois/expansion keys for the table and item databases
    pub keys: GaloisKeys,
}

impl Payload for SetPirKeysRequestPayload {
    const MSG_TYPE: MsgType = MsgType::SetPirKeysRequest;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        records::write_galois_keys(&mut buf, &self.keys).unwrap();
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        Ok(Self {
            keys: records::read_galois_keys(&mut cursor)?,
        })
    }
}

/// SetPirKeys response (Server -> Client), an ack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetPirKeysResponsePayload {
    pub ok: bool,
}

impl Payload for SetPirKeysResponsePayload {
    const MSG_TYPE: MsgType = MsgType::SetPirKeysResponse;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1);
        buf.write_u8(self.ok as u8).unwrap();
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ProtocolError::InvalidPayloadLength);
        }
        let mut cursor = Cursor::new(data);
        Ok(Self {
            ok: cursor.read_u8()? != 0,
        })
    }
}
