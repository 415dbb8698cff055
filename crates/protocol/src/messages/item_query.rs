//! ItemQuery message pair: fetch a content item by id
//!
//! Two modes on one request type: a private PIR fetch, or a plaintext
//! by-index fetch used as the non-private baseline.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use veilfeed_pir::{PirAnswer, PirQuery};

use crate::constants::MsgType;
use crate::error::{ProtocolError, Result};
use crate::messages::Payload;
use crate::records;

const MODE_PRIVATE: u8 = 0;
const MODE_PLAIN: u8 = 1;

/// ItemQuery request (Client -> Server)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemQueryRequestPayload {
    /// Oblivious fetch through the PIR collaborator
    Private { query: PirQuery },
    /// Plaintext fetch by item index
    Plain { index: u64 },
}

impl Payload for ItemQueryRequestPayload {
    const MSG_TYPE: MsgType = MsgType::ItemQueryRequest;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            ItemQueryRequestPayload::Private { query } => {
                buf.write_u8(MODE_PRIVATE).unwrap();
                records::write_pir_query(&mut buf, query).unwrap();
            }
            ItemQueryRequestPayload::Plain { index } => {
                buf.write_u8(MODE_PLAIN).unwrap();
                buf.write_u64::<LittleEndian>(*index).unwrap();
            }
        }
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        match cursor.read_u8()? {
            MODE_PRIVATE => Ok(ItemQueryRequestPayload::Private {
                query: records::read_pir_query(&mut cursor)?,
            }),
            MODE_PLAIN => Ok(ItemQueryRequestPayload::Plain {
                index: cursor.read_u64::<LittleEndian>()?,
            }),
            other => Err(ProtocolError::InvalidRecord(format!(
                "unknown item query mode {other}"
            ))),
        }
    }
}

/// ItemQuery response (Server -> Client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQueryResponsePayload {
    /// Answer shards for a private fetch; empty for a plain fetch
    pub answers: Vec<PirAnswer>,
    /// Item bytes for a plain fetch; empty for a private fetch
    pub item: Vec<u8>,
    /// Server processing time in milliseconds
    pub server_time_ms: u64,
}

impl Payload for ItemQueryResponsePayload {
    const MSG_TYPE: MsgType = MsgType::ItemQueryResponse;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(self.answers.len() as u32)
            .unwrap();
        for answer in &self.answers {
            records::write_pir_answer(&mut buf, answer).unwrap();
        }
        records::write_bytes(&mut buf, &self.item).unwrap();
        buf.write_u64::<LittleEndian>(self.server_time_ms).unwrap();
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let count = cursor.read_u32::<LittleEndian>()? as usize;
        let mut answers = Vec::with_capacity(count);
        for _ in 0..count {
            answers.push(records::read_pir_answer(&mut cursor)?);
        }
        let item = records::read_bytes(&mut cursor)?;
        let server_time_ms = cursor.read_u64::<LittleEndian>()?;
        Ok(Self {
            answers,
            item,
            server_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_roundtrip() {
        let payload = ItemQueryRequestPayload::Private {
            query: PirQuery {
                blob: vec![1, 2, 3],
                client_id: 4,
            },
        };
        assert_eq!(
            ItemQueryRequestPayload::decode(&payload.encode()).unwrap(),
            payload
        );
    }

    #[test]
    fn test_plain_roundtrip() {
        let payload = ItemQueryRequestPayload::Plain { index: 42 };
        assert_eq!(
            ItemQueryRequestPayload::decode(&payload.encode()).unwrap(),
            payload
        );
    }

    #[test]
    fn test_response_roundtrip() {
        let payload = ItemQueryResponsePayload {
            answers: vec![PirAnswer { blob: vec![5, 6] }],
            item: vec![],
            server_time_ms: 3,
        };
        assert_eq!(
            ItemQueryResponsePayload::decode(&payload.encode()).unwrap(),
            payload
        );
    }
}
