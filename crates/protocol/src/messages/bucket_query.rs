//! BucketQuery message pair: the private bucket retrieval
//!
//! The request carries one oblivious query per (table, probe) slot, keyed
//! by table_db_index = table * num_probes + probe, plus an optional
//! redemption token gating the request. The response carries the answer
//! shards per slot and two diagnostic fields: what a naive protocol would
//! have shipped, and the server's wall-clock time.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use veilfeed_pir::{PirAnswer, PirQuery};
use veilfeed_token::SignedToken;

use crate::constants::MsgType;
use crate::error::Result;
use crate::messages::Payload;
use crate::records;

/// BucketQuery request (Client -> Server)
#[derive(Debug, Clone)]
pub struct BucketQueryRequestPayload {
    /// One query per (table, probe) slot, keyed by table db index
    pub queries: Vec<(u32, PirQuery)>,
    /// Redemption token authorizing this retrieval, when the server
    /// requires one
    pub token: Option<SignedToken>,
}

impl Payload for BucketQueryRequestPayload {
    const MSG_TYPE: MsgType = MsgType::BucketQueryRequest;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(self.queries.len() as u32)
            .unwrap();
        for (slot, query) in &self.queries {
            buf.write_u32::<LittleEndian>(*slot).unwrap();
            records::write_pir_query(&mut buf, query).unwrap();
        }
        match &self.token {
            Some(token) => {
                buf.write_u8(1).unwrap();
                records::write_token(&mut buf, token).unwrap();
            }
            None => buf.write_u8(0).unwrap(),
        }
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let count = cursor.read_u32::<LittleEndian>()? as usize;
        let mut queries = Vec::with_capacity(count);
        for _ in 0..count {
            let slot = cursor.read_u32::<LittleEndian>()?;
            queries.push((slot, records::read_pir_query(&mut cursor)?));
        }
        let token = match cursor.read_u8()? {
            0 => None,
            _ => Some(records::read_token(&mut cursor)?),
        };
        Ok(Self { queries, token })
    }
}

/// BucketQuery response (Server -> Client)
#[derive(Debug, Clone)]
pub struct BucketQueryResponsePayload {
    /// Answer shards per table db index, position-matched to the request
    pub answers: Vec<(u32, Vec<PirAnswer>)>,
    /// What sending every table plus the id-to-vector map in the clear
    /// would have cost
    pub naive_bandwidth_bytes: u64,
    /// Server processing time in milliseconds
    pub server_time_ms: u64,
}

impl Payload for BucketQueryResponsePayload {
    const MSG_TYPE: MsgType = MsgType::BucketQueryResponse;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(self.answers.len() as u32)
            .unwrap();
        for (slot, shards) in &self.answers {
            buf.write_u32::<LittleEndian>(*slot).unwrap();
            buf.write_u32::<LittleEndian>(shards.len() as u32).unwrap();
            for shard in shards {
                records::write_pir_answer(&mut buf, shard).unwrap();
            }
        }
        buf.write_u64::<LittleEndian>(self.naive_bandwidth_bytes)
            .unwrap();
        buf.write_u64::<LittleEndian>(self.server_time_ms).unwrap();
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let count = cursor.read_u32::<LittleEndian>()? as usize;
        let mut answers = Vec::with_capacity(count);
        for _ in 0..count {
            let slot = cursor.read_u32::<LittleEndian>()?;
            let shard_count = cursor.read_u32::<LittleEndian>()? as usize;
            let mut shards = Vec::with_capacity(shard_count);
            for _ in 0..shard_count {
                shards.push(records::read_pir_answer(&mut cursor)?);
            }
            answers.push((slot, shards));
        }
        let naive_bandwidth_bytes = cursor.read_u64::<LittleEndian>()?;
        let server_time_ms = cursor.read_u64::<LittleEndian>()?;
        Ok(Self {
            answers,
            naive_bandwidth_bytes,
            server_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let payload = BucketQueryRequestPayload {
            queries: vec![
                (
                    0,
                    PirQuery {
                        blob: vec![1, 2, 3],
                        client_id: 7,
                    },
                ),
                (
                    1,
                    PirQuery {
                        blob: vec![4, 5],
                        client_id: 7,
                    },
                ),
            ],
            token: None,
        };
        let decoded = BucketQueryRequestPayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded.queries, payload.queries);
        assert!(decoded.token.is_none());
    }

    #[test]
    fn test_response_roundtrip() {
        let payload = BucketQueryResponsePayload {
            answers: vec![
                (0, vec![PirAnswer { blob: vec![9, 8] }]),
                (1, vec![PirAnswer { blob: vec![] }, PirAnswer { blob: vec![7] }]),
            ],
            naive_bandwidth_bytes: 570_000,
            server_time_ms: 12,
        };
        let decoded = BucketQueryResponsePayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded.answers, payload.answers);
        assert_eq!(decoded.naive_bandwidth_bytes, 570_000);
        assert_eq!(decoded.server_time_ms, 12);
    }
}
