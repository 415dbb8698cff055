//! InitSession message pair: session setup
//!
//! The response hands the client everything it needs to issue private
//! bucket queries: the per-table LSH functions, per-table bucket counts,
//! and the PIR parameters for the table and item databases.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use veilfeed_anns::Lsh;
use veilfeed_pir::PirParams;

use crate::constants::{MsgType, SESSION_ID_LEN};
use crate::error::{ProtocolError, Result};
use crate::messages::Payload;
use crate::records;

/// InitSession request (Client -> Server), empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitSessionRequestPayload;

impl Payload for InitSessionRequestPayload {
    const MSG_TYPE: MsgType = MsgType::InitSessionRequest;

    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }

    fn decode(_data: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// InitSession response (Server -> Client)
#[derive(Debug, Clone)]
pub struct InitSessionResponsePayload {
    /// Fresh session id
    pub session_id: [u8; SESSION_ID_LEN],
    /// Feature-vector dimension d
    pub num_features: u32,
    /// Total number of content items N
    pub num_categories: u32,
    /// Number of hash tables L
    pub num_tables: u32,
    /// Probes per table at query time
    pub num_probes: u32,
    /// Number of table databases to address queries to
    pub num_table_dbs: u32,
    /// Bucket slots per table database
    pub table_num_buckets: Vec<u32>,
    /// PIR parameters of the table databases
    pub table_pir_params: PirParams,
    /// PIR parameters of the item database
    pub item_pir_params: PirParams,
    /// One composed LSH per table, in table order
    pub hash_functions: Vec<Lsh>,
}

impl Payload for InitSessionResponsePayload {
    const MSG_TYPE: MsgType = MsgType::InitSessionResponse;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.session_id);
        buf.write_u32::<LittleEndian>(self.num_features).unwrap();
        buf.write_u32::<LittleEndian>(self.num_categories).unwrap();
        buf.write_u32::<LittleEndian>(self.num_tables).unwrap();
        buf.write_u32::<LittleEndian>(self.num_probes).unwrap();
        buf.write_u32::<LittleEndian>(self.num_table_dbs).unwrap();

        buf.write_u32::<LittleEndian>(self.table_num_buckets.len() as u32)
            .unwrap();
        for &count in &self.table_num_buckets {
            buf.write_u32::<LittleEndian>(count).unwrap();
        }

        records::write_pir_params(&mut buf, &self.table_pir_params).unwrap();
        records::write_pir_params(&mut buf, &self.item_pir_params).unwrap();

        buf.write_u32::<LittleEndian>(self.hash_functions.len() as u32)
            .unwrap();
        for lsh in &self.hash_functions {
            records::write_lsh(&mut buf, lsh).unwrap();
        }
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < SESSION_ID_LEN + 5 * 4 {
            return Err(ProtocolError::InvalidPayloadLength);
        }
        let mut cursor = Cursor::new(data);

        let mut session_id = [0u8; SESSION_ID_LEN];
        cursor.read_exact(&mut session_id)?;
        let num_features = cursor.read_u32::<LittleEndian>()?;
        let num_categories = cursor.read_u32::<LittleEndian>()?;
        let num_tables = cursor.read_u32::<LittleEndian>()?;
        let num_probes = cursor.read_u32::<LittleEndian>()?;
        let num_table_dbs = cursor.read_u32::<LittleEndian>()?;

        let bucket_count = cursor.read_u32::<LittleEndian>()? as usize;
        let mut table_num_buckets = Vec::with_capacity(bucket_count);
        for _ in 0..bucket_count {
            table_num_buckets.push(cursor.read_u32::<LittleEndian>()?);
        }

        let table_pir_params = records::read_pir_params(&mut cursor)?;
        let item_pir_params = records::read_pir_params(&mut cursor)?;

        let hash_count = cursor.read_u32::<LittleEndian>()? as usize;
        let mut hash_functions = Vec::with_capacity(hash_count);
        for _ in 0..hash_count {
            hash_functions.push(records::read_lsh(&mut cursor)?);
        }

        Ok(Self {
            session_id,
            num_features,
            num_categories,
            num_tables,
            num_probes,
            num_table_dbs,
            table_num_buckets,
            table_pir_params,
            item_pir_params,
            hash_functions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use veilfeed_vector::{DistanceMetric, Vector};

    #[test]
    fn test_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(81);
        let hash_functions: Vec<Lsh> = (0..4)
            .map(|_| Lsh::new(DistanceMetric::Euclidean, 8, 50.0, 2, &mut rng).unwrap())
            .collect();

        let payload = InitSessionResponsePayload {
            session_id: [9u8; SESSION_ID_LEN],
            num_features: 8,
            num_categories: 10_000,
            num_tables: 4,
            num_probes: 1,
            num_table_dbs: 4,
            table_num_buckets: vec![10_000; 4],
            table_pir_params: PirParams::new(10_000, 4, 2048, 12, 2, 1).unwrap(),
            item_pir_params: PirParams::new(10_000, 64, 2048, 12, 2, 1).unwrap(),
            hash_functions,
        };

        let decoded = InitSessionResponsePayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded.session_id, payload.session_id);
        assert_eq!(decoded.num_categories, 10_000);
        assert_eq!(decoded.table_num_buckets, payload.table_num_buckets);
        assert_eq!(decoded.table_pir_params, payload.table_pir_params);
        assert_eq!(decoded.hash_functions.len(), 4);

        // reconstructed hash functions digest identically
        let v = Vector::random(8, -50.0, 50.0, &mut rng).unwrap();
        for (orig, dec) in payload.hash_functions.iter().zip(&decoded.hash_functions) {
            assert_eq!(orig.digest(&v).unwrap(), dec.digest(&v).unwrap());
        }
    }
}
