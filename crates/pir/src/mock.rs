//! In-memory mock backend
//!
//! A plaintext stand-in for the lattice-based collaborator, faithful to
//! its shapes: the database splits into n_parallel shards, answers come
//! back one per shard, and recovery extracts the requested offset from
//! the shard that held the plaintext. Queries are transparent index
//! encodings — nothing here is oblivious, which is exactly enough for
//! exercising the orchestrator.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{PirError, Result};
use crate::params::PirParams;
use crate::traits::{GaloisKeys, PirAnswer, PirClient, PirQuery, PirServer};

const QUERY_BLOB_LEN: usize = 8;

/// Mock client handle
#[derive(Debug, Clone)]
pub struct MockPirClient {
    params: PirParams,
    client_id: u64,
}

impl MockPirClient {
    pub fn new(params: PirParams, client_id: u64) -> Self {
        Self { params, client_id }
    }
}

impl PirClient for MockPirClient {
    fn params(&self) -> &PirParams {
        &self.params
    }

    fn client_id(&self) -> u64 {
        self.client_id
    }

    fn gen_galois_keys(&self) -> Result<GaloisKeys> {
        // a recognizable placeholder blob; the real backend serializes
        // kilobytes of key material here
        let mut blob = b"mock-galois-".to_vec();
        let mut id = [0u8; 8];
        LittleEndian::write_u64(&mut id, self.client_id);
        blob.extend_from_slice(&id);
        Ok(GaloisKeys {
            blob,
            client_id: self.client_id,
        })
    }

    fn gen_query(&self, index: u64) -> Result<PirQuery> {
        let num_plaintexts = self
            .params
            .num_items
            .div_ceil(self.params.elems_per_plaintext());
        if index >= num_plaintexts {
            return Err(PirError::IndexOutOfRange {
                index,
                max: num_plaintexts,
            });
        }
        let mut blob = vec![0u8; QUERY_BLOB_LEN];
        LittleEndian::write_u64(&mut blob, index);
        Ok(PirQuery {
            blob,
            client_id: self.client_id,
        })
    }

    fn recover(&self, answers: &[PirAnswer], offset: u64) -> Result<Vec<u8>> {
        // the shard that held the plaintext returns it; the others are empty
        let plaintext = answers
            .iter()
            .find(|a| !a.blob.is_empty())
            .ok_or(PirError::MalformedAnswer)?;

        let item_bytes = self.params.item_bytes as usize;
        let start = offset as usize * item_bytes;
        let end = start + item_bytes;
        if end > plaintext.blob.len() {
            return Err(PirError::MalformedAnswer);
        }
        Ok(plaintext.blob[start..end].to_vec())
    }
}

/// Mock server handle
#[derive(Debug)]
pub struct MockPirServer {
    params: PirParams,
    shards: Vec<Vec<u8>>,
    plaintexts_per_shard: u64,
    keyed_clients: Vec<u64>,
}

impl MockPirServer {
    pub fn new(params: PirParams) -> Self {
        Self {
            params,
            shards: Vec::new(),
            plaintexts_per_shard: 0,
            keyed_clients: Vec::new(),
        }
    }

    fn plaintext_bytes(&self) -> usize {
        self.params.elems_per_plaintext() as usize * self.params.item_bytes as usize
    }
}

impl PirServer for MockPirServer {
    fn params(&self) -> &PirParams {
        &self.params
    }

    fn set_galois_keys(&mut self, keys: &GaloisKeys) -> Result<()> {
        if !self.keyed_clients.contains(&keys.client_id) {
            self.keyed_clients.push(keys.client_id);
        }
        Ok(())
    }

    fn setup_database(&mut self, bytes: &[u8]) -> Result<()> {
        let expected = self.params.database_bytes() as usize;
        if bytes.len() != expected {
            return Err(PirError::InvalidParameter(format!(
                "database is {} bytes, parameters require {expected}",
                bytes.len()
            )));
        }

        // pad to whole plaintexts, then split into n_parallel shard ranges
        let pt_bytes = self.plaintext_bytes();
        let mut padded = bytes.to_vec();
        if padded.len() % pt_bytes != 0 {
            padded.resize(padded.len().div_ceil(pt_bytes) * pt_bytes, 0);
        }
        let num_plaintexts = (padded.len() / pt_bytes) as u64;
        self.plaintexts_per_shard = num_plaintexts.div_ceil(self.params.n_parallel as u64);

        self.shards = (0..self.params.n_parallel as u64)
            .map(|shard| {
                let start = (shard * self.plaintexts_per_shard * pt_bytes as u64) as usize;
                let end = (((shard + 1) * self.plaintexts_per_shard * pt_bytes as u64) as usize)
                    .min(padded.len());
                padded.get(start..end).map(|s| s.to_vec()).unwrap_or_default()
            })
            .collect();
        Ok(())
    }

    fn gen_answer(&self, query: &PirQuery) -> Result<Vec<PirAnswer>> {
        if self.shards.is_empty() {
            return Err(PirError::DatabaseNotInitialized);
        }
        if !self.keyed_clients.contains(&query.client_id) {
            return Err(PirError::KeysNotInstalled {
                client_id: query.client_id,
            });
        }
        if query.blob.len() != QUERY_BLOB_LEN {
            return Err(PirError::MalformedQuery);
        }

        let index = LittleEndian::read_u64(&query.blob);
        let pt_bytes = self.plaintext_bytes();

        Ok((0..self.params.n_parallel as u64)
            .map(|shard| {
                let local = index.checked_sub(shard * self.plaintexts_per_shard);
                let blob = match local {
                    Some(local) if local < self.plaintexts_per_shard => {
                        let start = local as usize * pt_bytes;
                        self.shards[shard as usize]
                            .get(start..start + pt_bytes)
                            .map(|s| s.to_vec())
                            .unwrap_or_default()
                    }
                    _ => Vec::new(),
                };
                PirAnswer { blob }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(num_items: u64, item_bytes: u32, n_parallel: u32) -> (MockPirClient, MockPirServer) {
        let params = PirParams::new(num_items, item_bytes, 2048, 12, 2, n_parallel).unwrap();
        let client = MockPirClient::new(params.clone(), 7);
        let mut server = MockPirServer::new(params);

        let db: Vec<u8> = (0..num_items * item_bytes as u64)
            .map(|i| (i % 251) as u8)
            .collect();
        server.setup_database(&db).unwrap();
        server
            .set_galois_keys(&client.gen_galois_keys().unwrap())
            .unwrap();
        (client, server)
    }

    #[test]
    fn test_roundtrip_single_shard() {
        let (client, server) = setup(100, 32, 1);
        for elem in [0u64, 1, 57, 99] {
            let query = client.gen_query(client.fv_index(elem)).unwrap();
            let answers = server.gen_answer(&query).unwrap();
            assert_eq!(answers.len(), 1);
            let item = client.recover(&answers, client.fv_offset(elem)).unwrap();
            let start = (elem * 32) as usize;
            let expected: Vec<u8> = (start..start + 32).map(|i| (i % 251) as u8).collect();
            assert_eq!(item, expected);
        }
    }

    #[test]
    fn test_roundtrip_multi_shard() {
        let (client, server) = setup(1000, 64, 4);
        let query = client.gen_query(client.fv_index(777)).unwrap();
        let answers = server.gen_answer(&query).unwrap();
        assert_eq!(answers.len(), 4);
        let item = client.recover(&answers, client.fv_offset(777)).unwrap();
        let start = 777 * 64;
        let expected: Vec<u8> = (start..start + 64).map(|i| (i % 251) as u8).collect();
        assert_eq!(item, expected);
    }

    #[test]
    fn test_answer_requires_keys() {
        let params = PirParams::new(10, 8, 2048, 12, 2, 1).unwrap();
        let client = MockPirClient::new(params.clone(), 1);
        let mut server = MockPirServer::new(params);
        server.setup_database(&[0u8; 80]).unwrap();

        let query = client.gen_query(0).unwrap();
        assert!(matches!(
            server.gen_answer(&query),
            Err(PirError::KeysNotInstalled { client_id: 1 })
        ));
    }

    #[test]
    fn test_answer_requires_database() {
        let params = PirParams::new(10, 8, 2048, 12, 2, 1).unwrap();
        let client = MockPirClient::new(params.clone(), 1);
        let server = MockPirServer::new(params);
        let query = client.gen_query(0).unwrap();
        assert!(matches!(
            server.gen_answer(&query),
            Err(PirError::DatabaseNotInitialized)
        ));
    }

    #[test]
    fn test_query_index_bounds() {
        let (client, _) = setup(100, 32, 1);
        let num_plaintexts = 100u64.div_ceil(client.params().elems_per_plaintext());
        assert!(client.gen_query(num_plaintexts).is_err());
    }
}
