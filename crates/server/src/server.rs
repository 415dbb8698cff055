//! The server-side orchestrator

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use rand::{CryptoRng, Rng};
use rayon::prelude::*;
use uuid::Uuid;

use veilfeed_anns::{digest_slot, LshIndex};
use veilfeed_pir::{PirParams, PirServer};
use veilfeed_protocol::bucket;
use veilfeed_protocol::{
    BucketQueryRequestPayload, BucketQueryResponsePayload, InitSessionResponsePayload,
    ItemQueryRequestPayload, ItemQueryResponsePayload, SetPirKeysRequestPayload,
    SetPirKeysResponsePayload, TerminateSessionResponsePayload, WaitForReadyResponsePayload,
};
use veilfeed_token::{CurveId, KeyPair};
use veilfeed_vector::Vector;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::session::SessionStore;

/// Server state: the index, the per-table and item PIR databases, the
/// token keypair and the session store. Read-only after construction
/// apart from session bookkeeping and key installation.
pub struct Server<S: PirServer> {
    config: ServerConfig,
    keys: KeyPair,
    index: LshIndex,
    items: Vec<u8>,
    bucket_cap: usize,
    table_dbs: Vec<RwLock<S>>,
    item_db: RwLock<S>,
    table_pir_params: PirParams,
    item_pir_params: PirParams,
    sessions: SessionStore,
    ready: AtomicBool,
}

impl<S: PirServer + Send + Sync> Server<S> {
    /// Build a server: construct the LSH index over data, serialize each
    /// table into a PIR database, and load the item blobs into their own
    /// database. `make_db` constructs a collaborator server handle for a
    /// parameter block.
    pub fn new<R, F>(
        config: ServerConfig,
        data: Vec<Vector>,
        items: Vec<u8>,
        make_db: F,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + CryptoRng,
        F: Fn(&PirParams) -> S,
    {
        if data.len() != config.num_items {
            return Err(ServerError::InvalidParameter(format!(
                "expected {} data vectors, got {}",
                config.num_items,
                data.len()
            )));
        }
        if items.len() != config.num_items * config.item_bytes {
            return Err(ServerError::InvalidParameter(format!(
                "expected {} item bytes, got {}",
                config.num_items * config.item_bytes,
                items.len()
            )));
        }
        if config.num_buckets == 0 {
            return Err(ServerError::InvalidParameter(
                "num_buckets must be >= 1".into(),
            ));
        }

        let keys = KeyPair::generate(CurveId::P256, rng)?;

        tracing::info!(
            items = config.num_items,
            features = config.lsh.num_features,
            tables = config.lsh.num_tables,
            "building LSH index"
        );
        let mut index = LshIndex::new(config.lsh.clone(), rng)?;
        index.build(data)?;

        // with no declared cap, size slots for the largest observed bucket
        let bucket_cap = config
            .lsh
            .bucket_cap
            .unwrap_or_else(|| index.max_bucket_sizes().into_iter().max().unwrap_or(1))
            .max(1);

        let num_items = config.num_items as u64;
        let table_pir_params = PirParams::new(
            config.num_buckets as u64,
            bucket::bucket_bytes(bucket_cap, num_items) as u32,
            config.poly_degree,
            config.logt,
            config.pir_dim,
            config.n_parallel,
        )?;
        let item_pir_params = PirParams::new(
            num_items,
            config.item_bytes as u32,
            config.poly_degree,
            config.logt,
            config.pir_dim,
            config.n_parallel,
        )?;

        let table_dbs = (0..config.lsh.num_tables)
            .map(|t| {
                let bytes = table_db_bytes(
                    &index,
                    t,
                    config.num_buckets,
                    bucket_cap,
                    num_items,
                );
                let mut db = make_db(&table_pir_params);
                db.setup_database(&bytes)?;
                Ok(RwLock::new(db))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut item_db = make_db(&item_pir_params);
        item_db.setup_database(&items)?;

        let sessions = SessionStore::new(config.max_sessions, config.session_ttl);

        tracing::info!(tables = table_dbs.len(), bucket_cap, "server ready");
        let server = Self {
            config,
            keys,
            index,
            items,
            bucket_cap,
            table_dbs,
            item_db: RwLock::new(item_db),
            table_pir_params,
            item_pir_params,
            sessions,
            ready: AtomicBool::new(true),
        };
        Ok(server)
    }

    /// Readiness probe; idempotent
    pub fn wait_for_ready(&self) -> WaitForReadyResponsePayload {
        WaitForReadyResponsePayload {
            ready: self.ready.load(Ordering::SeqCst),
        }
    }

    /// Open a session: hand the client the LSH functions and database
    /// parameters it needs to query privately.
    pub fn init_session(&self) -> Result<InitSessionResponsePayload> {
        self.ensure_ready()?;
        let id = self.sessions.create()?;
        tracing::info!(session = %id, "session initialized");

        let num_tables = self.config.lsh.num_tables;
        Ok(InitSessionResponsePayload {
            session_id: *id.as_bytes(),
            num_features: self.config.lsh.num_features as u32,
            num_categories: self.config.num_items as u32,
            num_tables: num_tables as u32,
            num_probes: self.config.lsh.num_probes.max(1) as u32,
            num_table_dbs: self.table_dbs.len() as u32,
            table_num_buckets: vec![self.config.num_buckets as u32; num_tables],
            table_pir_params: self.table_pir_params.clone(),
            item_pir_params: self.item_pir_params.clone(),
            hash_functions: (0..num_tables)
                .map(|t| self.index.hash_for_table(t).clone())
                .collect(),
        })
    }

    /// Install a client's evaluation keys on every database
    pub fn set_pir_keys(
        &self,
        session_id: &Uuid,
        request: &SetPirKeysRequestPayload,
    ) -> Result<SetPirKeysResponsePayload> {
        self.ensure_ready()?;
        self.sessions.validate(session_id)?;

        for db in &self.table_dbs {
            db.write().set_galois_keys(&request.keys)?;
        }
        self.item_db.write().set_galois_keys(&request.keys)?;
        self.sessions
            .mark_keys_ready(session_id, request.keys.client_id)?;

        tracing::info!(session = %session_id, client = request.keys.client_id, "evaluation keys installed");
        Ok(SetPirKeysResponsePayload { ok: true })
    }

    /// Answer a private bucket query: one PIR evaluation per (table,
    /// probe) slot, run concurrently, with naive-bandwidth accounting.
    pub fn private_bucket_query(
        &self,
        session_id: &Uuid,
        request: &BucketQueryRequestPayload,
    ) -> Result<BucketQueryResponsePayload> {
        let start = Instant::now();
        self.ensure_ready()?;
        self.sessions.validate(session_id)?;
        tracing::info!(
            session = %session_id,
            queries = request.queries.len(),
            "received private bucket query"
        );

        if self.config.require_token {
            let token = request.token.as_ref().ok_or(ServerError::InvalidToken)?;
            match self.keys.secret.redeem(token) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(session = %session_id, "token failed redemption");
                    return Err(ServerError::InvalidToken);
                }
                Err(e) => {
                    tracing::warn!(session = %session_id, error = %e, "malformed redemption token");
                    return Err(ServerError::InvalidToken);
                }
            }
        }

        let num_probes = self.config.lsh.num_probes.max(1) as u32;
        let answers = request
            .queries
            .par_iter()
            .map(|(slot, query)| {
                let table = (slot / num_probes) as usize;
                let db = self
                    .table_dbs
                    .get(table)
                    .ok_or(ServerError::UnknownTableDb(*slot))?;
                let shards = db.read().gen_answer(query)?;
                Ok((*slot, shards))
            })
            .collect::<Result<Vec<_>>>()?;

        let server_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(session = %session_id, ms = server_time_ms, "processed private bucket query");
        Ok(BucketQueryResponsePayload {
            answers,
            naive_bandwidth_bytes: self.naive_bandwidth_bytes(),
            server_time_ms,
        })
    }

    /// Fetch a content item, privately or by plain index
    pub fn item_query(
        &self,
        session_id: &Uuid,
        request: &ItemQueryRequestPayload,
    ) -> Result<ItemQueryResponsePayload> {
        let start = Instant::now();
        self.ensure_ready()?;
        self.sessions.validate(session_id)?;

        match request {
            ItemQueryRequestPayload::Private { query } => {
                let answers = self.item_db.read().gen_answer(query)?;
                Ok(ItemQueryResponsePayload {
                    answers,
                    item: Vec::new(),
                    server_time_ms: start.elapsed().as_millis() as u64,
                })
            }
            ItemQueryRequestPayload::Plain { index } => {
                let max = self.config.num_items as u64;
                if *index >= max {
                    return Err(ServerError::ItemOutOfRange { index: *index, max });
                }
                let size = self.config.item_bytes;
                let offset = *index as usize * size;
                Ok(ItemQueryResponsePayload {
                    answers: Vec::new(),
                    item: self.items[offset..offset + size].to_vec(),
                    server_time_ms: start.elapsed().as_millis() as u64,
                })
            }
        }
    }

    /// End a session. Idempotent: terminating an unknown session is a
    /// no-op ack.
    pub fn terminate_session(&self, session_id: &Uuid) -> TerminateSessionResponsePayload {
        if self.sessions.remove(session_id).is_some() {
            tracing::info!(session = %session_id, "session terminated");
        }
        TerminateSessionResponsePayload
    }

    /// Bytes a naive protocol would ship: every table (cap ids of
    /// ceil(log2 N) bits per bucket) plus the id-to-vector map at one
    /// byte per feature.
    pub fn naive_bandwidth_bytes(&self) -> u64 {
        let num_items = self.config.num_items as u64;
        let id_bits = bucket::id_bits(num_items) as u64;
        let bucket_bits = id_bits * self.bucket_cap as u64;
        let table_bits =
            self.config.lsh.num_tables as u64 * bucket_bits * self.config.num_buckets as u64;
        let mapping_bits = num_items * self.config.lsh.num_features as u64 * 8;
        (table_bits + mapping_bits) / 8
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(ServerError::NotReady);
        }
        Ok(())
    }

    /// The token keypair; the public half is what clients issue against
    pub fn token_keys(&self) -> &KeyPair {
        &self.keys
    }

    /// The LSH index
    pub fn index(&self) -> &LshIndex {
        &self.index
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The effective per-bucket cap used for table database sizing
    pub fn bucket_cap(&self) -> usize {
        self.bucket_cap
    }

    /// The session store
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

/// Serialize one hash table into a flat database: num_buckets fixed-size
/// slots, each bucket placed at slot digest mod num_buckets, colliding
/// buckets merged up to the cap.
fn table_db_bytes(
    index: &LshIndex,
    table: usize,
    num_buckets: usize,
    cap: usize,
    num_items: u64,
) -> Vec<u8> {
    let mut slots: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); num_buckets];
    for (key, ids) in index.table(table).iter() {
        let slot = digest_slot(&key.to_big_uint(), num_buckets as u64) as usize;
        slots[slot].extend(ids.iter().copied());
    }

    let slot_bytes = bucket::bucket_bytes(cap, num_items);
    let mut bytes = Vec::with_capacity(num_buckets * slot_bytes);
    for ids in slots {
        let ids: Vec<u32> = ids.into_iter().collect();
        bytes.extend(bucket::encode_bucket(&ids, cap, num_items));
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use veilfeed_anns::LshParams;
    use veilfeed_pir::mock::MockPirServer;
    use veilfeed_vector::DistanceMetric;

    fn test_server(rng: &mut ChaCha20Rng) -> Server<MockPirServer> {
        let lsh = LshParams {
            num_features: 8,
            num_tables: 4,
            num_probes: 1,
            num_projections: 2,
            approximation_factor: 2.0,
            projection_width: 50.0,
            hash_bytes: 8,
            metric: DistanceMetric::Euclidean,
            bucket_cap: Some(4),
        };
        let config = ServerConfig::new(lsh, 64, 16);
        let data: Vec<Vector> = (0..64)
            .map(|_| Vector::random(8, -50.0, 50.0, rng).unwrap())
            .collect();
        let items = vec![0xAB; 64 * 16];
        Server::new(config, data, items, |p| MockPirServer::new(p.clone()), rng).unwrap()
    }

    #[test]
    fn test_ready_after_build() {
        let mut rng = ChaCha20Rng::seed_from_u64(91);
        let server = test_server(&mut rng);
        assert!(server.wait_for_ready().ready);
    }

    #[test]
    fn test_init_session_shape() {
        let mut rng = ChaCha20Rng::seed_from_u64(92);
        let server = test_server(&mut rng);
        let resp = server.init_session().unwrap();

        assert_eq!(resp.num_tables, 4);
        assert_eq!(resp.num_features, 8);
        assert_eq!(resp.num_categories, 64);
        assert_eq!(resp.num_table_dbs, 4);
        assert_eq!(resp.hash_functions.len(), 4);
        assert_eq!(resp.table_num_buckets, vec![64; 4]);
    }

    #[test]
    fn test_query_requires_session() {
        let mut rng = ChaCha20Rng::seed_from_u64(93);
        let server = test_server(&mut rng);
        let request = BucketQueryRequestPayload {
            queries: vec![],
            token: None,
        };
        let bogus = Uuid::new_v4();
        assert!(matches!(
            server.private_bucket_query(&bogus, &request),
            Err(ServerError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_plain_item_query() {
        let mut rng = ChaCha20Rng::seed_from_u64(94);
        let server = test_server(&mut rng);
        let resp = server.init_session().unwrap();
        let session = Uuid::from_bytes(resp.session_id);

        let request = ItemQueryRequestPayload::Plain { index: 3 };
        let reply = server.item_query(&session, &request).unwrap();
        assert_eq!(reply.item, vec![0xAB; 16]);

        let request = ItemQueryRequestPayload::Plain { index: 64 };
        assert!(matches!(
            server.item_query(&session, &request),
            Err(ServerError::ItemOutOfRange { .. })
        ));
    }

    #[test]
    fn test_naive_bandwidth_formula() {
        // L=4, d=50, N=10000, cap=1:
        // 4 * 14 * 10000 + 10000 * 50 * 8 = 4_560_000 bits = 570_000 bytes
        let mut rng = ChaCha20Rng::seed_from_u64(95);
        let lsh = LshParams {
            num_features: 50,
            num_tables: 4,
            num_probes: 1,
            num_projections: 1,
            approximation_factor: 2.0,
            projection_width: 50.0,
            hash_bytes: 8,
            metric: DistanceMetric::Euclidean,
            bucket_cap: Some(1),
        };
        let config = ServerConfig::new(lsh, 10_000, 1);
        let data: Vec<Vector> = (0..10_000)
            .map(|_| Vector::random(50, -50.0, 50.0, &mut rng).unwrap())
            .collect();
        let items = vec![0u8; 10_000];
        let server =
            Server::new(config, data, items, |p| MockPirServer::new(p.clone()), &mut rng).unwrap();

        assert_eq!(server.naive_bandwidth_bytes(), 570_000);
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut rng = ChaCha20Rng::seed_from_u64(96);
        let server = test_server(&mut rng);
        let resp = server.init_session().unwrap();
        let session = Uuid::from_bytes(resp.session_id);

        server.terminate_session(&session);
        server.terminate_session(&session);
        assert!(server.sessions().is_empty());
    }
}
