//! The client-side orchestrator

use std::collections::BTreeMap;

use rand::Rng;
use uuid::Uuid;

use veilfeed_anns::{digest_slot, HashFn, Lsh};
use veilfeed_pir::{PirClient, PirParams};
use veilfeed_protocol::bucket;
use veilfeed_protocol::{
    BucketQueryRequestPayload, BucketQueryResponsePayload, InitSessionResponsePayload,
    ItemQueryRequestPayload, ItemQueryResponsePayload, SetPirKeysRequestPayload,
};
use veilfeed_token::SignedToken;
use veilfeed_vector::Vector;

use crate::error::{ClientError, Result};

/// Session parameters accepted from the server
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub session_id: Uuid,
    pub num_features: usize,
    pub num_categories: usize,
    pub num_tables: usize,
    pub num_probes: usize,
    pub num_table_dbs: usize,
    pub table_num_buckets: Vec<u32>,
}

/// Bookkeeping for an in-flight bucket query: the recovery offset for
/// each query slot. Answers are matched to slots by position, not by
/// arrival order.
#[derive(Debug, Clone)]
pub struct PendingBucketQuery {
    offsets: BTreeMap<u32, u64>,
}

/// Bookkeeping for an in-flight private item query
#[derive(Debug, Clone, Copy)]
pub struct PendingItemQuery {
    offset: u64,
}

/// One recovered bucket: which (table, probe) produced it and the
/// candidate ids it held
#[derive(Debug, Clone)]
pub struct RecoveredBucket {
    pub table: u32,
    pub probe: u32,
    pub ids: Vec<u32>,
}

struct SessionState<C: PirClient> {
    params: SessionParams,
    hashes: Vec<Lsh>,
    table_pir: C,
    item_pir: C,
}

/// Client state: the private profile and, once a session is open, the
/// server-provided hash functions and PIR client handles
pub struct Client<C: PirClient> {
    profile: Vector,
    session: Option<SessionState<C>>,
}

impl<C: PirClient> Client<C> {
    /// Create a client around a profile vector
    pub fn new(profile: Vector) -> Self {
        Self {
            profile,
            session: None,
        }
    }

    /// The client's profile
    pub fn profile(&self) -> &Vector {
        &self.profile
    }

    /// Adopt a session: validate the offered parameters against the
    /// profile and initialize the PIR client handles. `make_client`
    /// constructs a collaborator client handle for a parameter block.
    pub fn apply_session<F>(
        &mut self,
        response: &InitSessionResponsePayload,
        make_client: F,
    ) -> Result<()>
    where
        F: Fn(&PirParams) -> C,
    {
        if response.num_features as usize != self.profile.dim() {
            return Err(ClientError::InvalidParameter(format!(
                "server expects {} features, profile has {}",
                response.num_features,
                self.profile.dim()
            )));
        }
        if response.hash_functions.len() != response.num_tables as usize {
            return Err(ClientError::InvalidParameter(format!(
                "server sent {} hash functions for {} tables",
                response.hash_functions.len(),
                response.num_tables
            )));
        }
        if response.table_num_buckets.len() != response.num_tables as usize {
            return Err(ClientError::InvalidParameter(
                "per-table bucket counts do not match table count".into(),
            ));
        }

        let params = SessionParams {
            session_id: Uuid::from_bytes(response.session_id),
            num_features: response.num_features as usize,
            num_categories: response.num_categories as usize,
            num_tables: response.num_tables as usize,
            num_probes: response.num_probes.max(1) as usize,
            num_table_dbs: response.num_table_dbs as usize,
            table_num_buckets: response.table_num_buckets.clone(),
        };

        tracing::info!(
            session = %params.session_id,
            tables = params.num_tables,
            probes = params.num_probes,
            "session adopted"
        );

        self.session = Some(SessionState {
            table_pir: make_client(&response.table_pir_params),
            item_pir: make_client(&response.item_pir_params),
            hashes: response.hash_functions.clone(),
            params,
        });
        Ok(())
    }

    /// The active session's parameters
    pub fn session_params(&self) -> Result<&SessionParams> {
        self.session
            .as_ref()
            .map(|s| &s.params)
            .ok_or(ClientError::NoSession)
    }

    /// Build the key-upload request from the PIR client's evaluation keys
    pub fn galois_keys(&self) -> Result<SetPirKeysRequestPayload> {
        let session = self.session.as_ref().ok_or(ClientError::NoSession)?;
        Ok(SetPirKeysRequestPayload {
            keys: session.table_pir.gen_galois_keys()?,
        })
    }

    /// Build one oblivious lookup per (table, probe) pair.
    ///
    /// Probe 0 digests the profile itself; further probes digest
    /// perturbed copies so a near-miss bucket can still be hit. Returns
    /// the request and the recovery offsets for matching answers back.
    pub fn build_bucket_query<R: Rng>(
        &self,
        token: Option<SignedToken>,
        rng: &mut R,
    ) -> Result<(BucketQueryRequestPayload, PendingBucketQuery)> {
        let session = self.session.as_ref().ok_or(ClientError::NoSession)?;
        let params = &session.params;

        let mut queries = Vec::with_capacity(params.num_tables * params.num_probes);
        let mut offsets = BTreeMap::new();

        for table in 0..params.num_tables {
            let lsh = &session.hashes[table];
            let num_buckets = params.table_num_buckets[table] as u64;

            for probe in 0..params.num_probes {
                let point = if probe == 0 {
                    self.profile.clone()
                } else {
                    probe_vector(lsh, &self.profile, rng)?
                };

                let digest = lsh.digest(&point)?;
                let elem_index = digest_slot(&digest, num_buckets);

                let pir = &session.table_pir;
                let query = pir.gen_query(pir.fv_index(elem_index))?;
                let slot = (table * params.num_probes + probe) as u32;

                offsets.insert(slot, pir.fv_offset(elem_index));
                queries.push((slot, query));
            }
        }

        Ok((
            BucketQueryRequestPayload { queries, token },
            PendingBucketQuery { offsets },
        ))
    }

    /// Recover the bucket behind every answered slot and decode its
    /// candidate ids
    pub fn recover_buckets(
        &self,
        pending: &PendingBucketQuery,
        response: &BucketQueryResponsePayload,
    ) -> Result<Vec<RecoveredBucket>> {
        let session = self.session.as_ref().ok_or(ClientError::NoSession)?;
        let num_probes = session.params.num_probes as u32;
        let num_items = session.params.num_categories as u64;

        let mut buckets = Vec::with_capacity(response.answers.len());
        for (slot, shards) in &response.answers {
            let offset = pending
                .offsets
                .get(slot)
                .copied()
                .ok_or(ClientError::UnknownSlot(*slot))?;
            let bytes = session.table_pir.recover(shards, offset)?;
            let ids = bucket::decode_bucket(&bytes, num_items)?;
            buckets.push(RecoveredBucket {
                table: slot / num_probes,
                probe: slot % num_probes,
                ids,
            });
        }
        Ok(buckets)
    }

    /// Flatten recovered buckets into candidate ids, deduplicated in
    /// first-seen order
    pub fn merged_candidates(buckets: &[RecoveredBucket]) -> Vec<u32> {
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        for bucket in buckets {
            for &id in &bucket.ids {
                if seen.insert(id) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Build a private fetch for the content item with the given id
    pub fn build_item_query(&self, id: u64) -> Result<(ItemQueryRequestPayload, PendingItemQuery)> {
        let session = self.session.as_ref().ok_or(ClientError::NoSession)?;
        let pir = &session.item_pir;
        let query = pir.gen_query(pir.fv_index(id))?;
        Ok((
            ItemQueryRequestPayload::Private { query },
            PendingItemQuery {
                offset: pir.fv_offset(id),
            },
        ))
    }

    /// Recover the item bytes from a private fetch
    pub fn recover_item(
        &self,
        pending: PendingItemQuery,
        response: &ItemQueryResponsePayload,
    ) -> Result<Vec<u8>> {
        let session = self.session.as_ref().ok_or(ClientError::NoSession)?;
        Ok(session.item_pir.recover(&response.answers, pending.offset)?)
    }
}

/// Perturb the profile for an extra probe. Euclidean tables take uniform
/// additive noise of half the projection width per coordinate; Hamming
/// tables flip one coordinate.
fn probe_vector<R: Rng>(lsh: &Lsh, profile: &Vector, rng: &mut R) -> Result<Vector> {
    match lsh.hash_set().first() {
        Some(HashFn::Gaussian(h)) => {
            let (_, _, width) = h.parameters();
            let half = width / 2.0;
            let mut out = profile.clone();
            for i in 0..out.dim() {
                out.add_to_coord(i, rng.gen_range(-half..half))?;
            }
            Ok(out)
        }
        Some(HashFn::Hamming(_)) => {
            let mut out = profile.clone();
            let coord = rng.gen_range(0..out.dim());
            let val = out.coord(coord)?;
            out.set_coord(coord, 1.0 - val)?;
            Ok(out)
        }
        None => Ok(profile.clone()),
    }
}
