//! The collaborator seam
//!
//! Queries, answers and evaluation keys are opaque byte blobs at this
//! layer; their internal structure belongs to the backend. Handles own
//! their state and release it on drop — no raw pointers cross this
//! boundary.

use crate::error::Result;
use crate::params::PirParams;

/// Client evaluation keys (Galois/expansion keys) as an opaque blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaloisKeys {
    pub blob: Vec<u8>,
    pub client_id: u64,
}

/// An oblivious query as an opaque blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PirQuery {
    pub blob: Vec<u8>,
    pub client_id: u64,
}

/// An encrypted answer shard as an opaque blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PirAnswer {
    pub blob: Vec<u8>,
}

/// Client half of the collaborator
pub trait PirClient {
    /// The parameters this client was initialized with
    fn params(&self) -> &PirParams;

    /// The id the server knows this client's keys under
    fn client_id(&self) -> u64;

    /// Generate the evaluation keys the server needs for query expansion
    fn gen_galois_keys(&self) -> Result<GaloisKeys>;

    /// Build an oblivious query for the plaintext at the given native index
    fn gen_query(&self, index: u64) -> Result<PirQuery>;

    /// Recover the element at offset from the answer shards
    fn recover(&self, answers: &[PirAnswer], offset: u64) -> Result<Vec<u8>>;

    /// Native plaintext index of logical element i
    fn fv_index(&self, i: u64) -> u64 {
        self.params().fv_index(i)
    }

    /// Offset of logical element i within its plaintext
    fn fv_offset(&self, i: u64) -> u64 {
        self.params().fv_offset(i)
    }
}

/// Server half of the collaborator
pub trait PirServer {
    /// The parameters this server was initialized with
    fn params(&self) -> &PirParams;

    /// Install a client's evaluation keys
    fn set_galois_keys(&mut self, keys: &GaloisKeys) -> Result<()>;

    /// Load the database; the byte layout is the caller's contract
    fn setup_database(&mut self, bytes: &[u8]) -> Result<()>;

    /// Evaluate a query, producing one answer per parallel shard
    fn gen_answer(&self, query: &PirQuery) -> Result<Vec<PirAnswer>>;
}
