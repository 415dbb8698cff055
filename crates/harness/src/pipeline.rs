//! End-to-end pipeline over the mock PIR backend

use rand::{CryptoRng, Rng};
use uuid::Uuid;

use veilfeed_client::{Client, RecoveredBucket};
use veilfeed_pir::mock::{MockPirClient, MockPirServer};
use veilfeed_server::{Server, ServerConfig};
use veilfeed_token::SignedToken;
use veilfeed_vector::Vector;

use crate::error::Result;

/// A server plus the plumbing to open clients against it, with the mock
/// collaborator standing in for the lattice backend
pub struct Pipeline {
    server: Server<MockPirServer>,
}

impl Pipeline {
    /// Build the server side: index the data vectors and load the item
    /// blobs
    pub fn new<R: Rng + CryptoRng>(
        config: ServerConfig,
        data: Vec<Vector>,
        items: Vec<u8>,
        rng: &mut R,
    ) -> Result<Self> {
        let server = Server::new(config, data, items, |p| MockPirServer::new(p.clone()), rng)?;
        Ok(Self { server })
    }

    /// The server under test
    pub fn server(&self) -> &Server<MockPirServer> {
        &self.server
    }

    /// Run the session handshake for a client: InitSession, key
    /// generation, SetPirKeys. Returns the connected client and its
    /// session id.
    pub fn open_client<R: Rng>(
        &self,
        profile: Vector,
        rng: &mut R,
    ) -> Result<(Client<MockPirClient>, Uuid)> {
        let response = self.server.init_session()?;
        let session_id = Uuid::from_bytes(response.session_id);

        let client_id: u64 = rng.gen();
        let mut client = Client::new(profile);
        client.apply_session(&response, |p| MockPirClient::new(p.clone(), client_id))?;

        let keys = client.galois_keys()?;
        self.server.set_pir_keys(&session_id, &keys)?;
        tracing::info!(session = %session_id, client = client_id, "client handshake complete");
        Ok((client, session_id))
    }

    /// Issue one private bucket query and recover the per-bucket
    /// candidates
    pub fn query_buckets<R: Rng>(
        &self,
        client: &Client<MockPirClient>,
        session_id: &Uuid,
        token: Option<SignedToken>,
        rng: &mut R,
    ) -> Result<Vec<RecoveredBucket>> {
        let (request, pending) = client.build_bucket_query(token, rng)?;
        let response = self.server.private_bucket_query(session_id, &request)?;
        let buckets = client.recover_buckets(&pending, &response)?;
        tracing::debug!(
            session = %session_id,
            buckets = buckets.len(),
            server_ms = response.server_time_ms,
            "bucket query round trip"
        );
        Ok(buckets)
    }

    /// Issue one private bucket query and merge the candidates
    pub fn query_candidates<R: Rng>(
        &self,
        client: &Client<MockPirClient>,
        session_id: &Uuid,
        token: Option<SignedToken>,
        rng: &mut R,
    ) -> Result<Vec<u32>> {
        let buckets = self.query_buckets(client, session_id, token, rng)?;
        Ok(Client::<MockPirClient>::merged_candidates(&buckets))
    }

    /// Privately fetch a content item by id
    pub fn fetch_item(
        &self,
        client: &Client<MockPirClient>,
        session_id: &Uuid,
        id: u64,
    ) -> Result<Vec<u8>> {
        let (request, pending) = client.build_item_query(id)?;
        let response = self.server.item_query(session_id, &request)?;
        Ok(client.recover_item(pending, &response)?)
    }
}
