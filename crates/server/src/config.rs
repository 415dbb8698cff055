//! Server configuration

use std::time::Duration;

use veilfeed_anns::LshParams;

// Collaborator defaults, matching the lattice backend's recommended
// parameter set.
pub const DEFAULT_POLY_DEGREE: u32 = 2048;
pub const DEFAULT_LOGT: u32 = 12;
pub const DEFAULT_RECURSION_DIM: u32 = 2;

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(900);
const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// LSH index parameters
    pub lsh: LshParams,
    /// Number of content items N
    pub num_items: usize,
    /// Bytes per content item
    pub item_bytes: usize,
    /// Bucket slots per table database; digests address slots mod this
    pub num_buckets: usize,
    /// Collaborator lattice polynomial degree
    pub poly_degree: u32,
    /// Collaborator plaintext modulus bits
    pub logt: u32,
    /// Collaborator recursion dimension
    pub pir_dim: u32,
    /// Collaborator parallel shards per database
    pub n_parallel: u32,
    /// Require a valid redemption token on every bucket query
    pub require_token: bool,
    /// Session time-to-live
    pub session_ttl: Duration,
    /// Maximum concurrent sessions
    pub max_sessions: usize,
}

impl ServerConfig {
    /// Configuration with collaborator defaults and one bucket slot per
    /// item (the worst case for table database sizing)
    pub fn new(lsh: LshParams, num_items: usize, item_bytes: usize) -> Self {
        Self {
            lsh,
            num_items,
            item_bytes,
            num_buckets: num_items,
            poly_degree: DEFAULT_POLY_DEGREE,
            logt: DEFAULT_LOGT,
            pir_dim: DEFAULT_RECURSION_DIM,
            n_parallel: 1,
            require_token: false,
            session_ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}
