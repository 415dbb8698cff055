//! Veilfeed Server
//!
//! The server half of the query orchestrator: owns the LSH index, one PIR
//! database per hash table plus the content-item database, the token
//! keypair, and the session store. Handlers are transport-agnostic —
//! they take and return protocol payloads, and whatever carries those
//! frames is the caller's concern.

mod config;
mod error;
mod server;
mod session;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use server::Server;
pub use session::{Session, SessionStore};
