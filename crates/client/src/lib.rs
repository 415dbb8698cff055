//! Veilfeed Client
//!
//! The client half of the query orchestrator: holds the private profile
//! vector, adopts the session parameters and hash functions the server
//! hands out, builds multiprobe bucket queries, and recovers candidate
//! ids from the answers. Transport is the caller's concern; every
//! operation maps a protocol payload to a protocol payload.

mod client;
mod error;

pub use client::{Client, PendingBucketQuery, PendingItemQuery, RecoveredBucket, SessionParams};
pub use error::{ClientError, Result};
