//! Veilfeed Protocol Crate
//!
//! Wire format for the retrieval protocol: framing with CRC validation,
//! the request/response payload pairs, and the binary records that carry
//! hash functions, curve points and PIR blobs between client and server.

pub mod bucket;
mod constants;
mod error;
mod frame;
mod header;
mod messages;
pub mod records;

pub use constants::*;
pub use error::{ProtocolError, Result};
pub use frame::Frame;
pub use header::Header;
pub use messages::*;
