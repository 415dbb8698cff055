//! Veilfeed Anonymous Tokens
//!
//! Blind-signature tokens used to authorize and rate-limit retrievals
//! without linkability. Three variants share the elliptic-curve layer:
//! the plain blind-signature core, a private-metadata-bit variant, and a
//! public-metadata variant carrying a proof of correct signing.
//!
//! All tokens are single-use. Double-spend prevention is deliberately not
//! implemented here: deployments must keep a persistent set (or Bloom
//! filter) of redeemed token nonces and reject replays before calling any
//! of the `redeem*` operations.

mod blind;
mod curve;
mod dleq;
mod error;
mod h2c;
mod keys;
mod private;
mod public;

pub use blind::{BlindToken, SignedBlindToken, SignedToken, TOKEN_NONCE_LEN};
pub use curve::{random_nonzero_scalar, random_scalar, CurveId, CurveParams, Point};
pub use dleq::DleqProof;
pub use error::{Result, TokenError};
pub use h2c::hash_to_curve;
pub use keys::{KeyPair, PublicKey, SecretKey};
pub use private::{PrivateToken, SignedBlindPrivateToken};
pub use public::{PublicMdBlindToken, PublicToken, SignedBlindPublicToken};
