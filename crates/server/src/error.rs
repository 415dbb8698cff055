//! Server error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Max sessions reached")]
    MaxSessionsReached,

    #[error("Server not ready")]
    NotReady,

    #[error("Missing or invalid redemption token")]
    InvalidToken,

    #[error("Unknown table db index: {0}")]
    UnknownTableDb(u32),

    #[error("Item index out of range: {index} >= {max}")]
    ItemOutOfRange { index: u64, max: u64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Index error: {0}")]
    Anns(#[from] veilfeed_anns::AnnsError),

    #[error("Vector error: {0}")]
    Vector(#[from] veilfeed_vector::VectorError),

    #[error("Token error: {0}")]
    Token(#[from] veilfeed_token::TokenError),

    #[error("PIR error: {0}")]
    Pir(#[from] veilfeed_pir::PirError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] veilfeed_protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
