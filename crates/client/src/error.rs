//! Client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No active session")]
    NoSession,

    #[error("Answer for unknown query slot: {0}")]
    UnknownSlot(u32),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Index error: {0}")]
    Anns(#[from] veilfeed_anns::AnnsError),

    #[error("Vector error: {0}")]
    Vector(#[from] veilfeed_vector::VectorError),

    #[error("PIR error: {0}")]
    Pir(#[from] veilfeed_pir::PirError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] veilfeed_protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
