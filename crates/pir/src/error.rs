//! PIR error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PirError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Evaluation keys not installed for client {client_id}")]
    KeysNotInstalled { client_id: u64 },

    #[error("Database not initialized")]
    DatabaseNotInitialized,

    #[error("Malformed query blob")]
    MalformedQuery,

    #[error("Malformed answer blob")]
    MalformedAnswer,

    #[error("Element index out of range: {index} >= {max}")]
    IndexOutOfRange { index: u64, max: u64 },
}

pub type Result<T> = std::result::Result<T, PirError>;
