//! Harness error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Server error: {0}")]
    Server(#[from] veilfeed_server::ServerError),

    #[error("Client error: {0}")]
    Client(#[from] veilfeed_client::ClientError),

    #[error("Token error: {0}")]
    Token(#[from] veilfeed_token::TokenError),

    #[error("Vector error: {0}")]
    Vector(#[from] veilfeed_vector::VectorError),

    #[error("Index error: {0}")]
    Anns(#[from] veilfeed_anns::AnnsError),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
