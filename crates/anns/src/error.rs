//! ANNS error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnsError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty candidate list")]
    EmptyInput,

    #[error("Vector error: {0}")]
    Vector(#[from] veilfeed_vector::VectorError),
}

pub type Result<T> = std::result::Result<T, AnnsError>;
