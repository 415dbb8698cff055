//! Token error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Point is not on the curve or its encoding is malformed")]
    InvalidPoint,

    #[error("Hash-to-curve failed to find a point")]
    NoPointFound,

    #[error("Equality proof verification failed")]
    InvalidProof,

    #[error("Token redemption failed")]
    RedemptionFailed,

    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    #[error("Arithmetic failure: {0}")]
    Arithmetic(String),

    #[error("RNG failure: {0}")]
    Rng(String),
}

pub type Result<T> = std::result::Result<T, TokenError>;
