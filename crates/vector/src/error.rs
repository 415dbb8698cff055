//! Vector error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Coordinate index out of range: {index} >= {dim}")]
    CoordOutOfRange { index: usize, dim: usize },

    #[error("Invalid dimension: {0} (must be >= 1)")]
    InvalidDimension(usize),
}

pub type Result<T> = std::result::Result<T, VectorError>;
