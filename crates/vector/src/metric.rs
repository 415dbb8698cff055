//! Distance metrics

use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorError};
use crate::vector::Vector;

/// The distance the LSH layer is sensitive to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Hamming distance over {0,1} coordinates
    Hamming,
    /// Euclidean (L2) distance
    Euclidean,
}

/// Euclidean distance between p and q
pub fn l2_distance(p: &Vector, q: &Vector) -> Result<f64> {
    if p.dim() != q.dim() {
        return Err(VectorError::DimensionMismatch {
            expected: p.dim(),
            got: q.dim(),
        });
    }
    let sum: f64 = p
        .as_slice()
        .iter()
        .zip(q.as_slice())
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    Ok(sum.sqrt())
}

/// Hamming distance between p and q; coordinates are expected in {0,1}
pub fn hamming_distance(p: &Vector, q: &Vector) -> Result<f64> {
    if p.dim() != q.dim() {
        return Err(VectorError::DimensionMismatch {
            expected: p.dim(),
            got: q.dim(),
        });
    }
    let count = p
        .as_slice()
        .iter()
        .zip(q.as_slice())
        .filter(|(a, b)| a != b)
        .count();
    Ok(count as f64)
}

/// Distance between p and q under the given metric
pub fn distance(metric: DistanceMetric, p: &Vector, q: &Vector) -> Result<f64> {
    match metric {
        DistanceMetric::Hamming => hamming_distance(p, q),
        DistanceMetric::Euclidean => l2_distance(p, q),
    }
}
