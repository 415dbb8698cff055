//! Feature vector operations

use rand::Rng;

use crate::error::{Result, VectorError};

/// A fixed-dimension vector of f64 feature values
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    /// Create a zero vector of the given dimension
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension(dim));
        }
        Ok(Self { data: vec![0.0; dim] })
    }

    /// Create a vector from existing values
    pub fn from_values(data: Vec<f64>) -> Result<Self> {
        if data.is_empty() {
            return Err(VectorError::InvalidDimension(0));
        }
        Ok(Self { data })
    }

    /// Sample a vector with coordinates uniform in [min, max)
    pub fn random<R: Rng>(dim: usize, min: f64, max: f64, rng: &mut R) -> Result<Self> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension(dim));
        }
        let data = (0..dim).map(|_| rng.gen_range(min..max)).collect();
        Ok(Self { data })
    }

    /// Number of coordinates
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    /// Coordinate at index
    pub fn coord(&self, index: usize) -> Result<f64> {
        self.data
            .get(index)
            .copied()
            .ok_or(VectorError::CoordOutOfRange {
                index,
                dim: self.data.len(),
            })
    }

    /// Overwrite the coordinate at index
    pub fn set_coord(&mut self, index: usize, value: f64) -> Result<()> {
        let dim = self.data.len();
        let slot = self
            .data
            .get_mut(index)
            .ok_or(VectorError::CoordOutOfRange { index, dim })?;
        *slot = value;
        Ok(())
    }

    /// Add a delta to the coordinate at index
    pub fn add_to_coord(&mut self, index: usize, delta: f64) -> Result<()> {
        let dim = self.data.len();
        let slot = self
            .data
            .get_mut(index)
            .ok_or(VectorError::CoordOutOfRange { index, dim })?;
        *slot += delta;
        Ok(())
    }

    /// Inner product with another vector
    pub fn dot(&self, other: &Self) -> Result<f64> {
        if self.dim() != other.dim() {
            return Err(VectorError::DimensionMismatch {
                expected: self.dim(),
                got: other.dim(),
            });
        }
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Elementwise sum
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.dim() != other.dim() {
            return Err(VectorError::DimensionMismatch {
                expected: self.dim(),
                got: other.dim(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a + b)
            .collect();
        Ok(Self { data })
    }

    /// Multiply every coordinate by a scalar
    pub fn scale(&self, s: f64) -> Self {
        Self {
            data: self.data.iter().map(|x| x * s).collect(),
        }
    }

    /// L2 norm
    pub fn l2_norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Scale to unit L2 norm. A zero vector is returned unchanged.
    pub fn normalize(&self) -> Self {
        let norm = self.l2_norm();
        if norm == 0.0 {
            return self.clone();
        }
        self.scale(1.0 / norm)
    }

    /// Raw coordinate slice
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}
