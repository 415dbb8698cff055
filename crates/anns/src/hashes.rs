//! The hash family
//!
//! Three hash constructions used by the index:
//! - `UniversalHash`: h(x) = r1*x + r2 mod n over a random prime modulus,
//!   used to randomize bucket keys before they are exposed to storage.
//! - `GaussianHash`: locality sensitive for L2 distance, from the p-stable
//!   construction of Datar et al.
//! - `HammingHash`: a single-coordinate projection, locality sensitive for
//!   Hamming distance.

use num_bigint_dig::{BigUint, RandBigInt, RandPrime};
use rand::Rng;
use rand_distr::StandardNormal;
use veilfeed_vector::Vector;

use crate::error::{AnnsError, Result};

/// Universal hash h(x) = r1*x + r2 mod n with n prime
#[derive(Debug, Clone)]
pub struct UniversalHash {
    r1: BigUint,
    r2: BigUint,
    n: BigUint,
}

impl UniversalHash {
    /// Sample a universal hash with a fresh prime modulus of
    /// hash_bytes * 8 bits.
    pub fn new<R: Rng>(hash_bytes: usize, rng: &mut R) -> Result<Self> {
        if hash_bytes == 0 {
            return Err(AnnsError::InvalidParameter(
                "hash_bytes must be >= 1".into(),
            ));
        }
        let n = rng.gen_prime(hash_bytes * 8);
        let r1 = rng.gen_biguint_below(&n);
        let r2 = rng.gen_biguint_below(&n);
        Ok(Self { r1, r2, n })
    }

    /// Sample a universal hash over a caller-provided modulus
    pub fn with_modulus<R: Rng>(n: BigUint, rng: &mut R) -> Result<Self> {
        if n <= BigUint::from(1u32) {
            return Err(AnnsError::InvalidParameter("modulus must be > 1".into()));
        }
        let r1 = rng.gen_biguint_below(&n);
        let r2 = rng.gen_biguint_below(&n);
        Ok(Self { r1, r2, n })
    }

    /// Rebuild from previously sampled parameters
    pub fn from_parts(r1: BigUint, r2: BigUint, n: BigUint) -> Self {
        Self { r1, r2, n }
    }

    /// Evaluate the hash on x
    pub fn digest(&self, x: &BigUint) -> BigUint {
        ((x % &self.n) * &self.r1 + &self.r2) % &self.n
    }

    /// Hash parameters (r1, r2, n)
    pub fn parameters(&self) -> (&BigUint, &BigUint, &BigUint) {
        (&self.r1, &self.r2, &self.n)
    }
}

/// Gaussian p-stable hash: v -> floor(|a.v + b| / r)
///
/// The absolute value folds negative projections onto the positive axis so
/// digests encode as unsigned big integers. Nearby points still collide; the
/// fold only merges the two buckets mirrored around zero.
#[derive(Debug, Clone)]
pub struct GaussianHash {
    a: Vector,
    b: f64,
    r: f64,
}

impl GaussianHash {
    /// Sample a Gaussian hash of width r for dimension dim
    pub fn new<R: Rng>(dim: usize, r: f64, rng: &mut R) -> Result<Self> {
        if r <= 0.0 {
            return Err(AnnsError::InvalidParameter(format!(
                "projection width must be > 0, got {r}"
            )));
        }
        let b = rng.gen_range(0.0..r);
        let coords: Vec<f64> = (0..dim).map(|_| rng.sample(StandardNormal)).collect();
        let a = Vector::from_values(coords)?;
        Ok(Self { a, b, r })
    }

    /// Rebuild from previously sampled parameters
    pub fn from_parts(a: Vector, b: f64, r: f64) -> Result<Self> {
        if r <= 0.0 {
            return Err(AnnsError::InvalidParameter(format!(
                "projection width must be > 0, got {r}"
            )));
        }
        Ok(Self { a, b, r })
    }

    /// Evaluate the hash on v
    pub fn digest(&self, v: &Vector) -> Result<BigUint> {
        let mut res = self.a.dot(v)?;
        res += self.b;
        res /= self.r;
        res = res.abs();
        Ok(BigUint::from(res.floor() as u64))
    }

    /// Hash parameters (a, b, r)
    pub fn parameters(&self) -> (&Vector, f64, f64) {
        (&self.a, self.b, self.r)
    }
}

/// Hamming hash: v -> v[i] for a fixed random coordinate i
#[derive(Debug, Clone)]
pub struct HammingHash {
    coord: usize,
    dim: usize,
}

impl HammingHash {
    /// Sample a Hamming hash for dimension dim
    pub fn new<R: Rng>(dim: usize, rng: &mut R) -> Result<Self> {
        if dim == 0 {
            return Err(AnnsError::InvalidParameter("dimension must be >= 1".into()));
        }
        Ok(Self {
            coord: rng.gen_range(0..dim),
            dim,
        })
    }

    /// Rebuild from a previously sampled coordinate
    pub fn from_parts(coord: usize, dim: usize) -> Result<Self> {
        if coord >= dim {
            return Err(AnnsError::InvalidParameter(format!(
                "coordinate {coord} out of range for dimension {dim}"
            )));
        }
        Ok(Self { coord, dim })
    }

    /// Evaluate the hash on v
    pub fn digest(&self, v: &Vector) -> Result<BigUint> {
        let val = v.coord(self.coord)?;
        Ok(BigUint::from(val as u64))
    }

    /// The projected coordinate and the expected dimension
    pub fn parameters(&self) -> (usize, usize) {
        (self.coord, self.dim)
    }
}
