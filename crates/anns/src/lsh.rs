//! Composed LSH
//!
//! An LSH is k single hashes concatenated for amplification. The k
//! sub-digests are packed into one big integer; the big-endian byte form of
//! that integer is the bucket key.

use num_bigint_dig::BigUint;
use rand::Rng;
use veilfeed_vector::{DistanceMetric, Vector};

use crate::error::Result;
use crate::hashes::{GaussianHash, HammingHash};
use crate::index::BucketKey;

/// A single locality-sensitive hash function
#[derive(Debug, Clone)]
pub enum HashFn {
    Gaussian(GaussianHash),
    Hamming(HammingHash),
}

impl HashFn {
    /// Evaluate the hash on v
    pub fn digest(&self, v: &Vector) -> Result<BigUint> {
        match self {
            HashFn::Gaussian(h) => h.digest(v),
            HashFn::Hamming(h) => h.digest(v),
        }
    }
}

/// A set of k concatenated locality-sensitive hash functions
#[derive(Debug, Clone)]
pub struct Lsh {
    hashes: Vec<HashFn>,
}

impl Lsh {
    /// Sample an LSH for the L2 metric: k Gaussian hashes of width r.
    ///
    /// See Datar et al., Locality-Sensitive Hashing Scheme Based on
    /// p-Stable Distributions.
    pub fn new_euclidean<R: Rng>(dim: usize, r: f64, k: usize, rng: &mut R) -> Result<Self> {
        let hashes = (0..k)
            .map(|_| Ok(HashFn::Gaussian(GaussianHash::new(dim, r, rng)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { hashes })
    }

    /// Sample an LSH for the Hamming metric: k coordinate projections.
    pub fn new_hamming<R: Rng>(dim: usize, k: usize, rng: &mut R) -> Result<Self> {
        let hashes = (0..k)
            .map(|_| Ok(HashFn::Hamming(HammingHash::new(dim, rng)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { hashes })
    }

    /// Sample an LSH for the given metric
    pub fn new<R: Rng>(
        metric: DistanceMetric,
        dim: usize,
        r: f64,
        k: usize,
        rng: &mut R,
    ) -> Result<Self> {
        match metric {
            DistanceMetric::Euclidean => Self::new_euclidean(dim, r, k, rng),
            DistanceMetric::Hamming => Self::new_hamming(dim, k, rng),
        }
    }

    /// Rebuild from previously sampled hash functions
    pub fn from_hashes(hashes: Vec<HashFn>) -> Self {
        Self { hashes }
    }

    /// The hash functions comprising this LSH
    pub fn hash_set(&self) -> &[HashFn] {
        &self.hashes
    }

    /// The encoded digest of v
    pub fn digest(&self, v: &Vector) -> Result<BigUint> {
        let digests = self
            .hashes
            .iter()
            .map(|h| h.digest(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(encode_digests(&digests))
    }

    /// The bucket key of v: the big-endian byte form of the digest
    pub fn bucket_key(&self, v: &Vector) -> Result<BucketKey> {
        Ok(BucketKey::from_big_uint(&self.digest(v)?))
    }
}

/// Pack sub-digests into a single integer: E = sum 2^(i+1) * d_i.
///
/// The power series starts at 2^1. Keys are unique per digest tuple when
/// each sub-digest is a single bit; multi-bit sub-digests can collide, which
/// only widens the bucket a query lands in.
pub fn encode_digests(values: &[BigUint]) -> BigUint {
    let mut res = BigUint::from(0u32);
    let mut pow = BigUint::from(2u32);
    for d in values {
        res += d * &pow;
        pow *= 2u32;
    }
    res
}

/// Map a digest to a storage slot in a table of num_buckets slots.
/// Digests beyond the slot range wrap; the colliding buckets merge.
pub fn digest_slot(digest: &BigUint, num_buckets: u64) -> u64 {
    let reduced = digest % BigUint::from(num_buckets);
    reduced
        .to_bytes_be()
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
