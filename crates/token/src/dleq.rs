//! Chaum-Pedersen discrete-log-equality proofs
//!
//! Proves log_G(U) = log_B(W) without revealing the exponent. The
//! Fiat-Shamir challenge hashes the canonical uncompressed encodings of
//! the statement points and the two commitments.

use num_bigint_dig::BigUint;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::curve::{fsub, random_nonzero_scalar, Point};
use crate::error::Result;

/// A non-interactive equality proof (c, s)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DleqProof {
    pub c: BigUint,
    pub s: BigUint,
}

impl DleqProof {
    /// Prove log_g(u) = log_b(w) = e
    pub fn prove<R: RngCore + CryptoRng>(
        g: &Point,
        u: &Point,
        b: &Point,
        w: &Point,
        e: &BigUint,
        rng: &mut R,
    ) -> Result<Self> {
        let curve = g.curve;
        let n = &curve.params().n;

        let k = random_nonzero_scalar(curve, rng)?;
        let a1 = g.mul(&k);
        let a2 = b.mul(&k);

        let c = challenge(g, u, b, w, &a1, &a2);
        // s = k - c*e mod n
        let s = fsub(&k, &((&c * e) % n), n);
        Ok(Self { c, s })
    }

    /// Verify the proof against the statement (g, u, b, w)
    pub fn verify(&self, g: &Point, u: &Point, b: &Point, w: &Point) -> bool {
        let a1 = g.mul(&self.s).add(&u.mul(&self.c));
        let a2 = b.mul(&self.s).add(&w.mul(&self.c));
        challenge(g, u, b, w, &a1, &a2) == self.c
    }
}

fn challenge(g: &Point, u: &Point, b: &Point, w: &Point, a1: &Point, a2: &Point) -> BigUint {
    let n = &g.curve.params().n;
    let mut hasher = Sha256::new();
    for point in [g, u, b, w, a1, a2] {
        hasher.update(point.encode());
    }
    BigUint::from_bytes_be(&hasher.finalize()) % n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn statement(rng: &mut ChaCha20Rng) -> (Point, Point, Point, Point, BigUint) {
        let g = Point::generator(CurveId::P256);
        let e = random_nonzero_scalar(CurveId::P256, rng).unwrap();
        let base = random_nonzero_scalar(CurveId::P256, rng).unwrap();
        let b = Point::base_mul(CurveId::P256, &base);
        let u = g.mul(&e);
        let w = b.mul(&e);
        (g, u, b, w, e)
    }

    #[test]
    fn test_prove_verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let (g, u, b, w, e) = statement(&mut rng);
        let proof = DleqProof::prove(&g, &u, &b, &w, &e, &mut rng).unwrap();
        assert!(proof.verify(&g, &u, &b, &w));
    }

    #[test]
    fn test_wrong_exponent_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(22);
        let (g, u, b, w, e) = statement(&mut rng);
        let bad_e = (&e + BigUint::from(1u32)) % &CurveId::P256.params().n;
        let proof = DleqProof::prove(&g, &u, &b, &w, &bad_e, &mut rng).unwrap();
        assert!(!proof.verify(&g, &u, &b, &w));
    }

    #[test]
    fn test_corrupted_scalar_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        let (g, u, b, w, e) = statement(&mut rng);
        let mut proof = DleqProof::prove(&g, &u, &b, &w, &e, &mut rng).unwrap();
        proof.s = (&proof.s + BigUint::from(1u32)) % &CurveId::P256.params().n;
        assert!(!proof.verify(&g, &u, &b, &w));
    }

    #[test]
    fn test_swapped_point_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(24);
        let (g, u, b, w, e) = statement(&mut rng);
        let proof = DleqProof::prove(&g, &u, &b, &w, &e, &mut rng).unwrap();
        assert!(!proof.verify(&g, &w, &b, &u));
    }
}
