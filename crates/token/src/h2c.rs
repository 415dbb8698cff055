//! Hash-to-curve
//!
//! Deterministic map from bytes to a P-256 point. The primary path is the
//! Simplified SWU encoding of Brier et al. ("Efficient Indifferentiable
//! Hashing into Ordinary Elliptic Curves"), which relies on a = -3 and
//! p = 3 mod 4. SWU rejects the rare inputs with u(u+1) = 0; those fall
//! back to bounded try-and-increment.

use num_bigint_dig::BigUint;
use sha2::{Digest, Sha256};

use crate::curve::{fsub, try_inv, CurveId, Point};
use crate::error::{Result, TokenError};

const POINT_SEED: &[u8] = b"veilfeed point generation seed";
const INCREMENT_ITERS: u8 = 20;

/// Hash arbitrary bytes to a curve point. Deterministic; never returns the
/// identity.
pub fn hash_to_curve(curve: CurveId, data: &[u8]) -> Result<Point> {
    match curve {
        CurveId::P256 => p256_sha256(data),
    }
}

fn p256_sha256(data: &[u8]) -> Result<Point> {
    let t = hash_to_base_field(CurveId::P256, data, None);
    match simplified_swu(&t) {
        Ok(point) => Ok(point),
        Err(TokenError::NoPointFound) => try_and_increment(data),
        Err(e) => Err(e),
    }
}

/// Hash bytes to a field element: SHA-256 over seed || data || ctr,
/// truncated to the field byte length and reduced mod p.
fn hash_to_base_field(curve: CurveId, data: &[u8], ctr: Option<u8>) -> BigUint {
    let params = curve.params();
    let byte_len = curve.byte_len();

    let mut hasher = Sha256::new();
    hasher.update(POINT_SEED);
    hasher.update(data);
    if let Some(ctr) = ctr {
        hasher.update([ctr]);
    }
    let sum = hasher.finalize();
    BigUint::from_bytes_be(&sum[..byte_len.min(sum.len())]) % &params.p
}

/// The Simplified SWU map for a = -3, p = 3 mod 4
fn simplified_swu(t: &BigUint) -> Result<Point> {
    let params = CurveId::P256.params();
    let p = &params.p;
    let a = p - BigUint::from(3u32);
    let b = &params.b;

    // bDivA = -B/A mod p
    let b_div_a = fsub(&BigUint::from(0u32), &((b * try_inv(&a, p)?) % p), p);
    // (p+1)/4
    let p_plus_1_div_4 = (p + BigUint::from(1u32)) >> 2;

    // u = -t^2
    let u = fsub(&BigUint::from(0u32), &((t * t) % p), p);
    // t0 = u^2 + u; zero means t in {0, 1, -1} and SWU has no preimage
    let t0 = ((&u * &u) % p + &u) % p;
    if t0 == BigUint::from(0u32) {
        return Err(TokenError::NoPointFound);
    }
    let t0 = try_inv(&t0, p)?;

    // x = (-B/A) * (1 + 1/(u^2 + u))
    let mut x = ((BigUint::from(1u32) + t0) * &b_div_a) % p;
    // g = (x^2 + A) * x + B = x^3 - 3x + B
    let g = (((&x * &x) % p + &a) % p * &x + b) % p;
    // y = g^((p+1)/4)
    let mut y = g.modpow(&p_plus_1_div_4, p);

    // if y^2 != g, rescale: x by -t^2 (= u), y by t^3
    if (&y * &y) % p != g {
        x = (&x * &u) % p;
        y = (&y * &u) % p;
        y = fsub(&BigUint::from(0u32), &y, p);
        y = (&y * t) % p;
    }

    Point::new(CurveId::P256, x, y)
}

/// Bounded try-and-increment: hash with a counter until the candidate x
/// coordinate lands on the curve.
fn try_and_increment(data: &[u8]) -> Result<Point> {
    let params = CurveId::P256.params();
    let p = &params.p;
    let p_plus_1_div_4 = (p + BigUint::from(1u32)) >> 2;

    for ctr in 0..INCREMENT_ITERS {
        let x = hash_to_base_field(CurveId::P256, data, Some(ctr));
        let three_x = (BigUint::from(3u32) * &x) % p;
        let g = (fsub(&x.modpow(&BigUint::from(3u32), p), &three_x, p) + &params.b) % p;
        let y = g.modpow(&p_plus_1_div_4, p);
        if (&y * &y) % p == g {
            return Point::new(CurveId::P256, x, y);
        }
    }
    Err(TokenError::NoPointFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h2c_on_curve() {
        for input in [&b"hello"[..], b"", b"\x00\x01\x02", b"veilfeed"] {
            let point = hash_to_curve(CurveId::P256, input).unwrap();
            assert!(point.is_on_curve(), "off curve for {input:?}");
            assert!(!point.is_identity());
        }
    }

    #[test]
    fn test_h2c_deterministic() {
        let a = hash_to_curve(CurveId::P256, b"same input").unwrap();
        let b = hash_to_curve(CurveId::P256, b"same input").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_h2c_distinct_inputs_distinct_points() {
        let a = hash_to_curve(CurveId::P256, b"input a").unwrap();
        let b = hash_to_curve(CurveId::P256, b"input b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_increment_fallback_finds_points() {
        // exercise the fallback directly; roughly half of all candidates
        // are quadratic residues so 20 iterations are ample
        for i in 0u8..8 {
            let point = try_and_increment(&[i]).unwrap();
            assert!(point.is_on_curve());
        }
    }
}
