//! Token signing keys
//!
//! A keypair carries two independent secrets: the signing scalar x with
//! X = x*G, and the randomization scalar y with Y = y*H, where H is derived
//! by hashing X's encoding to the curve. The basic and public-metadata
//! variants only use x; the private-metadata variant needs both.

use num_bigint_dig::BigUint;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::curve::{random_nonzero_scalar, CurveId, Point};
use crate::error::Result;
use crate::h2c::hash_to_curve;

/// Public half of a token keypair
#[derive(Debug, Clone)]
pub struct PublicKey {
    pub curve: CurveId,
    /// X = x*G
    pub pk_s: Point,
    /// Y = y*H
    pub pk_r: Point,
    /// H = H2C(encode(X))
    pub h: Point,
}

/// Secret half of a token keypair
#[derive(Debug)]
pub struct SecretKey {
    pub curve: CurveId,
    /// Signing scalar x
    pub sk_s: BigUint,
    /// Randomization scalar y
    pub sk_r: BigUint,
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.sk_s.zeroize();
        self.sk_r.zeroize();
    }
}

/// A full token keypair
#[derive(Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: SecretKey,
}

impl KeyPair {
    /// Generate a fresh keypair on the given curve
    pub fn generate<R: RngCore + CryptoRng>(curve: CurveId, rng: &mut R) -> Result<Self> {
        let sk_s = random_nonzero_scalar(curve, rng)?;
        let pk_s = Point::base_mul(curve, &sk_s);

        let h = hash_to_curve(curve, &pk_s.encode())?;
        let sk_r = random_nonzero_scalar(curve, rng)?;
        let pk_r = h.mul(&sk_r);

        Ok(Self {
            public: PublicKey {
                curve,
                pk_s,
                pk_r,
                h,
            },
            secret: SecretKey { curve, sk_s, sk_r },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_keygen_consistency() {
        let mut rng = ChaCha20Rng::seed_from_u64(31);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        assert!(kp.public.pk_s.is_on_curve());
        assert!(kp.public.pk_r.is_on_curve());
        assert_eq!(
            kp.public.pk_s,
            Point::base_mul(CurveId::P256, &kp.secret.sk_s)
        );
        assert_eq!(kp.public.pk_r, kp.public.h.mul(&kp.secret.sk_r));
    }

    #[test]
    fn test_keygen_distinct() {
        let mut rng = ChaCha20Rng::seed_from_u64(32);
        let a = KeyPair::generate(CurveId::P256, &mut rng).unwrap();
        let b = KeyPair::generate(CurveId::P256, &mut rng).unwrap();
        assert_ne!(a.public.pk_s, b.public.pk_s);
    }
}
