//! The blind-signature core (no metadata)
//!
//! An oblivious PRF in the style of Jarecki et al.: the client blinds
//! P = H2C(t) so the signer learns nothing about t, the signer applies its
//! secret scalar, and the client strips the blinds to obtain S = x*H2C(t).
//!
//! States: BlindToken -> SignedBlindToken -> SignedToken.

use num_bigint_dig::BigUint;
use rand::{CryptoRng, RngCore};

use crate::curve::{random_nonzero_scalar, try_inv, Point};
use crate::dleq::DleqProof;
use crate::error::{Result, TokenError};
use crate::h2c::hash_to_curve;
use crate::keys::{PublicKey, SecretKey};

/// Length of the token nonce t
pub const TOKEN_NONCE_LEN: usize = 16;

/// Client-side token state before signing
#[derive(Debug, Clone)]
pub struct BlindToken {
    /// Token nonce
    pub t: [u8; TOKEN_NONCE_LEN],
    /// Blinded point B = u^-1 (H2C(t) - v*G)
    pub b: Point,
    /// Multiplicative blind
    pub u: BigUint,
    /// Additive blind
    pub v: BigUint,
}

/// Server-signed blinded token
#[derive(Debug, Clone)]
pub struct SignedBlindToken {
    /// W = x*B
    pub w: Point,
}

/// Fully unblinded token, ready for redemption
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub t: [u8; TOKEN_NONCE_LEN],
    /// S = x*H2C(t)
    pub s: Point,
}

impl PublicKey {
    /// Issue: sample a nonce and blind its curve point.
    ///
    /// B = u^-1 (P - v*G) with u, v uniform in [1, n-1], so B is
    /// distributed as a uniform curve point regardless of t.
    pub fn issue<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<BlindToken> {
        let mut t = [0u8; TOKEN_NONCE_LEN];
        rng.try_fill_bytes(&mut t)
            .map_err(|e| TokenError::Rng(e.to_string()))?;

        let p = hash_to_curve(self.curve, &t)?;
        let u = random_nonzero_scalar(self.curve, rng)?;
        let v = random_nonzero_scalar(self.curve, rng)?;

        let n = &self.curve.params().n;
        let u_inv = try_inv(&u, n)?;
        let vg = Point::base_mul(self.curve, &v);
        let b = p.add(&vg.neg()).mul(&u_inv);

        Ok(BlindToken { t, b, u, v })
    }

    /// Unblind: S = u*W + v*X.
    ///
    /// u*W = u * x * u^-1 (P - v*G) = x*P - v*X, so adding v*X recovers
    /// x*P = x*H2C(t).
    pub fn unblind(&self, signed: &SignedBlindToken, token: &BlindToken) -> SignedToken {
        let s = signed.w.mul(&token.u).add(&self.pk_s.mul(&token.v));
        SignedToken { t: token.t, s }
    }
}

impl SecretKey {
    /// Sign a blinded point: W = x*B
    pub fn sign(&self, b: &Point) -> SignedBlindToken {
        SignedBlindToken {
            w: b.mul(&self.sk_s),
        }
    }

    /// Redeem: check x*H2C(t) == S.
    ///
    /// Callers must reject nonces seen before; this check alone does not
    /// prevent double spending.
    pub fn redeem(&self, token: &SignedToken) -> Result<bool> {
        let p = hash_to_curve(self.curve, &token.t)?;
        Ok(p.mul(&self.sk_s) == token.s)
    }

    /// Redeem and additionally prove the redemption was computed with the
    /// key behind pk, via a DLEQ proof of log_G(X) = log_T(x*T).
    pub fn redeem_and_prove<R: RngCore + CryptoRng>(
        &self,
        pk: &PublicKey,
        token: &SignedToken,
        rng: &mut R,
    ) -> Result<(bool, DleqProof)> {
        let t_point = hash_to_curve(self.curve, &token.t)?;
        let expected = t_point.mul(&self.sk_s);
        let ok = expected == token.s;

        let g = Point::generator(self.curve);
        let proof = DleqProof::prove(&g, &pk.pk_s, &t_point, &expected, &self.sk_s, rng)?;
        Ok((ok, proof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveId;
    use crate::keys::KeyPair;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_token_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let sbt = kp.secret.sign(&bt.b);
        let token = kp.public.unblind(&sbt, &bt);
        assert!(kp.secret.redeem(&token).unwrap());
    }

    #[test]
    fn test_trivial_blinds() {
        // u = 1, v = 0 degenerates to B = H2C(t), W = S
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let t = [0u8; TOKEN_NONCE_LEN];
        let p = hash_to_curve(CurveId::P256, &t).unwrap();
        let bt = BlindToken {
            t,
            b: p.clone(),
            u: BigUint::from(1u32),
            v: BigUint::from(0u32),
        };

        let sbt = kp.secret.sign(&bt.b);
        let token = kp.public.unblind(&sbt, &bt);
        assert_eq!(token.s, p.mul(&kp.secret.sk_s));
        assert!(kp.secret.redeem(&token).unwrap());
    }

    #[test]
    fn test_tampered_nonce_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(43);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let sbt = kp.secret.sign(&bt.b);
        let mut token = kp.public.unblind(&sbt, &bt);
        token.t[0] ^= 0x01;
        assert!(!kp.secret.redeem(&token).unwrap());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(44);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let sbt = kp.secret.sign(&bt.b);
        let mut token = kp.public.unblind(&sbt, &bt);
        token.s = token.s.double();
        assert!(!kp.secret.redeem(&token).unwrap());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(45);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();
        let other = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let sbt = kp.secret.sign(&bt.b);
        let token = kp.public.unblind(&sbt, &bt);
        assert!(!other.secret.redeem(&token).unwrap());
    }

    #[test]
    fn test_redeem_and_prove() {
        let mut rng = ChaCha20Rng::seed_from_u64(46);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let sbt = kp.secret.sign(&bt.b);
        let token = kp.public.unblind(&sbt, &bt);

        let (ok, proof) = kp
            .secret
            .redeem_and_prove(&kp.public, &token, &mut rng)
            .unwrap();
        assert!(ok);

        let g = Point::generator(CurveId::P256);
        let t_point = hash_to_curve(CurveId::P256, &token.t).unwrap();
        let expected = t_point.mul(&kp.secret.sk_s);
        assert!(proof.verify(&g, &kp.public.pk_s, &t_point, &expected));
    }
}
