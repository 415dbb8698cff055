//! Private-metadata-bit tokens
//!
//! Construction 4 of the PMBTokens paper (eprint 2020/072), reduced to the
//! single-key shape used here: signing adds an Okamoto-Schnorr style
//! randomization term y*S with S derived by hashing a fresh nonce and the
//! blinded point to the curve. A true metadata bit signs with the real
//! scalar x; a false bit signs with a throwaway scalar, producing a token
//! that fails redemption without the client being able to tell the
//! difference.

use rand::{CryptoRng, RngCore};

use crate::blind::{BlindToken, TOKEN_NONCE_LEN};
use crate::curve::{random_nonzero_scalar, Point};
use crate::error::{Result, TokenError};
use crate::h2c::hash_to_curve;
use crate::keys::{PublicKey, SecretKey};

/// Server-signed blinded token with randomization term
#[derive(Debug, Clone)]
pub struct SignedBlindPrivateToken {
    /// W = e*B + y*S, with e = x or a throwaway scalar
    pub w: Point,
    /// S = H2C(nonce || B.x || B.y)
    pub s: Point,
}

/// Unblinded private-metadata token
#[derive(Debug, Clone)]
pub struct PrivateToken {
    pub t: [u8; TOKEN_NONCE_LEN],
    /// u*W + v*X; equals x*H2C(t) + y*S_r for a genuinely signed token
    pub s: Point,
    /// u*S, the unblinded randomization term
    pub s_r: Point,
}

impl SecretKey {
    /// Sign a blinded point, embedding the private bit.
    ///
    /// The randomizer nonce is sampled fresh on every call; reusing it
    /// across signatures would link them.
    pub fn sign_private<R: RngCore + CryptoRng>(
        &self,
        b: &Point,
        bit: bool,
        rng: &mut R,
    ) -> Result<SignedBlindPrivateToken> {
        let mut nonce = [0u8; TOKEN_NONCE_LEN];
        rng.try_fill_bytes(&mut nonce)
            .map_err(|e| TokenError::Rng(e.to_string()))?;

        let mut transcript = Vec::with_capacity(TOKEN_NONCE_LEN + 2 * self.curve.byte_len());
        transcript.extend_from_slice(&nonce);
        transcript.extend_from_slice(&b.x.to_bytes_be());
        transcript.extend_from_slice(&b.y.to_bytes_be());
        let s = hash_to_curve(self.curve, &transcript)?;

        let e = if bit {
            self.sk_s.clone()
        } else {
            // garbage signature under a throwaway scalar
            random_nonzero_scalar(self.curve, rng)?
        };

        let w = b.mul(&e).add(&s.mul(&self.sk_r));
        Ok(SignedBlindPrivateToken { w, s })
    }

    /// Redeem: check x*H2C(t) + y*S_r == S using both secrets.
    ///
    /// Double-spend prevention is the caller's responsibility.
    pub fn redeem_private(&self, token: &PrivateToken) -> Result<bool> {
        let t_point = hash_to_curve(self.curve, &token.t)?;
        let expected = t_point.mul(&self.sk_s).add(&token.s_r.mul(&self.sk_r));
        Ok(expected == token.s)
    }
}

impl PublicKey {
    /// Unblind a signed private-metadata token, propagating both blinding
    /// factors through the signature and the randomization term.
    ///
    /// u*W + v*X = e*H2C(t) + y*(u*S) when e = x, since the -e*v*G and
    /// +v*x*G terms cancel exactly for the genuine scalar.
    pub fn unblind_private(
        &self,
        signed: &SignedBlindPrivateToken,
        token: &BlindToken,
    ) -> PrivateToken {
        let s = signed.w.mul(&token.u).add(&self.pk_s.mul(&token.v));
        let s_r = signed.s.mul(&token.u);
        PrivateToken {
            t: token.t,
            s,
            s_r,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::curve::CurveId;
    use crate::keys::KeyPair;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_true_bit_redeems() {
        let mut rng = ChaCha20Rng::seed_from_u64(51);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let sbt = kp.secret.sign_private(&bt.b, true, &mut rng).unwrap();
        let token = kp.public.unblind_private(&sbt, &bt);
        assert!(kp.secret.redeem_private(&token).unwrap());
    }

    #[test]
    fn test_false_bit_fails_redemption() {
        let mut rng = ChaCha20Rng::seed_from_u64(52);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let sbt = kp.secret.sign_private(&bt.b, false, &mut rng).unwrap();
        let token = kp.public.unblind_private(&sbt, &bt);
        assert!(!kp.secret.redeem_private(&token).unwrap());
    }

    #[test]
    fn test_fresh_randomizer_per_signature() {
        let mut rng = ChaCha20Rng::seed_from_u64(53);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let first = kp.secret.sign_private(&bt.b, true, &mut rng).unwrap();
        let second = kp.secret.sign_private(&bt.b, true, &mut rng).unwrap();
        assert_ne!(first.s, second.s);
        assert_ne!(first.w, second.w);
    }

    #[test]
    fn test_tampered_randomization_term_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(54);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue(&mut rng).unwrap();
        let sbt = kp.secret.sign_private(&bt.b, true, &mut rng).unwrap();
        let mut token = kp.public.unblind_private(&sbt, &bt);
        token.s_r = token.s_r.double();
        assert!(!kp.secret.redeem_private(&token).unwrap());
    }
}
