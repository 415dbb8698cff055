//! Public-metadata tokens
//!
//! The public-metadata construction of eprint 2021/203: the signing
//! exponent binds a metadata byte string md through e = (H_md(md) + x)^-1,
//! the server proves correct signing with a DLEQ proof, and the final
//! token commits to (md, t, e*H2C(t)) under an HMAC so redemption is a
//! byte comparison.

use hmac::{Hmac, Mac};
use num_bigint_dig::BigUint;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;

use crate::blind::TOKEN_NONCE_LEN;
use crate::curve::{random_nonzero_scalar, try_inv, CurveId, Point};
use crate::dleq::DleqProof;
use crate::error::{Result, TokenError};
use crate::h2c::hash_to_curve;
use crate::keys::{PublicKey, SecretKey};

type HmacSha256 = Hmac<Sha256>;

// Domain-separation keys for the two HMAC roles
const COMMIT_KEY: &[u8] = &[0x32];
const MD_KEY: &[u8] = &[0x33];

/// Client-side public-metadata token state before signing
#[derive(Debug, Clone)]
pub struct PublicMdBlindToken {
    pub t: [u8; TOKEN_NONCE_LEN],
    /// B = u^-1 * H2C(t)
    pub b: Point,
    /// Multiplicative blind
    pub u: BigUint,
}

/// Server-signed blinded token with metadata and proof
#[derive(Debug, Clone)]
pub struct SignedBlindPublicToken {
    /// W = e*B
    pub w: Point,
    /// U = e*G, the statement point the proof is anchored to
    pub u_point: Point,
    pub md: Vec<u8>,
    pub proof: DleqProof,
}

/// Unblinded public-metadata token
#[derive(Debug, Clone)]
pub struct PublicToken {
    pub t: [u8; TOKEN_NONCE_LEN],
    /// HMAC commitment over (md, t, e*H2C(t))
    pub z: Vec<u8>,
    pub md: Vec<u8>,
}

impl PublicKey {
    /// Issue: sample a nonce and multiplicatively blind its curve point
    pub fn issue_public<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<PublicMdBlindToken> {
        let mut t = [0u8; TOKEN_NONCE_LEN];
        rng.try_fill_bytes(&mut t)
            .map_err(|e| TokenError::Rng(e.to_string()))?;

        let t_point = hash_to_curve(self.curve, &t)?;
        let u = random_nonzero_scalar(self.curve, rng)?;
        let n = &self.curve.params().n;
        let b = t_point.mul(&try_inv(&u, n)?);

        Ok(PublicMdBlindToken { t, b, u })
    }

    /// Unblind: verify the signing proof against the blinded point this
    /// client produced, then derive the HMAC commitment from the unblinded
    /// point u*W = e*H2C(t).
    pub fn unblind_public(
        &self,
        signed: &SignedBlindPublicToken,
        token: &PublicMdBlindToken,
    ) -> Result<PublicToken> {
        let g = Point::generator(self.curve);
        if !signed.proof.verify(&g, &signed.u_point, &token.b, &signed.w) {
            return Err(TokenError::InvalidProof);
        }

        let p = signed.w.mul(&token.u);
        let z = commit(&signed.md, &token.t, &p);
        Ok(PublicToken {
            t: token.t,
            z,
            md: signed.md.clone(),
        })
    }
}

impl SecretKey {
    /// Sign under metadata md: W = (H_md(md) + x)^-1 * B, with a DLEQ
    /// proof that the same exponent produced U = e*G.
    pub fn sign_public<R: RngCore + CryptoRng>(
        &self,
        b: &Point,
        md: &[u8],
        rng: &mut R,
    ) -> Result<SignedBlindPublicToken> {
        let n = &self.curve.params().n;
        let d = md_scalar(self.curve, md);
        let e = try_inv(&((d + &self.sk_s) % n), n)?;

        let u_point = Point::base_mul(self.curve, &e);
        let w = b.mul(&e);

        let g = Point::generator(self.curve);
        let proof = DleqProof::prove(&g, &u_point, b, &w, &e, rng)?;

        Ok(SignedBlindPublicToken {
            w,
            u_point,
            md: md.to_vec(),
            proof,
        })
    }

    /// Redeem under metadata md: recompute the commitment and compare.
    ///
    /// Returns false for a token signed under different metadata. Callers
    /// must separately reject replayed nonces.
    pub fn redeem_public(&self, token: &PublicToken, md: &[u8]) -> Result<bool> {
        let n = &self.curve.params().n;
        let d = md_scalar(self.curve, md);
        let e = try_inv(&((d + &self.sk_s) % n), n)?;

        let t_point = hash_to_curve(self.curve, &token.t)?;
        let p = t_point.mul(&e);

        let mut mac = HmacSha256::new_from_slice(COMMIT_KEY)
            .map_err(|e| TokenError::Arithmetic(e.to_string()))?;
        mac.update(md);
        mac.update(&token.t);
        mac.update(&p.x.to_bytes_be());
        mac.update(&p.y.to_bytes_be());
        Ok(mac.verify_slice(&token.z).is_ok())
    }
}

/// H_md: hash metadata to a scalar with the 0x33-keyed HMAC
fn md_scalar(curve: CurveId, md: &[u8]) -> BigUint {
    let mut mac = HmacSha256::new_from_slice(MD_KEY).expect("hmac accepts any key length");
    mac.update(md);
    let tag = mac.finalize().into_bytes();
    BigUint::from_bytes_be(&tag) % &curve.params().n
}

/// z = HMAC_{0x32}(md || t || P.x || P.y)
fn commit(md: &[u8], t: &[u8; TOKEN_NONCE_LEN], p: &Point) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(COMMIT_KEY).expect("hmac accepts any key length");
    mac.update(md);
    mac.update(t);
    mac.update(&p.x.to_bytes_be());
    mac.update(&p.y.to_bytes_be());
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_public_md_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(61);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue_public(&mut rng).unwrap();
        let sbt = kp.secret.sign_public(&bt.b, b"abc", &mut rng).unwrap();
        let token = kp.public.unblind_public(&sbt, &bt).unwrap();
        assert!(kp.secret.redeem_public(&token, b"abc").unwrap());
    }

    #[test]
    fn test_metadata_mismatch_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(62);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue_public(&mut rng).unwrap();
        let sbt = kp.secret.sign_public(&bt.b, b"abc", &mut rng).unwrap();
        let token = kp.public.unblind_public(&sbt, &bt).unwrap();
        assert!(!kp.secret.redeem_public(&token, b"abd").unwrap());
    }

    #[test]
    fn test_forged_proof_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(63);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let bt = kp.public.issue_public(&mut rng).unwrap();
        let mut sbt = kp.secret.sign_public(&bt.b, b"abc", &mut rng).unwrap();
        // a signer that lies about W cannot produce a passing proof
        sbt.w = sbt.w.double();
        assert!(matches!(
            kp.public.unblind_public(&sbt, &bt),
            Err(TokenError::InvalidProof)
        ));
    }

    #[test]
    fn test_md_scalar_in_group() {
        let n = &CurveId::P256.params().n;
        for md in [&b"a"[..], b"abc", b"some longer metadata string"] {
            assert!(&md_scalar(CurveId::P256, md) < n);
        }
    }
}
