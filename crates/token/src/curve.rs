//! Short-Weierstrass curve arithmetic
//!
//! Affine point operations over big integers. Points carry their curve by
//! tag; the parameters behind a tag are process-static singletons. Only
//! NIST P-256 is wired up, but the tag keeps the wire format and key
//! material honest about which curve they belong to.

use num_bigint_dig::{BigUint, ModInverse};
use once_cell::sync::Lazy;
use rand::{CryptoRng, RngCore};

use crate::error::{Result, TokenError};

/// Identifies a supported curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveId {
    P256,
}

/// Domain parameters of a short-Weierstrass curve y^2 = x^3 - 3x + b
#[derive(Debug)]
pub struct CurveParams {
    pub name: &'static str,
    pub bit_size: usize,
    /// Field prime
    pub p: BigUint,
    /// Base point subgroup order
    pub n: BigUint,
    /// Curve constant b
    pub b: BigUint,
    /// Base point
    pub gx: BigUint,
    pub gy: BigUint,
}

static P256_PARAMS: Lazy<CurveParams> = Lazy::new(|| CurveParams {
    name: "P-256",
    bit_size: 256,
    p: hex_uint("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff"),
    n: hex_uint("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551"),
    b: hex_uint("5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b"),
    gx: hex_uint("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296"),
    gy: hex_uint("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5"),
});

fn hex_uint(s: &str) -> BigUint {
    BigUint::parse_bytes(s.as_bytes(), 16).expect("valid curve constant")
}

impl CurveId {
    /// The process-static parameters behind this tag
    pub fn params(&self) -> &'static CurveParams {
        match self {
            CurveId::P256 => &P256_PARAMS,
        }
    }

    /// Field size in bytes
    pub fn byte_len(&self) -> usize {
        (self.params().bit_size + 7) >> 3
    }

    /// Resolve a curve from its wire name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "P-256" => Ok(CurveId::P256),
            other => Err(TokenError::UnsupportedCurve(other.to_string())),
        }
    }
}

/// An affine curve point. The identity is the all-zero point; (0, 0) does
/// not satisfy the curve equation on P-256, so the sentinel is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub curve: CurveId,
    pub x: BigUint,
    pub y: BigUint,
}

impl Point {
    /// Construct a point, rejecting coordinates off the curve
    pub fn new(curve: CurveId, x: BigUint, y: BigUint) -> Result<Self> {
        let point = Self { curve, x, y };
        if !point.is_on_curve() {
            return Err(TokenError::InvalidPoint);
        }
        Ok(point)
    }

    /// The point at infinity
    pub fn identity(curve: CurveId) -> Self {
        Self {
            curve,
            x: BigUint::from(0u32),
            y: BigUint::from(0u32),
        }
    }

    /// The base point of the curve
    pub fn generator(curve: CurveId) -> Self {
        let params = curve.params();
        Self {
            curve,
            x: params.gx.clone(),
            y: params.gy.clone(),
        }
    }

    /// True for the point at infinity
    pub fn is_identity(&self) -> bool {
        self.x == BigUint::from(0u32) && self.y == BigUint::from(0u32)
    }

    /// True when the point satisfies the curve equation (or is the identity)
    pub fn is_on_curve(&self) -> bool {
        if self.is_identity() {
            return true;
        }
        let params = self.curve.params();
        let p = &params.p;
        if self.x >= *p || self.y >= *p {
            return false;
        }
        let lhs = (&self.y * &self.y) % p;
        let rhs = curve_rhs(self.curve, &self.x);
        lhs == rhs
    }

    /// Point addition
    pub fn add(&self, other: &Point) -> Point {
        if self.is_identity() {
            return other.clone();
        }
        if other.is_identity() {
            return self.clone();
        }

        let p = &self.curve.params().p;
        if self.x == other.x {
            if (&self.y + &other.y) % p == BigUint::from(0u32) {
                return Point::identity(self.curve);
            }
            return self.double();
        }

        // lambda = (y2 - y1) / (x2 - x1)
        let num = fsub(&other.y, &self.y, p);
        let den = fsub(&other.x, &self.x, p);
        let lambda = (num * finv(&den, p)) % p;

        let x3 = fsub(&fsub(&((&lambda * &lambda) % p), &self.x, p), &other.x, p);
        let y3 = fsub(&((lambda * fsub(&self.x, &x3, p)) % p), &self.y, p);
        Point {
            curve: self.curve,
            x: x3,
            y: y3,
        }
    }

    /// Point doubling
    pub fn double(&self) -> Point {
        if self.is_identity() || self.y == BigUint::from(0u32) {
            return Point::identity(self.curve);
        }
        let p = &self.curve.params().p;

        // lambda = (3x^2 - 3) / (2y), using a = -3
        let three = BigUint::from(3u32);
        let num = fsub(&((&three * &self.x * &self.x) % p), &three, p);
        let den = (BigUint::from(2u32) * &self.y) % p;
        let lambda = (num * finv(&den, p)) % p;

        let two_x = (BigUint::from(2u32) * &self.x) % p;
        let x3 = fsub(&((&lambda * &lambda) % p), &two_x, p);
        let y3 = fsub(&((lambda * fsub(&self.x, &x3, p)) % p), &self.y, p);
        Point {
            curve: self.curve,
            x: x3,
            y: y3,
        }
    }

    /// Scalar multiplication by double-and-add
    pub fn mul(&self, k: &BigUint) -> Point {
        let mut acc = Point::identity(self.curve);
        for byte in k.to_bytes_be() {
            for bit in 0..8 {
                acc = acc.double();
                if byte & (0x80 >> bit) != 0 {
                    acc = acc.add(self);
                }
            }
        }
        acc
    }

    /// k times the base point
    pub fn base_mul(curve: CurveId, k: &BigUint) -> Point {
        Point::generator(curve).mul(k)
    }

    /// The additive inverse
    pub fn neg(&self) -> Point {
        if self.is_identity() {
            return self.clone();
        }
        let p = &self.curve.params().p;
        Point {
            curve: self.curve,
            x: self.x.clone(),
            y: (p - &self.y) % p,
        }
    }

    /// SEC1 2.3.3 uncompressed encoding; the identity encodes as a single
    /// zero byte.
    pub fn encode(&self) -> Vec<u8> {
        if self.is_identity() {
            return vec![0x00];
        }
        let byte_len = self.curve.byte_len();
        let mut out = Vec::with_capacity(1 + 2 * byte_len);
        out.push(0x04);
        out.extend_from_slice(&pad_be(&self.x, byte_len));
        out.extend_from_slice(&pad_be(&self.y, byte_len));
        out
    }

    /// SEC1 2.3.3 compressed encoding
    pub fn encode_compressed(&self) -> Vec<u8> {
        if self.is_identity() {
            return vec![0x00];
        }
        let byte_len = self.curve.byte_len();
        let mut out = Vec::with_capacity(1 + byte_len);
        let parity = (&self.y % BigUint::from(2u32)) == BigUint::from(1u32);
        out.push(if parity { 0x03 } else { 0x02 });
        out.extend_from_slice(&pad_be(&self.x, byte_len));
        out
    }

    /// Decode a SEC1 2.3.4 point, compressed or uncompressed. Compressed
    /// decoding solves the curve equation; both paths reject off-curve
    /// coordinates.
    pub fn decode(curve: CurveId, data: &[u8]) -> Result<Point> {
        let params = curve.params();
        let byte_len = curve.byte_len();

        if data == [0x00] {
            return Ok(Point::identity(curve));
        }

        if data.len() == byte_len + 1 && (data[0] == 0x02 || data[0] == 0x03) {
            let x = BigUint::from_bytes_be(&data[1..]);
            if x >= params.p {
                return Err(TokenError::InvalidPoint);
            }
            let g = curve_rhs(curve, &x);
            let y = mod_sqrt(&g, &params.p).ok_or(TokenError::InvalidPoint)?;
            let want_odd = data[0] & 1 == 1;
            let is_odd = (&y % BigUint::from(2u32)) == BigUint::from(1u32);
            let y = if want_odd == is_odd {
                y
            } else {
                (&params.p - &y) % &params.p
            };
            return Point::new(curve, x, y);
        }

        if data.len() == 2 * byte_len + 1 && data[0] == 0x04 {
            let x = BigUint::from_bytes_be(&data[1..1 + byte_len]);
            let y = BigUint::from_bytes_be(&data[1 + byte_len..]);
            return Point::new(curve, x, y);
        }

        Err(TokenError::InvalidPoint)
    }
}

/// x^3 - 3x + b mod p
fn curve_rhs(curve: CurveId, x: &BigUint) -> BigUint {
    let params = curve.params();
    let p = &params.p;
    let x3 = x.modpow(&BigUint::from(3u32), p);
    let three_x = (BigUint::from(3u32) * x) % p;
    (fsub(&x3, &three_x, p) + &params.b) % p
}

/// Modular square root for p = 3 mod 4: sqrt(g) = g^((p+1)/4), checked
fn mod_sqrt(g: &BigUint, p: &BigUint) -> Option<BigUint> {
    let exp = (p + BigUint::from(1u32)) >> 2;
    let y = g.modpow(&exp, p);
    if (&y * &y) % p == g % p {
        Some(y)
    } else {
        None
    }
}

/// (a - b) mod p
pub(crate) fn fsub(a: &BigUint, b: &BigUint, p: &BigUint) -> BigUint {
    ((a % p) + p - (b % p)) % p
}

/// a^-1 mod p; panics only on non-invertible input, which the callers rule
/// out (prime modulus, nonzero operand)
pub(crate) fn finv(a: &BigUint, p: &BigUint) -> BigUint {
    a.mod_inverse(p)
        .and_then(|i| i.to_biguint())
        .expect("inverse exists for nonzero element of a prime field")
}

/// a^-1 mod p as a fallible operation, for scalar arithmetic on values
/// that may legitimately be zero
pub(crate) fn try_inv(a: &BigUint, p: &BigUint) -> Result<BigUint> {
    a.mod_inverse(p)
        .and_then(|i| i.to_biguint())
        .ok_or_else(|| TokenError::Arithmetic("non-invertible scalar".to_string()))
}

fn pad_be(v: &BigUint, len: usize) -> Vec<u8> {
    let bytes = v.to_bytes_be();
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(&bytes);
    out
}

// Masks off the excess high bits of the first sampled byte when the group
// order is not a whole number of bytes.
const SCALAR_MASK: [u8; 8] = [0xff, 0x1, 0x3, 0x7, 0xf, 0x1f, 0x3f, 0x7f];

/// Sample a scalar uniformly in [0, n) by rejection
pub fn random_scalar<R: RngCore + CryptoRng>(curve: CurveId, rng: &mut R) -> Result<BigUint> {
    let params = curve.params();
    let bit_len = params.n.bits();
    let byte_len = (bit_len + 7) >> 3;
    let mut buf = vec![0u8; byte_len];
    loop {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| TokenError::Rng(e.to_string()))?;
        buf[0] &= SCALAR_MASK[bit_len % 8];
        let candidate = BigUint::from_bytes_be(&buf);
        if candidate < params.n {
            return Ok(candidate);
        }
    }
}

/// Sample a scalar uniformly in [1, n-1] by rejection
pub fn random_nonzero_scalar<R: RngCore + CryptoRng>(
    curve: CurveId,
    rng: &mut R,
) -> Result<BigUint> {
    loop {
        let s = random_scalar(curve, rng)?;
        if s != BigUint::from(0u32) {
            return Ok(s);
        }
    }
}
