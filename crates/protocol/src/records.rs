//! Binary records for key material in flight
//!
//! Tagged encodings for the payloads' structured fields: hash functions
//! (algorithm tag, dimension, parameter vector), curve points (curve name
//! plus SEC1 bytes), tokens, and the PIR parameter block and blobs.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_bigint_dig::BigUint;
use std::io::{Cursor, Read, Write};

use veilfeed_anns::{GaussianHash, HammingHash, HashFn, Lsh, UniversalHash};
use veilfeed_pir::{GaloisKeys, PirAnswer, PirParams, PirQuery};
use veilfeed_token::{CurveId, Point, SignedToken, TOKEN_NONCE_LEN};
use veilfeed_vector::Vector;

use crate::error::{ProtocolError, Result};

// Hash algorithm tags
const ALGO_UNIVERSAL: u8 = 0;
const ALGO_GAUSSIAN: u8 = 1;
const ALGO_HAMMING: u8 = 2;

/// Write a length-prefixed byte string
pub fn write_bytes<W: Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    writer.write_u32::<LittleEndian>(data.len() as u32)?;
    writer.write_all(data)?;
    Ok(())
}

/// Read a length-prefixed byte string
pub fn read_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let len = cursor.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    Ok(buf)
}

/// Encode a universal hash: r1, r2, n as big-endian byte strings
pub fn write_universal_hash<W: Write>(writer: &mut W, hash: &UniversalHash) -> Result<()> {
    let (r1, r2, n) = hash.parameters();
    writer.write_u8(ALGO_UNIVERSAL)?;
    write_bytes(writer, &r1.to_bytes_be())?;
    write_bytes(writer, &r2.to_bytes_be())?;
    write_bytes(writer, &n.to_bytes_be())?;
    Ok(())
}

/// Encode a single LSH hash function as a tagged record
pub fn write_hash_fn<W: Write>(writer: &mut W, hash: &HashFn) -> Result<()> {
    match hash {
        HashFn::Gaussian(h) => {
            let (a, b, r) = h.parameters();
            writer.write_u8(ALGO_GAUSSIAN)?;
            writer.write_u32::<LittleEndian>(a.dim() as u32)?;
            for &coord in a.as_slice() {
                writer.write_f64::<LittleEndian>(coord)?;
            }
            writer.write_f64::<LittleEndian>(b)?;
            writer.write_f64::<LittleEndian>(r)?;
        }
        HashFn::Hamming(h) => {
            let (coord, dim) = h.parameters();
            writer.write_u8(ALGO_HAMMING)?;
            writer.write_u32::<LittleEndian>(dim as u32)?;
            writer.write_u32::<LittleEndian>(coord as u32)?;
        }
    }
    Ok(())
}

/// Decode a single tagged hash-function record
pub fn read_hash_fn(cursor: &mut Cursor<&[u8]>) -> Result<HashFn> {
    let tag = cursor.read_u8()?;
    match tag {
        ALGO_GAUSSIAN => {
            let dim = cursor.read_u32::<LittleEndian>()? as usize;
            let mut coords = Vec::with_capacity(dim);
            for _ in 0..dim {
                coords.push(cursor.read_f64::<LittleEndian>()?);
            }
            let b = cursor.read_f64::<LittleEndian>()?;
            let r = cursor.read_f64::<LittleEndian>()?;
            let a = Vector::from_values(coords)?;
            Ok(HashFn::Gaussian(GaussianHash::from_parts(a, b, r)?))
        }
        ALGO_HAMMING => {
            let dim = cursor.read_u32::<LittleEndian>()? as usize;
            let coord = cursor.read_u32::<LittleEndian>()? as usize;
            Ok(HashFn::Hamming(HammingHash::from_parts(coord, dim)?))
        }
        other => Err(ProtocolError::InvalidRecord(format!(
            "unknown hash algorithm tag {other}"
        ))),
    }
}

/// Decode a universal-hash record
pub fn read_universal_hash(cursor: &mut Cursor<&[u8]>) -> Result<UniversalHash> {
    let tag = cursor.read_u8()?;
    if tag != ALGO_UNIVERSAL {
        return Err(ProtocolError::InvalidRecord(format!(
            "expected universal hash record, got tag {tag}"
        )));
    }
    let r1 = BigUint::from_bytes_be(&read_bytes(cursor)?);
    let r2 = BigUint::from_bytes_be(&read_bytes(cursor)?);
    let n = BigUint::from_bytes_be(&read_bytes(cursor)?);
    Ok(UniversalHash::from_parts(r1, r2, n))
}

/// Encode a composed LSH: count plus one record per sub-hash
pub fn write_lsh<W: Write>(writer: &mut W, lsh: &Lsh) -> Result<()> {
    writer.write_u16::<LittleEndian>(lsh.hash_set().len() as u16)?;
    for hash in lsh.hash_set() {
        write_hash_fn(writer, hash)?;
    }
    Ok(())
}

/// Decode a composed LSH
pub fn read_lsh(cursor: &mut Cursor<&[u8]>) -> Result<Lsh> {
    let count = cursor.read_u16::<LittleEndian>()? as usize;
    let mut hashes = Vec::with_capacity(count);
    for _ in 0..count {
        hashes.push(read_hash_fn(cursor)?);
    }
    Ok(Lsh::from_hashes(hashes))
}

/// Encode a curve point: curve name plus SEC1 uncompressed bytes
pub fn write_point<W: Write>(writer: &mut W, point: &Point) -> Result<()> {
    write_bytes(writer, point.curve.params().name.as_bytes())?;
    write_bytes(writer, &point.encode())?;
    Ok(())
}

/// Decode a curve point
pub fn read_point(cursor: &mut Cursor<&[u8]>) -> Result<Point> {
    let name_bytes = read_bytes(cursor)?;
    let name = String::from_utf8(name_bytes)
        .map_err(|_| ProtocolError::InvalidRecord("curve name is not UTF-8".into()))?;
    let curve = CurveId::from_name(&name)?;
    let data = read_bytes(cursor)?;
    Ok(Point::decode(curve, &data)?)
}

/// Encode an unblinded redemption token (t, S)
pub fn write_token<W: Write>(writer: &mut W, token: &SignedToken) -> Result<()> {
    writer.write_all(&token.t)?;
    write_point(writer, &token.s)?;
    Ok(())
}

/// Decode an unblinded redemption token
pub fn read_token(cursor: &mut Cursor<&[u8]>) -> Result<SignedToken> {
    let mut t = [0u8; TOKEN_NONCE_LEN];
    cursor.read_exact(&mut t)?;
    let s = read_point(cursor)?;
    Ok(SignedToken { t, s })
}

/// Encode a PIR parameter block
pub fn write_pir_params<W: Write>(writer: &mut W, params: &PirParams) -> Result<()> {
    writer.write_u64::<LittleEndian>(params.num_items)?;
    writer.write_u32::<LittleEndian>(params.item_bytes)?;
    writer.write_u32::<LittleEndian>(params.poly_degree)?;
    writer.write_u32::<LittleEndian>(params.logt)?;
    writer.write_u32::<LittleEndian>(params.dim)?;
    writer.write_u32::<LittleEndian>(params.n_parallel)?;
    Ok(())
}

/// Decode a PIR parameter block
pub fn read_pir_params(cursor: &mut Cursor<&[u8]>) -> Result<PirParams> {
    let num_items = cursor.read_u64::<LittleEndian>()?;
    let item_bytes = cursor.read_u32::<LittleEndian>()?;
    let poly_degree = cursor.read_u32::<LittleEndian>()?;
    let logt = cursor.read_u32::<LittleEndian>()?;
    let dim = cursor.read_u32::<LittleEndian>()?;
    let n_parallel = cursor.read_u32::<LittleEndian>()?;
    Ok(PirParams::new(
        num_items,
        item_bytes,
        poly_degree,
        logt,
        dim,
        n_parallel,
    )?)
}

/// Encode an opaque PIR query
pub fn write_pir_query<W: Write>(writer: &mut W, query: &PirQuery) -> Result<()> {
    writer.write_u64::<LittleEndian>(query.client_id)?;
    write_bytes(writer, &query.blob)?;
    Ok(())
}

/// Decode an opaque PIR query
pub fn read_pir_query(cursor: &mut Cursor<&[u8]>) -> Result<PirQuery> {
    let client_id = cursor.read_u64::<LittleEndian>()?;
    let blob = read_bytes(cursor)?;
    Ok(PirQuery { client_id, blob })
}

/// Encode an opaque PIR answer shard
pub fn write_pir_answer<W: Write>(writer: &mut W, answer: &PirAnswer) -> Result<()> {
    write_bytes(writer, &answer.blob)
}

/// Decode an opaque PIR answer shard
pub fn read_pir_answer(cursor: &mut Cursor<&[u8]>) -> Result<PirAnswer> {
    Ok(PirAnswer {
        blob: read_bytes(cursor)?,
    })
}

/// Encode opaque evaluation keys
pub fn write_galois_keys<W: Write>(writer: &mut W, keys: &GaloisKeys) -> Result<()> {
    writer.write_u64::<LittleEndian>(keys.client_id)?;
    write_bytes(writer, &keys.blob)?;
    Ok(())
}

/// Decode opaque evaluation keys
pub fn read_galois_keys(cursor: &mut Cursor<&[u8]>) -> Result<GaloisKeys> {
    let client_id = cursor.read_u64::<LittleEndian>()?;
    let blob = read_bytes(cursor)?;
    Ok(GaloisKeys { client_id, blob })
}
