//! PIR parameter block

use crate::error::{PirError, Result};

/// Parameters shared between a PIR client and server.
///
/// poly_degree and logt describe the collaborator's plaintext space: one
/// lattice plaintext packs poly_degree * logt bits, so small items are
/// grouped several-per-plaintext and addressed by (plaintext index,
/// offset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PirParams {
    /// Number of items in the database
    pub num_items: u64,
    /// Bytes per item
    pub item_bytes: u32,
    /// Lattice polynomial degree
    pub poly_degree: u32,
    /// Plaintext modulus bits
    pub logt: u32,
    /// Recursion dimension
    pub dim: u32,
    /// Number of database shards evaluated in parallel
    pub n_parallel: u32,
}

impl PirParams {
    pub fn new(
        num_items: u64,
        item_bytes: u32,
        poly_degree: u32,
        logt: u32,
        dim: u32,
        n_parallel: u32,
    ) -> Result<Self> {
        if num_items == 0 || item_bytes == 0 {
            return Err(PirError::InvalidParameter(
                "database must have at least one item of at least one byte".into(),
            ));
        }
        if poly_degree == 0 || logt == 0 || dim == 0 || n_parallel == 0 {
            return Err(PirError::InvalidParameter(
                "poly_degree, logt, dim and n_parallel must be >= 1".into(),
            ));
        }
        Ok(Self {
            num_items,
            item_bytes,
            poly_degree,
            logt,
            dim,
            n_parallel,
        })
    }

    /// Items packed per plaintext
    pub fn elems_per_plaintext(&self) -> u64 {
        let bits = self.poly_degree as u64 * self.logt as u64;
        (bits / (self.item_bytes as u64 * 8)).max(1)
    }

    /// Native plaintext index of logical element i
    pub fn fv_index(&self, i: u64) -> u64 {
        i / self.elems_per_plaintext()
    }

    /// Offset of logical element i within its plaintext
    pub fn fv_offset(&self, i: u64) -> u64 {
        i % self.elems_per_plaintext()
    }

    /// Total database size in bytes
    pub fn database_bytes(&self) -> u64 {
        self.num_items * self.item_bytes as u64
    }
}
