//! The LSH index
//!
//! L hash tables, each keyed by the digests of its own composed LSH. Build
//! and query run one worker per table; tables never share state, and query
//! results are aggregated by collecting the frozen per-table candidate
//! lists in table order.

use std::collections::{BTreeMap, BTreeSet};

use num_bigint_dig::BigUint;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use veilfeed_vector::{DistanceMetric, Vector};

use crate::error::{AnnsError, Result};
use crate::hashes::UniversalHash;
use crate::lsh::Lsh;

/// A bucket key: the big-endian byte encoding of an LSH digest.
///
/// Typed so digest bytes cannot be confused with text keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey(pub Vec<u8>);

impl BucketKey {
    /// Key bytes of a digest
    pub fn from_big_uint(digest: &BigUint) -> Self {
        Self(digest.to_bytes_be())
    }

    /// The digest this key encodes
    pub fn to_big_uint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// One hash table: bucket key -> set of item ids
#[derive(Debug, Clone, Default)]
pub struct Table {
    buckets: BTreeMap<BucketKey, BTreeSet<u32>>,
}

impl Table {
    /// Insert id into the bucket for key, dropping the insert when the
    /// bucket is already at cap.
    fn insert(&mut self, key: BucketKey, id: u32, cap: Option<usize>) {
        let bucket = self.buckets.entry(key).or_default();
        match cap {
            Some(cap) if bucket.len() >= cap => {}
            _ => {
                bucket.insert(id);
            }
        }
    }

    /// The bucket for key, if present
    pub fn bucket(&self, key: &BucketKey) -> Option<&BTreeSet<u32>> {
        self.buckets.get(key)
    }

    /// All bucket keys in ascending order
    pub fn keys(&self) -> Vec<BucketKey> {
        self.buckets.keys().cloned().collect()
    }

    /// Iterate buckets in key order
    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, &BTreeSet<u32>)> {
        self.buckets.iter()
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when the table holds no buckets
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Size of the largest bucket
    pub fn max_bucket_size(&self) -> usize {
        self.buckets.values().map(|b| b.len()).max().unwrap_or(0)
    }
}

/// Parameters of the LSH index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LshParams {
    /// Number of features in each data point
    pub num_features: usize,
    /// Number of hash tables to construct
    pub num_tables: usize,
    /// Number of probes per hash table at query time
    pub num_probes: usize,
    /// Number of hash functions composed per table
    pub num_projections: usize,
    /// LSH approximation factor c
    pub approximation_factor: f64,
    /// Width of each Gaussian hash (Euclidean metric only)
    pub projection_width: f64,
    /// Output length of the key-randomization hash, in bytes
    pub hash_bytes: usize,
    /// Distance metric the index is sensitive to
    pub metric: DistanceMetric,
    /// Max ids per bucket; None for unbounded
    pub bucket_cap: Option<usize>,
}

impl LshParams {
    fn validate(&self) -> Result<()> {
        if self.num_features == 0 {
            return Err(AnnsError::InvalidParameter(
                "num_features must be >= 1".into(),
            ));
        }
        if self.num_tables == 0 {
            return Err(AnnsError::InvalidParameter("num_tables must be >= 1".into()));
        }
        if self.num_projections == 0 {
            return Err(AnnsError::InvalidParameter(
                "num_projections must be >= 1".into(),
            ));
        }
        if self.metric == DistanceMetric::Euclidean && self.projection_width <= 0.0 {
            return Err(AnnsError::InvalidParameter(format!(
                "projection_width must be > 0, got {}",
                self.projection_width
            )));
        }
        Ok(())
    }
}

/// LSH-based nearest-neighbor index
#[derive(Debug)]
pub struct LshIndex {
    params: LshParams,
    hashes: Vec<Lsh>,
    tables: Vec<Table>,
    data: Vec<Vector>,
}

impl LshIndex {
    /// Allocate an index: L composed hashes of k sub-hashes each, sampled
    /// per the declared metric. Construction cannot fail after parameter
    /// validation.
    pub fn new<R: Rng>(params: LshParams, rng: &mut R) -> Result<Self> {
        params.validate()?;
        let hashes = (0..params.num_tables)
            .map(|_| {
                Lsh::new(
                    params.metric,
                    params.num_features,
                    params.projection_width,
                    params.num_projections,
                    rng,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let tables = vec![Table::default(); params.num_tables];
        Ok(Self {
            params,
            hashes,
            tables,
            data: Vec::new(),
        })
    }

    /// Build the tables for data, retaining it by id = position.
    ///
    /// One worker per table; a table that fails leaves the others intact
    /// because each worker writes only its own slot.
    pub fn build(&mut self, data: Vec<Vector>) -> Result<()> {
        for (j, v) in data.iter().enumerate() {
            if v.dim() != self.params.num_features {
                return Err(AnnsError::InvalidParameter(format!(
                    "data[{j}] has dimension {}, index expects {}",
                    v.dim(),
                    self.params.num_features
                )));
            }
        }

        let cap = self.params.bucket_cap;
        let tables = self
            .hashes
            .par_iter()
            .map(|lsh| {
                let mut table = Table::default();
                for (j, point) in data.iter().enumerate() {
                    let key = lsh.bucket_key(point)?;
                    table.insert(key, j as u32, cap);
                }
                Ok(table)
            })
            .collect::<Result<Vec<_>>>()?;

        self.tables = tables;
        self.data = data;
        Ok(())
    }

    /// Return the candidates that share a bucket with the query in any
    /// table. Duplicates across tables are kept; callers deduplicate. An
    /// empty result is a valid answer.
    pub fn query(&self, query: &Vector) -> Result<(Vec<&Vector>, Vec<u32>)> {
        let per_table = self
            .hashes
            .par_iter()
            .zip(self.tables.par_iter())
            .map(|(lsh, table)| {
                let key = lsh.bucket_key(query)?;
                Ok(table
                    .bucket(&key)
                    .map(|b| b.iter().copied().collect::<Vec<u32>>())
                    .unwrap_or_default())
            })
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<u32> = per_table.into_iter().flatten().collect();
        let candidates = ids.iter().map(|&id| &self.data[id as usize]).collect();
        Ok((candidates, ids))
    }

    /// Replace every bucket key k with uh(k), per table, and return the new
    /// keys sorted ascending. Used when the table keys themselves must be
    /// hidden from the storage layer.
    pub fn randomize_bucket_keys(&mut self, uh: &UniversalHash) -> Vec<Vec<BigUint>> {
        let randomized: Vec<(Table, Vec<BigUint>)> = self
            .tables
            .par_iter()
            .map(|table| {
                let mut rekeyed = Table::default();
                for (key, bucket) in table.iter() {
                    let new_key = uh.digest(&key.to_big_uint());
                    let entry = rekeyed
                        .buckets
                        .entry(BucketKey::from_big_uint(&new_key))
                        .or_default();
                    entry.extend(bucket.iter().copied());
                }
                let keys = rekeyed.buckets.keys().map(|k| k.to_big_uint()).collect();
                (rekeyed, keys)
            })
            .collect();

        let mut new_keys = Vec::with_capacity(randomized.len());
        for (i, (table, keys)) in randomized.into_iter().enumerate() {
            self.tables[i] = table;
            new_keys.push(keys);
        }
        new_keys
    }

    /// Bucket keys of every table, ascending within each table
    pub fn table_keys(&self) -> Vec<Vec<BucketKey>> {
        self.tables.iter().map(|t| t.keys()).collect()
    }

    /// Size of the largest bucket in each table
    pub fn max_bucket_sizes(&self) -> Vec<usize> {
        self.tables.iter().map(|t| t.max_bucket_size()).collect()
    }

    /// The composed hash for table t
    pub fn hash_for_table(&self, t: usize) -> &Lsh {
        &self.hashes[t]
    }

    /// The table at index t
    pub fn table(&self, t: usize) -> &Table {
        &self.tables[t]
    }

    /// Number of tables
    pub fn num_tables(&self) -> usize {
        self.params.num_tables
    }

    /// Index parameters
    pub fn params(&self) -> &LshParams {
        &self.params
    }

    /// The indexed vectors, id = position
    pub fn data(&self) -> &[Vector] {
        &self.data
    }
}
