//! Veilfeed Approximate Nearest Neighbors
//!
//! Locality-sensitive hashing over feature vectors: the hash family
//! (universal, Gaussian p-stable, Hamming), k-wise composition into bucket
//! keys, the L-table index, and the brute-force post-filter that ranks the
//! candidates an index query returns.

mod error;
mod hashes;
mod index;
mod knn;
mod lsh;

pub use error::{AnnsError, Result};
pub use hashes::{GaussianHash, HammingHash, UniversalHash};
pub use index::{BucketKey, LshIndex, LshParams, Table};
pub use knn::{brute_force_top_k, majority_candidate, sorted_by_frequency};
pub use lsh::{digest_slot, encode_digests, HashFn, Lsh};
