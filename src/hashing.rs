//! Deterministic string hashing.
//!
//! The standard library hasher is randomly seeded per process, which would make RNG stream seeds
//! differ between runs. `hash_str` is used by `crate::random` to derive a stable seed offset from
//! the name of each RNG stream.

use xxhash_rust::xxh3::xxh3_64;

/// A convenience method to compute the hash of a `&str`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
