//! Deterministic hashing for the model.
//!
//! The standard library `HashMap` seeds its hasher randomly, which would make iteration order
//! differ between runs. Everything that is keyed by a hash in this crate uses the `FxHash`
//! variants re-exported here instead. `HashMap::default()` creates a new map.
//!
//! `hash_str` is used to derive a per-stream seed offset in `crate::random`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A convenience method to compute a stable hash of a `&str`.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
