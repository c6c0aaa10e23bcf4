//! Fast non-cryptographic hashing for internal maps.
//!
//! Keys in the store and the indices are small integers and interned
//! strings, so the std SipHash is wasted work.

use rustc_hash::FxBuildHasher;

pub use rustc_hash::FxHasher;

/// A `hashbrown` map keyed with FxHash.
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// A `hashbrown` set keyed with FxHash.
pub type FxHashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;
