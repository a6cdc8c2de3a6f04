// Stable hashing utilities
//
// Hash join keys and index bucket selection both need a hash that is
// stable for the lifetime of the process and identical for equal values.

use std::hash::{Hash, Hasher};

use crate::catalog::value::Value;

/// Hash a raw byte slice.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Hash a single value. Equal values (by `compare_equals`) hash equally;
/// the discriminant keeps different types from colliding.
pub fn hash_value(value: &Value) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
