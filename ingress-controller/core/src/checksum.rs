//! Stable hashing for node checksums and FQDN sharding.
//!
//! All hashing is unseeded xxh64 so that a checksum computed by one process
//! matches the `cloud_config_cksum` written by a previous incarnation of the
//! controller. Unordered collections must be canonicalized (sorted) by the
//! caller before being folded in; the helpers here only hash what they are
//! given.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh64(bytes, 0)
}

pub fn hash_str(s: &str) -> u64 {
    xxh64(s.as_bytes(), 0)
}

/// Hashes the JSON rendering of a value. Used for compound fields where the
/// original controller hashed a stringified object.
pub fn hash_json<T: Serialize>(value: &T) -> u64 {
    let s = serde_json::to_string(value).unwrap_or_default();
    hash_str(&s)
}

/// Hashes a logically unordered string collection, independent of insertion
/// order.
pub fn hash_sorted<S: AsRef<str>>(items: &[S]) -> u64 {
    let mut sorted: Vec<&str> = items.iter().map(|s| s.as_ref()).collect();
    sorted.sort_unstable();
    hash_json(&sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_calls() {
        assert_eq!(hash_str("foo.com"), hash_str("foo.com"));
        assert_ne!(hash_str("foo.com"), hash_str("bar.com"));
    }

    #[test]
    fn sorted_is_order_independent() {
        let a = ["foo.com".to_string(), "bar.com".to_string()];
        let b = ["bar.com".to_string(), "foo.com".to_string()];
        assert_eq!(hash_sorted(&a), hash_sorted(&b));
    }
}
