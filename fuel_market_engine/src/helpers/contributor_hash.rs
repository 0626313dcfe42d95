use std::fmt::Write;

use blake2::{Blake2b512, Digest};
use log::warn;

/// Fallback salt for development environments. Production deployments must set
/// `FMC_CONTRIBUTOR_SALT`, otherwise contributor hashes are linkable across installs.
const DEFAULT_SALT: &str = "fmc-dev-salt";

/// Returns the contributor-hash salt from the `FMC_CONTRIBUTOR_SALT` environment variable.
pub fn contributor_salt() -> String {
    std::env::var("FMC_CONTRIBUTOR_SALT").unwrap_or_else(|_| {
        warn!(
            "FMC_CONTRIBUTOR_SALT is not set. Falling back to the built-in development salt; contributor hashes \
             will not be unique to this install."
        );
        DEFAULT_SALT.to_string()
    })
}

/// One-way, salted hash of a raw contributor key (typically a remote address).
///
/// The raw key is never stored; only this hash is, so submissions can be grouped and
/// rate-limited per contributor without being attributable to an identity. 128 bits of the
/// Blake2b digest are plenty for collision resistance at this cardinality.
pub fn contributor_hash(salt: &str, contributor_key: &str) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"|");
    hasher.update(contributor_key.as_bytes());
    let digest = hasher.finalize();
    digest[..16].iter().fold(String::with_capacity(32), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_salted() {
        let a = contributor_hash("salt-1", "203.0.113.7");
        let b = contributor_hash("salt-1", "203.0.113.7");
        let c = contributor_hash("salt-2", "203.0.113.7");
        let d = contributor_hash("salt-1", "203.0.113.8");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_not_the_key() {
        let hash = contributor_hash("salt", "198.51.100.23");
        assert_ne!(hash, "198.51.100.23");
    }
}
