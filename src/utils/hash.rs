// src/utils/hash.rs

//! Content fingerprints.

use sha2::{Digest, Sha256};

/// Hex SHA-256 over a list of field renderings.
///
/// Each part is length-prefixed so that `["ab", "c"]` and `["a", "bc"]`
/// hash differently.
pub fn fingerprint<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        let bytes = part.as_ref().as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize())
}
