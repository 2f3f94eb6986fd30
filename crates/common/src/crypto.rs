//! Hashing and identifier generation

use crate::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes hashed into a resource identifier
pub const ID_ENTROPY_BYTES: usize = 16;

/// SHA-256 of `data`, hex encoded
pub fn hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Generate a fresh resource identifier.
///
/// The identifier is the hash of random bytes and carries no information
/// about the resource's inputs.
pub fn generate_resource_id() -> Result<String> {
    let mut bytes = [0u8; ID_ENTROPY_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Internal(format!("Failed to gather randomness: {}", e)))?;
    Ok(hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_value() {
        assert_eq!(
            hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generated_ids_are_unique_hex() {
        let a = generate_resource_id().unwrap();
        let b = generate_resource_id().unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
