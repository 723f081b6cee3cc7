//! Blake2b hashing for content digests.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest as _};
use rapid_types::Digest;
use serde::Serialize;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Digest of raw bytes (transaction bytes, seeds, public keys).
pub fn digest_of(data: &[u8]) -> Digest {
    Digest::new(blake2b_256(data))
}

/// Digest of a value's canonical bincode encoding.
pub fn hash_serialized<T: Serialize + ?Sized>(value: &T) -> Result<Digest, bincode::Error> {
    let bytes = bincode::serialize(value)?;
    Ok(digest_of(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_deterministic() {
        let h1 = blake2b_256(b"hello committee");
        let h2 = blake2b_256(b"hello committee");
        assert_eq!(h1, h2);
    }

    #[test]
    fn blake2b_different_inputs() {
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn hash_serialized_tracks_content() {
        let a = hash_serialized(&(1u64, [2u8; 32])).unwrap();
        let b = hash_serialized(&(1u64, [2u8; 32])).unwrap();
        let c = hash_serialized(&(2u64, [2u8; 32])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }
}
