//! Blake2b-256, used for group uids, chain block links and blob key
//! derivation.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Digest of the concatenation of `parts`, without building it.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    parts
        .iter()
        .fold(Blake2b256::new(), |hasher, part| hasher.chain_update(part))
        .finalize()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_hash_like_their_concatenation() {
        assert_eq!(
            blake2b_256(b"main-seedversion-seed"),
            blake2b_256_multi(&[b"main-seed", b"version-seed"])
        );
    }

    #[test]
    fn distinct_inputs_distinct_digests() {
        assert_ne!(blake2b_256(b"group-a"), blake2b_256(b"group-b"));
        assert_ne!(blake2b_256(b""), [0u8; 32]);
    }
}
