//! Symmetric encryption for relay blobs and administrators chains.
//!
//! Keys are derived from group seeds with Blake2b, then ChaCha20-Poly1305 is
//! used with a fresh random nonce prepended to the ciphertext.

use crate::error::CryptoError;
use crate::hash::blake2b_256_multi;
use crate::random::Prng;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use roster_types::Seed;

/// Length of the nonce prepended to every ciphertext.
pub const AEAD_NONCE_LEN: usize = 12;

const TAG_LEN: usize = 16;
const LENGTH_PREFIX: usize = 4;

/// Key for the server blob of a given version.
pub fn derive_blob_key(main_seed: &Seed, version_seed: &Seed) -> [u8; 32] {
    blake2b_256_multi(&[b"roster-blob", main_seed.as_bytes(), version_seed.as_bytes()])
}

/// Key for the standalone encrypted administrators chain. Depends only on the
/// main seed so that it survives version-seed rotations.
pub fn derive_chain_key(main_seed: &Seed) -> [u8; 32] {
    blake2b_256_multi(&[b"roster-admin-chain", main_seed.as_bytes()])
}

/// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
pub fn seal(key: &[u8; 32], plaintext: &[u8], prng: &dyn Prng) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut nonce_bytes = [0u8; AEAD_NONCE_LEN];
    prng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from(nonce_bytes);

    // Encryption with a 32-byte key into a Vec cannot fail.
    let ciphertext = cipher.encrypt(&nonce, plaintext).unwrap_or_default();
    let mut out = Vec::with_capacity(AEAD_NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypt the output of [`seal`].
pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < AEAD_NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Truncated(sealed.len()));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(AEAD_NONCE_LEN);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

/// Length-prefix `data` and zero-pad it to a multiple of `block` bytes, hiding
/// the exact member count from the relay.
pub fn pad_to_multiple(data: &[u8], block: usize) -> Vec<u8> {
    let block = block.max(1);
    let unpadded = LENGTH_PREFIX + data.len();
    let padded = unpadded.div_ceil(block) * block;
    let mut out = Vec::with_capacity(padded);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    out.resize(padded, 0);
    out
}

/// Strip the padding added by [`pad_to_multiple`].
pub fn unpad(padded: &[u8]) -> Result<&[u8], CryptoError> {
    if padded.len() < LENGTH_PREFIX {
        return Err(CryptoError::Padding("missing length prefix".into()));
    }
    let (prefix, rest) = padded.split_at(LENGTH_PREFIX);
    let mut len_bytes = [0u8; LENGTH_PREFIX];
    len_bytes.copy_from_slice(prefix);
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > rest.len() {
        return Err(CryptoError::Padding(format!(
            "declared length {} exceeds {} available bytes",
            len,
            rest.len()
        )));
    }
    if rest[len..].iter().any(|b| *b != 0) {
        return Err(CryptoError::Padding("non-zero padding".into()));
    }
    Ok(&rest[..len])
}
