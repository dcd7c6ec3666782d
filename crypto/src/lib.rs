//! Cryptographic services for roster.
//!
//! - **Ed25519** for identity signatures and relay authentication
//! - **Blake2b** for chain digests, group uids and key derivation
//! - **Challenges**: domain-separated messages that an identity signs to
//!   certify chain blocks, group blobs, leave requests and blob updates
//! - **ChaCha20-Poly1305** for relay blob and administrators-chain encryption
//! - **Compact JWS** (EdDSA) verification for identity-provider payloads

pub mod challenge;
pub mod encryption;
pub mod error;
pub mod hash;
pub mod jws;
pub mod keys;
pub mod random;
pub mod sign;

pub use challenge::{check_response, Challenge, ChallengeSolver, LocalKeyring};
pub use encryption::{
    derive_blob_key, derive_chain_key, open, pad_to_multiple, seal, unpad, AEAD_NONCE_LEN,
};
pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi};
pub use jws::{sign_compact_jws, verify_compact_jws, SigningKeySet};
pub use keys::{
    generate_keypair, identity_of, keypair_from_private, keypair_from_seed, public_from_private,
};
pub use random::{OsPrng, Prng};
pub use sign::{sign_message, verify_signature};
