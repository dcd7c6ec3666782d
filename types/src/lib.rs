//! Fundamental types for roster.
//!
//! This crate defines the value types shared across every other crate in the workspace:
//! identities, keys, group identifiers, permissions, nonces, seeds, photo descriptors
//! and timestamps.

pub mod error;
pub mod group;
pub mod identity;
pub mod keys;
pub mod nonce;
pub mod permission;
pub mod photo;
pub mod time;

pub use error::TypesError;
pub use group::{GroupCategory, GroupIdentifier, GroupInitiator, GroupUid};
pub use identity::CryptoIdentity;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use nonce::{InvitationNonce, Seed, INVITATION_NONCE_LEN, SEED_LEN};
pub use permission::{Permission, PermissionSet};
pub use photo::PhotoDescriptor;
pub use time::Timestamp;

// Inline hex encoding to avoid adding the `hex` crate as a dependency of types.
pub(crate) mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}
