//! Domain-separated challenges.
//!
//! An identity never signs raw bytes supplied by a peer: every signature is
//! over a typed `Challenge`, whose encoding starts with a per-purpose prefix.
//! A signature produced for one purpose therefore never verifies for another.

use crate::error::CryptoError;
use crate::sign::{sign_message, verify_signature};
use roster_types::{CryptoIdentity, GroupIdentifier, InvitationNonce, PrivateKey, PublicKey, Signature};
use std::collections::HashMap;
use std::sync::RwLock;

/// Something an identity (or a group admin key) can be asked to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge<'a> {
    /// Certifies one administrators-chain block (its encoded inner data).
    AdministratorsChainBlock { inner_data: &'a [u8] },
    /// Certifies an encoded server blob as authored by an administrator.
    GroupBlob { encoded_blob: &'a [u8] },
    /// A member's request to leave, proven with its invitation nonce.
    GroupLeaveNonce {
        identifier: &'a GroupIdentifier,
        nonce: &'a InvitationNonce,
    },
    /// Authenticates a blob upload to the relay; signed with the group admin key.
    BlobUpdate {
        lock_nonce: &'a [u8],
        encrypted_blob: &'a [u8],
        admin_public_key: &'a PublicKey,
    },
}

impl Challenge<'_> {
    fn prefix(&self) -> &'static [u8] {
        match self {
            Challenge::AdministratorsChainBlock { .. } => b"roster/group/admin-chain-block\0",
            Challenge::GroupBlob { .. } => b"roster/group/blob\0",
            Challenge::GroupLeaveNonce { .. } => b"roster/group/leave-nonce\0",
            Challenge::BlobUpdate { .. } => b"roster/group/blob-update\0",
        }
    }

    /// The exact bytes that get signed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.prefix().to_vec();
        match self {
            Challenge::AdministratorsChainBlock { inner_data } => out.extend_from_slice(inner_data),
            Challenge::GroupBlob { encoded_blob } => out.extend_from_slice(encoded_blob),
            Challenge::GroupLeaveNonce { identifier, nonce } => {
                out.extend_from_slice(identifier.uid.as_bytes());
                out.push(identifier.category.as_u8());
                push_len_prefixed(&mut out, identifier.server_url.as_bytes());
                push_len_prefixed(&mut out, nonce.as_bytes());
            }
            Challenge::BlobUpdate {
                lock_nonce,
                encrypted_blob,
                admin_public_key,
            } => {
                push_len_prefixed(&mut out, lock_nonce);
                out.extend_from_slice(admin_public_key.as_bytes());
                out.extend_from_slice(encrypted_blob);
            }
        }
        out
    }

    /// Sign this challenge directly with a key held by the caller (used for
    /// the group admin key, which is not an identity key).
    pub fn respond_with_key(&self, key: &PrivateKey) -> Signature {
        sign_message(&self.to_bytes(), key)
    }

    /// Verify a response against an explicit public key.
    pub fn check_with_key(&self, response: &Signature, key: &PublicKey) -> bool {
        verify_signature(&self.to_bytes(), response, key)
    }
}

fn push_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Check that `response` is `identity`'s signature over `challenge`.
pub fn check_response(challenge: &Challenge<'_>, response: &Signature, identity: &CryptoIdentity) -> bool {
    challenge.check_with_key(response, &identity.public_key())
}

/// Signs challenges on behalf of owned identities.
///
/// The private keys stay behind this trait; the group logic only ever asks for
/// signatures.
pub trait ChallengeSolver: Send + Sync {
    fn solve(&self, challenge: &Challenge<'_>, identity: &CryptoIdentity) -> Result<Signature, CryptoError>;
}

/// In-process keyring holding the private keys of owned identities.
#[derive(Default)]
pub struct LocalKeyring {
    keys: RwLock<HashMap<CryptoIdentity, PrivateKey>>,
}

impl LocalKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a private key and return the identity it controls.
    pub fn insert(&self, private: PrivateKey) -> CryptoIdentity {
        let identity = crate::keys::identity_of(&private);
        self.keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(identity, private);
        identity
    }
}

impl ChallengeSolver for LocalKeyring {
    fn solve(&self, challenge: &Challenge<'_>, identity: &CryptoIdentity) -> Result<Signature, CryptoError> {
        let keys = self.keys.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = keys
            .get(identity)
            .ok_or_else(|| CryptoError::UnknownIdentity(identity.to_hex()))?;
        Ok(challenge.respond_with_key(key))
    }
}
