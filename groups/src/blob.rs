//! The relay's server blob.
//!
//! The blob is the relay-side form of a consolidated snapshot. An
//! administrator encodes it, signs it, pads it and encrypts it under a key
//! derived from the group's main and version seeds. Readers reverse each step
//! and refuse the blob unless the signer is a current administrator of a
//! verified chain.

use crate::admin_chain::AdministratorsChain;
use crate::error::{encoding, GroupError};
use crate::member::SnapshotMember;
use crate::snapshot::{ConsolidatedSnapshot, SnapshotSource};
use roster_crypto::{
    check_response, derive_blob_key, keypair_from_private, open, pad_to_multiple, seal, unpad,
    Challenge, ChallengeSolver, Prng,
};
use roster_types::{
    CryptoIdentity, GroupIdentifier, PhotoDescriptor, PrivateKey, PublicKey, Seed, Signature,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Key material of a relay-backed group at one version.
#[derive(Clone)]
pub struct BlobKeys {
    pub main_seed: Seed,
    pub version_seed: Seed,
    /// Authenticates blob uploads; held by administrators only.
    pub admin_auth_key: Option<PrivateKey>,
}

impl BlobKeys {
    pub fn new(main_seed: Seed, version_seed: Seed, admin_auth_key: Option<PrivateKey>) -> Self {
        Self {
            main_seed,
            version_seed,
            admin_auth_key,
        }
    }

    pub fn admin_public_key(&self) -> Option<PublicKey> {
        self.admin_auth_key
            .clone()
            .map(|key| keypair_from_private(key).public)
    }

    fn blob_key(&self) -> [u8; 32] {
        derive_blob_key(&self.main_seed, &self.version_seed)
    }
}

impl PartialEq for BlobKeys {
    fn eq(&self, other: &Self) -> bool {
        self.main_seed == other.main_seed
            && self.version_seed == other.version_seed
            && self.admin_auth_key == other.admin_auth_key
    }
}

impl Eq for BlobKeys {}

impl std::fmt::Debug for BlobKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobKeys")
            .field("has_admin_key", &self.admin_auth_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Decrypted content of a relay blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerBlob {
    pub administrators_chain: AdministratorsChain,
    pub members: Vec<SnapshotMember>,
    pub version: u64,
    pub serialized_core_details: Vec<u8>,
    pub photo: Option<PhotoDescriptor>,
}

#[derive(Serialize, Deserialize)]
struct SignedBlob {
    encoded_blob: Vec<u8>,
    signer: CryptoIdentity,
    signature: Signature,
}

impl ServerBlob {
    pub fn member(&self, identity: &CryptoIdentity) -> Option<&SnapshotMember> {
        self.members.iter().find(|m| &m.identity == identity)
    }

    /// Encode, sign as `signer`, pad to a multiple of `padding` and encrypt.
    pub fn sign_then_encrypt(
        &self,
        signer: &CryptoIdentity,
        solver: &dyn ChallengeSolver,
        keys: &BlobKeys,
        padding: usize,
        prng: &dyn Prng,
    ) -> Result<Vec<u8>, GroupError> {
        if !self.administrators_chain.current_administrators().contains(signer) {
            return Err(GroupError::NotAdministrator(signer.to_hex()));
        }
        let encoded_blob = bincode::serialize(self).map_err(encoding)?;
        let signature = solver.solve(
            &Challenge::GroupBlob {
                encoded_blob: &encoded_blob,
            },
            signer,
        )?;
        let signed = SignedBlob {
            encoded_blob,
            signer: *signer,
            signature,
        };
        let plaintext = bincode::serialize(&signed).map_err(encoding)?;
        Ok(seal(&keys.blob_key(), &pad_to_multiple(&plaintext, padding), prng))
    }

    /// Decrypt and authenticate a blob downloaded for `expected`.
    pub fn decrypt_and_verify(
        ciphertext: &[u8],
        keys: &BlobKeys,
        expected: &GroupIdentifier,
    ) -> Result<Self, GroupError> {
        let padded = open(&keys.blob_key(), ciphertext)?;
        let plaintext = unpad(&padded)?;
        let signed: SignedBlob = bincode::deserialize(plaintext)
            .map_err(|e| GroupError::BlobRejected(format!("undecodable envelope: {e}")))?;

        let challenge = Challenge::GroupBlob {
            encoded_blob: &signed.encoded_blob,
        };
        if !check_response(&challenge, &signed.signature, &signed.signer) {
            return Err(GroupError::BadSignature(format!(
                "blob signature by {} does not verify",
                signed.signer
            )));
        }

        let mut blob: ServerBlob = bincode::deserialize(&signed.encoded_blob)
            .map_err(|e| GroupError::BlobRejected(format!("undecodable blob: {e}")))?;
        blob.administrators_chain = blob
            .administrators_chain
            .with_checked_integrity(&expected.uid)?;

        let admins: BTreeSet<_> = blob
            .administrators_chain
            .current_administrators()
            .iter()
            .copied()
            .collect();
        if !admins.contains(&signed.signer) {
            return Err(GroupError::BlobRejected(format!(
                "signer {} is not a current administrator",
                signed.signer
            )));
        }
        if let Some(rogue) = blob
            .members
            .iter()
            .find(|m| m.permissions.is_admin() && !admins.contains(&m.identity))
        {
            return Err(GroupError::BlobRejected(format!(
                "member {} claims admin permission without being in the administrators chain",
                rogue.identity
            )));
        }
        debug!(group_uid = %expected.uid, version = blob.version, members = blob.members.len(), "decrypted server blob");
        Ok(blob)
    }

    /// Drop members whose signed leave request appears in the relay log.
    /// Returns the blob without them and the identities removed.
    pub fn consolidate_with_log_entries(
        mut self,
        identifier: &GroupIdentifier,
        log_entries: &[Signature],
    ) -> (Self, Vec<CryptoIdentity>) {
        let mut departed = Vec::new();
        self.members.retain(|member| {
            let challenge = Challenge::GroupLeaveNonce {
                identifier,
                nonce: &member.invitation_nonce,
            };
            let left = log_entries
                .iter()
                .any(|entry| check_response(&challenge, entry, &member.identity));
            if left {
                departed.push(member.identity);
            }
            !left
        });
        if !departed.is_empty() {
            warn!(group_uid = %identifier.uid, departed = departed.len(), "relay log removed departed members");
        }
        (self, departed)
    }

    pub fn into_snapshot(self) -> Result<ConsolidatedSnapshot, GroupError> {
        Ok(ConsolidatedSnapshot {
            version: self.version,
            members: ConsolidatedSnapshot::index_members(self.members)?,
            source: SnapshotSource::Relay {
                administrators_chain: self.administrators_chain,
            },
            serialized_core_details: self.serialized_core_details,
            photo: self.photo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_crypto::{keypair_from_seed, LocalKeyring, OsPrng};
    use roster_types::{GroupCategory, InvitationNonce, Permission, PermissionSet};

    struct Fixture {
        keyring: LocalKeyring,
        alice: CryptoIdentity,
        bob: CryptoIdentity,
        chain: AdministratorsChain,
        keys: BlobKeys,
        identifier: GroupIdentifier,
    }

    fn fixture() -> Fixture {
        let keyring = LocalKeyring::new();
        let alice = keyring.insert(keypair_from_seed(&[1; 32]).private);
        let bob = keyring.insert(keypair_from_seed(&[2; 32]).private);
        let chain = AdministratorsChain::start_new(&alice, &[], &keyring, &OsPrng).unwrap();
        let identifier = GroupIdentifier::new(*chain.group_uid(), "https://relay.example", GroupCategory::RelayBacked).unwrap();
        Fixture {
            keyring,
            alice,
            bob,
            chain,
            keys: BlobKeys::new(Seed::new([7; 32]), Seed::new([8; 32]), None),
            identifier,
        }
    }

    fn member(identity: CryptoIdentity, permissions: PermissionSet, nonce: u8) -> SnapshotMember {
        SnapshotMember {
            identity,
            permissions,
            invitation_nonce: InvitationNonce::from_array([nonce; 16]),
            serialized_details: Vec::new(),
        }
    }

    fn blob(f: &Fixture) -> ServerBlob {
        ServerBlob {
            administrators_chain: f.chain.clone(),
            members: vec![
                member(f.alice, PermissionSet::all(), 1),
                member(f.bob, PermissionSet::default_member(), 2),
            ],
            version: 3,
            serialized_core_details: b"{\"name\":\"team\"}".to_vec(),
            photo: None,
        }
    }

    #[test]
    fn sign_encrypt_decrypt_verify() {
        let f = fixture();
        let ciphertext = blob(&f)
            .sign_then_encrypt(&f.alice, &f.keyring, &f.keys, 4096, &OsPrng)
            .unwrap();
        assert_eq!((ciphertext.len() - 12 - 16) % 4096, 0);
        let decrypted = ServerBlob::decrypt_and_verify(&ciphertext, &f.keys, &f.identifier).unwrap();
        assert_eq!(decrypted, blob(&f));
        assert!(decrypted.administrators_chain.is_integrity_checked());
    }

    #[test]
    fn non_admin_cannot_sign() {
        let f = fixture();
        let err = blob(&f)
            .sign_then_encrypt(&f.bob, &f.keyring, &f.keys, 4096, &OsPrng)
            .unwrap_err();
        assert!(matches!(err, GroupError::NotAdministrator(_)));
    }

    #[test]
    fn wrong_keys_fail() {
        let f = fixture();
        let ciphertext = blob(&f)
            .sign_then_encrypt(&f.alice, &f.keyring, &f.keys, 4096, &OsPrng)
            .unwrap();
        let other = BlobKeys::new(Seed::new([7; 32]), Seed::new([9; 32]), None);
        assert!(ServerBlob::decrypt_and_verify(&ciphertext, &other, &f.identifier).is_err());
    }

    #[test]
    fn admin_permission_outside_chain_rejected() {
        let f = fixture();
        let mut b = blob(&f);
        b.members[1].permissions = PermissionSet::default_member().with(Permission::GroupAdmin);
        let ciphertext = b
            .sign_then_encrypt(&f.alice, &f.keyring, &f.keys, 4096, &OsPrng)
            .unwrap();
        let err = ServerBlob::decrypt_and_verify(&ciphertext, &f.keys, &f.identifier).unwrap_err();
        assert!(matches!(err, GroupError::BlobRejected(_)));
    }

    #[test]
    fn blob_for_another_group_rejected() {
        let f = fixture();
        let ciphertext = blob(&f)
            .sign_then_encrypt(&f.alice, &f.keyring, &f.keys, 4096, &OsPrng)
            .unwrap();
        let mut elsewhere = f.identifier.clone();
        elsewhere.uid = roster_types::GroupUid::new([0; 32]);
        let err = ServerBlob::decrypt_and_verify(&ciphertext, &f.keys, &elsewhere).unwrap_err();
        assert!(matches!(err, GroupError::ChainRejected(_)));
    }

    #[test]
    fn log_entries_remove_departed_members() {
        let f = fixture();
        let b = blob(&f);
        let bob_nonce = b.member(&f.bob).unwrap().invitation_nonce.clone();
        let leave = f
            .keyring
            .solve(
                &Challenge::GroupLeaveNonce {
                    identifier: &f.identifier,
                    nonce: &bob_nonce,
                },
                &f.bob,
            )
            .unwrap();
        let (consolidated, departed) = b.consolidate_with_log_entries(&f.identifier, &[leave]);
        assert_eq!(departed, vec![f.bob]);
        assert!(consolidated.member(&f.bob).is_none());
        assert!(consolidated.member(&f.alice).is_some());
    }

    #[test]
    fn snapshot_rejects_duplicate_members() {
        let f = fixture();
        let mut b = blob(&f);
        b.members.push(member(f.bob, PermissionSet::default_member(), 3));
        assert!(matches!(b.into_snapshot(), Err(GroupError::BlobRejected(_))));
    }
}
