//! Group persistence.
//!
//! One [`GroupRecord`] per (owner, identifier). Members, pending members and
//! details are stored as child rows of the record and are created and
//! destroyed with it.

use crate::StoreError;
use roster_types::{
    CryptoIdentity, GroupIdentifier, GroupInitiator, InvitationNonce, PhotoDescriptor, PrivateKey,
    Seed, Signature, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A member or pending member row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRow {
    pub identity: CryptoIdentity,
    /// `|`-joined permission codes.
    pub permissions: String,
    pub invitation_nonce: InvitationNonce,
    pub serialized_details: Vec<u8>,
}

/// A trusted or published details row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsRow {
    pub serialized_core_details: Vec<u8>,
    pub photo: Option<PhotoDescriptor>,
    /// Local file holding the downloaded photo, once available.
    pub photo_path: Option<PathBuf>,
}

/// One administrators-chain block as stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBlockRow {
    pub encoded_inner_data: Vec<u8>,
    pub signature: Signature,
}

/// Category-specific part of a group record.
#[derive(Clone, Serialize, Deserialize)]
pub enum GroupKindRecord {
    RelayBacked {
        main_seed: Seed,
        version_seed: Seed,
        admin_auth_key: Option<PrivateKey>,
        administrators_chain: Vec<ChainBlockRow>,
    },
    IdentityProviderManaged {
        push_topic: Option<String>,
        last_modification: Timestamp,
    },
}

impl std::fmt::Debug for GroupKindRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKindRecord::RelayBacked {
                administrators_chain,
                admin_auth_key,
                ..
            } => f
                .debug_struct("RelayBacked")
                .field("chain_len", &administrators_chain.len())
                .field("has_admin_key", &admin_auth_key.is_some())
                .finish_non_exhaustive(),
            GroupKindRecord::IdentityProviderManaged {
                push_topic,
                last_modification,
            } => f
                .debug_struct("IdentityProviderManaged")
                .field("push_topic", push_topic)
                .field("last_modification", last_modification)
                .finish(),
        }
    }
}

/// The persisted form of a group state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupRecord {
    pub owner: CryptoIdentity,
    pub identifier: GroupIdentifier,
    pub version: u64,
    pub own_permissions: String,
    pub own_invitation_nonce: InvitationNonce,
    pub frozen: bool,
    pub initiator: GroupInitiator,
    pub kind: GroupKindRecord,
    pub trusted_details: DetailsRow,
    pub published_details: Option<DetailsRow>,
    pub members: Vec<MemberRow>,
    pub pending_members: Vec<MemberRow>,
}

impl GroupRecord {
    pub fn references(&self, identity: &CryptoIdentity) -> bool {
        self.members
            .iter()
            .chain(self.pending_members.iter())
            .any(|row| &row.identity == identity)
    }
}

/// Trait for group persistence.
///
/// Implementations must keep (owner, identifier) unique: `insert_group` on an
/// existing key fails with [`StoreError::Duplicate`] and leaves the stored
/// record untouched.
pub trait GroupStore: Send + Sync {
    fn get_group(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<GroupRecord, StoreError>;

    fn insert_group(&self, record: &GroupRecord) -> Result<(), StoreError>;

    /// Replace an existing record. Fails with `NotFound` if absent.
    fn put_group(&self, record: &GroupRecord) -> Result<(), StoreError>;

    /// Delete a group with all its child rows, returning what was removed.
    fn delete_group(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<GroupRecord, StoreError>;

    fn group_exists(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<bool, StoreError>;

    fn groups_of_owner(&self, owner: &CryptoIdentity) -> Result<Vec<GroupRecord>, StoreError>;

    /// Identifiers of the owner's groups in which `identity` is a member or
    /// pending member.
    fn groups_with_member(
        &self,
        owner: &CryptoIdentity,
        identity: &CryptoIdentity,
    ) -> Result<Vec<GroupIdentifier>, StoreError> {
        Ok(self
            .groups_of_owner(owner)?
            .into_iter()
            .filter(|record| record.references(identity))
            .map(|record| record.identifier)
            .collect())
    }
}
