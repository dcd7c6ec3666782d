//! Consolidated snapshots: the input shape of reconciliation.

use crate::admin_chain::AdministratorsChain;
use crate::error::GroupError;
use crate::member::SnapshotMember;
use roster_types::{CryptoIdentity, PhotoDescriptor, Timestamp};
use std::collections::BTreeMap;

/// Which trust root vouches for a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Decrypted from the relay; the chain certifies the administrators.
    Relay {
        administrators_chain: AdministratorsChain,
    },
    /// Signed by an identity provider; ordered by its timestamp.
    IdentityProvider {
        timestamp: Timestamp,
        push_topic: Option<String>,
    },
}

/// The authoritative member and details list of a group at one version.
///
/// Always lists the local owner among its members. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsolidatedSnapshot {
    pub version: u64,
    pub source: SnapshotSource,
    pub members: BTreeMap<CryptoIdentity, SnapshotMember>,
    pub serialized_core_details: Vec<u8>,
    pub photo: Option<PhotoDescriptor>,
}

impl ConsolidatedSnapshot {
    /// Index members by identity, rejecting a list that names someone twice.
    pub fn index_members(
        members: impl IntoIterator<Item = SnapshotMember>,
    ) -> Result<BTreeMap<CryptoIdentity, SnapshotMember>, GroupError> {
        let mut indexed = BTreeMap::new();
        for member in members {
            let identity = member.identity;
            if indexed.insert(identity, member).is_some() {
                return Err(GroupError::BlobRejected(format!(
                    "member {identity} listed twice"
                )));
            }
        }
        Ok(indexed)
    }

    pub fn member(&self, identity: &CryptoIdentity) -> Option<&SnapshotMember> {
        self.members.get(identity)
    }

    pub fn administrators_chain(&self) -> Option<&AdministratorsChain> {
        match &self.source {
            SnapshotSource::Relay {
                administrators_chain,
            } => Some(administrators_chain),
            SnapshotSource::IdentityProvider { .. } => None,
        }
    }
}
