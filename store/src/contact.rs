//! Contact/trust subsystem interface.

use crate::StoreError;
use roster_types::{CryptoIdentity, GroupIdentifier};
use serde::{Deserialize, Serialize};

/// Why a contact is trusted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustOrigin {
    /// Vouched for by shared membership in a group.
    GroupMembership { identifier: GroupIdentifier },
    /// Vouched for by an identity provider.
    IdentityProvider { server_url: String },
}

/// A one-to-one contact of an owned identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub identity: CryptoIdentity,
    pub serialized_core_details: Vec<u8>,
    pub origins: Vec<TrustOrigin>,
}

pub trait ContactDirectory: Send + Sync {
    /// Create the contact if unknown, otherwise add `origin` to its trust
    /// origins. Adding an origin twice is a no-op.
    fn add_or_reinforce_contact(
        &self,
        owner: &CryptoIdentity,
        identity: &CryptoIdentity,
        serialized_core_details: &[u8],
        origin: TrustOrigin,
    ) -> Result<Contact, StoreError>;

    fn is_trusted_contact(
        &self,
        owner: &CryptoIdentity,
        identity: &CryptoIdentity,
    ) -> Result<bool, StoreError>;
}
