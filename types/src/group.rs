//! Group identifiers.
//!
//! A group is addressed by its unique id, the relay server that hosts it, and
//! the category of trust root that governs its membership.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte unique id of a group.
///
/// For relay-backed groups this is the Blake2b-256 digest of the genesis
/// administrators-chain block. Identity-provider groups receive theirs from
/// the provider.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupUid([u8; 32]);

impl GroupUid {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let bytes = crate::hex::decode(s).ok_or_else(|| TypesError::InvalidHex(s.to_string()))?;
        let actual = bytes.len();
        let arr: [u8; 32] = bytes.try_into().map_err(|_| TypesError::InvalidLength {
            what: "group uid",
            expected: 32,
            actual,
        })?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        crate::hex::encode(&self.0)
    }
}

impl fmt::Debug for GroupUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupUid({})", crate::hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for GroupUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Which trust root governs a group's membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GroupCategory {
    /// Membership lives in an encrypted blob on the relay, certified by the
    /// administrators chain.
    RelayBacked = 0,
    /// Membership is pushed by an identity provider as a signed feed.
    IdentityProviderManaged = 1,
}

impl GroupCategory {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self, TypesError> {
        match value {
            0 => Ok(Self::RelayBacked),
            1 => Ok(Self::IdentityProviderManaged),
            other => Err(TypesError::UnknownCategory(other)),
        }
    }
}

/// The full, immutable identifier of a group.
///
/// Together with the owner's identity this forms the primary key of a group state.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupIdentifier {
    pub uid: GroupUid,
    pub server_url: String,
    pub category: GroupCategory,
}

impl GroupIdentifier {
    /// Build an identifier, rejecting an empty or non-http(s) server URL.
    pub fn new(
        uid: GroupUid,
        server_url: impl Into<String>,
        category: GroupCategory,
    ) -> Result<Self, TypesError> {
        let server_url = server_url.into();
        if !(server_url.starts_with("https://") || server_url.starts_with("http://")) {
            return Err(TypesError::InvalidServerUrl(server_url));
        }
        Ok(Self {
            uid,
            server_url,
            category,
        })
    }

    pub fn is_relay_backed(&self) -> bool {
        self.category == GroupCategory::RelayBacked
    }
}

impl fmt::Display for GroupIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({:?})", self.uid, self.server_url, self.category)
    }
}

/// How the local owner came to hold a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupInitiator {
    CreatedByMe,
    JoinedByInvitation,
    ProvisionedByIdentityProvider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrips_through_u8() {
        for cat in [GroupCategory::RelayBacked, GroupCategory::IdentityProviderManaged] {
            assert_eq!(GroupCategory::from_u8(cat.as_u8()).unwrap(), cat);
        }
        assert_eq!(
            GroupCategory::from_u8(7),
            Err(TypesError::UnknownCategory(7))
        );
    }

    #[test]
    fn identifier_rejects_bad_url() {
        let uid = GroupUid::new([1; 32]);
        assert!(GroupIdentifier::new(uid, "", GroupCategory::RelayBacked).is_err());
        assert!(GroupIdentifier::new(uid, "ftp://x", GroupCategory::RelayBacked).is_err());
        let id = GroupIdentifier::new(uid, "https://relay.example", GroupCategory::RelayBacked)
            .unwrap();
        assert!(id.is_relay_backed());
    }

    #[test]
    fn uid_hex_roundtrip() {
        let uid = GroupUid::new([0x5a; 32]);
        assert_eq!(GroupUid::from_hex(&uid.to_hex()).unwrap(), uid);
    }
}
