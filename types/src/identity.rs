//! Cryptographic identities of group members and owners.

use crate::error::TypesError;
use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The cryptographic identity of a user: its long-term Ed25519 public key.
///
/// Identities are totally ordered so that member sets iterate deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CryptoIdentity([u8; 32]);

impl CryptoIdentity {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(public_key.0)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse an identity from its lowercase hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let bytes = crate::hex::decode(s).ok_or_else(|| TypesError::InvalidHex(s.to_string()))?;
        let actual = bytes.len();
        let arr: [u8; 32] = bytes.try_into().map_err(|_| TypesError::InvalidLength {
            what: "identity",
            expected: 32,
            actual,
        })?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        crate::hex::encode(&self.0)
    }
}

impl fmt::Debug for CryptoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoIdentity({})", crate::hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for CryptoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let id = CryptoIdentity::new([0xab; 32]);
        assert_eq!(CryptoIdentity::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn rejects_short_hex() {
        let err = CryptoIdentity::from_hex("abcd").unwrap_err();
        assert!(matches!(err, TypesError::InvalidLength { actual: 2, .. }));
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            CryptoIdentity::from_hex("zz"),
            Err(TypesError::InvalidHex(_))
        ));
    }

    #[test]
    fn debug_is_abbreviated() {
        let id = CryptoIdentity::new([0x01; 32]);
        assert_eq!(format!("{id:?}"), "CryptoIdentity(01010101)");
    }
}
