//! Invitation nonces and seeds.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length in bytes of an invitation nonce.
pub const INVITATION_NONCE_LEN: usize = 16;

/// Length in bytes of a seed.
pub const SEED_LEN: usize = 32;

/// A per-member secret proving group standing. Rotating it revokes the
/// previous proof.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvitationNonce(Vec<u8>);

impl InvitationNonce {
    pub fn new(bytes: Vec<u8>) -> Result<Self, TypesError> {
        if bytes.len() != INVITATION_NONCE_LEN {
            return Err(TypesError::InvalidLength {
                what: "invitation nonce",
                expected: INVITATION_NONCE_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn from_array(bytes: [u8; INVITATION_NONCE_LEN]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for InvitationNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InvitationNonce({})", crate::hex::encode(&self.0[..4.min(self.0.len())]))
    }
}

/// Symmetric seed material (main seed or version seed of a relay blob).
///
/// Zeroized on drop. `Debug` does not print the bytes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn new(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
        let arr: [u8; SEED_LEN] = bytes.try_into().map_err(|_| TypesError::InvalidLength {
            what: "seed",
            expected: SEED_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_length_enforced() {
        assert!(InvitationNonce::new(vec![0; 15]).is_err());
        assert!(InvitationNonce::new(vec![0; 16]).is_ok());
    }

    #[test]
    fn seed_debug_hides_bytes() {
        let seed = Seed::new([9; 32]);
        assert_eq!(format!("{seed:?}"), "Seed(..)");
    }

    #[test]
    fn seed_from_slice() {
        assert!(Seed::from_slice(&[1; 31]).is_err());
        assert_eq!(Seed::from_slice(&[1; 32]).unwrap(), Seed::new([1; 32]));
    }
}
