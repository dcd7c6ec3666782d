//! Remote group photo descriptor.

use crate::identity::CryptoIdentity;
use serde::{Deserialize, Serialize};

/// Where a group photo lives on the relay and how to decrypt it.
///
/// Two descriptors are equal only if uploader, label and key all match; a
/// changed descriptor means the photo has to be fetched again.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoDescriptor {
    /// Identity that uploaded the photo; `None` for identity-provider groups.
    pub uploader: Option<CryptoIdentity>,
    /// Relay-side label of the encrypted photo.
    pub label: [u8; 32],
    /// Symmetric key the photo is encrypted under.
    pub key: [u8; 32],
}

impl std::fmt::Debug for PhotoDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoDescriptor")
            .field("uploader", &self.uploader)
            .field("label", &crate::hex::encode(&self.label[..4]))
            .finish_non_exhaustive()
    }
}
