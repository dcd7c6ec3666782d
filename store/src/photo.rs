//! Photo file storage interface.
//!
//! Photos are shared by descriptor: two detail records pointing at the same
//! descriptor share one file. The store decides when a file can be removed.

use crate::StoreError;
use roster_types::{CryptoIdentity, PhotoDescriptor};
use std::path::PathBuf;

pub trait PhotoStore: Send + Sync {
    /// Local path of the photo for `descriptor`, if it is already on disk.
    fn resolve_photo(&self, descriptor: &PhotoDescriptor) -> Result<Option<PathBuf>, StoreError>;

    /// Like [`resolve_photo`](Self::resolve_photo), but also takes a reference
    /// on the file when it exists.
    fn retain_photo(&self, descriptor: &PhotoDescriptor) -> Result<Option<PathBuf>, StoreError>;

    /// Store a locally chosen photo and mint a fresh descriptor for it. The
    /// caller holds one reference.
    fn store_photo(
        &self,
        uploader: Option<CryptoIdentity>,
        bytes: &[u8],
    ) -> Result<PhotoDescriptor, StoreError>;

    /// Save bytes downloaded for a known descriptor and take a reference.
    fn save_downloaded(
        &self,
        descriptor: &PhotoDescriptor,
        bytes: &[u8],
    ) -> Result<PathBuf, StoreError>;

    /// Drop one reference to the photo. The file is removed once no details
    /// record needs it.
    fn release_photo(&self, descriptor: &PhotoDescriptor) -> Result<(), StoreError>;
}
