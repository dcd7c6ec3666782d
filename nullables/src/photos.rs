//! Nullable photo store: reference-counted in-memory photos.

use roster_crypto::blake2b_256_multi;
use roster_store::{PhotoStore, StoreError};
use roster_types::{CryptoIdentity, PhotoDescriptor};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

struct StoredPhoto {
    path: PathBuf,
    bytes: Vec<u8>,
    references: usize,
}

/// Photos live in memory under fake paths derived from their label.
pub struct NullPhotoStore {
    photos: Mutex<HashMap<PhotoDescriptor, StoredPhoto>>,
}

impl NullPhotoStore {
    pub fn new() -> Self {
        Self {
            photos: Mutex::new(HashMap::new()),
        }
    }

    pub fn bytes(&self, descriptor: &PhotoDescriptor) -> Option<Vec<u8>> {
        self.photos
            .lock()
            .unwrap()
            .get(descriptor)
            .map(|p| p.bytes.clone())
    }

    pub fn references(&self, descriptor: &PhotoDescriptor) -> usize {
        self.photos
            .lock()
            .unwrap()
            .get(descriptor)
            .map_or(0, |p| p.references)
    }

    pub fn len(&self) -> usize {
        self.photos.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn path_for(descriptor: &PhotoDescriptor) -> PathBuf {
        let label: String = descriptor.label[..8]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        PathBuf::from(format!("/null/photos/{label}"))
    }
}

impl Default for NullPhotoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoStore for NullPhotoStore {
    fn resolve_photo(&self, descriptor: &PhotoDescriptor) -> Result<Option<PathBuf>, StoreError> {
        Ok(self
            .photos
            .lock()
            .unwrap()
            .get(descriptor)
            .map(|p| p.path.clone()))
    }

    fn retain_photo(&self, descriptor: &PhotoDescriptor) -> Result<Option<PathBuf>, StoreError> {
        let mut photos = self.photos.lock().unwrap();
        Ok(photos.get_mut(descriptor).map(|p| {
            p.references += 1;
            p.path.clone()
        }))
    }

    fn store_photo(
        &self,
        uploader: Option<CryptoIdentity>,
        bytes: &[u8],
    ) -> Result<PhotoDescriptor, StoreError> {
        let label = blake2b_256_multi(&[b"label", bytes]);
        let key = blake2b_256_multi(&[b"key", bytes]);
        let descriptor = PhotoDescriptor { uploader, label, key };
        self.save_downloaded(&descriptor, bytes)?;
        Ok(descriptor)
    }

    fn save_downloaded(
        &self,
        descriptor: &PhotoDescriptor,
        bytes: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let mut photos = self.photos.lock().unwrap();
        let entry = photos
            .entry(descriptor.clone())
            .or_insert_with(|| StoredPhoto {
                path: Self::path_for(descriptor),
                bytes: bytes.to_vec(),
                references: 0,
            });
        entry.references += 1;
        Ok(entry.path.clone())
    }

    fn release_photo(&self, descriptor: &PhotoDescriptor) -> Result<(), StoreError> {
        let mut photos = self.photos.lock().unwrap();
        let Some(photo) = photos.get_mut(descriptor) else {
            return Ok(());
        };
        photo.references = photo.references.saturating_sub(1);
        if photo.references == 0 {
            photos.remove(descriptor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_photo_is_removed_after_last_release() {
        let store = NullPhotoStore::new();
        let descriptor = store.store_photo(None, b"jpeg").unwrap();
        assert!(store.retain_photo(&descriptor).unwrap().is_some());
        assert_eq!(store.references(&descriptor), 2);

        store.release_photo(&descriptor).unwrap();
        assert!(store.resolve_photo(&descriptor).unwrap().is_some());
        store.release_photo(&descriptor).unwrap();
        assert!(store.resolve_photo(&descriptor).unwrap().is_none());
    }

    #[test]
    fn retain_unknown_photo_is_none() {
        let store = NullPhotoStore::new();
        let descriptor = PhotoDescriptor {
            uploader: None,
            label: [1; 32],
            key: [2; 32],
        };
        assert!(store.retain_photo(&descriptor).unwrap().is_none());
        store.release_photo(&descriptor).unwrap();
        assert!(store.is_empty());
    }
}
