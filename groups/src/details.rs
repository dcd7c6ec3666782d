//! Group details: serialized core details plus an optional photo.

use roster_store::DetailsRow;
use roster_types::PhotoDescriptor;
use std::path::PathBuf;

/// Descriptive metadata of a group.
///
/// A group holds trusted details and, when a peer published newer ones that
/// were not accepted yet, published details. Neither refers back to the
/// group; they are owned by value by the group state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDetails {
    pub serialized_core_details: Vec<u8>,
    pub photo: Option<PhotoDescriptor>,
    /// Local copy of the photo, set once downloaded.
    pub photo_path: Option<PathBuf>,
}

impl GroupDetails {
    pub fn new(serialized_core_details: Vec<u8>, photo: Option<PhotoDescriptor>) -> Self {
        Self {
            serialized_core_details,
            photo,
            photo_path: None,
        }
    }

    /// Same core details and photo descriptor. The local photo path is not
    /// part of the content.
    pub fn has_content(&self, serialized_core_details: &[u8], photo: Option<&PhotoDescriptor>) -> bool {
        self.serialized_core_details == serialized_core_details && self.photo.as_ref() == photo
    }

    pub fn same_content(&self, other: &GroupDetails) -> bool {
        self.has_content(&other.serialized_core_details, other.photo.as_ref())
    }

    /// Equal core details but a different photo descriptor.
    pub fn differs_only_by_photo(&self, other: &GroupDetails) -> bool {
        self.serialized_core_details == other.serialized_core_details && self.photo != other.photo
    }

    /// A photo is referenced but not downloaded yet.
    pub fn photo_missing(&self) -> bool {
        self.photo.is_some() && self.photo_path.is_none()
    }

    pub fn to_row(&self) -> DetailsRow {
        DetailsRow {
            serialized_core_details: self.serialized_core_details.clone(),
            photo: self.photo.clone(),
            photo_path: self.photo_path.clone(),
        }
    }

    pub fn from_row(row: DetailsRow) -> Self {
        Self {
            serialized_core_details: row.serialized_core_details,
            photo: row.photo,
            photo_path: row.photo_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(byte: u8) -> PhotoDescriptor {
        PhotoDescriptor {
            uploader: None,
            label: [byte; 32],
            key: [byte; 32],
        }
    }

    #[test]
    fn photo_path_is_not_content() {
        let mut a = GroupDetails::new(b"core".to_vec(), Some(photo(1)));
        let b = a.clone();
        a.photo_path = Some(PathBuf::from("/tmp/p"));
        assert!(a.same_content(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn photo_only_difference() {
        let a = GroupDetails::new(b"core".to_vec(), Some(photo(1)));
        let b = GroupDetails::new(b"core".to_vec(), Some(photo(2)));
        let c = GroupDetails::new(b"other".to_vec(), Some(photo(2)));
        assert!(a.differs_only_by_photo(&b));
        assert!(!a.differs_only_by_photo(&c));
        assert!(!a.differs_only_by_photo(&a));
    }

    #[test]
    fn missing_photo() {
        let mut d = GroupDetails::new(vec![], Some(photo(1)));
        assert!(d.photo_missing());
        d.photo_path = Some(PathBuf::from("/p"));
        assert!(!d.photo_missing());
        assert!(!GroupDetails::new(vec![], None).photo_missing());
    }
}
