use thiserror::Error;

/// Failures reported by the persistence, contact and photo collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No group, contact or photo under the given key.
    #[error("not found: {0}")]
    NotFound(String),

    /// An insert collided with an existing `(owner, identifier)`.
    #[error("already stored: {0}")]
    Duplicate(String),

    /// The underlying storage refused or failed the operation.
    #[error("backend unavailable: {0}")]
    Backend(String),
}
