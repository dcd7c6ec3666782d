use roster_crypto::CryptoError;
use roster_store::StoreError;
use roster_types::{Timestamp, TypesError};
use thiserror::Error;

/// Coarse classification of a [`GroupError`].
///
/// Every rejection is total: whatever the kind, the group state the caller
/// held before the call is still the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input failed a cryptographic or ordering check. Retrying with a
    /// newer input is safe.
    Integrity,
    /// Relay or local state is inconsistent with the group invariants.
    Consistency,
    /// The operation is not valid in the current state.
    Precondition,
    /// A collaborator (storage, photo store, key service) failed.
    External,
}

#[derive(Debug, Error)]
pub enum GroupError {
    // ── Integrity ──────────────────────────────────────────────────────
    #[error("snapshot version {received} is older than current version {current}")]
    VersionRegression { current: u64, received: u64 },

    #[error("provider timestamp {received} is older than last modification {current}")]
    TimestampRegression {
        current: Timestamp,
        received: Timestamp,
    },

    #[error("snapshot at unchanged version {version} is not deletion-only: {reason}")]
    NotDeletionOnly { version: u64, reason: String },

    #[error("duplicate snapshot at version {0}: nothing to delete")]
    DuplicateSnapshot(u64),

    #[error("administrators chain rejected: {0}")]
    ChainRejected(String),

    #[error("administrators chain does not extend the trusted chain")]
    ChainNotExtension,

    #[error("signature verification failed: {0}")]
    BadSignature(String),

    #[error("group blob rejected: {0}")]
    BlobRejected(String),

    // ── Consistency ────────────────────────────────────────────────────
    #[error("own identity is not a member of the snapshot")]
    OwnIdentityAbsent,

    #[error("own permissions include group admin but no admin key is available")]
    AdminWithoutKey,

    #[error("snapshot source does not match group category {0}")]
    SourceMismatch(String),

    #[error("group invariant violated: {0}")]
    InvariantViolation(String),

    #[error("corrupt group record: {0}")]
    CorruptRecord(String),

    // ── Precondition ───────────────────────────────────────────────────
    #[error("group already exists: {0}")]
    AlreadyExists(String),

    #[error("group not found: {0}")]
    NotFound(String),

    #[error("{0} is not a pending member")]
    NotPending(String),

    #[error("{0} is not a member")]
    NotMember(String),

    #[error("the owner's own identity cannot be removed from its group")]
    OwnIdentityRemoval,

    #[error("members can only be demoted in identity-provider managed groups")]
    DemotionNotAllowed,

    #[error("{0} is not a current administrator")]
    NotAdministrator(String),

    #[error("no published details to accept")]
    NoPublishedDetails,

    #[error("operation requires a relay-backed group")]
    NotRelayBacked,

    #[error("group {0} appears more than once in the batch")]
    DuplicateBatchEntry(String),

    #[error("invalid value: {0}")]
    InvalidValue(#[from] TypesError),

    #[error("configuration error: {0}")]
    Config(String),

    // ── External ───────────────────────────────────────────────────────
    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    #[error("encoding: {0}")]
    Encoding(String),
}

impl GroupError {
    pub fn kind(&self) -> ErrorKind {
        use GroupError::*;
        match self {
            VersionRegression { .. }
            | TimestampRegression { .. }
            | NotDeletionOnly { .. }
            | DuplicateSnapshot(_)
            | ChainRejected(_)
            | ChainNotExtension
            | BadSignature(_)
            | BlobRejected(_) => ErrorKind::Integrity,

            OwnIdentityAbsent
            | AdminWithoutKey
            | SourceMismatch(_)
            | InvariantViolation(_)
            | CorruptRecord(_) => ErrorKind::Consistency,

            AlreadyExists(_)
            | NotFound(_)
            | NotPending(_)
            | NotMember(_)
            | OwnIdentityRemoval
            | DemotionNotAllowed
            | NotAdministrator(_)
            | NoPublishedDetails
            | NotRelayBacked
            | DuplicateBatchEntry(_)
            | InvalidValue(_)
            | Config(_) => ErrorKind::Precondition,

            // A key service that cannot sign is a collaborator failure; every
            // other crypto error comes from verifying untrusted input.
            Crypto(CryptoError::UnknownIdentity(_)) => ErrorKind::External,
            Crypto(_) => ErrorKind::Integrity,

            Store(_) | Encoding(_) => ErrorKind::External,
        }
    }
}

pub(crate) fn encoding(e: impl std::fmt::Display) -> GroupError {
    GroupError::Encoding(e.to_string())
}
