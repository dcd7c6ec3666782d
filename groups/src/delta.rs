//! The explicit diff produced by reconciliation.

use crate::events::GroupEvent;
use crate::state::GroupState;
use roster_types::{CryptoIdentity, PhotoDescriptor};
use std::collections::BTreeSet;

/// What happened to the group's details.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DetailsChange {
    #[default]
    Unchanged,
    /// A locally authored change replaced the trusted details.
    TrustedReplaced,
    /// A peer's change was stored as published details awaiting acceptance.
    Published,
    /// The snapshot matches the trusted details again; stale published
    /// details were discarded.
    PublishedDiscarded,
}

/// What the caller must do about the photo of the new details.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PhotoAction {
    /// No new details were created.
    #[default]
    Unchanged,
    /// The descriptor did not change; the downloaded file was carried over.
    Reusable,
    /// The descriptor changed; the photo must be (re)fetched.
    Fetch(PhotoDescriptor),
    /// The new details have no photo.
    Cleared,
}

/// Attributable record of every decision a reconciliation made.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupDelta {
    /// Identities added as pending members.
    pub inserted: BTreeSet<CryptoIdentity>,
    /// Identities removed from members or pending members.
    pub removed: BTreeSet<CryptoIdentity>,
    /// Retained identities whose invitation nonce changed.
    pub nonce_updated: BTreeSet<CryptoIdentity>,
    /// Retained identities whose permissions or details changed.
    pub silently_updated: BTreeSet<CryptoIdentity>,
    pub details: DetailsChange,
    pub photo: PhotoAction,
    /// Identities found in both sets and dropped from pending members.
    pub duplicates_dropped: BTreeSet<CryptoIdentity>,
}

impl GroupDelta {
    /// Identities the invitation sub-protocol must contact: those freshly
    /// inserted or whose nonce changed. Silent updates never appear here.
    pub fn touched(&self) -> BTreeSet<CryptoIdentity> {
        self.inserted.union(&self.nonce_updated).copied().collect()
    }

    pub fn membership_changed(&self) -> bool {
        !(self.inserted.is_empty()
            && self.removed.is_empty()
            && self.nonce_updated.is_empty()
            && self.silently_updated.is_empty())
    }
}

/// Outcome of a successful state transition: the next state, what changed,
/// and the events to dispatch once the state is persisted.
#[derive(Clone, Debug)]
pub struct Reconciliation {
    pub state: GroupState,
    pub delta: GroupDelta,
    pub events: Vec<GroupEvent>,
}

impl Reconciliation {
    pub fn touched(&self) -> BTreeSet<CryptoIdentity> {
        self.delta.touched()
    }
}
