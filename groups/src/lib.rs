//! Cryptographic group membership.
//!
//! A group's authoritative membership arrives as a consolidated snapshot,
//! either decrypted from the relay (certified by an administrators chain) or
//! signed by an identity provider. The reconciliation engine turns the local
//! [`GroupState`] and such a snapshot into the next state plus an explicit
//! [`GroupDelta`]; the [`GroupManager`] persists the result and dispatches
//! the returned [`GroupEvent`]s.
//!
//! Design:
//! - State transitions are pure: they return a new state or an error, never a
//!   partially mutated one.
//! - Snapshots are version-gated; an equal version may only delete.
//! - A chain update is accepted only if the trusted chain is its prefix.
//! - Invited and provider-listed identities start as pending members.

pub mod admin_chain;
pub mod batch;
pub mod blob;
pub mod config;
pub mod delta;
pub mod details;
pub mod error;
pub mod events;
pub mod keycloak;
pub mod manager;
pub mod member;
pub mod reconcile;
pub mod snapshot;
pub mod state;
pub mod transitions;

pub use admin_chain::{AdministratorsChain, ChainBlock};
pub use batch::{reconcile_batch, BatchItem};
pub use blob::{BlobKeys, ServerBlob};
pub use config::GroupsConfig;
pub use delta::{DetailsChange, GroupDelta, PhotoAction, Reconciliation};
pub use details::GroupDetails;
pub use error::{ErrorKind, GroupError};
pub use events::{EventBus, GroupEvent};
pub use keycloak::{
    KeycloakAdapter, KeycloakGroupBlob, KeycloakGroupMember, KeycloakPhoto, SignedUserDetails,
};
pub use manager::GroupManager;
pub use member::{Member, Membership, PendingMember, SnapshotMember};
pub use reconcile::UpdateOrigin;
pub use snapshot::{ConsolidatedSnapshot, SnapshotSource};
pub use state::{GroupKind, GroupState, NewMember};
